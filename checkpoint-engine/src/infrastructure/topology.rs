// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # In-Process Topology / Collective Adapters
//!
//! The process-group/topology and collective-operations layers are external
//! collaborators (a real deployment plugs in an MPI-style implementation).
//! This module supplies two adapters usable without one: [`LocalTopology`],
//! a trivial single-rank group for single-node runs, and
//! [`SimulatedGroup`], a barrier-rendezvous implementation of
//! [`Collective`] for exercising L2/L3 multi-rank logic with in-process
//! threads in tests.

use std::sync::{Arc, Condvar, Mutex};

use checkpoint_domain::{CheckpointError, Collective, GroupTopology};

/// A single-process, single-rank group: `groupSize == 1`, partner ranks are
/// the process itself. Used for single-node runs and any test that does not
/// exercise L2/L3 redundancy.
#[derive(Debug, Clone, Copy)]
pub struct LocalTopology {
    rank: i32,
}

impl LocalTopology {
    pub fn new(rank: i32) -> Self {
        LocalTopology { rank }
    }
}

impl GroupTopology for LocalTopology {
    fn my_rank(&self) -> i32 {
        self.rank
    }
    fn group_rank(&self) -> i32 {
        0
    }
    fn group_size(&self) -> i32 {
        1
    }
    fn left(&self) -> i32 {
        self.rank
    }
    fn right(&self) -> i32 {
        self.rank
    }
}

impl Collective for LocalTopology {
    fn all_gather_u64(&self, value: u64) -> Result<Vec<u64>, CheckpointError> {
        Ok(vec![value])
    }
    fn all_gather_i64(&self, value: i64) -> Result<Vec<i64>, CheckpointError> {
        Ok(vec![value])
    }
    fn all_reduce_sum_i64(&self, value: i64) -> Result<i64, CheckpointError> {
        Ok(value)
    }
}

/// Per-rank view of a [`SimulatedGroup`]: a `GroupTopology` (fixed group
/// size and rank) paired with the shared rendezvous state that makes
/// [`Collective`] block until every rank has contributed its value.
pub struct GroupMember {
    rank: i32,
    size: i32,
    state: Arc<Rendezvous>,
}

impl GroupTopology for GroupMember {
    fn my_rank(&self) -> i32 {
        self.rank
    }
    fn group_rank(&self) -> i32 {
        self.rank
    }
    fn group_size(&self) -> i32 {
        self.size
    }
    fn left(&self) -> i32 {
        (self.rank + self.size - 1) % self.size
    }
    fn right(&self) -> i32 {
        (self.rank + 1) % self.size
    }
}

impl Collective for GroupMember {
    fn all_gather_u64(&self, value: u64) -> Result<Vec<u64>, CheckpointError> {
        let values = self.state.rendezvous(self.rank as usize, value as i64)?;
        Ok(values.into_iter().map(|v| v as u64).collect())
    }

    fn all_gather_i64(&self, value: i64) -> Result<Vec<i64>, CheckpointError> {
        self.state.rendezvous(self.rank as usize, value)
    }

    fn all_reduce_sum_i64(&self, value: i64) -> Result<i64, CheckpointError> {
        Ok(self.state.rendezvous(self.rank as usize, value)?.into_iter().sum())
    }
}

/// Simulates a fixed-size rank group in one process: spawn [`GroupMember`]
/// handles on separate threads and each thread's `Collective` calls block
/// until every member has submitted a value for that round, then all
/// threads see the same rank-ordered vector. Exists only to drive L2/L3
/// logic under test; a real deployment's `Collective` crosses process and
/// node boundaries instead.
pub struct SimulatedGroup {
    size: usize,
    state: Arc<Rendezvous>,
}

impl SimulatedGroup {
    pub fn new(size: usize) -> Self {
        SimulatedGroup {
            size,
            state: Arc::new(Rendezvous::new(size)),
        }
    }

    pub fn member(&self, rank: usize) -> GroupMember {
        GroupMember {
            rank: rank as i32,
            size: self.size as i32,
            state: Arc::clone(&self.state),
        }
    }
}

struct Rendezvous {
    size: usize,
    inner: Mutex<RendezvousState>,
    cond: Condvar,
}

struct RendezvousState {
    round: u64,
    values: Vec<Option<i64>>,
    arrived: usize,
    /// Snapshot of the last completed round's gathered values, taken at the
    /// instant the final rank arrives — before `round` advances and slots
    /// are reused by the next round.
    completed: Vec<i64>,
}

impl Rendezvous {
    fn new(size: usize) -> Self {
        Rendezvous {
            size,
            inner: Mutex::new(RendezvousState { round: 0, values: vec![None; size], arrived: 0, completed: Vec::new() }),
            cond: Condvar::new(),
        }
    }

    /// Blocks the calling rank until every rank in the group has submitted a
    /// value for the current round, then returns all values in rank order.
    fn rendezvous(&self, rank: usize, value: i64) -> Result<Vec<i64>, CheckpointError> {
        let mut state = self.inner.lock().map_err(|_| CheckpointError::QuorumLost("rendezvous lock poisoned".into()))?;
        let my_round = state.round;
        state.values[rank] = Some(value);
        state.arrived += 1;

        if state.arrived == self.size {
            let out: Vec<i64> = state.values.iter().map(|v| v.expect("all ranks submitted this round")).collect();
            state.completed = out.clone();
            for slot in state.values.iter_mut() {
                *slot = None;
            }
            state.round += 1;
            state.arrived = 0;
            self.cond.notify_all();
            Ok(out)
        } else {
            while state.round == my_round {
                state = self.cond.wait(state).map_err(|_| CheckpointError::QuorumLost("rendezvous wait poisoned".into()))?;
            }
            Ok(state.completed.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn local_topology_is_a_trivial_single_rank_group() {
        let topo = LocalTopology::new(3);
        assert_eq!(topo.group_size(), 1);
        assert_eq!(topo.all_gather_u64(42).unwrap(), vec![42]);
    }

    #[test]
    fn simulated_group_all_gather_sees_every_rank_value() {
        let group = SimulatedGroup::new(3);
        let handles: Vec<_> = (0..3)
            .map(|rank| {
                let member = group.member(rank);
                thread::spawn(move || member.all_gather_u64(100 + rank as u64).unwrap())
            })
            .collect();

        for h in handles {
            let gathered = h.join().unwrap();
            assert_eq!(gathered, vec![100, 101, 102]);
        }
    }

    #[test]
    fn left_right_partner_ranks_wrap_around_the_ring() {
        let group = SimulatedGroup::new(3);
        let m1 = group.member(1);
        assert_eq!(m1.left(), 0);
        assert_eq!(m1.right(), 2);
        let m0 = group.member(0);
        assert_eq!(m0.left(), 2);
    }
}
