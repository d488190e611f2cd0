// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # External Collaborator Ports
//!
//! The process-group/topology layer, the collective-operations layer, the
//! erasure-coding primitives, and the dirty-page tracker are explicitly out
//! of scope for this crate: the core consumes their interfaces rather than
//! implementing them. `checkpoint-engine` supplies concrete adapters
//! (an in-process topology/collective pair usable for tests and
//! single-node runs, and a `reed-solomon-erasure`-backed coder); a
//! production deployment would instead plug in a real MPI-style topology.

use crate::error::CheckpointError;
use crate::value_objects::variable::VariableId;

/// Process-group/topology facts the level scanners and writer need:
/// `myRank`, `groupRank`, `groupSize`, and left/right partner ranks for L2.
pub trait GroupTopology {
    fn my_rank(&self) -> i32;
    fn group_rank(&self) -> i32;
    fn group_size(&self) -> i32;
    /// Rank of the left partner node (for L2 partner-copy placement).
    fn left(&self) -> i32;
    /// Rank of the right partner node (for L2 partner-copy placement).
    fn right(&self) -> i32;
}

/// Group-wide collective operations: the only suspension points in an
/// otherwise synchronous, single-threaded engine.
pub trait Collective {
    /// All-gather of one `u64` per rank, ranks in group order.
    fn all_gather_u64(&self, value: u64) -> Result<Vec<u64>, CheckpointError>;
    /// All-gather of one `i64` per rank, ranks in group order.
    fn all_gather_i64(&self, value: i64) -> Result<Vec<i64>, CheckpointError>;
    /// Sum all-reduce of one `i64` across the group.
    fn all_reduce_sum_i64(&self, value: i64) -> Result<i64, CheckpointError>;
}

/// Reed-Solomon erasure coding over opaque byte shards, consumed by the L3
/// writer (encode) and L3 recovery (reconstruct). Byte ranges are opaque to
/// this port; it knows nothing about the checkpoint file format.
pub trait ErasureCoder {
    /// Encodes `data_shards` in place, appending `parity_shards` parity
    /// shards of the same length as the data shards.
    fn encode(&self, data_shards: &[Vec<u8>], parity_shards: usize) -> Result<Vec<Vec<u8>>, CheckpointError>;

    /// Reconstructs missing shards (`None` entries) from the surviving data
    /// and parity shards, given the original shard count was `data_shards`.
    fn reconstruct(
        &self,
        shards: &mut [Option<Vec<u8>>],
        data_shards: usize,
    ) -> Result<(), CheckpointError>;
}

/// One yielded dirty sub-range: `(sub_addr, sub_len)`, relative to the
/// whole-process address space the same way `baseAddr` is.
pub type DirtyRange = (u64, u64);

/// The differential-write iterator contract: yields successive, strictly
/// increasing, non-overlapping dirty sub-ranges of
/// `[base_addr, base_addr + length)` for one variable chunk. Fed by the
/// page-fault-driven dirty-page tracker, which is itself out of scope; the
/// engine only consumes this trait.
pub trait DirtyChunkSource {
    /// Returns an iterator over the dirty sub-ranges of the given chunk.
    /// When differential mode is disabled, implementations yield exactly
    /// one range equal to the whole chunk.
    fn changed_ranges(&self, id: VariableId, base_addr: u64, length: u64) -> Box<dyn Iterator<Item = DirtyRange> + '_>;
}
