// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! L3 (Reed-Solomon parity) scenarios: the erasure coder reconstructing a
//! lost shard end-to-end, and a multi-rank group agreeing recoverability
//! through `scan_l3` when erasures stay within the parity budget.

use std::path::PathBuf;
use std::thread;

use checkpoint_domain::{CheckpointError, ErasureCoder, FileMeta, Md5Digest, FILE_META_LEN, NOT_APPLICABLE};
use checkpoint_engine::infrastructure::level_scan::scan_l3;
use checkpoint_engine::{ReedSolomonCoder, SimulatedGroup};
use tempfile::tempdir;

fn write_primary(dir: &std::path::Path, ckpt_id: i64, rank: i32, max_fs: i64) {
    let payload = [7u8; 40];
    let mut hasher = Md5Digest::default();
    hasher.update(&payload);
    let digest = hasher.finalize();
    let fs = FILE_META_LEN as u64 + payload.len() as u64;
    let meta = FileMeta::finalize::<Md5Digest>(digest, 1, fs, fs, NOT_APPLICABLE, max_fs);
    let mut file = std::fs::File::create(dir.join(format!("Ckpt{ckpt_id}-Rank{rank}.fti"))).unwrap();
    std::io::Write::write_all(&mut file, &meta.to_bytes()).unwrap();
    std::io::Write::write_all(&mut file, &payload).unwrap();
}

#[test]
fn reed_solomon_reconstructs_two_lost_shards_out_of_five() {
    let coder = ReedSolomonCoder;
    let data: Vec<Vec<u8>> = (0..3).map(|i| vec![i as u8; 64]).collect();
    let encoded = coder.encode(&data, 2).unwrap();
    assert_eq!(encoded.len(), 5);

    let mut shards: Vec<Option<Vec<u8>>> = encoded.into_iter().map(Some).collect();
    shards[0] = None;
    shards[2] = None;
    coder.reconstruct(&mut shards, 3).unwrap();

    assert_eq!(shards[0].as_ref().unwrap(), &vec![0u8; 64]);
    assert_eq!(shards[2].as_ref().unwrap(), &vec![2u8; 64]);
}

#[test]
fn reed_solomon_refuses_to_reconstruct_beyond_its_parity_budget() {
    let coder = ReedSolomonCoder;
    let data: Vec<Vec<u8>> = (0..3).map(|i| vec![i as u8; 16]).collect();
    let encoded = coder.encode(&data, 2).unwrap();

    let mut shards: Vec<Option<Vec<u8>>> = encoded.into_iter().map(Some).collect();
    // Losing 3 of 5 shards exceeds a 2-parity-shard scheme's tolerance.
    shards[0] = None;
    shards[1] = None;
    shards[2] = None;
    let result = coder.reconstruct(&mut shards, 3);
    assert!(matches!(result, Err(CheckpointError::QuorumLost(_))));
}

/// Five ranks, a 2-parity-shard scheme: two ranks lose their primary file
/// entirely, which is within the erasure budget, so the group still agrees
/// the checkpoint is recoverable and on the shared `maxFs`.
#[test]
fn group_tolerates_erasures_within_the_parity_budget() {
    let rank_dirs: Vec<_> = (0..5).map(|_| tempdir().unwrap()).collect();
    let max_fs = 9001i64;

    for rank in [0usize, 2, 3] {
        write_primary(rank_dirs[rank].path(), 11, rank as i32, max_fs);
    }
    // ranks 1 and 4 lost their primaries outright.

    let group = SimulatedGroup::new(5);
    let handles: Vec<_> = (0..5)
        .map(|rank| {
            let member = group.member(rank);
            let dir = rank_dirs[rank].path().to_path_buf();
            thread::spawn(move || scan_l3::<Md5Digest, _>(&dir, &member, 2, None).unwrap())
        })
        .collect();

    for h in handles {
        let decision = h.join().unwrap();
        assert_eq!(decision.ckpt_id, 11);
        assert_eq!(decision.max_fs, max_fs);
        assert!(decision.recoverable);
    }
}

/// The same five-rank group losing three primaries exceeds a 2-parity-shard
/// budget; every rank must agree recovery is not possible.
#[test]
fn group_agrees_recovery_fails_when_erasures_exceed_the_parity_budget() {
    let rank_tempdirs: Vec<_> = (0..5).map(|_| tempdir().unwrap()).collect();
    let rank_dirs: Vec<PathBuf> = rank_tempdirs.iter().map(|d| d.path().to_path_buf()).collect();
    let max_fs = 4242i64;

    for rank in [0usize, 2] {
        write_primary(&rank_dirs[rank], 12, rank as i32, max_fs);
    }
    // ranks 1, 3, and 4 lost their primaries: 3 erasures against a 2-shard budget.

    let group = SimulatedGroup::new(5);
    let handles: Vec<_> = (0..5)
        .map(|rank| {
            let member = group.member(rank);
            let dir = rank_dirs[rank].clone();
            thread::spawn(move || scan_l3::<Md5Digest, _>(&dir, &member, 2, None).unwrap())
        })
        .collect();

    for h in handles {
        let decision = h.join().unwrap();
        assert!(!decision.recoverable);
    }
}
