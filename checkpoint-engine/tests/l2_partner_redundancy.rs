// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Multi-rank L2 (partner-replicated) recovery, driven across real threads
//! via `SimulatedGroup` so the collective `all_gather` calls inside
//! `scan_l2` genuinely block on every rank's contribution rather than
//! trivially returning a single-rank vector.

mod common;

use std::path::PathBuf;
use std::thread;

use checkpoint_domain::{FileMeta, Md5Digest, FILE_META_LEN, NOT_APPLICABLE};
use checkpoint_engine::infrastructure::level_scan::scan_l2;
use checkpoint_engine::SimulatedGroup;
use tempfile::tempdir;

fn write_primary_like_file(dir: &std::path::Path, name: &str, payload: &[u8]) {
    let mut hasher = Md5Digest::default();
    hasher.update(payload);
    let digest = hasher.finalize();
    let fs = FILE_META_LEN as u64 + payload.len() as u64;
    let meta = FileMeta::finalize::<Md5Digest>(digest, 1, fs, fs, NOT_APPLICABLE, NOT_APPLICABLE);
    let mut file = std::fs::File::create(dir.join(name)).unwrap();
    std::io::Write::write_all(&mut file, &meta.to_bytes()).unwrap();
    std::io::Write::write_all(&mut file, payload).unwrap();
}

/// Three ranks in a ring. Rank 1 lost its own primary; its right neighbour
/// (rank 2) still holds the `Pcof1` partner copy, so the group as a whole
/// must still agree the checkpoint is recoverable.
#[test]
fn group_recovers_when_only_the_partner_copy_survives_for_one_rank() {
    let rank_dirs: Vec<_> = (0..3).map(|_| tempdir().unwrap()).collect();
    let rank_paths: Vec<PathBuf> = rank_dirs.iter().map(|d| d.path().to_path_buf()).collect();

    write_primary_like_file(&rank_paths[0], "Ckpt4-Rank0.fti", &[1u8; 32]);
    // rank 1's own primary is missing entirely.
    write_primary_like_file(&rank_paths[2], "Ckpt4-Rank2.fti", &[3u8; 32]);
    // rank 2 (rank 1's right neighbour) holds rank 1's partner copy.
    write_primary_like_file(&rank_paths[2], "Ckpt4-Pcof1.fti", &[9u8; 32]);

    let group = SimulatedGroup::new(3);
    let handles: Vec<_> = (0..3)
        .map(|rank| {
            let member = group.member(rank);
            let own_dir = rank_paths[rank].clone();
            let paths = rank_paths.clone();
            thread::spawn(move || {
                let neighbour_dirs = move |r: i32| paths[r as usize].clone();
                scan_l2::<Md5Digest, _, _>(&own_dir, neighbour_dirs, &member, None).unwrap()
            })
        })
        .collect();

    for h in handles {
        let decision = h.join().unwrap();
        assert_eq!(decision.ckpt_id, 4);
        assert!(decision.recoverable, "whole group should agree the checkpoint is recoverable");
    }
}

/// If a rank's primary is gone and no neighbour holds its partner copy
/// either, the whole group must agree recovery has failed for that
/// `ckptID` — not just the affected rank.
#[test]
fn group_agrees_recovery_fails_when_a_rank_has_neither_primary_nor_partner_copy() {
    let rank_dirs: Vec<_> = (0..3).map(|_| tempdir().unwrap()).collect();
    let rank_paths: Vec<PathBuf> = rank_dirs.iter().map(|d| d.path().to_path_buf()).collect();

    write_primary_like_file(&rank_paths[0], "Ckpt5-Rank0.fti", &[1u8; 32]);
    write_primary_like_file(&rank_paths[2], "Ckpt5-Rank2.fti", &[3u8; 32]);
    // rank 1 has no primary and no one holds its partner copy.

    let group = SimulatedGroup::new(3);
    let handles: Vec<_> = (0..3)
        .map(|rank| {
            let member = group.member(rank);
            let own_dir = rank_paths[rank].clone();
            let paths = rank_paths.clone();
            thread::spawn(move || {
                let neighbour_dirs = move |r: i32| paths[r as usize].clone();
                scan_l2::<Md5Digest, _, _>(&own_dir, neighbour_dirs, &member, None).unwrap()
            })
        })
        .collect();

    for h in handles {
        let decision = h.join().unwrap();
        assert!(!decision.recoverable);
    }
}
