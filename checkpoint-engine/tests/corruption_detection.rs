// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Corruption detection at both layers: the level-scanner's header/body
//! validation (a tampered file is skipped, not fatal to the scan) and
//! `RecoveredCheckpoint::recover`'s per-chunk hash check (a tampered chunk
//! payload is caught even though the whole-file checksum on a different
//! byte range would not have seen it).

mod common;

use std::io::{Seek, SeekFrom, Write};

use checkpoint_domain::{CheckpointError, MetadataGraph, Md5Digest, FILE_META_LEN};
use checkpoint_engine::infrastructure::level_scan::scan_l1;
use checkpoint_engine::{write_checkpoint, FullRangeSource, LocalTopology, RecoveredCheckpoint, RedundancyFacts};
use common::TestVars;
use tempfile::tempdir;

fn no_redundancy() -> RedundancyFacts {
    RedundancyFacts { pt_fs: -1, max_fs: -1 }
}

#[test]
fn scanner_skips_a_file_whose_header_self_hash_was_tampered() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Ckpt1-Rank0.fti");
    let mut graph = MetadataGraph::new();
    let vars = TestVars::new(&[(1, vec![4u8; 128])]);
    write_checkpoint::<Md5Digest, _>(&path, &mut graph, &vars, &FullRangeSource, false, 1, no_redundancy()).unwrap();

    // Flip a byte inside the header's timestamp field; my_hash no longer matches.
    let mut file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(33)).unwrap();
    file.write_all(&[0xFF]).unwrap();
    file.sync_all().unwrap();

    let group = LocalTopology::new(0);
    let result = scan_l1::<Md5Digest, _>(dir.path(), &group, None);
    assert!(result.is_err(), "a group of one with no valid header must fail to agree on a ckptID");
}

#[test]
fn scanner_skips_a_file_whose_body_was_tampered_even_though_header_is_intact() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Ckpt1-Rank0.fti");
    let mut graph = MetadataGraph::new();
    let vars = TestVars::new(&[(1, vec![4u8; 128])]);
    write_checkpoint::<Md5Digest, _>(&path, &mut graph, &vars, &FullRangeSource, false, 1, no_redundancy()).unwrap();

    // Flip a payload byte well past the header; my_hash is untouched but the
    // whole-file checksum recorded in the (still-valid) header no longer matches.
    let mut file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(FILE_META_LEN as u64 + 12 + checkpoint_domain::VAR_CHUNK_LEN as u64 + 5)).unwrap();
    file.write_all(&[0x00]).unwrap();
    file.sync_all().unwrap();

    let group = LocalTopology::new(0);
    let result = scan_l1::<Md5Digest, _>(dir.path(), &group, None);
    assert!(result.is_err());
}

#[test]
fn recover_rejects_a_tampered_chunk_even_when_it_is_the_only_variable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Ckpt1-Rank0.fti");
    let mut graph = MetadataGraph::new();
    let vars = TestVars::new(&[(1, vec![3u8; 64])]);
    write_checkpoint::<Md5Digest, _>(&path, &mut graph, &vars, &FullRangeSource, false, 1, no_redundancy()).unwrap();

    let mut file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(FILE_META_LEN as u64 + 12 + checkpoint_domain::VAR_CHUNK_LEN as u64)).unwrap();
    file.write_all(&[0xAB]).unwrap();
    file.sync_all().unwrap();

    // The header was finalized before the tamper and still self-validates,
    // and open()/verify_whole_file() only check the aggregate digest — the
    // per-chunk hash inside recover() is what must catch this.
    let recovered = RecoveredCheckpoint::open::<Md5Digest>(&path).unwrap();
    let mut dst = TestVars::empty_like(&vars);
    let result = recovered.recover::<Md5Digest, _>(&path, &mut dst);
    assert!(matches!(result, Err(CheckpointError::DataCorrupt { id: Some(1), .. })));
}
