// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Level-Scan Shared Machinery
//!
//! Filename pattern matching, per-file header/body validation, and the
//! strict `ckptID` agreement every L1-L4 scanner shares. A candidate file's
//! body re-hash is a flat byte-range digest over the file itself, not a
//! graph walk: for a primary or partner file the block/chunk bytes are
//! already laid out contiguously on disk in exactly the order invariant I4
//! hashes them in, so re-reading the file sequentially reproduces the same
//! digest without reconstructing the metadata graph.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::warn;

use checkpoint_domain::{render_checksum_hex, CheckpointError, Digest128, FileMeta, FILE_META_LEN};

/// Cap on one read during body re-hashing, matching the level scanner's
/// fixed-size re-read loop.
pub const SCAN_BUFFER_LIMIT: usize = 128 * 1024;

/// Which of the three on-disk file roles a candidate plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `Ckpt<id>-Rank<rank>.fti`, header at offset 0.
    Primary,
    /// `Ckpt<id>-Pcof<rank>.fti`, an L2 partner copy, header at offset 0.
    PartnerCopy,
    /// `Ckpt<id>-RSed<rank>.fti`, an L3 parity shard, header at the file's
    /// tail rather than its head.
    Parity,
}

/// A filename-matched, header-and-body-validated on-disk checkpoint file.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub ckpt_id: i64,
    pub rank: i32,
    pub kind: FileKind,
    pub meta: FileMeta,
}

fn primary_pattern() -> Regex {
    Regex::new(r"^Ckpt(\d+)-Rank(\d+)\.fti$").expect("static pattern is valid")
}

fn pcof_pattern() -> Regex {
    Regex::new(r"^Ckpt(\d+)-Pcof(\d+)\.fti$").expect("static pattern is valid")
}

fn rsed_pattern() -> Regex {
    Regex::new(r"^Ckpt(\d+)-RSed(\d+)\.fti$").expect("static pattern is valid")
}

fn pattern_for(kind: FileKind) -> Regex {
    match kind {
        FileKind::Primary => primary_pattern(),
        FileKind::PartnerCopy => pcof_pattern(),
        FileKind::Parity => rsed_pattern(),
    }
}

/// Scans `dir` for a file of `kind` targeting `target_rank`. If
/// `requested_ckpt_id` is `Some`, only that exact id is accepted; otherwise
/// the highest-numbered valid candidate wins (older retained checkpoints are
/// ignored). Files that fail header or body validation are logged and
/// skipped rather than failing the whole scan — a single corrupt leftover
/// must not blind the scanner to an otherwise-recoverable file.
pub fn scan_for_rank<D: Digest128>(
    dir: &Path,
    kind: FileKind,
    target_rank: i32,
    requested_ckpt_id: Option<i64>,
) -> Result<Option<CandidateFile>, CheckpointError> {
    let pattern = pattern_for(kind);
    let mut best: Option<CandidateFile> = None;

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CheckpointError::io(dir.display().to_string(), e)),
    };

    for entry in entries {
        let entry = entry.map_err(|e| CheckpointError::io(dir.display().to_string(), e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(caps) = pattern.captures(name) else { continue };

        let ckpt_id: i64 = caps[1].parse().unwrap_or(-1);
        let rank: i32 = caps[2].parse().unwrap_or(-1);
        if rank != target_rank {
            continue;
        }
        if let Some(requested) = requested_ckpt_id {
            if ckpt_id != requested {
                continue;
            }
        }

        let path = entry.path();
        match validate_candidate::<D>(&path, kind, ckpt_id, rank) {
            Ok(candidate) => {
                let better = best.as_ref().map(|b| candidate.ckpt_id > b.ckpt_id).unwrap_or(true);
                if better {
                    best = Some(candidate);
                }
            }
            Err(e) => warn!(path = %path.display(), error = %e, "candidate file failed validation, skipping"),
        }
    }

    Ok(best)
}

fn validate_candidate<D: Digest128>(
    path: &Path,
    kind: FileKind,
    ckpt_id: i64,
    rank: i32,
) -> Result<CandidateFile, CheckpointError> {
    let metadata = std::fs::metadata(path).map_err(|e| CheckpointError::io(path.display().to_string(), e))?;
    if !metadata.is_file() || metadata.len() <= FILE_META_LEN as u64 {
        return Err(CheckpointError::HeaderCorrupt { path: path.display().to_string() });
    }

    let mut file = File::open(path).map_err(|e| CheckpointError::io(path.display().to_string(), e))?;
    let header_offset = match kind {
        FileKind::Parity => metadata.len() - FILE_META_LEN as u64,
        FileKind::Primary | FileKind::PartnerCopy => 0,
    };
    let mut header_buf = [0u8; FILE_META_LEN];
    file.seek(SeekFrom::Start(header_offset))
        .map_err(|e| CheckpointError::io(path.display().to_string(), e))?;
    file.read_exact(&mut header_buf)
        .map_err(|e| CheckpointError::io(path.display().to_string(), e))?;

    let meta = FileMeta::from_bytes(&header_buf)?;
    if !meta.verify_my_hash::<D>() {
        return Err(CheckpointError::HeaderCorrupt { path: path.display().to_string() });
    }

    let body_start = match kind {
        FileKind::Parity => 0,
        FileKind::Primary | FileKind::PartnerCopy => FILE_META_LEN as u64,
    };
    let digest = rehash_body::<D>(&mut file, body_start, meta.fs)?;
    if render_checksum_hex(digest) != meta.checksum {
        return Err(CheckpointError::DataCorrupt { path: path.display().to_string(), id: None });
    }

    Ok(CandidateFile { path: path.to_path_buf(), ckpt_id, rank, kind, meta })
}

/// Re-hashes `[start, start + len)` of an already-open file in fixed
/// [`SCAN_BUFFER_LIMIT`]-sized reads.
fn rehash_body<D: Digest128>(file: &mut File, start: u64, len: u64) -> Result<[u8; checkpoint_domain::DIGEST_LEN], CheckpointError> {
    file.seek(SeekFrom::Start(start)).map_err(|e| CheckpointError::io(String::new(), e))?;
    let mut hasher = D::default();
    let mut buf = vec![0u8; SCAN_BUFFER_LIMIT];
    let mut remaining = len;
    while remaining > 0 {
        let take = remaining.min(SCAN_BUFFER_LIMIT as u64) as usize;
        file.read_exact(&mut buf[..take]).map_err(|e| CheckpointError::io(String::new(), e))?;
        hasher.update(&buf[..take]);
        remaining -= take as u64;
    }
    Ok(hasher.finalize())
}

/// Strictly agrees on a `ckptID`/`maxFs`-style value across a group: every
/// positive value present must be identical. Favors a hard failure on
/// disagreement over a silently averaged, possibly-nonsensical id.
pub fn agree_strictly(values: &[i64], what: &str) -> Result<i64, CheckpointError> {
    let mut agreed: Option<i64> = None;
    for &v in values {
        if v <= 0 {
            continue;
        }
        match agreed {
            None => agreed = Some(v),
            Some(a) if a == v => {}
            Some(a) => {
                return Err(CheckpointError::QuorumLost(format!(
                    "group disagreed on {what}: {a} vs {v}"
                )))
            }
        }
    }
    agreed.ok_or_else(|| CheckpointError::QuorumLost(format!("no rank reported a positive {what}")))
}
