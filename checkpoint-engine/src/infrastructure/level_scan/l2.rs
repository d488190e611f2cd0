// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # L2 (Partner-Replicated) Level Scan
//!
//! A partner copy of rank `r`'s data (`Ckpt<id>-Pcof<r>.fti`) is written by
//! rank `r`'s right neighbour. So recovering rank `r` succeeds if either its
//! own primary survived, or its right neighbour still holds that copy; this
//! scanner therefore looks in two directories: its own, for its primary, and
//! its right neighbour's, for the copy of its own data.

use std::path::Path;

use checkpoint_domain::{CheckpointError, Collective, Digest128, GroupTopology};

use super::common::{agree_strictly, scan_for_rank, FileKind};

#[derive(Debug, Clone, Copy)]
pub struct L2Decision {
    pub ckpt_id: i64,
    pub recoverable: bool,
}

/// `own_dir` is this rank's L2 directory; `neighbour_dirs(rank)` resolves
/// any other rank's L2 directory (a real deployment's directories are
/// per-node and reachable only through the shared/network filesystem
/// topology, which is external to this crate; tests pass a closure over a
/// fixture of per-rank temp directories).
pub fn scan_l2<D, G, F>(
    own_dir: &Path,
    neighbour_dirs: F,
    group: &G,
    requested_ckpt_id: Option<i64>,
) -> Result<L2Decision, CheckpointError>
where
    D: Digest128,
    G: GroupTopology + Collective,
    F: Fn(i32) -> std::path::PathBuf,
{
    let my_rank = group.group_rank();
    let primary = scan_for_rank::<D>(own_dir, FileKind::Primary, my_rank, requested_ckpt_id)?;

    let right_dir = neighbour_dirs(group.right());
    let partner_copy = scan_for_rank::<D>(&right_dir, FileKind::PartnerCopy, my_rank, requested_ckpt_id)?;

    let local_ckpt_id = primary
        .as_ref()
        .map(|c| c.ckpt_id)
        .or_else(|| partner_copy.as_ref().map(|c| c.ckpt_id))
        .unwrap_or(-1);
    let ids = group.all_gather_i64(local_ckpt_id)?;
    let ckpt_id = agree_strictly(&ids, "ckptID")?;

    let covered = primary.is_some() || partner_copy.is_some();
    let flags = group.all_gather_u64(covered as u64)?;
    let recoverable = flags.iter().all(|&f| f == 1);

    Ok(L2Decision { ckpt_id, recoverable })
}
