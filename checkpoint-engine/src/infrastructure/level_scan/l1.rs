// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # L1 (Node-Local) Level Scan
//!
//! Success requires every rank in the group to have a valid local primary
//! file for the agreed `ckptID`.

use std::path::Path;

use checkpoint_domain::{CheckpointError, Collective, Digest128, GroupTopology};

use super::common::{agree_strictly, scan_for_rank, FileKind};

/// Outcome of a group-wide L1 decide.
#[derive(Debug, Clone, Copy)]
pub struct L1Decision {
    pub ckpt_id: i64,
    pub recoverable: bool,
}

/// Scans `dir` for this rank's primary file, then gathers findings across
/// the group and decides recoverability.
pub fn scan_l1<D: Digest128, G: GroupTopology + Collective>(
    dir: &Path,
    group: &G,
    requested_ckpt_id: Option<i64>,
) -> Result<L1Decision, CheckpointError> {
    let found = scan_for_rank::<D>(dir, FileKind::Primary, group.group_rank(), requested_ckpt_id)?;

    let local_ckpt_id = found.as_ref().map(|c| c.ckpt_id).unwrap_or(-1);
    let ids = group.all_gather_i64(local_ckpt_id)?;
    let ckpt_id = agree_strictly(&ids, "ckptID")?;

    let flags = group.all_gather_u64(found.is_some() as u64)?;
    let recoverable = flags.iter().all(|&f| f == 1);

    Ok(L1Decision { ckpt_id, recoverable })
}
