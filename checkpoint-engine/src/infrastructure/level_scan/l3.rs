// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # L3 (Reed-Solomon Parity) Level Scan
//!
//! Unlike L1/L2/L4, recoverability does not require every rank's primary to
//! survive: erasures up to the group's parity-shard count are tolerable, as
//! long as the surviving files agree on `ckptID` and the group-wide max
//! checkpoint size (`maxFs`). `maxFs` is read from whichever header
//! survives — primary or parity — since both are finalized with the same
//! value by the writer.

use std::path::Path;

use checkpoint_domain::{CheckpointError, Collective, Digest128, GroupTopology};

use super::common::{agree_strictly, scan_for_rank, FileKind};

#[derive(Debug, Clone, Copy)]
pub struct L3Decision {
    pub ckpt_id: i64,
    pub max_fs: i64,
    pub recoverable: bool,
}

/// `parity_shards` is the group's configured fault tolerance (how many
/// simultaneous rank losses the Reed-Solomon scheme can absorb).
pub fn scan_l3<D, G>(
    dir: &Path,
    group: &G,
    parity_shards: usize,
    requested_ckpt_id: Option<i64>,
) -> Result<L3Decision, CheckpointError>
where
    D: Digest128,
    G: GroupTopology + Collective,
{
    let my_rank = group.group_rank();
    let primary = scan_for_rank::<D>(dir, FileKind::Primary, my_rank, requested_ckpt_id)?;
    let parity = scan_for_rank::<D>(dir, FileKind::Parity, my_rank, requested_ckpt_id)?;

    let local_ckpt_id = primary
        .as_ref()
        .map(|c| c.ckpt_id)
        .or_else(|| parity.as_ref().map(|c| c.ckpt_id))
        .unwrap_or(-1);
    let ids = group.all_gather_i64(local_ckpt_id)?;
    let ckpt_id = agree_strictly(&ids, "ckptID")?;

    let local_max_fs = primary
        .as_ref()
        .map(|c| c.meta.max_fs)
        .or_else(|| parity.as_ref().map(|c| c.meta.max_fs))
        .unwrap_or(-1);
    let max_fs_candidates = group.all_gather_i64(local_max_fs)?;
    let max_fs = agree_strictly(&max_fs_candidates, "maxFs")?;

    let has_primary = primary.is_some();
    let survived = group.all_gather_u64(has_primary as u64)?;
    let erasures = survived.iter().filter(|&&v| v == 0).count();

    Ok(L3Decision { ckpt_id, max_fs, recoverable: erasures <= parity_shards })
}
