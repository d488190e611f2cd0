// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # L4 (Shared Global Filesystem) Level Scan
//!
//! Same decide logic as L1 — every rank needs a valid primary file — the
//! only difference is that `dir` is a shared filesystem path every rank
//! reaches directly rather than a node-local one.

use std::path::Path;

use checkpoint_domain::{CheckpointError, Collective, GroupTopology};
use checkpoint_domain::Digest128;

use super::l1::{scan_l1, L1Decision};

pub type L4Decision = L1Decision;

pub fn scan_l4<D: Digest128, G: GroupTopology + Collective>(
    shared_dir: &Path,
    group: &G,
    requested_ckpt_id: Option<i64>,
) -> Result<L4Decision, CheckpointError> {
    scan_l1::<D, G>(shared_dir, group, requested_ckpt_id)
}
