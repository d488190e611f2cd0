// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Dirty-Chunk Source Adapters
//!
//! The dirty-page tracker that actually watches a process's memory for
//! writes is out of scope; this module supplies the one adapter the engine
//! needs regardless of whether a real tracker is wired in: the fallback that
//! treats every chunk as fully dirty when differential checkpointing is
//! disabled.

use checkpoint_domain::{DirtyChunkSource, DirtyRange, VariableId};

/// Yields exactly one range covering the whole chunk, for every variable.
/// Used whenever `enable_diff_ckpt` is `false`, and as the default in tests
/// that do not care about partial re-writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullRangeSource;

impl DirtyChunkSource for FullRangeSource {
    fn changed_ranges(&self, _id: VariableId, _base_addr: u64, length: u64) -> Box<dyn Iterator<Item = DirtyRange> + '_> {
        Box::new(std::iter::once((0, length)))
    }
}
