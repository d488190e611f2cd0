// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Reed-Solomon Parity Adapter (L3)
//!
//! The erasure-coding primitive itself is an external collaborator; this
//! is the concrete adapter the L3 writer/recoverer use to fulfil it, built
//! on the `reed-solomon-erasure` crate. Shard sizes are
//! opaque bytes to this module — it knows nothing about the checkpoint file
//! layout above it.

use reed_solomon_erasure::galois_8::ReedSolomon;

use checkpoint_domain::{CheckpointError, ErasureCoder};

/// Reed-Solomon coder over a fixed `(data_shards, parity_shards)` scheme,
/// matching the group size and redundancy level the L3 caller has already
/// decided on via `Collective`/`GroupTopology`.
pub struct ReedSolomonCoder;

impl ErasureCoder for ReedSolomonCoder {
    fn encode(&self, data_shards: &[Vec<u8>], parity_shards: usize) -> Result<Vec<Vec<u8>>, CheckpointError> {
        if data_shards.is_empty() {
            return Err(CheckpointError::InvalidLayout("erasure encode requires at least one data shard".into()));
        }
        let shard_len = data_shards[0].len();
        if data_shards.iter().any(|s| s.len() != shard_len) {
            return Err(CheckpointError::InvalidLayout("erasure encode requires equal-length shards".into()));
        }

        let rs = ReedSolomon::new(data_shards.len(), parity_shards)
            .map_err(|e| CheckpointError::InvalidLayout(format!("reed-solomon scheme rejected: {e}")))?;

        let mut shards: Vec<Vec<u8>> = data_shards.to_vec();
        shards.extend(std::iter::repeat(vec![0u8; shard_len]).take(parity_shards));

        rs.encode(&mut shards).map_err(|e| CheckpointError::InvalidLayout(format!("reed-solomon encode failed: {e}")))?;

        Ok(shards)
    }

    fn reconstruct(&self, shards: &mut [Option<Vec<u8>>], data_shards: usize) -> Result<(), CheckpointError> {
        let parity_shards = shards.len() - data_shards;
        let rs = ReedSolomon::new(data_shards, parity_shards)
            .map_err(|e| CheckpointError::InvalidLayout(format!("reed-solomon scheme rejected: {e}")))?;

        rs.reconstruct(shards)
            .map_err(|e| CheckpointError::QuorumLost(format!("reed-solomon reconstruct failed: {e}")))
    }
}
