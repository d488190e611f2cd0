// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metadata Graph Update
//!
//! Builds and grows the in-memory chain of [`DataBlock`]s that maps
//! registered variables onto file offsets. The first call builds one block
//! holding every registered variable; each later call appends at most one
//! new block holding newly registered variables and "growth" chunks for
//! variables whose size increased. Blocks are never rewritten or removed
//! during normal operation (see invariants I1-I3 and the first-call /
//! growth-append algorithm below).

use std::collections::HashMap;

use crate::error::CheckpointError;
use crate::value_objects::data_block::{DataBlock, BLOCK_PREFIX_LEN};
use crate::value_objects::digest::DIGEST_LEN;
use crate::value_objects::file_meta::FILE_META_LEN;
use crate::value_objects::var_chunk::{VarChunk, VAR_CHUNK_LEN};
use crate::value_objects::variable::{RegisteredVariable, VariableId};

/// The in-memory metadata graph: a flat arena of blocks in insertion order.
/// See the module doc on [`DataBlock`] for why an arena models the
/// on-disk "doubly-linked, forward-owning" chain of blocks.
#[derive(Debug, Clone, Default)]
pub struct MetadataGraph {
    blocks: Vec<DataBlock>,
    /// Count of registered variables as of the last successful `update`,
    /// used to classify a variable's positional index as "new" or not.
    last_var_count: usize,
}

impl MetadataGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[DataBlock] {
        &self.blocks
    }

    /// Mutable access to the block chain, used by the writer to fill in each
    /// chunk's `hash` once its payload has been written.
    pub fn blocks_mut(&mut self) -> &mut [DataBlock] {
        &mut self.blocks
    }

    /// Appends a block decoded from disk during recovery, bypassing the
    /// first-call/growth-append classification in [`Self::update`] (the
    /// chunks already carry their original `idx`/`dptr`/`fptr`). Advances
    /// `last_var_count` so a subsequent live `update` classifies variables
    /// correctly against the recovered state.
    pub fn insert_recovered_block(&mut self, block: DataBlock) {
        for c in &block.vars {
            let next = c.idx as usize + 1;
            if next > self.last_var_count {
                self.last_var_count = next;
            }
        }
        self.blocks.push(block);
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// `sizeof(FileMeta) + Σ block.dbsize` — the first free file offset,
    /// and per invariant I3 also `FileMeta.ckptSize`.
    pub fn file_size(&self) -> u64 {
        FILE_META_LEN as u64 + self.blocks.iter().map(|b| b.dbsize).sum::<u64>()
    }

    /// Every chunk across the graph, in block order then `vars` order,
    /// matching a variable's id. Used by recovery to reconstruct a
    /// variable's bytes and by the writer/whole-file digest to walk chunks
    /// in canonical order (invariant I2).
    pub fn chunks_for(&self, id: VariableId) -> impl Iterator<Item = &VarChunk> {
        self.blocks.iter().flat_map(|b| b.vars.iter()).filter(move |c| c.id == id.0)
    }

    /// Per-variable total size as recorded in this graph: the sum of every
    /// chunk's `chunksize` for each variable id, across all blocks. Used by
    /// the reader to check the live registered-variable table against what
    /// was actually checkpointed before copying any bytes.
    pub fn recorded_variable_sizes(&self) -> HashMap<i32, u64> {
        let mut sizes: HashMap<i32, u64> = HashMap::new();
        for block in &self.blocks {
            for chunk in &block.vars {
                *sizes.entry(chunk.id).or_insert(0) += chunk.chunksize;
            }
        }
        sizes
    }

    /// Updates the graph for the current registered-variable table,
    /// appending at most one new block. Returns `true` if a block was
    /// appended, `false` if nothing changed (idempotence, property P4).
    ///
    /// Fails with [`CheckpointError::NoProtectedVariables`] if `vars` is
    /// empty.
    pub fn update(&mut self, vars: &[RegisteredVariable]) -> Result<bool, CheckpointError> {
        if vars.is_empty() {
            return Err(CheckpointError::NoProtectedVariables);
        }

        if self.blocks.is_empty() {
            let chunks = vars
                .iter()
                .enumerate()
                .map(|(idx, v)| (idx, v, 0u64, v.size))
                .collect::<Vec<_>>();
            self.append_block(FILE_META_LEN as u64, chunks);
            self.last_var_count = vars.len();
            return Ok(true);
        }

        let mut old_size_by_id: HashMap<i32, u64> = HashMap::new();
        for block in &self.blocks {
            for c in &block.vars {
                *old_size_by_id.entry(c.id).or_insert(0) += c.chunksize;
            }
        }

        let affected: Vec<_> = vars
            .iter()
            .enumerate()
            .filter_map(|(idx, v)| {
                let is_new = idx >= self.last_var_count;
                let prior = old_size_by_id.get(&v.id.0).copied().unwrap_or(0);
                if is_new {
                    Some((idx, v, 0u64, v.size))
                } else if v.size > prior {
                    Some((idx, v, prior, v.size - prior))
                } else {
                    None
                }
            })
            .collect();

        self.last_var_count = vars.len();

        if affected.is_empty() {
            return Ok(false);
        }

        let offset = self.file_size();
        self.append_block(offset, affected);
        Ok(true)
    }

    /// Appends one block starting at absolute file offset `block_offset`,
    /// assigning each chunk's `fptr` after the block's own metadata prefix
    /// and chunk-record table.
    fn append_block(&mut self, block_offset: u64, affected: Vec<(usize, &RegisteredVariable, u64, u64)>) {
        let numvars = affected.len();
        let metadata_len = BLOCK_PREFIX_LEN as u64 + numvars as u64 * VAR_CHUNK_LEN as u64;
        let mut running = 0u64;
        let mut chunks = Vec::with_capacity(numvars);
        for (idx, v, dptr, chunksize) in affected {
            let fptr = block_offset + metadata_len + running;
            chunks.push(VarChunk {
                id: v.id.0,
                idx: idx as i32,
                dptr,
                fptr,
                chunksize,
                hash: [0u8; DIGEST_LEN],
            });
            running += chunksize;
        }
        self.blocks.push(DataBlock::from_chunks(chunks));
    }
}
