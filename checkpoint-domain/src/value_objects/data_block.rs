// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Data Block Value Object
//!
//! A contiguous region in the checkpoint file holding metadata for, and the
//! payload of, a set of variable chunks written together. The in-memory
//! metadata graph chains blocks in insertion order; the chain is an
//! ownership chain (head owns tail through an implicit forward edge), not a
//! cycle. [`crate::services::metadata_graph::MetadataGraph`] stores blocks
//! in a flat arena (`Vec<DataBlock>`) indexed by position rather than as a
//! pointer-linked list: the forward edge is "next index", the backward edge
//! is a non-owning "previous index" used only for bounded backward walks
//! during teardown, as the design notes require.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::CheckpointError;
use crate::value_objects::var_chunk::{VarChunk, VAR_CHUNK_LEN};

/// On-disk size of a block's leading prefix: numvars(4) + dbsize(8).
pub const BLOCK_PREFIX_LEN: usize = 4 + 8;

/// A block of variable chunks written together in one checkpoint pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlock {
    /// Count of variable chunks in this block.
    pub numvars: i32,
    /// Total on-disk bytes this block consumes: its prefix, its chunk
    /// metadata records, and its chunk payloads (invariant I1).
    pub dbsize: u64,
    /// Chunks in write order.
    pub vars: Vec<VarChunk>,
}

impl DataBlock {
    /// Builds a block from its chunks, computing `numvars` and `dbsize` per
    /// invariant I1.
    pub fn from_chunks(vars: Vec<VarChunk>) -> Self {
        let numvars = vars.len() as i32;
        let payload: u64 = vars.iter().map(|c| c.chunksize).sum();
        let dbsize = BLOCK_PREFIX_LEN as u64 + vars.len() as u64 * VAR_CHUNK_LEN as u64 + payload;
        DataBlock { numvars, dbsize, vars }
    }

    /// Serializes the prefix and the chunk metadata records (not the chunk
    /// payload bytes, which are written separately at each chunk's `fptr`).
    pub fn metadata_to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; BLOCK_PREFIX_LEN + self.vars.len() * VAR_CHUNK_LEN];
        LittleEndian::write_i32(&mut buf[0..4], self.numvars);
        LittleEndian::write_u64(&mut buf[4..12], self.dbsize);
        for (i, chunk) in self.vars.iter().enumerate() {
            let start = BLOCK_PREFIX_LEN + i * VAR_CHUNK_LEN;
            buf[start..start + VAR_CHUNK_LEN].copy_from_slice(&chunk.to_bytes());
        }
        buf
    }

    pub fn prefix_from_bytes(buf: &[u8]) -> Result<(i32, u64), CheckpointError> {
        if buf.len() < BLOCK_PREFIX_LEN {
            return Err(CheckpointError::InvalidLayout(format!(
                "data block prefix truncated: got {} bytes, need {BLOCK_PREFIX_LEN}",
                buf.len()
            )));
        }
        let numvars = LittleEndian::read_i32(&buf[0..4]);
        let dbsize = LittleEndian::read_u64(&buf[4..12]);
        Ok((numvars, dbsize))
    }

    /// Verifies invariant I1: `dbsize` equals prefix + metadata + payload.
    pub fn check_dbsize_invariant(&self) -> bool {
        let payload: u64 = self.vars.iter().map(|c| c.chunksize).sum();
        self.dbsize == BLOCK_PREFIX_LEN as u64 + self.vars.len() as u64 * VAR_CHUNK_LEN as u64 + payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::digest::DIGEST_LEN;

    fn chunk(id: i32, dptr: u64, fptr: u64, size: u64) -> VarChunk {
        VarChunk {
            id,
            idx: 0,
            dptr,
            fptr,
            chunksize: size,
            hash: [0u8; DIGEST_LEN],
        }
    }

    #[test]
    fn from_chunks_satisfies_dbsize_invariant() {
        let block = DataBlock::from_chunks(vec![chunk(1, 0, 89, 100), chunk(2, 0, 189, 200)]);
        assert_eq!(block.numvars, 2);
        assert!(block.check_dbsize_invariant());
        assert_eq!(
            block.dbsize,
            BLOCK_PREFIX_LEN as u64 + 2 * VAR_CHUNK_LEN as u64 + 300
        );
    }

    #[test]
    fn prefix_round_trips() {
        let block = DataBlock::from_chunks(vec![chunk(1, 0, 89, 100)]);
        let bytes = block.metadata_to_bytes();
        let (numvars, dbsize) = DataBlock::prefix_from_bytes(&bytes).unwrap();
        assert_eq!(numvars, block.numvars);
        assert_eq!(dbsize, block.dbsize);
    }
}
