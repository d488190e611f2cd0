// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Variable Chunk Value Object
//!
//! A `VarChunk` is a sub-range of one registered variable's bytes persisted
//! as a single record in one data block. Fields are serialized explicitly in
//! little-endian order with no implicit padding, so the layout is pinned
//! across producer and consumer regardless of host ABI (see design notes on
//! native binary layout).

use byteorder::{ByteOrder, LittleEndian};

use crate::error::CheckpointError;
use crate::value_objects::digest::DIGEST_LEN;

/// On-disk size of a serialized `VarChunk`: id(4) + idx(4) + dptr(8) +
/// fptr(8) + chunksize(8) + hash(16).
pub const VAR_CHUNK_LEN: usize = 4 + 4 + 8 + 8 + 8 + DIGEST_LEN;

/// A sub-range of one registered variable's bytes, persisted as a record in
/// one data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarChunk {
    /// Application-assigned variable identifier.
    pub id: i32,
    /// Positional index into the registered-variable table at write time.
    pub idx: i32,
    /// Offset within the in-memory variable where this chunk's bytes begin.
    pub dptr: u64,
    /// Absolute byte offset in the file where this chunk's bytes live.
    pub fptr: u64,
    /// Bytes in this chunk.
    pub chunksize: u64,
    /// 128-bit digest of the chunk's bytes.
    pub hash: [u8; DIGEST_LEN],
}

impl VarChunk {
    pub fn to_bytes(&self) -> [u8; VAR_CHUNK_LEN] {
        let mut buf = [0u8; VAR_CHUNK_LEN];
        LittleEndian::write_i32(&mut buf[0..4], self.id);
        LittleEndian::write_i32(&mut buf[4..8], self.idx);
        LittleEndian::write_u64(&mut buf[8..16], self.dptr);
        LittleEndian::write_u64(&mut buf[16..24], self.fptr);
        LittleEndian::write_u64(&mut buf[24..32], self.chunksize);
        buf[32..32 + DIGEST_LEN].copy_from_slice(&self.hash);
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, CheckpointError> {
        if buf.len() < VAR_CHUNK_LEN {
            return Err(CheckpointError::InvalidLayout(format!(
                "VarChunk record truncated: got {} bytes, need {VAR_CHUNK_LEN}",
                buf.len()
            )));
        }
        let mut hash = [0u8; DIGEST_LEN];
        hash.copy_from_slice(&buf[32..32 + DIGEST_LEN]);
        Ok(VarChunk {
            id: LittleEndian::read_i32(&buf[0..4]),
            idx: LittleEndian::read_i32(&buf[4..8]),
            dptr: LittleEndian::read_u64(&buf[8..16]),
            fptr: LittleEndian::read_u64(&buf[16..24]),
            chunksize: LittleEndian::read_u64(&buf[24..32]),
            hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let c = VarChunk {
            id: 7,
            idx: 2,
            dptr: 1024,
            fptr: 4096,
            chunksize: 2048,
            hash: [0x42; DIGEST_LEN],
        };
        let bytes = c.to_bytes();
        assert_eq!(bytes.len(), VAR_CHUNK_LEN);
        assert_eq!(VarChunk::from_bytes(&bytes).unwrap(), c);
    }

    #[test]
    fn rejects_truncated_record() {
        let short = [0u8; VAR_CHUNK_LEN - 1];
        assert!(matches!(
            VarChunk::from_bytes(&short),
            Err(CheckpointError::InvalidLayout(_))
        ));
    }
}
