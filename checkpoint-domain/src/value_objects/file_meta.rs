// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File Header (`FileMeta`) Value Object
//!
//! The fixed-size record written at file offset 0 (or at the tail of an L3
//! parity file, which places its encoded shard first). Carries the
//! whole-file checksum, a write timestamp, this process's and its
//! redundancy peers' checkpoint sizes, and a self-hash over all of the
//! above so a level scanner can reject a truncated or tampered header
//! before trusting anything else in the file.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::CheckpointError;
use crate::value_objects::digest::{render_checksum_hex, Digest128, CHECKSUM_HEX_LEN, DIGEST_LEN};

/// Sentinel stored in `pt_fs`/`max_fs` when the field does not apply to the
/// level this file was written at.
pub const NOT_APPLICABLE: i64 = -1;

/// On-disk size of `FileMeta`: checksum(33) + timestamp(8) + ckpt_size(8) +
/// fs(8) + pt_fs(8) + max_fs(8) + my_hash(16).
pub const FILE_META_LEN: usize = CHECKSUM_HEX_LEN + 8 + 8 + 8 + 8 + 8 + DIGEST_LEN;

/// The fixed-size file-leading metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    /// 33-byte ASCII hex string (32 hex chars + NUL) of the whole-file data
    /// digest (invariant I4).
    pub checksum: [u8; CHECKSUM_HEX_LEN],
    /// Nanoseconds since epoch when this header was finalized.
    pub timestamp: i64,
    /// Total bytes in this file (invariant I3).
    pub ckpt_size: u64,
    /// This process's checkpoint size.
    pub fs: u64,
    /// Partner's checkpoint size, or [`NOT_APPLICABLE`] if not L2.
    pub pt_fs: i64,
    /// Group-wide max checkpoint size, or [`NOT_APPLICABLE`] if not L3.
    pub max_fs: i64,
    /// Digest over every field above, in declaration order (invariant I5).
    pub my_hash: [u8; DIGEST_LEN],
}

impl FileMeta {
    /// Byte layout fed to the self-hash: `checksum || timestamp || ckpt_size
    /// || fs || pt_fs || max_fs`, per invariant I5.
    fn hashed_fields(checksum: &[u8; CHECKSUM_HEX_LEN], timestamp: i64, ckpt_size: u64, fs: u64, pt_fs: i64, max_fs: i64) -> Vec<u8> {
        let mut buf = Vec::with_capacity(CHECKSUM_HEX_LEN + 8 * 5);
        buf.extend_from_slice(checksum);
        let mut scratch = [0u8; 8];
        LittleEndian::write_i64(&mut scratch, timestamp);
        buf.extend_from_slice(&scratch);
        LittleEndian::write_u64(&mut scratch, ckpt_size);
        buf.extend_from_slice(&scratch);
        LittleEndian::write_u64(&mut scratch, fs);
        buf.extend_from_slice(&scratch);
        LittleEndian::write_i64(&mut scratch, pt_fs);
        buf.extend_from_slice(&scratch);
        LittleEndian::write_i64(&mut scratch, max_fs);
        buf.extend_from_slice(&scratch);
        buf
    }

    /// Builds a finalized header, computing `my_hash` over the other fields.
    pub fn finalize<D: Digest128>(
        data_digest: [u8; DIGEST_LEN],
        timestamp: i64,
        ckpt_size: u64,
        fs: u64,
        pt_fs: i64,
        max_fs: i64,
    ) -> Self {
        let checksum = render_checksum_hex(data_digest);
        let mut hasher = D::default();
        hasher.update(&Self::hashed_fields(&checksum, timestamp, ckpt_size, fs, pt_fs, max_fs));
        let my_hash = hasher.finalize();
        FileMeta {
            checksum,
            timestamp,
            ckpt_size,
            fs,
            pt_fs,
            max_fs,
            my_hash,
        }
    }

    /// Recomputes the self-hash and compares it against `my_hash`
    /// (invariant I5). A mismatch means the header is corrupt and the file
    /// must be treated as if it does not exist.
    pub fn verify_my_hash<D: Digest128>(&self) -> bool {
        let mut hasher = D::default();
        hasher.update(&Self::hashed_fields(
            &self.checksum,
            self.timestamp,
            self.ckpt_size,
            self.fs,
            self.pt_fs,
            self.max_fs,
        ));
        hasher.finalize() == self.my_hash
    }

    pub fn to_bytes(&self) -> [u8; FILE_META_LEN] {
        let mut buf = [0u8; FILE_META_LEN];
        let mut off = 0;
        buf[off..off + CHECKSUM_HEX_LEN].copy_from_slice(&self.checksum);
        off += CHECKSUM_HEX_LEN;
        LittleEndian::write_i64(&mut buf[off..off + 8], self.timestamp);
        off += 8;
        LittleEndian::write_u64(&mut buf[off..off + 8], self.ckpt_size);
        off += 8;
        LittleEndian::write_u64(&mut buf[off..off + 8], self.fs);
        off += 8;
        LittleEndian::write_i64(&mut buf[off..off + 8], self.pt_fs);
        off += 8;
        LittleEndian::write_i64(&mut buf[off..off + 8], self.max_fs);
        off += 8;
        buf[off..off + DIGEST_LEN].copy_from_slice(&self.my_hash);
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, CheckpointError> {
        if buf.len() < FILE_META_LEN {
            return Err(CheckpointError::InvalidLayout(format!(
                "FileMeta truncated: got {} bytes, need {FILE_META_LEN}",
                buf.len()
            )));
        }
        let mut off = 0;
        let mut checksum = [0u8; CHECKSUM_HEX_LEN];
        checksum.copy_from_slice(&buf[off..off + CHECKSUM_HEX_LEN]);
        off += CHECKSUM_HEX_LEN;
        let timestamp = LittleEndian::read_i64(&buf[off..off + 8]);
        off += 8;
        let ckpt_size = LittleEndian::read_u64(&buf[off..off + 8]);
        off += 8;
        let fs = LittleEndian::read_u64(&buf[off..off + 8]);
        off += 8;
        let pt_fs = LittleEndian::read_i64(&buf[off..off + 8]);
        off += 8;
        let max_fs = LittleEndian::read_i64(&buf[off..off + 8]);
        off += 8;
        let mut my_hash = [0u8; DIGEST_LEN];
        my_hash.copy_from_slice(&buf[off..off + DIGEST_LEN]);
        Ok(FileMeta {
            checksum,
            timestamp,
            ckpt_size,
            fs,
            pt_fs,
            max_fs,
            my_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::digest::Md5Digest;

    #[test]
    fn finalize_then_verify_succeeds() {
        let meta = FileMeta::finalize::<Md5Digest>([0x11; DIGEST_LEN], 42, 1000, 1000, NOT_APPLICABLE, NOT_APPLICABLE);
        assert!(meta.verify_my_hash::<Md5Digest>());
    }

    #[test]
    fn tampering_with_any_field_breaks_self_hash() {
        let mut meta = FileMeta::finalize::<Md5Digest>([0x11; DIGEST_LEN], 42, 1000, 1000, NOT_APPLICABLE, NOT_APPLICABLE);
        meta.fs += 1;
        assert!(!meta.verify_my_hash::<Md5Digest>());
    }

    #[test]
    fn round_trips_through_bytes() {
        let meta = FileMeta::finalize::<Md5Digest>([0x22; DIGEST_LEN], 7, 500, 500, 500, NOT_APPLICABLE);
        let bytes = meta.to_bytes();
        assert_eq!(bytes.len(), FILE_META_LEN);
        let parsed = FileMeta::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, meta);
        assert!(parsed.verify_my_hash::<Md5Digest>());
    }
}
