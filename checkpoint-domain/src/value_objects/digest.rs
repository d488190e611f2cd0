// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Digest Service
//!
//! A streaming 128-bit cryptographic hash with the contract
//! `h = finalize(update*(init()))`: the final digest is a pure function of
//! the concatenation of every `update` call. Used for per-variable chunk
//! hashes, the whole-file checksum, and the file header's self-hash.
//!
//! [`render_checksum_hex`] renders a 16-byte digest as the 33-byte ASCII
//! form the file format stores on disk: 32 lowercase hex characters
//! followed by a NUL byte.

use md5::{Digest as _, Md5};

/// Number of bytes in a raw digest.
pub const DIGEST_LEN: usize = 16;

/// Number of bytes in the on-disk hex rendering (32 hex chars + NUL).
pub const CHECKSUM_HEX_LEN: usize = 33;

/// Streaming 128-bit digest. Implementations must be order-sensitive: the
/// result depends only on the sequence of bytes fed via `update`.
pub trait Digest128: Default {
    fn update(&mut self, bytes: &[u8]);
    fn finalize(self) -> [u8; DIGEST_LEN];
}

/// MD5-backed digest, matching the 128-bit hash this file format was
/// originally specified against.
#[derive(Default)]
pub struct Md5Digest(Md5);

impl Digest128 for Md5Digest {
    fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    fn finalize(self) -> [u8; DIGEST_LEN] {
        self.0.finalize().into()
    }
}

/// Renders a 16-byte digest as the on-disk 33-byte form: 32 lowercase hex
/// characters followed by a NUL byte.
pub fn render_checksum_hex(digest: [u8; DIGEST_LEN]) -> [u8; CHECKSUM_HEX_LEN] {
    let mut out = [0u8; CHECKSUM_HEX_LEN];
    hex::encode_to_slice(digest, &mut out[..32]).expect("32-byte buffer fits a 16-byte digest");
    out
}

/// Parses the on-disk 33-byte checksum form back into a lowercase hex
/// string, dropping the trailing NUL.
pub fn checksum_hex_str(checksum: &[u8; CHECKSUM_HEX_LEN]) -> &str {
    let end = checksum.iter().position(|&b| b == 0).unwrap_or(32).min(32);
    std::str::from_utf8(&checksum[..end]).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_checksum_hex_is_lowercase_32_chars_plus_nul() {
        let digest = [0xABu8; DIGEST_LEN];
        let rendered = render_checksum_hex(digest);
        assert_eq!(rendered.len(), CHECKSUM_HEX_LEN);
        assert_eq!(rendered[32], 0);
        assert_eq!(checksum_hex_str(&rendered), "ab".repeat(16));
    }

    #[test]
    fn digest_is_pure_function_of_update_sequence() {
        let mut a = Md5Digest::default();
        a.update(b"hello ");
        a.update(b"world");
        let mut b = Md5Digest::default();
        b.update(b"hello world");
        assert_eq!(a.finalize(), b.finalize());
    }

    #[test]
    fn digest_changes_with_byte_order() {
        let mut a = Md5Digest::default();
        a.update(b"ab");
        let mut b = Md5Digest::default();
        b.update(b"ba");
        assert_ne!(a.finalize(), b.finalize());
    }
}
