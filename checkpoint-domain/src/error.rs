// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Checkpoint Error Taxonomy
//!
//! One variant per failure category the checkpoint file format engine can
//! hit: an empty protected-variable table, I/O failures, a
//! corrupt header (self-hash mismatch), corrupt chunk or whole-file data,
//! a metadata mismatch between the live variable table and the recorded
//! checkpoint, and a level scanner's quorum-lost decision. Errors are
//! returned up the call chain as `Result`; nothing is recovered silently.

use thiserror::Error;

/// Errors produced by the checkpoint metadata graph, writer, reader, and
/// level scanners.
#[derive(Error, Debug, Clone)]
pub enum CheckpointError {
    /// The registered-variable table was empty at checkpoint time.
    #[error("no protected variables registered")]
    NoProtectedVariables,

    /// An open/seek/read/write/stat/mmap/munmap call failed.
    #[error("io failure on {path}: {reason}")]
    IoFailure { path: String, reason: String },

    /// `FileMeta.myHash` did not match the recomputed digest; the file is
    /// treated as if it does not exist.
    #[error("header corrupt: {path}")]
    HeaderCorrupt { path: String },

    /// A whole-file or per-chunk digest mismatch was found during recovery.
    #[error("data corrupt in {path} (variable {id:?})")]
    DataCorrupt { path: String, id: Option<i32> },

    /// The live registered-variable count or sizes differ from those
    /// recorded in the checkpoint metadata.
    #[error("metadata mismatch: {0}")]
    MetadataMismatch(String),

    /// The level scanner determined surviving files plus redundancy cannot
    /// cover every rank.
    #[error("quorum lost: {0}")]
    QuorumLost(String),

    /// A decoded on-disk record violated the fixed layout (short read,
    /// out-of-range sizes). Distinct from `DataCorrupt`: this is detected
    /// before any digest is even computed.
    #[error("invalid on-disk layout: {0}")]
    InvalidLayout(String),
}

impl CheckpointError {
    pub fn io(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::IoFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the engine should consider retrying this attempt at the next
    /// checkpoint iteration rather than surfacing it as a hard failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CheckpointError::IoFailure { .. })
    }

    /// Whether this error indicates on-disk or in-transit corruption, as
    /// opposed to a caller/usage error.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            CheckpointError::HeaderCorrupt { .. } | CheckpointError::DataCorrupt { .. }
        )
    }
}

impl From<std::io::Error> for CheckpointError {
    fn from(err: std::io::Error) -> Self {
        CheckpointError::IoFailure {
            path: String::new(),
            reason: err.to_string(),
        }
    }
}
