// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Configuration
//!
//! Layered configuration loading: built-in defaults, overridden by an
//! optional `Checkpoint.toml` in the current directory, overridden by
//! `CKPT_*` environment variables (file, then environment, highest
//! precedence last) against the handful of keys the engine actually needs.

use std::path::PathBuf;

use config::{Config as ConfigSource, ConfigError, Environment, File};
use serde::Deserialize;

use checkpoint_domain::CheckpointError;

/// One of the four checkpoint levels a configuration can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum Level {
    L1 = 1,
    L2 = 2,
    L3 = 3,
    L4 = 4,
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Level::L1),
            2 => Ok(Level::L2),
            3 => Ok(Level::L3),
            4 => Ok(Level::L4),
            other => Err(format!("ckpt_level must be 1-4, got {other}")),
        }
    }
}

/// Recognized engine configuration: the handful of knobs the writer and
/// level scanners actually consult.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Whether the writer consults `DirtyChunkSource` to skip unchanged
    /// sub-ranges, or always writes every chunk in full.
    pub enable_diff_ckpt: bool,
    /// Which of L1-L4 this process checkpoints to.
    pub ckpt_level: Level,
    /// Whether the checkpoint write happens inline (blocking the caller) or
    /// is handed off, e.g. to a background task.
    pub is_inline: bool,
    /// Per-level output directory, indexed `[L1, L2, L3, L4]`.
    pub level_dir: [PathBuf; 4],
    /// Scratch directory for a level's local staging writes.
    pub local_tmp_dir: PathBuf,
    /// Scratch directory for L4's shared-filesystem staging writes.
    pub global_tmp_dir: PathBuf,
}

impl EngineConfig {
    /// Loads defaults, then `Checkpoint.toml` if present, then `CKPT_*`
    /// environment overrides (e.g. `CKPT_ENABLE_DIFF_CKPT=true`).
    pub fn load() -> Result<Self, CheckpointError> {
        let raw = ConfigSource::builder()
            .set_default("enable_diff_ckpt", false)?
            .set_default("ckpt_level", 1)?
            .set_default("is_inline", true)?
            .set_default("level_dir", vec!["./ckpt/l1", "./ckpt/l2", "./ckpt/l3", "./ckpt/l4"])?
            .set_default("local_tmp_dir", "./ckpt/tmp")?
            .set_default("global_tmp_dir", "./ckpt/global")?
            .add_source(File::with_name("Checkpoint").required(false))
            .add_source(Environment::with_prefix("CKPT"))
            .build()
            .map_err(to_checkpoint_error)?;

        let parsed: EngineConfig = raw.try_deserialize().map_err(to_checkpoint_error)?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Rejects configuration the level scanners cannot act on: an
    /// out-of-range level is caught by `Level`'s own decode, so this only
    /// needs to check the directory roots exist.
    pub fn validate(&self) -> Result<(), CheckpointError> {
        for dir in self.level_dir.iter().chain([&self.local_tmp_dir, &self.global_tmp_dir]) {
            if dir.as_os_str().is_empty() {
                return Err(CheckpointError::MetadataMismatch("configured directory path is empty".into()));
            }
        }
        Ok(())
    }

    pub fn dir_for(&self, level: Level) -> &PathBuf {
        &self.level_dir[level as usize - 1]
    }
}

fn to_checkpoint_error(err: ConfigError) -> CheckpointError {
    CheckpointError::MetadataMismatch(format!("configuration error: {err}"))
}
