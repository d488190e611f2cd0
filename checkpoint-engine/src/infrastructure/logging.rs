// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Logging
//!
//! Initializes a `tracing-subscriber` `fmt` layer filtered by `RUST_LOG`
//! (or a supplied default). The engine itself only ever emits through
//! `tracing`'s macros inside `checkpoint`/`recover`/`level_scan` spans;
//! this module just wires the global subscriber once at process start.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a global `tracing` subscriber. `default_directives` is used
/// when `RUST_LOG` is unset, e.g. `"checkpoint_engine=info"`.
pub fn init_tracing(default_directives: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    fmt().with_env_filter(filter).with_target(true).init();
}

/// Span fields every `checkpoint`/`recover`/`level_scan` span carries, so
/// log lines can be correlated across a multi-rank run without a
/// structured log aggregator doing the joining.
#[derive(Debug, Clone, Copy)]
pub struct SpanContext {
    pub ckpt_id: i64,
    pub rank: i32,
    pub level: u8,
}

impl SpanContext {
    pub fn checkpoint_span(&self) -> tracing::Span {
        tracing::info_span!("checkpoint", ckpt_id = self.ckpt_id, rank = self.rank, level = self.level)
    }

    pub fn recover_span(&self) -> tracing::Span {
        tracing::info_span!("recover", ckpt_id = self.ckpt_id, rank = self.rank, level = self.level)
    }

    pub fn level_scan_span(&self) -> tracing::Span {
        tracing::info_span!("level_scan", ckpt_id = self.ckpt_id, rank = self.rank, level = self.level)
    }
}
