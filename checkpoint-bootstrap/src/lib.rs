// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Bootstrap Module
//!
//! The bootstrap module sits **outside** `checkpoint-domain` and
//! `checkpoint-engine` and provides:
//!
//! - **Entry point** - the `checkpoint-demo` binary's lifecycle
//! - **Platform abstraction** - OS-specific operations (POSIX vs Windows)
//! - **Signal handling** - graceful shutdown (SIGTERM/SIGINT via `tokio::signal`)
//! - **Argument parsing** - CLI validation (`clap` + range checks)
//! - **Composition root** - wires an `EngineConfig` and a concrete
//!   `GroupTopology`/`Collective` into the engine and drives one demo
//!   checkpoint/recover cycle
//!
//! ## Architecture Position
//!
//! ```text
//! checkpoint-bootstrap (this crate)
//!   -> checkpoint-engine   (writer, reader, level scanners, adapters)
//!        -> checkpoint-domain (metadata graph, file format, ports)
//! ```
//!
//! This crate exists to wire `checkpoint-engine`, not to reimplement it: it
//! carries no checkpoint file format logic of its own.
//!
//! ## Module Structure
//!
//! - `platform` - OS abstraction (Unix/Windows)
//! - `cli` - argument parsing and validation
//! - `logger` - bootstrap-phase logging, ahead of `init_tracing`
//! - `shutdown` - shutdown coordination

pub mod cli;
pub mod logger;
pub mod platform;
pub mod shutdown;

pub use cli::{parse_and_validate, ValidatedCli, ValidatedCommand};

/// Bootstrap and parse CLI arguments.
///
/// # Errors
///
/// Returns `cli::ParseError` if CLI parsing or validation fails. Clap
/// handles `--help`/`--version` itself and exits the process.
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::ParseError> {
    cli::parse_and_validate()
}
