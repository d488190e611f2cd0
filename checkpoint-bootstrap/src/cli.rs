// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI for `checkpoint-demo`: a single binary that writes
//! one checkpoint of a small, synthetic variable set to a chosen level
//! directory and then recovers it, to exercise `checkpoint-engine`
//! end-to-end. It does not register real application variables or expose
//! the full "register/checkpoint/recover" API the engine's callers would
//! implement against `checkpoint_domain::VariableTable` themselves.
//!
//! ## Architecture
//!
//! ```text
//! 1. parse_cli()        Parse CLI with clap
//! 2. validate_cli()     Range-check numeric arguments
//! 3. ValidatedCli        Safe, validated arguments handed to main.rs
//! ```

use clap::{Parser, Subcommand};
use thiserror::Error;

/// Errors produced while parsing or validating CLI arguments.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid value for --{arg}: {reason}")]
    InvalidValue { arg: String, reason: String },
}

/// `checkpoint-demo`: exercise the multi-level checkpoint engine.
#[derive(Parser, Debug)]
#[command(name = "checkpoint-demo", version, about = "Drives one checkpoint/recover cycle through checkpoint-engine")]
struct Cli {
    /// Emit debug-level logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a checkpoint, then immediately recover it and verify the result.
    Demo {
        /// Number of synthetic variables to register.
        #[arg(long, default_value_t = 4)]
        variables: usize,

        /// Bytes per synthetic variable.
        #[arg(long, default_value_t = 4096)]
        variable_bytes: usize,
    },
}

/// Validated CLI configuration handed to `main.rs`.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Demo { variables: usize, variable_bytes: usize },
}

/// Parses CLI arguments and applies range validation.
///
/// # Errors
///
/// Returns [`ParseError`] if a numeric argument is out of range.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = Cli::parse();
    validate_cli(cli)
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let command = match cli.command {
        Commands::Demo { variables, variable_bytes } => {
            if variables == 0 || variables > 1024 {
                return Err(ParseError::InvalidValue {
                    arg: "variables".to_string(),
                    reason: "must be between 1 and 1024".to_string(),
                });
            }
            if variable_bytes == 0 || variable_bytes > 1024 * 1024 * 1024 {
                return Err(ParseError::InvalidValue {
                    arg: "variable-bytes".to_string(),
                    reason: "must be between 1 and 1 GiB".to_string(),
                });
            }
            ValidatedCommand::Demo { variables, variable_bytes }
        }
    };

    Ok(ValidatedCli { command, verbose: cli.verbose })
}
