// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # checkpoint-demo
//!
//! The composition root: wires an [`EngineConfig`] and a [`LocalTopology`]
//! into `checkpoint-engine`'s writer and reader and drives one demo
//! checkpoint/recover cycle against a small synthetic variable set. The
//! actual write/recover work is synchronous (see `checkpoint-engine`'s
//! crate doc); `main` stays async only to race it against `tokio::signal`
//! for Ctrl-C handling.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use checkpoint_bootstrap::cli::ValidatedCommand;
use checkpoint_bootstrap::logger::{BootstrapLogger, ConsoleLogger};
use checkpoint_bootstrap::shutdown::ShutdownCoordinator;
use checkpoint_bootstrap::{bootstrap_cli, platform};

use checkpoint_engine::domain::{
    CheckpointError, MetadataGraph, RegisteredVariable, VariableId, VariableTable,
};
use checkpoint_engine::{
    init_tracing, write_checkpoint, EngineConfig, FullRangeSource, LocalTopology, RecoveredCheckpoint, RedundancyFacts,
};

type Digest = checkpoint_engine::domain::Md5Digest;

/// A synthetic, in-memory stand-in for the application's real protected
/// variables. Registering real variables and wiring their backing storage
/// is the high-level application API this crate treats as an external
/// collaborator (see `checkpoint-engine`'s crate doc); this type exists
/// only so `checkpoint-demo` has something to checkpoint.
struct InMemoryVariables {
    table: Vec<RegisteredVariable>,
    data: HashMap<i32, Vec<u8>>,
}

impl InMemoryVariables {
    fn synthetic(count: usize, bytes_each: usize) -> Self {
        let mut table = Vec::with_capacity(count);
        let mut data = HashMap::with_capacity(count);
        for i in 0..count {
            let id = i as i32;
            table.push(RegisteredVariable { id: VariableId(id), size: bytes_each as u64 });
            data.insert(id, (0..bytes_each).map(|b| (b as u8).wrapping_add(id as u8)).collect());
        }
        InMemoryVariables { table, data }
    }

    fn empty_like(other: &Self) -> Self {
        InMemoryVariables { table: other.table.clone(), data: HashMap::new() }
    }
}

impl VariableTable for InMemoryVariables {
    fn variables(&self) -> &[RegisteredVariable] {
        &self.table
    }

    fn read_at(&self, id: VariableId, offset: u64, len: u64) -> Result<&[u8], CheckpointError> {
        let buf = self
            .data
            .get(&id.0)
            .ok_or_else(|| CheckpointError::MetadataMismatch(format!("no such variable {}", id.0)))?;
        let start = offset as usize;
        let end = start + len as usize;
        buf.get(start..end).ok_or_else(|| CheckpointError::InvalidLayout("read past end of variable".into()))
    }

    fn write_at(&mut self, id: VariableId, offset: u64, data: &[u8]) -> Result<(), CheckpointError> {
        let buf = self.data.entry(id.0).or_default();
        let end = offset as usize + data.len();
        if buf.len() < end {
            buf.resize(end, 0);
        }
        buf[offset as usize..end].copy_from_slice(data);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let validated_cli = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("CLI error: {e}");
            return std::process::ExitCode::from(65); // EX_DATAERR
        }
    };

    init_tracing(if validated_cli.verbose { "checkpoint_engine=debug,checkpoint_bootstrap=debug" } else { "checkpoint_engine=info" });

    let logger = ConsoleLogger::new();
    let platform = platform::create_platform();
    logger.info(&format!("running on {} ({} cpus)", platform.platform_name(), platform.cpu_count()));

    let coordinator = ShutdownCoordinator::default();

    let demo = async move {
        let ValidatedCommand::Demo { variables, variable_bytes } = validated_cli.command;
        run_demo(variables, variable_bytes)
    };

    tokio::select! {
        result = demo => {
            match result {
                Ok(()) => {
                    logger.info("demo checkpoint/recover cycle succeeded");
                    std::process::ExitCode::SUCCESS
                }
                Err(e) => {
                    logger.error(&format!("demo cycle failed: {e}"));
                    std::process::ExitCode::FAILURE
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            logger.warn("received interrupt, shutting down");
            coordinator.initiate_shutdown();
            std::process::ExitCode::from(130) // 128 + SIGINT
        }
    }
}

/// Writes one checkpoint of `variables` synthetic protected variables to
/// the configured level directory, then recovers it into a fresh
/// in-memory table and verifies every byte round-trips.
fn run_demo(variables: usize, variable_bytes: usize) -> Result<(), CheckpointError> {
    let config = EngineConfig::load()?;
    std::fs::create_dir_all(config.dir_for(config.ckpt_level))
        .map_err(|e| CheckpointError::io("level directory", e))?;

    // Single-rank topology: a real multi-rank deployment would plug in an
    // MPI-style GroupTopology/Collective pair here instead.
    let _group = LocalTopology::new(0);

    let src = InMemoryVariables::synthetic(variables, variable_bytes);
    let mut graph = MetadataGraph::new();
    let path = config.dir_for(config.ckpt_level).join("Ckpt1-Rank0.fti");
    let timestamp_nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos() as i64;

    write_checkpoint::<Digest, _>(
        &path,
        &mut graph,
        &src,
        &FullRangeSource,
        config.enable_diff_ckpt,
        timestamp_nanos,
        RedundancyFacts { pt_fs: -1, max_fs: -1 },
    )?;

    let recovered = RecoveredCheckpoint::open::<Digest>(&path)?;
    recovered.verify_whole_file::<Digest>(&path)?;

    let mut dst = InMemoryVariables::empty_like(&src);
    recovered.recover::<Digest, _>(&path, &mut dst)?;

    for var in &src.table {
        if src.data.get(&var.id.0) != dst.data.get(&var.id.0) {
            return Err(CheckpointError::DataCorrupt { path: path.display().to_string(), id: Some(var.id.0) });
        }
    }

    Ok(())
}
