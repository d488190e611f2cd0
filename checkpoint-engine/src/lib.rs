// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Checkpoint Engine
//!
//! Infrastructure layer over [`checkpoint_domain`]: the writer and
//! reader/recoverer, the four level scanners, a default in-process
//! topology/collective pair, a Reed-Solomon erasure adapter, configuration
//! loading, and structured logging. `checkpoint-bootstrap` wires this crate
//! into a runnable process; nothing here drives a CLI or owns `main`.

pub mod infrastructure;

pub use checkpoint_domain as domain;

pub use infrastructure::config::{EngineConfig, Level};
pub use infrastructure::differential::FullRangeSource;
pub use infrastructure::erasure::ReedSolomonCoder;
pub use infrastructure::logging::{init_tracing, SpanContext};
pub use infrastructure::reader::RecoveredCheckpoint;
pub use infrastructure::topology::{GroupMember, LocalTopology, SimulatedGroup};
pub use infrastructure::writer::{projected_file_size, whole_file_digest, write_checkpoint, RedundancyFacts, COPY_BUFFER_LIMIT};
