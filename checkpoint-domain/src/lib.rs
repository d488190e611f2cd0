// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

#![forbid(unsafe_code)]

//! # Checkpoint Domain
//!
//! Pure data model for the multi-level checkpoint file format: the fixed-size
//! file header (`FileMeta`), the metadata graph of `DataBlock`/`VarChunk`
//! records that maps registered variables onto file offsets, the streaming
//! 128-bit digest contract used for per-chunk and whole-file integrity, and
//! the trait ports for every collaborator the core consumes but does not
//! implement (process topology, collective operations, erasure coding, the
//! dirty-chunk tracker that feeds the differential write path).
//!
//! This crate performs no I/O. `checkpoint-engine` is the infrastructure
//! layer that reads and writes these types to disk.

pub mod error;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use error::CheckpointError;
pub use value_objects::data_block::{DataBlock, BLOCK_PREFIX_LEN};
pub use value_objects::digest::{render_checksum_hex, Digest128, Md5Digest, CHECKSUM_HEX_LEN, DIGEST_LEN};
pub use value_objects::file_meta::{FileMeta, FILE_META_LEN, NOT_APPLICABLE};
pub use value_objects::var_chunk::{VarChunk, VAR_CHUNK_LEN};
pub use value_objects::variable::{RegisteredVariable, VariableId, VariableTable};
pub use ports::{Collective, DirtyChunkSource, DirtyRange, ErasureCoder, GroupTopology};

pub use services::metadata_graph::MetadataGraph;
