// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Checkpoint Writer
//!
//! Drives one checkpoint write: updates the metadata graph, walks the
//! *entire* block chain (not just a newly appended block) rewriting each
//! chunk's on-disk metadata record and payload, then computes the
//! whole-file checksum as a separate pass and finalizes the file header.
//! Every checkpoint re-touches every block because a variable's growth
//! chunk can live anywhere in the chain and its hash must stay consistent
//! with what is actually on disk.
//!
//! Reads and writes are capped to [`COPY_BUFFER_LIMIT`] at a time so a
//! single huge variable never forces one giant syscall or a same-sized
//! hashing buffer allocation.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use checkpoint_domain::{
    CheckpointError, Digest128, DirtyChunkSource, FileMeta, MetadataGraph, VarChunk, VariableId, VariableTable,
    BLOCK_PREFIX_LEN, DIGEST_LEN, FILE_META_LEN, VAR_CHUNK_LEN,
};

/// Largest span read from a variable or written to disk in one step. Mirrors
/// the fixed-size copy buffer the original engine reuses across all chunks,
/// regardless of a single variable's size, so memory use stays bounded.
pub const COPY_BUFFER_LIMIT: u64 = 16 * 1024 * 1024;

/// Inputs that do not come from the metadata graph or variable table
/// themselves: level-specific redundancy facts the caller (an L1-L4 level
/// scanner/writer) has already gathered via [`checkpoint_domain::Collective`].
pub struct RedundancyFacts {
    pub pt_fs: i64,
    pub max_fs: i64,
}

/// Writes one checkpoint to `path`, returning the finalized [`FileMeta`] and
/// the total file size (invariant I3).
///
/// When `enable_diff` is set, the write lands on a staging file next to
/// `path` (seeded with `path`'s current content, since a differential write
/// only touches the dirty sub-ranges) and is published with a single
/// `rename` once the header is finalized and synced, so a crash mid-write
/// leaves the previous canonical file intact rather than a torn one. A
/// full (non-differential) write has no prior content to preserve and
/// writes `path` directly.
pub fn write_checkpoint<D, V>(
    path: &Path,
    graph: &mut MetadataGraph,
    vars: &V,
    diff_source: &dyn DirtyChunkSource,
    enable_diff: bool,
    timestamp_nanos: i64,
    redundancy: RedundancyFacts,
) -> Result<(FileMeta, u64), CheckpointError>
where
    D: Digest128,
    V: VariableTable,
{
    graph.update(vars.variables())?;

    let staging_path = if enable_diff { staging_path_for(path) } else { path.to_path_buf() };

    if enable_diff && path.exists() {
        std::fs::copy(path, &staging_path).map_err(|e| CheckpointError::io(staging_path.display().to_string(), e))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&staging_path)
        .map_err(|e| CheckpointError::io(staging_path.display().to_string(), e))?;

    let mut block_offset = FILE_META_LEN as u64;
    for block in graph.blocks_mut() {
        let prefix_offset = block_offset;
        for chunk in block.vars.iter_mut() {
            let mut hasher = D::default();
            write_chunk::<D, V>(&mut file, &staging_path, vars, chunk, diff_source, enable_diff, &mut hasher)?;
            chunk.hash = hasher.finalize();
        }
        file.seek(SeekFrom::Start(prefix_offset))
            .map_err(|e| CheckpointError::io(staging_path.display().to_string(), e))?;
        file.write_all(&block.metadata_to_bytes())
            .map_err(|e| CheckpointError::io(staging_path.display().to_string(), e))?;
        block_offset += block.dbsize;
    }

    let data_digest = whole_file_digest::<D, V>(graph, vars)?;
    let fs = graph.file_size();
    let meta = FileMeta::finalize::<D>(data_digest, timestamp_nanos, fs, fs, redundancy.pt_fs, redundancy.max_fs);

    file.seek(SeekFrom::Start(0))
        .map_err(|e| CheckpointError::io(staging_path.display().to_string(), e))?;
    file.write_all(&meta.to_bytes())
        .map_err(|e| CheckpointError::io(staging_path.display().to_string(), e))?;
    file.sync_all()
        .map_err(|e| CheckpointError::io(staging_path.display().to_string(), e))?;
    drop(file);

    if enable_diff {
        std::fs::rename(&staging_path, path).map_err(|e| CheckpointError::io(path.display().to_string(), e))?;
    }

    Ok((meta, fs))
}

/// The staging file a differential write lands on before being renamed over
/// `path`. Kept alongside `path` (same directory, same filesystem) so the
/// publishing `rename` is atomic, and named from `path` so concurrent
/// writers targeting different ranks' files in the same directory don't
/// collide on a shared staging name.
fn staging_path_for(path: &Path) -> std::path::PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".current");
    path.with_file_name(name)
}

/// Writes one chunk's payload (or, in differential mode, only its dirty
/// sub-ranges) and feeds every byte of the chunk's full range into `hasher`
/// in canonical order — unchanged bytes are hashed straight from the live
/// variable even when nothing is written for them, so the chunk hash always
/// reflects the variable's current contents.
fn write_chunk<D, V>(
    file: &mut File,
    path: &Path,
    vars: &V,
    chunk: &VarChunk,
    diff_source: &dyn DirtyChunkSource,
    enable_diff: bool,
    hasher: &mut D,
) -> Result<(), CheckpointError>
where
    D: Digest128,
    V: VariableTable,
{
    let id = VariableId(chunk.id);

    if !enable_diff {
        return write_and_hash_range(file, path, vars, id, chunk.dptr, chunk.chunksize, chunk.fptr, hasher);
    }

    let mut cursor = 0u64;
    for (sub_off, sub_len) in diff_source.changed_ranges(id, chunk.dptr, chunk.chunksize) {
        if sub_off > cursor {
            hash_range(vars, id, chunk.dptr + cursor, sub_off - cursor, hasher)?;
        }
        write_and_hash_range(
            file,
            path,
            vars,
            id,
            chunk.dptr + sub_off,
            sub_len,
            chunk.fptr + sub_off,
            hasher,
        )?;
        cursor = sub_off + sub_len;
    }
    if cursor < chunk.chunksize {
        hash_range(vars, id, chunk.dptr + cursor, chunk.chunksize - cursor, hasher)?;
    }
    Ok(())
}

fn write_and_hash_range<D, V>(
    file: &mut File,
    path: &Path,
    vars: &V,
    id: VariableId,
    var_offset: u64,
    len: u64,
    file_offset: u64,
    hasher: &mut D,
) -> Result<(), CheckpointError>
where
    D: Digest128,
    V: VariableTable,
{
    let mut done = 0u64;
    while done < len {
        let take = (len - done).min(COPY_BUFFER_LIMIT);
        let bytes = vars.read_at(id, var_offset + done, take)?;
        file.seek(SeekFrom::Start(file_offset + done))
            .map_err(|e| CheckpointError::io(path.display().to_string(), e))?;
        file.write_all(bytes)
            .map_err(|e| CheckpointError::io(path.display().to_string(), e))?;
        hasher.update(bytes);
        done += take;
    }
    Ok(())
}

fn hash_range<D, V>(vars: &V, id: VariableId, var_offset: u64, len: u64, hasher: &mut D) -> Result<(), CheckpointError>
where
    D: Digest128,
    V: VariableTable,
{
    let mut done = 0u64;
    while done < len {
        let take = (len - done).min(COPY_BUFFER_LIMIT);
        let bytes = vars.read_at(id, var_offset + done, take)?;
        hasher.update(bytes);
        done += take;
    }
    Ok(())
}

/// The whole-file data digest (invariant I4): a pass separate from the
/// per-chunk hashes above, grouped per block — a block's prefix and chunk
/// records, then that block's payload bytes read from the live variable
/// table, before moving to the next block. Every block is included, not
/// just the one(s) touched by this checkpoint.
pub fn whole_file_digest<D, V>(graph: &MetadataGraph, vars: &V) -> Result<[u8; DIGEST_LEN], CheckpointError>
where
    D: Digest128,
    V: VariableTable,
{
    let mut hasher = D::default();
    for block in graph.blocks() {
        hasher.update(&block.metadata_to_bytes());
        for chunk in &block.vars {
            hash_range(vars, VariableId(chunk.id), chunk.dptr, chunk.chunksize, &mut hasher)?;
        }
    }
    Ok(hasher.finalize())
}

/// Byte length a checkpoint of `graph` currently occupies on disk, without
/// touching the file: `FileMeta` plus every block's `dbsize` (invariant I3).
/// Exposed for callers that need `fs` before a `Collective::all_gather_u64`
/// (L2/L3 redundancy bookkeeping) without re-deriving the arithmetic.
pub fn projected_file_size(graph: &MetadataGraph) -> u64 {
    graph.file_size()
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkpoint_domain::{Md5Digest, RegisteredVariable};
    use std::collections::HashMap;
    use tempfile::tempdir;

    /// An in-memory, fully in-process `VariableTable` + `DirtyChunkSource`
    /// for exercising the writer without a real HPC application wired in.
    struct FakeVars {
        data: HashMap<i32, Vec<u8>>,
        table: Vec<RegisteredVariable>,
    }

    impl VariableTable for FakeVars {
        fn variables(&self) -> &[RegisteredVariable] {
            &self.table
        }

        fn read_at(&self, id: VariableId, offset: u64, len: u64) -> Result<&[u8], CheckpointError> {
            let buf = self.data.get(&id.0).ok_or_else(|| CheckpointError::InvalidLayout("unknown var".into()))?;
            let start = offset as usize;
            let end = start + len as usize;
            if end > buf.len() {
                return Err(CheckpointError::InvalidLayout("read past variable end".into()));
            }
            Ok(&buf[start..end])
        }

        fn write_at(&mut self, id: VariableId, offset: u64, data: &[u8]) -> Result<(), CheckpointError> {
            let buf = self.data.get_mut(&id.0).ok_or_else(|| CheckpointError::InvalidLayout("unknown var".into()))?;
            let start = offset as usize;
            buf[start..start + data.len()].copy_from_slice(data);
            Ok(())
        }
    }

    struct FullRange;
    impl DirtyChunkSource for FullRange {
        fn changed_ranges(&self, _id: VariableId, _base_addr: u64, length: u64) -> Box<dyn Iterator<Item = (u64, u64)> + '_> {
            Box::new(std::iter::once((0, length)))
        }
    }

    #[test]
    fn write_checkpoint_produces_self_consistent_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Ckpt1-Rank0.fti");

        let mut data = HashMap::new();
        data.insert(1, vec![7u8; 1024]);
        let table = vec![RegisteredVariable { id: VariableId(1), size: 1024 }];
        let vars = FakeVars { data, table: table.clone() };

        let mut graph = MetadataGraph::new();
        graph.update(&table).unwrap();

        let (meta, fs) = write_checkpoint::<Md5Digest, _>(
            &path,
            &mut graph,
            &vars,
            &FullRange,
            false,
            1,
            RedundancyFacts { pt_fs: -1, max_fs: -1 },
        )
        .unwrap();

        assert!(meta.verify_my_hash::<Md5Digest>());
        assert_eq!(fs, graph.file_size());
        assert_eq!(meta.ckpt_size, fs);
    }

    struct OnlyDirty {
        target: VariableId,
        range: (u64, u64),
    }

    impl DirtyChunkSource for OnlyDirty {
        fn changed_ranges(&self, id: VariableId, _base_addr: u64, _length: u64) -> Box<dyn Iterator<Item = (u64, u64)> + '_> {
            if id == self.target {
                Box::new(std::iter::once(self.range))
            } else {
                Box::new(std::iter::empty())
            }
        }
    }

    #[test]
    fn differential_write_publishes_atomically_and_leaves_no_staging_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Ckpt1-Rank0.fti");

        let mut data = HashMap::new();
        data.insert(1, vec![1u8; 256]);
        let table = vec![RegisteredVariable { id: VariableId(1), size: 256 }];
        let vars = FakeVars { data, table: table.clone() };

        let mut graph = MetadataGraph::new();
        graph.update(&table).unwrap();

        write_checkpoint::<Md5Digest, _>(
            &path,
            &mut graph,
            &vars,
            &FullRange,
            true,
            1,
            RedundancyFacts { pt_fs: -1, max_fs: -1 },
        )
        .unwrap();

        assert!(path.exists());
        assert!(!staging_path_for(&path).exists());

        let mut data2 = HashMap::new();
        let mut updated = vec![1u8; 256];
        updated[100..120].fill(0xAB);
        data2.insert(1, updated.clone());
        let vars2 = FakeVars { data: data2, table: table.clone() };

        let (meta, fs) = write_checkpoint::<Md5Digest, _>(
            &path,
            &mut graph,
            &vars2,
            &OnlyDirty { target: VariableId(1), range: (100, 20) },
            true,
            2,
            RedundancyFacts { pt_fs: -1, max_fs: -1 },
        )
        .unwrap();

        assert!(meta.verify_my_hash::<Md5Digest>());
        assert!(path.exists());
        assert!(!staging_path_for(&path).exists());

        let recovered = crate::infrastructure::reader::RecoveredCheckpoint::open::<Md5Digest>(&path).unwrap();
        recovered.verify_whole_file::<Md5Digest>(&path).unwrap();
        let mut dst = FakeVars { data: HashMap::new(), table: table.clone() };
        dst.data.insert(1, vec![0u8; 256]);
        recovered.recover::<Md5Digest, _>(&path, &mut dst).unwrap();
        assert_eq!(dst.data.get(&1).unwrap(), &updated);
        let _ = fs;
    }
}
