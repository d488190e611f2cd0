// /////////////////////////////////////////////////////////////////////////////
// Checkpoint File Format Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Shared test fixtures for the engine's integration suite: an in-memory
//! `VariableTable` and a `DirtyChunkSource` that reports only an explicitly
//! configured sub-range as changed, for exercising the differential path.

use std::collections::HashMap;

use checkpoint_domain::{CheckpointError, DirtyChunkSource, DirtyRange, RegisteredVariable, VariableId, VariableTable};

pub struct TestVars {
    pub table: Vec<RegisteredVariable>,
    pub data: HashMap<i32, Vec<u8>>,
}

impl TestVars {
    pub fn new(vars: &[(i32, Vec<u8>)]) -> Self {
        let table = vars.iter().map(|(id, bytes)| RegisteredVariable { id: VariableId(*id), size: bytes.len() as u64 }).collect();
        let data = vars.iter().cloned().collect();
        TestVars { table, data }
    }

    pub fn empty_like(other: &Self) -> Self {
        TestVars { table: other.table.clone(), data: HashMap::new() }
    }
}

impl VariableTable for TestVars {
    fn variables(&self) -> &[RegisteredVariable] {
        &self.table
    }

    fn read_at(&self, id: VariableId, offset: u64, len: u64) -> Result<&[u8], CheckpointError> {
        let buf = self.data.get(&id.0).ok_or_else(|| CheckpointError::InvalidLayout("unknown variable".into()))?;
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

/// Reports a single fixed sub-range as dirty for one target variable, and
/// nothing at all for any other variable — enough to exercise the writer's
/// "hash the untouched bytes, write only the dirty ones" path without a
/// real dirty-page tracker.
pub struct FixedDirtyRange {
    pub target: VariableId,
    pub range: DirtyRange,
}

impl DirtyChunkSource for FixedDirtyRange {
    fn changed_ranges(&self, id: VariableId, _base_addr: u64, _length: u64) -> Box<dyn Iterator<Item = DirtyRange> + '_> {
        if id == self.target {
            Box::new(std::iter::once(self.range))
        } else {
            Box::new(std::iter::empty())
        }
    }
}
