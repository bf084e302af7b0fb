//! `MemoryContainer`: records held in memory, keyed by source id.
//!
//! Useful for callers that already hold decoded buffers and as the default
//! collaborator in tests.

use std::collections::BTreeMap;

use tracing::debug;

use super::{Container, Field, Record};
use crate::error::{Result, SegmentError};

#[derive(Debug, Clone, PartialEq)]
enum MemoryValue {
    Double {
        rows: usize,
        cols: usize,
        values: Vec<f64>,
    },
    Unsupported(String),
}

/// A record built field by field.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRecord {
    name: String,
    fields: Vec<(String, MemoryValue)>,
}

impl MemoryRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a double matrix field. `values` is column-major and is stored as
    /// given, even when its length disagrees with `rows * cols`.
    pub fn with_matrix(
        mut self,
        name: impl Into<String>,
        rows: usize,
        cols: usize,
        values: Vec<f64>,
    ) -> Self {
        self.fields
            .push((name.into(), MemoryValue::Double { rows, cols, values }));
        self
    }

    /// Add a 1×1 double field.
    pub fn with_scalar(self, name: impl Into<String>, value: f64) -> Self {
        self.with_matrix(name, 1, 1, vec![value])
    }

    /// Add a field of a class the decoder does not read.
    pub fn with_unsupported(mut self, name: impl Into<String>, class: impl Into<String>) -> Self {
        self.fields
            .push((name.into(), MemoryValue::Unsupported(class.into())));
        self
    }
}

impl Record for MemoryRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn field_count(&self) -> usize {
        self.fields.len()
    }

    fn field_name(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|(name, _)| name.as_str())
    }

    fn field_by_name(&self, name: &str) -> Option<Field<'_>> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| match value {
                MemoryValue::Double { rows, cols, values } => Field::Double {
                    rows: *rows,
                    cols: *cols,
                    values,
                },
                MemoryValue::Unsupported(class) => Field::Unsupported { class },
            })
    }
}

/// In-memory container with one cursor.
#[derive(Debug, Default)]
pub struct MemoryContainer {
    sources: BTreeMap<String, Vec<MemoryRecord>>,
    open: Option<(String, usize)>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `records` under `source_id`, replacing any previous entry.
    pub fn with_source(mut self, source_id: impl Into<String>, records: Vec<MemoryRecord>) -> Self {
        self.insert(source_id, records);
        self
    }

    pub fn insert(&mut self, source_id: impl Into<String>, records: Vec<MemoryRecord>) {
        self.sources.insert(source_id.into(), records);
    }

    /// Whether a source is currently open.
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    fn open_records(&self) -> Result<(&[MemoryRecord], usize)> {
        let (source_id, cursor) = self
            .open
            .as_ref()
            .ok_or_else(|| SegmentError::ContainerRead("no source is open".into()))?;
        let records = self
            .sources
            .get(source_id)
            .ok_or_else(|| SegmentError::ContainerRead(format!("source `{source_id}` vanished")))?;
        Ok((records, *cursor))
    }
}

impl Container for MemoryContainer {
    type Record = MemoryRecord;

    fn open(&mut self, source_id: &str) -> Result<()> {
        if !self.sources.contains_key(source_id) {
            return Err(SegmentError::container_open(source_id, "no such source"));
        }
        debug!(source = source_id, "memory container opened");
        self.open = Some((source_id.to_string(), 0));
        Ok(())
    }

    fn record_count(&mut self) -> Result<usize> {
        self.open_records().map(|(records, _)| records.len())
    }

    fn next_record(&mut self) -> Result<MemoryRecord> {
        let (records, cursor) = self.open_records()?;
        let record = records
            .get(cursor)
            .cloned()
            .ok_or_else(|| SegmentError::ContainerRead(format!("no record at index {cursor}")))?;
        if let Some((_, cursor)) = self.open.as_mut() {
            *cursor += 1;
        }
        Ok(record)
    }

    fn close(&mut self) {
        self.open = None;
    }
}
