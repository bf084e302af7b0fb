//! Container collaborator abstraction.
//!
//! A [`Container`] is a single stateful cursor over the top-level records of
//! one source: `open` positions it before the first record, `next_record`
//! advances it, `close` releases whatever `open` acquired. Because the cursor
//! is shared state, a container must never be driven by two loads at once;
//! `SegmentLoader` serialises access through a `parking_lot::Mutex`.
//!
//! Backends:
//! - [`MemoryContainer`]: records held in memory, keyed by source id.
//! - `Mat5Container` (feature `mat5`): Level 5 MAT-files on disk.

pub mod memory;

#[cfg(feature = "mat5")]
pub mod mat5;

pub use memory::{MemoryContainer, MemoryRecord};

#[cfg(feature = "mat5")]
pub use mat5::Mat5Container;

use crate::error::Result;

/// Contract for container backends.
pub trait Container: Send + 'static {
    type Record: Record;

    /// Acquire the source for reading and rewind the record cursor.
    ///
    /// # Errors
    /// Returns [`SegmentError::ContainerOpen`](crate::SegmentError::ContainerOpen)
    /// if the source is missing, unreadable or not a container of this kind.
    fn open(&mut self, source_id: &str) -> Result<()>;

    /// Number of top-level records in the open source.
    fn record_count(&mut self) -> Result<usize>;

    /// Read the record under the cursor and advance.
    fn next_record(&mut self) -> Result<Self::Record>;

    /// Release the source. Must be safe to call after a failed read.
    fn close(&mut self);
}

/// A named top-level record exposing its fields by index and by name.
pub trait Record {
    fn name(&self) -> &str;

    fn field_count(&self) -> usize;

    /// Name of the field at `index`, or `None` past the end.
    fn field_name(&self, index: usize) -> Option<&str>;

    /// Borrow the field called `name`.
    fn field_by_name(&self, name: &str) -> Option<Field<'_>>;
}

/// A borrowed field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a> {
    /// Dense real double matrix; `values` is column-major with `rows * cols`
    /// elements (not yet validated).
    Double {
        rows: usize,
        cols: usize,
        values: &'a [f64],
    },
    /// Any other class (char, cell, complex, integer, ...).
    Unsupported { class: &'a str },
}

impl Field<'_> {
    /// Short description of the field's class and shape for error messages.
    pub fn describe(&self) -> String {
        match self {
            Field::Double { rows, cols, .. } => format!("{rows}x{cols} double"),
            Field::Unsupported { class } => format!("{class} array"),
        }
    }
}
