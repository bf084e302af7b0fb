//! # matseg-core
//!
//! Decodes recorded segments out of MAT-file containers.
//!
//! ## Architecture
//!
//! ```text
//! source id ─► SegmentLoader ─► Container (MemoryContainer | Mat5Container)
//!                    │                 │
//!                    │          records → fields
//!                    │                 │
//!                    │   "data" ─► RawMatrixView (column-major)
//!                    │                 │
//!                    │        statistics::collect → decode
//!                    ▼                 │
//!                 Segment ◄────────────┘  rows × samples in [0, 1]
//! ```
//!
//! One load holds the container's lock from open to close; nothing else is
//! shared between loads.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod container;
pub mod decode;
pub mod error;
pub mod loader;
pub mod segment;

// Convenience re-exports for downstream crates
pub use container::{Container, Field, MemoryContainer, MemoryRecord, Record};
pub use decode::{ChannelStatistics, DegenerateRowPolicy, RawMatrixView, StatisticsSeed};
pub use error::{Result, SegmentError};
pub use loader::{FieldKind, LoaderConfig, SegmentLoader};
pub use segment::Segment;

#[cfg(feature = "mat5")]
pub use container::Mat5Container;

/// Load the segment stored in the MAT-file at `path` with default settings.
#[cfg(feature = "mat5")]
pub fn load_segment(path: impl AsRef<std::path::Path>) -> Result<Segment> {
    let path = path.as_ref();
    let source_id = path.to_str().ok_or_else(|| SegmentError::ContainerOpen {
        source_id: path.display().to_string(),
        reason: "path is not valid UTF-8".into(),
    })?;
    SegmentLoader::new(Mat5Container::new()).load(source_id)
}
