//! Decode-and-normalise pipeline for one column-major numeric field.
//!
//! ```text
//! &[f64] (column-major) ──► RawMatrixView ──► statistics::collect ──► Vec<ChannelStatistics>
//!                                   │                                         │
//!                                   └──────────────► matrix::decode ◄─────────┘
//!                                                          │
//!                                               Vec<Vec<f64>> (row-major, [0, 1])
//! ```
//!
//! All element addressing goes through [`view::element`]; nothing else in the
//! crate computes column-major offsets.

pub mod matrix;
pub mod normalize;
pub mod statistics;
pub mod view;

pub use matrix::decode;
pub use normalize::{normalize, DegenerateRowPolicy};
pub use statistics::{collect, ChannelStatistics, StatisticsSeed};
pub use view::{element, RawMatrixView};

use crate::error::Result;
use crate::loader::LoaderConfig;

/// Collect per-row statistics, then decode `view` into a normalised
/// row-major table.
pub fn decode_normalized(view: &RawMatrixView<'_>, config: &LoaderConfig) -> Result<Vec<Vec<f64>>> {
    let statistics = collect(view, config.statistics_seed);
    decode(view, &statistics, config.degenerate_rows)
}
