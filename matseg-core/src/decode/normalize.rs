//! Min/max rescaling of a single sample.

use serde::{Deserialize, Serialize};

use super::statistics::ChannelStatistics;

/// What to do with a channel whose min equals its max.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DegenerateRowPolicy {
    /// Emit `0.0` for every sample of the channel.
    #[default]
    ZeroFill,
    /// Fail the load with [`SegmentError::DegenerateRow`](crate::SegmentError::DegenerateRow).
    Reject,
}

/// `(value - min) / (max - min)`.
///
/// The caller must ensure `max != min`; see [`ChannelStatistics::is_degenerate`].
/// When `max - min` overflows `f64`, the operands are halved first so finite
/// inputs within `[min, max]` still land in `[0, 1]`.
#[inline]
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range.is_finite() {
        (value - min) / range
    } else {
        (value / 2.0 - min / 2.0) / (max / 2.0 - min / 2.0)
    }
}

impl ChannelStatistics {
    /// Normalise `value` against this channel's range.
    #[inline]
    pub fn normalize(&self, value: f64) -> f64 {
        normalize(value, self.min, self.max)
    }
}
