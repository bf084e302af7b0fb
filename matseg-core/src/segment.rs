//! The decoded result of one load.

use serde::Serialize;

/// A normalised channel matrix plus scalar metadata.
///
/// Built once by [`SegmentLoader`](crate::SegmentLoader) and immutable
/// afterwards. `data` is row-major: one row per channel, one column per
/// sample, every row the same length.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    data: Vec<Vec<f64>>,
    duration_seconds: f64,
    sampling_frequency_hz: f64,
    source_name: String,
}

impl Segment {
    pub(crate) fn new(
        data: Vec<Vec<f64>>,
        duration_seconds: f64,
        sampling_frequency_hz: f64,
        source_name: String,
    ) -> Self {
        debug_assert!(
            data.windows(2).all(|w| w[0].len() == w[1].len()),
            "segment rows must share one length"
        );
        Self {
            data,
            duration_seconds,
            sampling_frequency_hz,
            source_name,
        }
    }

    /// Normalised samples, `data()[channel][sample]`.
    pub fn data(&self) -> &[Vec<f64>] {
        &self.data
    }

    /// One channel's normalised samples.
    pub fn channel(&self, index: usize) -> Option<&[f64]> {
        self.data.get(index).map(Vec::as_slice)
    }

    /// Number of rows (channels).
    pub fn channel_count(&self) -> usize {
        self.data.len()
    }

    /// Number of columns (samples per channel).
    pub fn sample_count(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }

    /// `data_length_sec`, or `0.0` when the record had none.
    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    /// `sampling_frequency`, or `0.0` when the record had none.
    pub fn sampling_frequency_hz(&self) -> f64 {
        self.sampling_frequency_hz
    }

    /// The source id the segment was loaded from.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Take ownership of the sample table.
    pub fn into_data(self) -> Vec<Vec<f64>> {
        self.data
    }

    /// Copy the samples into a `channels × samples` array.
    #[cfg(feature = "ndarray")]
    pub fn to_array2(&self) -> ndarray::Array2<f64> {
        ndarray::Array2::from_shape_fn((self.channel_count(), self.sample_count()), |(r, c)| {
            self.data[r][c]
        })
    }
}
