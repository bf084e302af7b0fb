//! Per-channel extrema collected in one scan per row.
//!
//! ## Seeding
//!
//! With [`StatisticsSeed::Zero`] both `min` and `max` start at `0.0` and are
//! only moved by strict comparison, so zero is always inside the range: a row
//! of `[0.3, 0.7]` yields `min = 0.0, max = 0.7`. This reproduces the
//! historical output of the decoder bit for bit.
//!
//! [`StatisticsSeed::FirstSample`] seeds from the row's first element instead,
//! giving the true range of the row.

use serde::{Deserialize, Serialize};

use super::view::RawMatrixView;

/// How the running min/max of each row is initialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatisticsSeed {
    /// Start at `0.0`; zero is an inclusive sentinel.
    #[default]
    Zero,
    /// Start at the first sample of the row.
    FirstSample,
}

/// Min/max of one channel's raw samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelStatistics {
    pub min: f64,
    pub max: f64,
}

impl ChannelStatistics {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `max - min`.
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// `true` when min and max coincide, so normalising would divide by zero.
    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }

    /// `true` when `value` lies within `[min, max]`.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Scan every row of `view` once and return one [`ChannelStatistics`] per row.
///
/// NaN samples never win a comparison and are therefore ignored here; the
/// decoder rejects them separately.
pub fn collect(view: &RawMatrixView<'_>, seed: StatisticsSeed) -> Vec<ChannelStatistics> {
    let mut statistics = Vec::with_capacity(view.rows());

    for row in 0..view.rows() {
        let (mut min, mut max) = match seed {
            StatisticsSeed::Zero => (0.0, 0.0),
            StatisticsSeed::FirstSample if view.cols() > 0 => {
                let first = view.get(row, 0);
                (first, first)
            }
            StatisticsSeed::FirstSample => (0.0, 0.0),
        };

        for signal in view.row(row) {
            if signal < min {
                min = signal;
            }
            if signal > max {
                max = signal;
            }
        }

        statistics.push(ChannelStatistics { min, max });
    }

    statistics
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn view(buf: &[f64], rows: usize, cols: usize) -> RawMatrixView<'_> {
        RawMatrixView::new(buf, rows, cols).unwrap()
    }

    #[test]
    fn zero_seed_keeps_zero_in_positive_row() {
        // Row 0 = [0.3, 0.7], row 1 = [-2.0, 5.0]
        let buf = [0.3, -2.0, 0.7, 5.0];
        let stats = collect(&view(&buf, 2, 2), StatisticsSeed::Zero);
        assert_eq!(stats[0], ChannelStatistics::new(0.0, 0.7));
        assert_eq!(stats[1], ChannelStatistics::new(-2.0, 5.0));
    }

    #[test]
    fn zero_seed_keeps_zero_in_negative_row() {
        let buf = [-3.0, -1.0, -2.0];
        let stats = collect(&view(&buf, 1, 3), StatisticsSeed::Zero);
        assert_eq!(stats[0], ChannelStatistics::new(-3.0, 0.0));
    }

    #[test]
    fn first_sample_seed_gives_true_range() {
        let buf = [0.3, 0.9, 0.7];
        let stats = collect(&view(&buf, 1, 3), StatisticsSeed::FirstSample);
        assert_eq!(stats[0], ChannelStatistics::new(0.3, 0.9));
    }

    #[test]
    fn rows_are_independent() {
        // Three channels, two samples each: [[1, 2], [10, -10], [0, 0]]
        let buf = [1.0, 10.0, 0.0, 2.0, -10.0, 0.0];
        let stats = collect(&view(&buf, 3, 2), StatisticsSeed::Zero);
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0], ChannelStatistics::new(0.0, 2.0));
        assert_eq!(stats[1], ChannelStatistics::new(-10.0, 10.0));
        assert!(stats[2].is_degenerate());
    }

    #[test]
    fn empty_columns_yield_zero_stats() {
        let buf: [f64; 0] = [];
        for seed in [StatisticsSeed::Zero, StatisticsSeed::FirstSample] {
            let stats = collect(&view(&buf, 4, 0), seed);
            assert_eq!(stats.len(), 4);
            assert!(stats.iter().all(|s| *s == ChannelStatistics::new(0.0, 0.0)));
        }
    }

    #[test]
    fn nan_is_ignored() {
        let buf = [1.0, f64::NAN, -1.0];
        let stats = collect(&view(&buf, 1, 3), StatisticsSeed::Zero);
        assert_eq!(stats[0], ChannelStatistics::new(-1.0, 1.0));
    }

    #[test]
    fn random_matrices_bound_every_sample() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let rows = rng.gen_range(1..8);
            let cols = rng.gen_range(1..32);
            let buf: Vec<f64> = (0..rows * cols).map(|_| rng.gen_range(-50.0..50.0)).collect();
            let v = view(&buf, rows, cols);
            let stats = collect(&v, StatisticsSeed::Zero);

            for (row, s) in stats.iter().enumerate() {
                assert!(s.min <= 0.0 && s.max >= 0.0);
                for sample in v.row(row) {
                    assert!(s.contains(sample), "row {row}: {sample} outside {s:?}");
                }
                let true_min = v.row(row).fold(f64::INFINITY, f64::min);
                let true_max = v.row(row).fold(f64::NEG_INFINITY, f64::max);
                assert_eq!(s.min, true_min.min(0.0));
                assert_eq!(s.max, true_max.max(0.0));
            }
        }
    }
}
