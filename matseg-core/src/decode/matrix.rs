//! Column-major → row-major decoding with per-channel normalisation.

use tracing::warn;

use super::normalize::DegenerateRowPolicy;
use super::statistics::ChannelStatistics;
use super::view::RawMatrixView;
use crate::error::{Result, SegmentError};

/// Build a row-major `rows × cols` table from `view`, normalising each sample
/// with its row's statistics.
///
/// Degenerate rows (`min == max`) follow `policy`. Rows with no samples are
/// never degenerate.
///
/// # Errors
/// - [`SegmentError::DegenerateRow`] under [`DegenerateRowPolicy::Reject`].
/// - [`SegmentError::NonFiniteSample`] if any raw sample is NaN or infinite.
///
/// # Panics
/// Panics if `statistics.len() != view.rows()`.
pub fn decode(
    view: &RawMatrixView<'_>,
    statistics: &[ChannelStatistics],
    policy: DegenerateRowPolicy,
) -> Result<Vec<Vec<f64>>> {
    assert_eq!(
        statistics.len(),
        view.rows(),
        "one ChannelStatistics per row is required"
    );

    let mut table = Vec::with_capacity(view.rows());

    for (row, stats) in statistics.iter().enumerate() {
        let degenerate = view.cols() > 0 && stats.is_degenerate();
        if degenerate {
            match policy {
                DegenerateRowPolicy::Reject => {
                    return Err(SegmentError::DegenerateRow {
                        row,
                        value: stats.min,
                    });
                }
                DegenerateRowPolicy::ZeroFill => {
                    warn!(row, value = stats.min, "constant channel zero-filled");
                }
            }
        }

        let mut out = Vec::with_capacity(view.cols());
        for (col, signal) in view.row(row).enumerate() {
            if !signal.is_finite() {
                return Err(SegmentError::NonFiniteSample { row, col });
            }
            out.push(if degenerate { 0.0 } else { stats.normalize(signal) });
        }
        table.push(out);
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::statistics::{collect, StatisticsSeed};

    fn decode_zero_seeded(buf: &[f64], rows: usize, cols: usize) -> Result<Vec<Vec<f64>>> {
        let view = RawMatrixView::new(buf, rows, cols).unwrap();
        let stats = collect(&view, StatisticsSeed::Zero);
        decode(&view, &stats, DegenerateRowPolicy::ZeroFill)
    }

    #[test]
    fn output_is_row_major() {
        // [[0, 5, 10], [-1, 0, 1]] stored column-major.
        let buf = [0.0, -1.0, 5.0, 0.0, 10.0, 1.0];
        let table = decode_zero_seeded(&buf, 2, 3).unwrap();
        assert_eq!(table, vec![vec![0.0, 0.5, 1.0], vec![0.0, 0.5, 1.0]]);
    }

    #[test]
    fn marker_lands_at_its_row_and_column() {
        let (rows, cols) = (4, 6);
        let mut buf = vec![0.0; rows * cols];
        // Marker at (2, 5); every other sample of row 2 is zero.
        buf[5 * rows + 2] = 9.0;
        let table = decode_zero_seeded(&buf, rows, cols).unwrap();

        assert_eq!(table[2][5], 1.0);
        for (r, row) in table.iter().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                if (r, c) != (2, 5) {
                    assert_eq!(v, 0.0, "unexpected value at ({r}, {c})");
                }
            }
        }
    }

    #[test]
    fn single_element() {
        let table = decode_zero_seeded(&[3.0], 1, 1).unwrap();
        assert_eq!(table, vec![vec![1.0]]);
    }

    #[test]
    fn zero_fill_policy_for_constant_row() {
        let buf = [0.0, 0.0, 0.0];
        let table = decode_zero_seeded(&buf, 1, 3).unwrap();
        assert_eq!(table, vec![vec![0.0, 0.0, 0.0]]);
    }

    #[test]
    fn reject_policy_for_constant_row() {
        // Row 1 is constant at 2.5 once seeded from the first sample.
        let buf = [1.0, 2.5, 3.0, 2.5];
        let view = RawMatrixView::new(&buf, 2, 2).unwrap();
        let stats = collect(&view, StatisticsSeed::FirstSample);
        let err = decode(&view, &stats, DegenerateRowPolicy::Reject).unwrap_err();
        assert!(matches!(err, SegmentError::DegenerateRow { row: 1, value } if value == 2.5));
    }

    #[test]
    fn empty_columns_are_not_degenerate() {
        let buf: [f64; 0] = [];
        let view = RawMatrixView::new(&buf, 3, 0).unwrap();
        let stats = collect(&view, StatisticsSeed::Zero);
        let table = decode(&view, &stats, DegenerateRowPolicy::Reject).unwrap();
        assert_eq!(table, vec![Vec::<f64>::new(); 3]);
    }

    #[test]
    fn extreme_span_decodes_to_finite_values() {
        let buf = [1e308, -1e308];
        let table = decode_zero_seeded(&buf, 1, 2).unwrap();
        assert_eq!(table, vec![vec![1.0, 0.0]]);
    }

    #[test]
    fn non_finite_sample_is_rejected() {
        let buf = [1.0, 2.0, f64::INFINITY, 4.0];
        let err = decode_zero_seeded(&buf, 2, 2).unwrap_err();
        assert!(matches!(err, SegmentError::NonFiniteSample { row: 0, col: 1 }));
    }

    #[test]
    #[should_panic(expected = "one ChannelStatistics per row")]
    fn mismatched_statistics_panic() {
        let buf = [1.0, 2.0];
        let view = RawMatrixView::new(&buf, 2, 1).unwrap();
        let _ = decode(&view, &[], DegenerateRowPolicy::ZeroFill);
    }
}
