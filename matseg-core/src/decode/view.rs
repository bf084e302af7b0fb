//! Column-major addressing over a borrowed `f64` buffer.

/// Flat offset of `(row, col)` in a column-major buffer with `row_count` rows.
///
/// Elements of one column are contiguous; the next column starts
/// `row_count` elements later.
#[inline]
pub fn column_major_offset(row_count: usize, row: usize, col: usize) -> usize {
    col * row_count + row
}

/// Read element `(row, col)` from a column-major buffer.
///
/// # Panics
/// Panics if the offset falls outside `buffer`.
#[inline]
pub fn element(buffer: &[f64], row_count: usize, row: usize, col: usize) -> f64 {
    buffer[column_major_offset(row_count, row, col)]
}

/// A validated `rows × cols` view over a column-major buffer.
///
/// Never copies the buffer. Every read goes through [`element`].
#[derive(Debug, Clone, Copy)]
pub struct RawMatrixView<'a> {
    values: &'a [f64],
    rows: usize,
    cols: usize,
}

impl<'a> RawMatrixView<'a> {
    /// Wrap `values` as a `rows × cols` matrix.
    ///
    /// Returns `None` when `values.len() != rows * cols` (including overflow
    /// of the product).
    pub fn new(values: &'a [f64], rows: usize, cols: usize) -> Option<Self> {
        let expected = rows.checked_mul(cols)?;
        (values.len() == expected).then_some(Self { values, rows, cols })
    }

    /// Number of rows (channels).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (samples per channel).
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Element at `(row, col)`.
    ///
    /// # Panics
    /// Panics if `row >= rows()` or `col >= cols()`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(
            row < self.rows && col < self.cols,
            "({row}, {col}) outside {}x{} matrix",
            self.rows,
            self.cols
        );
        element(self.values, self.rows, row, col)
    }

    /// Iterate the samples of one row in column order.
    pub fn row(&self, row: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.cols).map(move |col| self.get(row, col))
    }

    /// The underlying column-major buffer.
    pub fn as_slice(&self) -> &'a [f64] {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_walks_down_columns_first() {
        // 3 rows: column 0 holds offsets 0..3, column 1 holds 3..6.
        assert_eq!(column_major_offset(3, 0, 0), 0);
        assert_eq!(column_major_offset(3, 2, 0), 2);
        assert_eq!(column_major_offset(3, 0, 1), 3);
        assert_eq!(column_major_offset(3, 1, 2), 7);
    }

    #[test]
    fn view_rejects_wrong_length() {
        let buf = [0.0; 5];
        assert!(RawMatrixView::new(&buf, 2, 3).is_none());
        assert!(RawMatrixView::new(&buf, 5, 1).is_some());
    }

    #[test]
    fn view_rejects_overflowing_shape() {
        let buf = [0.0; 4];
        assert!(RawMatrixView::new(&buf, usize::MAX, 2).is_none());
    }

    #[test]
    fn row_iterator_reads_strided() {
        // [[1, 2, 3], [4, 5, 6]] stored column-major.
        let buf = [1.0, 4.0, 2.0, 5.0, 3.0, 6.0];
        let view = RawMatrixView::new(&buf, 2, 3).unwrap();
        assert_eq!(view.row(0).collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
        assert_eq!(view.row(1).collect::<Vec<_>>(), vec![4.0, 5.0, 6.0]);
        assert_eq!(view.get(1, 2), 6.0);
    }

    #[test]
    #[should_panic]
    fn get_out_of_range_panics() {
        let buf = [1.0, 2.0];
        let view = RawMatrixView::new(&buf, 1, 2).unwrap();
        view.get(1, 0);
    }
}
