//! Compressed sparse row storage for the constrained system.
//!
//! The solver assembles its matrix as `(row, col, value)` triplets, merges
//! them into CSR form here, and hands the result to the Cholesky backend.

use nalgebra::DVector;

/// Compressed Sparse Row (CSR) matrix.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    /// Number of rows.
    rows: usize,
    /// Number of columns.
    cols: usize,
    /// Row pointers: row_ptr[i] is the index in col_idx/values where row i starts.
    /// Length is rows + 1, with row_ptr[rows] = nnz.
    row_ptr: Vec<usize>,
    /// Column indices for each non-zero value, ascending within a row.
    col_idx: Vec<usize>,
    /// Non-zero values.
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Create a CSR matrix from triplets (row, col, value).
    ///
    /// Duplicate entries at the same (row, col) are summed.
    pub fn from_triplets(rows: usize, cols: usize, mut triplets: Vec<(usize, usize, f64)>) -> Self {
        triplets.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut row_ptr = vec![0usize; rows + 1];
        let mut col_idx: Vec<usize> = Vec::with_capacity(triplets.len());
        let mut values: Vec<f64> = Vec::with_capacity(triplets.len());

        let mut prev: Option<(usize, usize)> = None;
        for (row, col, val) in triplets {
            if prev == Some((row, col)) {
                if let Some(last) = values.last_mut() {
                    *last += val;
                }
                continue;
            }
            col_idx.push(col);
            values.push(val);
            row_ptr[row + 1] += 1;
            prev = Some((row, col));
        }

        // Counts per row -> prefix sums
        for r in 0..rows {
            row_ptr[r + 1] += row_ptr[r];
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Get the number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Get the number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Get the number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Stored value at `(row, col)`, zero if absent.
    ///
    /// # Panics
    /// Panics if `row` is out of range.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let range = self.row_ptr[row]..self.row_ptr[row + 1];
        match self.col_idx[range.clone()].binary_search(&col) {
            Ok(k) => self.values[range.start + k],
            Err(_) => 0.0,
        }
    }

    /// Iterate over stored entries as `(row, col, value)`.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.rows).flat_map(move |row| {
            (self.row_ptr[row]..self.row_ptr[row + 1])
                .map(move |k| (row, self.col_idx[k], self.values[k]))
        })
    }

    /// Whether the matrix is square and equal to its transpose within `tol`.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        self.rows == self.cols
            && self
                .triplets()
                .all(|(r, c, v)| (self.get(c, r) - v).abs() <= tol)
    }

    /// Multiply matrix by vector: y = A * x.
    ///
    /// # Panics
    /// Panics if `x` does not have [`ncols`](Self::ncols) entries.
    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        assert_eq!(x.len(), self.cols, "Vector dimension mismatch");

        let mut y = DVector::zeros(self.rows);
        for i in 0..self.rows {
            let mut sum = 0.0;
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                sum += self.values[k] * x[self.col_idx[k]];
            }
            y[i] = sum;
        }
        y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csr_from_triplets() {
        // [ 4  1 ]
        // [ 1  3 ]
        let triplets = vec![(0, 0, 4.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 3.0)];
        let a = CsrMatrix::from_triplets(2, 2, triplets);

        assert_eq!(a.nrows(), 2);
        assert_eq!(a.ncols(), 2);
        assert_eq!(a.nnz(), 4);
        assert_eq!(a.get(1, 0), 1.0);
    }

    #[test]
    fn test_duplicates_summed() {
        let triplets = vec![
            (1, 1, 3.0),
            (0, 0, 2.0),
            (0, 1, 1.0),
            (0, 0, 2.0), // sums to 4.0
            (1, 0, 1.0),
        ];
        let a = CsrMatrix::from_triplets(2, 2, triplets);

        assert_eq!(a.nnz(), 4);
        assert!((a.get(0, 0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_rows() {
        // Row 1 has no entries.
        let a = CsrMatrix::from_triplets(3, 3, vec![(0, 0, 1.0), (2, 2, 5.0)]);
        assert_eq!(a.get(1, 1), 0.0);
        assert_eq!(a.get(2, 2), 5.0);
        let y = a.mul_vec(&DVector::from_vec(vec![1.0, 1.0, 1.0]));
        assert_eq!(y.as_slice(), &[1.0, 0.0, 5.0]);
    }

    #[test]
    fn test_mul_vec() {
        // [ 4  1 ]   [ 1 ]   [ 5 ]
        // [ 1  3 ] * [ 1 ] = [ 4 ]
        let triplets = vec![(0, 0, 4.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 3.0)];
        let a = CsrMatrix::from_triplets(2, 2, triplets);

        let y = a.mul_vec(&DVector::from_vec(vec![1.0, 1.0]));
        assert!((y[0] - 5.0).abs() < 1e-10);
        assert!((y[1] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_symmetry_check() {
        let sym = CsrMatrix::from_triplets(2, 2, vec![(0, 1, 2.0), (1, 0, 2.0)]);
        assert!(sym.is_symmetric(0.0));

        let asym = CsrMatrix::from_triplets(2, 2, vec![(0, 1, 2.0)]);
        assert!(!asym.is_symmetric(1e-12));
    }

    #[test]
    #[should_panic(expected = "Vector dimension mismatch")]
    fn test_mul_vec_dimension_mismatch_panics() {
        let a = CsrMatrix::from_triplets(2, 2, vec![(0, 0, 1.0), (1, 1, 1.0)]);
        a.mul_vec(&DVector::from_vec(vec![1.0, 2.0, 3.0]));
    }
}
