//! Compressed Sparse Row matrix and the products the inversion needs.
//!
//! One row per observation, one column per grid cell; entries are ray
//! path lengths, so matrices are tall, rectangular and very sparse.

/// Sparse matrix in Compressed Sparse Row format.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    pub nrows: usize,
    pub ncols: usize,
    pub row_ptr: Vec<usize>,
    pub col_idx: Vec<usize>,
    pub values: Vec<f64>,
}

impl CsrMatrix {
    /// All-zero matrix with the given shape.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        CsrMatrix {
            nrows,
            ncols,
            row_ptr: vec![0; nrows + 1],
            col_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from (row, col, value) triplets. Triplets may arrive in any
    /// order; duplicates within a row are summed. Zero values are kept
    /// out of the structure.
    pub fn from_triplets(nrows: usize, ncols: usize, triplets: &[(usize, usize, f64)]) -> Self {
        let mut per_row: Vec<Vec<(usize, f64)>> = vec![Vec::new(); nrows];
        for &(r, c, v) in triplets {
            assert!(r < nrows && c < ncols, "triplet ({r}, {c}) out of shape");
            if v != 0.0 {
                per_row[r].push((c, v));
            }
        }

        let mut row_ptr = Vec::with_capacity(nrows + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for row in &mut per_row {
            row.sort_unstable_by_key(|&(c, _)| c);
            let mut last_col = usize::MAX;
            for &(c, v) in row.iter() {
                if c == last_col {
                    let k = values.len() - 1;
                    values[k] += v;
                } else {
                    col_idx.push(c);
                    values.push(v);
                    last_col = c;
                }
            }
            row_ptr.push(col_idx.len());
        }

        CsrMatrix {
            nrows,
            ncols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// y = A * x.
    pub fn spmv(&self, x: &[f64], y: &mut [f64]) {
        debug_assert_eq!(x.len(), self.ncols);
        debug_assert_eq!(y.len(), self.nrows);
        for (i, yi) in y.iter_mut().enumerate() {
            let mut sum = 0.0;
            for j in self.row_ptr[i]..self.row_ptr[i + 1] {
                sum += self.values[j] * x[self.col_idx[j]];
            }
            *yi = sum;
        }
    }

    /// y = Aᵀ * x, accumulated column-wise without materializing Aᵀ.
    pub fn spmv_transpose(&self, x: &[f64], y: &mut [f64]) {
        debug_assert_eq!(x.len(), self.nrows);
        debug_assert_eq!(y.len(), self.ncols);
        y.fill(0.0);
        for i in 0..self.nrows {
            let xi = x[i];
            if xi == 0.0 {
                continue;
            }
            for j in self.row_ptr[i]..self.row_ptr[i + 1] {
                y[self.col_idx[j]] += self.values[j] * xi;
            }
        }
    }

    /// Sum of each row; for a sensitivity matrix, the total ray length
    /// of each observation.
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.nrows)
            .map(|i| self.values[self.row_ptr[i]..self.row_ptr[i + 1]].iter().sum())
            .collect()
    }

    /// Number of rows holding at least one non-zero entry.
    pub fn nonzero_rows(&self) -> usize {
        (0..self.nrows)
            .filter(|&i| {
                self.values[self.row_ptr[i]..self.row_ptr[i + 1]]
                    .iter()
                    .any(|&v| v != 0.0)
            })
            .count()
    }

    /// Stack `blocks` vertically. Column counts must agree.
    pub fn vstack(blocks: &[&CsrMatrix]) -> Self {
        assert!(!blocks.is_empty(), "vstack of no blocks");
        let ncols = blocks[0].ncols;
        let nrows = blocks.iter().map(|b| b.nrows).sum();
        let nnz = blocks.iter().map(|b| b.nnz()).sum();

        let mut row_ptr = Vec::with_capacity(nrows + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        row_ptr.push(0);
        for b in blocks {
            assert_eq!(b.ncols, ncols, "vstack column mismatch");
            let base = values.len();
            for i in 0..b.nrows {
                row_ptr.push(base + b.row_ptr[i + 1]);
            }
            col_idx.extend_from_slice(&b.col_idx);
            values.extend_from_slice(&b.values);
        }

        CsrMatrix {
            nrows,
            ncols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Scale every stored entry.
    pub fn scaled(&self, factor: f64) -> Self {
        let mut out = self.clone();
        for v in &mut out.values {
            *v *= factor;
        }
        out
    }
}
