use ndarray::{Array1, Array2};
use num::Float;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::sort::radix_sort_u32_soa;

/// Sparse vector with sorted indices (SoA layout)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVec<N> {
    inds: Vec<u32>,
    vals: Vec<N>,
    len: u32,
}

impl<N> SparseVec<N>
where
    N: Float + Default,
{
    /// Create an all-zero vector of length `len`
    pub fn new(len: usize) -> Self {
        Self {
            inds: Vec::new(),
            vals: Vec::new(),
            len: len as u32,
        }
    }

    /// Build from index/value pairs in any order.
    /// Indices must be unique and `< len`.
    pub fn from_unsorted(len: usize, mut inds: Vec<u32>, mut vals: Vec<N>) -> Self {
        debug_assert!(inds.iter().all(|&i| (i as usize) < len));
        radix_sort_u32_soa(&mut inds, &mut vals);
        Self {
            inds,
            vals,
            len: len as u32,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// number of stored entries
    #[inline]
    pub fn nnz(&self) -> usize {
        self.inds.len()
    }

    /// Iterate stored `(index, value)` pairs in index order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (usize, N)> + '_ {
        self.inds.iter().zip(self.vals.iter()).map(|(&i, &v)| (i as usize, v))
    }

    /// Apply `f` to every stored value
    pub fn map_values<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, N) -> N,
    {
        for (i, v) in self.inds.iter().zip(self.vals.iter_mut()) {
            *v = f(*i as usize, *v);
        }
    }

    #[inline]
    pub fn norm_sq(&self) -> N {
        self.vals.iter().fold(N::zero(), |acc, &v| acc + v * v)
    }

    /// Scale to unit L2 norm. An all-zero vector is left as is.
    pub fn l2_normalize(&mut self) {
        let norm = self.norm_sq().sqrt();
        if norm > N::zero() && norm.is_finite() {
            self.vals.iter_mut().for_each(|v| *v = *v / norm);
        }
    }

    /// Densify
    pub fn to_dense(&self) -> Vec<N> {
        let mut out = vec![N::zero(); self.len()];
        for (i, v) in self.iter() {
            out[i] = v;
        }
        out
    }
}

/// Row-major sparse matrix (one [`SparseVec`] per row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    rows: Vec<SparseVec<f64>>,
    n_cols: usize,
}

impl SparseMatrix {
    pub fn new(n_cols: usize, rows: Vec<SparseVec<f64>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == n_cols));
        Self { rows, n_cols }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    #[inline]
    pub fn rows(&self) -> &[SparseVec<f64>] {
        &self.rows
    }

    pub fn nnz(&self) -> usize {
        self.rows.iter().map(SparseVec::nnz).sum()
    }

    /// `self · rhs` where `rhs` is `(n_cols × l)`
    pub fn mul_dense(&self, rhs: &Array2<f64>) -> Array2<f64> {
        debug_assert_eq!(rhs.nrows(), self.n_cols);
        let l = rhs.ncols();
        let products: Vec<Array1<f64>> = self
            .rows
            .par_iter()
            .map(|row| {
                let mut acc = Array1::zeros(l);
                for (j, v) in row.iter() {
                    acc.scaled_add(v, &rhs.row(j));
                }
                acc
            })
            .collect();

        let mut out = Array2::zeros((self.rows.len(), l));
        for (i, prod) in products.iter().enumerate() {
            out.row_mut(i).assign(prod);
        }
        out
    }

    /// `selfᵀ · rhs` where `rhs` is `(n_rows × l)`
    pub fn t_mul_dense(&self, rhs: &Array2<f64>) -> Array2<f64> {
        debug_assert_eq!(rhs.nrows(), self.rows.len());
        let mut out = Array2::zeros((self.n_cols, rhs.ncols()));
        for (i, row) in self.rows.iter().enumerate() {
            let r = rhs.row(i);
            for (j, v) in row.iter() {
                out.row_mut(j).scaled_add(v, &r);
            }
        }
        out
    }

    /// Sum over columns of the (population) column variance
    pub fn total_column_variance(&self) -> f64 {
        let n = self.rows.len();
        if n == 0 {
            return 0.0;
        }
        let mut sum = vec![0.0f64; self.n_cols];
        let mut sum_sq = vec![0.0f64; self.n_cols];
        for row in &self.rows {
            for (j, v) in row.iter() {
                sum[j] += v;
                sum_sq[j] += v * v;
            }
        }
        let n = n as f64;
        sum.iter()
            .zip(sum_sq.iter())
            .map(|(s, sq)| {
                let mean = s / n;
                (sq / n - mean * mean).max(0.0)
            })
            .sum()
    }
}
