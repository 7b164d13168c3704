//! Randomized truncated SVD over a sparse weighted-term matrix.
//!
//! The matrix is not centred, so this is latent semantic analysis rather
//! than PCA. The range of `X` is sampled with a seeded Gaussian test matrix,
//! refined by orthonormalised power iterations, and the small projected
//! problem is solved exactly.

use log::debug;
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::{
    error::{FeatureError, Result},
    utils::math::{
        dense::{orthonormal_columns, symmetric_eigen},
        sparse::SparseMatrix,
    },
};

/// singular values below `RANK_TOL * σ_max` are treated as zero
const RANK_TOL: f64 = 1e-10;

/// Reduction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvdConfig {
    /// number of output dimensions (k)
    pub n_components: usize,
    /// power iterations
    pub n_iter: usize,
    /// extra sampled directions beyond k
    pub n_oversamples: usize,
    pub random_seed: u64,
}

impl Default for SvdConfig {
    fn default() -> Self {
        Self {
            n_components: 50,
            n_iter: 5,
            n_oversamples: 10,
            random_seed: 42,
        }
    }
}

/// Fitted projection onto k orthonormal directions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruncatedSvd {
    /// k × n_features, one direction per row
    components: Array2<f64>,
    singular_values: Array1<f64>,
    explained_variance: Array1<f64>,
    explained_variance_ratio: Array1<f64>,
}

impl TruncatedSvd {
    /// Fit on `x` and return the k-dimensional coordinates of its rows
    pub fn fit_transform(x: &SparseMatrix, config: &SvdConfig) -> Result<(Self, Array2<f64>)> {
        let k = config.n_components;
        let n_features = x.n_cols();
        if k == 0 {
            return Err(FeatureError::InvalidConfig("n_components must be positive".into()));
        }
        if k > n_features {
            return Err(FeatureError::Dimensionality {
                requested: k,
                vocabulary: n_features,
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(config.random_seed);
        let (directions, singular) = randomized_directions(x, config, &mut rng);
        let mut components = complete_basis(directions, k, n_features, &mut rng);
        flip_signs(&mut components);

        let mut singular_values = Array1::zeros(k);
        for (i, s) in singular.into_iter().enumerate() {
            singular_values[i] = s;
        }

        let coords = x.mul_dense(&components.t().to_owned());
        let explained_variance = coords.var_axis(Axis(0), 0.0);
        let total = x.total_column_variance();
        let explained_variance_ratio = if total > 0.0 {
            &explained_variance / total
        } else {
            Array1::zeros(k)
        };
        debug!(
            "truncated svd: k={} over {} features, explained variance ratio {:.4}",
            k,
            n_features,
            explained_variance_ratio.sum()
        );

        Ok((
            Self {
                components,
                singular_values,
                explained_variance,
                explained_variance_ratio,
            },
            coords,
        ))
    }

    /// Project new rows onto the fitted directions
    pub fn transform(&self, x: &SparseMatrix) -> Result<Array2<f64>> {
        if x.n_cols() != self.n_features() {
            return Err(FeatureError::MalformedPipeline(format!(
                "matrix has {} features, reducer expects {}",
                x.n_cols(),
                self.n_features()
            )));
        }
        Ok(x.mul_dense(&self.components.t().to_owned()))
    }

    /// Projection directions, `k × n_features`
    #[inline]
    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }

    #[inline]
    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.components.ncols()
    }

    #[inline]
    pub fn singular_values(&self) -> &Array1<f64> {
        &self.singular_values
    }

    /// Variance of each output coordinate on the fitting data
    #[inline]
    pub fn explained_variance(&self) -> &Array1<f64> {
        &self.explained_variance
    }

    #[inline]
    pub fn explained_variance_ratio(&self) -> &Array1<f64> {
        &self.explained_variance_ratio
    }
}

/// Leading right singular vectors of `x` (at most k, fewer if `x` has lower rank)
fn randomized_directions(
    x: &SparseMatrix,
    config: &SvdConfig,
    rng: &mut ChaCha8Rng,
) -> (Vec<Array1<f64>>, Vec<f64>) {
    let k = config.n_components;
    let n_features = x.n_cols();
    let n_samples = (k + config.n_oversamples).min(n_features);

    let omega = Array2::from_shape_fn((n_features, n_samples), |_| rng.sample::<f64, _>(StandardNormal));
    let mut q = orthonormal_columns(&x.mul_dense(&omega));
    for _ in 0..config.n_iter {
        let z = orthonormal_columns(&x.t_mul_dense(&q));
        q = orthonormal_columns(&x.mul_dense(&z));
    }

    // B = Qᵀ X, held as Bᵀ (n_features × r); B Bᵀ is small (r × r)
    let bt = x.t_mul_dense(&q);
    let gram = bt.t().dot(&bt);
    let (eigvals, eigvecs) = symmetric_eigen(&gram);

    let sigma_max = eigvals.get(0).map_or(0.0, |l| l.max(0.0).sqrt());
    let mut directions = Vec::with_capacity(k);
    let mut singular = Vec::with_capacity(k);
    for (i, &lambda) in eigvals.iter().enumerate().take(k) {
        let sigma = lambda.max(0.0).sqrt();
        if sigma == 0.0 || sigma <= RANK_TOL * sigma_max {
            break;
        }
        directions.push(bt.dot(&eigvecs.column(i)) / sigma);
        singular.push(sigma);
    }
    (directions, singular)
}

/// Extend `directions` to `k` orthonormal rows with seeded random directions.
/// Only needed when the data has rank below k.
fn complete_basis(
    mut directions: Vec<Array1<f64>>,
    k: usize,
    n_features: usize,
    rng: &mut ChaCha8Rng,
) -> Array2<f64> {
    if directions.len() < k {
        debug!("data rank {} below k={}, completing basis", directions.len(), k);
    }
    while directions.len() < k {
        let mut v = Array1::from_shape_fn(n_features, |_| rng.sample::<f64, _>(StandardNormal));
        for _ in 0..2 {
            for d in &directions {
                let proj = d.dot(&v);
                v.scaled_add(-proj, d);
            }
        }
        let norm = v.dot(&v).sqrt();
        if norm > RANK_TOL {
            directions.push(v / norm);
        }
    }

    let mut out = Array2::zeros((k, n_features));
    for (i, d) in directions.iter().enumerate() {
        out.row_mut(i).assign(d);
    }
    out
}

/// Make the largest-magnitude entry of every direction positive
fn flip_signs(components: &mut Array2<f64>) {
    for mut row in components.axis_iter_mut(Axis(0)) {
        let mut best = 0usize;
        for (j, v) in row.iter().enumerate() {
            if v.abs() > row[best].abs() {
                best = j;
            }
        }
        if !row.is_empty() && row[best] < 0.0 {
            row.mapv_inplace(|v| -v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::math::sparse::SparseVec;

    fn matrix(dense: &[&[f64]]) -> SparseMatrix {
        let n_cols = dense[0].len();
        let rows = dense
            .iter()
            .map(|r| {
                let (inds, vals): (Vec<u32>, Vec<f64>) = r
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| **v != 0.0)
                    .map(|(i, v)| (i as u32, *v))
                    .unzip();
                SparseVec::from_unsorted(n_cols, inds, vals)
            })
            .collect();
        SparseMatrix::new(n_cols, rows)
    }

    fn cfg(k: usize) -> SvdConfig {
        SvdConfig {
            n_components: k,
            ..SvdConfig::default()
        }
    }

    #[test]
    fn recovers_singular_values_of_diagonal() {
        let x = matrix(&[&[3.0, 0.0, 0.0], &[0.0, 2.0, 0.0], &[0.0, 0.0, 1.0]]);
        let (svd, coords) = TruncatedSvd::fit_transform(&x, &cfg(2)).unwrap();
        assert!((svd.singular_values()[0] - 3.0).abs() < 1e-9);
        assert!((svd.singular_values()[1] - 2.0).abs() < 1e-9);
        // first direction is e0 (sign normalised)
        assert!((svd.components()[[0, 0]] - 1.0).abs() < 1e-9);
        assert!((coords[[0, 0]] - 3.0).abs() < 1e-9);
        assert!(coords[[1, 0]].abs() < 1e-9);
    }

    #[test]
    fn components_are_orthonormal() {
        let x = matrix(&[
            &[1.0, 2.0, 0.0, 0.5, 0.0],
            &[0.0, 1.0, 3.0, 0.0, 1.0],
            &[2.0, 0.0, 1.0, 1.0, 0.0],
            &[0.0, 0.0, 0.0, 2.0, 2.0],
        ]);
        let (svd, _) = TruncatedSvd::fit_transform(&x, &cfg(3)).unwrap();
        let c = svd.components();
        let gram = c.dot(&c.t());
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((gram[[i, j]] - expected).abs() < 1e-9, "gram[{i},{j}]={}", gram[[i, j]]);
            }
        }
        let s = svd.singular_values();
        assert!(s[0] >= s[1] && s[1] >= s[2]);
    }

    #[test]
    fn rank_deficient_data_still_yields_k_directions() {
        // rank 1, k = 3
        let x = matrix(&[&[1.0, 1.0, 0.0, 0.0], &[2.0, 2.0, 0.0, 0.0]]);
        let (svd, coords) = TruncatedSvd::fit_transform(&x, &cfg(3)).unwrap();
        assert_eq!(svd.components().dim(), (3, 4));
        assert_eq!(svd.singular_values()[1], 0.0);
        let gram = svd.components().dot(&svd.components().t());
        assert!((gram[[2, 2]] - 1.0).abs() < 1e-9);
        assert!(gram[[0, 2]].abs() < 1e-9);
        assert!(coords.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn same_seed_same_result() {
        let x = matrix(&[&[1.0, 0.2, 0.0], &[0.0, 1.0, 0.4], &[0.3, 0.0, 1.0]]);
        let a = TruncatedSvd::fit_transform(&x, &cfg(2)).unwrap();
        let b = TruncatedSvd::fit_transform(&x, &cfg(2)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn k_above_feature_count_is_dimensionality_error() {
        let x = matrix(&[&[1.0, 0.0], &[0.0, 1.0]]);
        let err = TruncatedSvd::fit_transform(&x, &cfg(3)).unwrap_err();
        assert_eq!(err, FeatureError::Dimensionality { requested: 3, vocabulary: 2 });
        assert!(matches!(
            TruncatedSvd::fit_transform(&x, &cfg(0)),
            Err(FeatureError::InvalidConfig(_))
        ));
    }

    #[test]
    fn transform_matches_fit_coordinates() {
        let x = matrix(&[&[1.0, 0.5, 0.0], &[0.0, 1.0, 1.0], &[1.0, 0.0, 1.0]]);
        let (svd, coords) = TruncatedSvd::fit_transform(&x, &cfg(2)).unwrap();
        assert_eq!(svd.transform(&x).unwrap(), coords);
        assert!(svd.transform(&matrix(&[&[1.0, 0.0]])).is_err());
    }
}
