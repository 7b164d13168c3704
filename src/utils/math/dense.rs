use ndarray::{Array1, Array2, Axis};

/// Relative tolerance below which a column is considered linearly dependent
const RANK_TOL: f64 = 1e-10;
const JACOBI_MAX_SWEEPS: usize = 100;

/// Orthonormal basis for the column space of `a` (modified Gram-Schmidt,
/// two passes). Columns that are numerically dependent on earlier ones are
/// dropped, so the result may have fewer columns than `a`.
pub fn orthonormal_columns(a: &Array2<f64>) -> Array2<f64> {
    let mut basis: Vec<Array1<f64>> = Vec::with_capacity(a.ncols());
    for col in a.axis_iter(Axis(1)) {
        let original = col.dot(&col).sqrt();
        if original == 0.0 || !original.is_finite() {
            continue;
        }
        let mut v = col.to_owned();
        // re-orthogonalise once to recover precision lost in the first pass
        for _ in 0..2 {
            for q in &basis {
                let proj = q.dot(&v);
                v.scaled_add(-proj, q);
            }
        }
        let norm = v.dot(&v).sqrt();
        if norm > RANK_TOL * original {
            v /= norm;
            basis.push(v);
        }
    }

    let mut out = Array2::zeros((a.nrows(), basis.len()));
    for (j, q) in basis.iter().enumerate() {
        out.column_mut(j).assign(q);
    }
    out
}

/// Eigen-decomposition of a symmetric matrix (cyclic Jacobi rotations)
///
/// # Returns
/// * eigenvalues sorted descending
/// * eigenvectors as the matching columns
pub fn symmetric_eigen(a: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    debug_assert_eq!(n, a.ncols());
    let mut m = a.clone();
    let mut v = Array2::<f64>::eye(n);

    let scale = m.iter().map(|x| x * x).sum::<f64>().sqrt();
    for _ in 0..JACOBI_MAX_SWEEPS {
        let mut off = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off += m[[p, q]] * m[[p, q]];
            }
        }
        if off.sqrt() <= f64::EPSILON * scale || off == 0.0 {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = m[[p, q]];
                if apq == 0.0 {
                    continue;
                }
                let theta = (m[[q, q]] - m[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let mkp = m[[k, p]];
                    let mkq = m[[k, q]];
                    m[[k, p]] = c * mkp - s * mkq;
                    m[[k, q]] = s * mkp + c * mkq;
                }
                for k in 0..n {
                    let mpk = m[[p, k]];
                    let mqk = m[[q, k]];
                    m[[p, k]] = c * mpk - s * mqk;
                    m[[q, k]] = s * mpk + c * mqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| m[[j, j]].total_cmp(&m[[i, i]]));

    let values = Array1::from_iter(order.iter().map(|&i| m[[i, i]]));
    let mut vectors = Array2::zeros((n, n));
    for (dst, &src) in order.iter().enumerate() {
        vectors.column_mut(dst).assign(&v.column(src));
    }
    (values, vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn orthonormal_columns_drops_dependent() {
        let a = array![[1.0, 2.0, 0.0], [1.0, 2.0, 1.0], [0.0, 0.0, 1.0]];
        let q = orthonormal_columns(&a);
        assert_eq!(q.ncols(), 2);
        let gram = q.t().dot(&q);
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((gram[[i, j]] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn orthonormal_columns_of_zero_matrix_is_empty() {
        let q = orthonormal_columns(&Array2::zeros((4, 3)));
        assert_eq!(q.dim(), (4, 0));
    }

    #[test]
    fn eigen_reconstructs_matrix() {
        let a = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 1.0]];
        let (vals, vecs) = symmetric_eigen(&a);
        assert!(vals[0] >= vals[1] && vals[1] >= vals[2]);
        let recon = vecs.dot(&Array2::from_diag(&vals)).dot(&vecs.t());
        for (x, y) in recon.iter().zip(a.iter()) {
            assert!((x - y).abs() < 1e-10);
        }
    }

    #[test]
    fn eigen_of_diagonal_is_sorted_diagonal() {
        let a = array![[1.0, 0.0], [0.0, 5.0]];
        let (vals, vecs) = symmetric_eigen(&a);
        assert_eq!(vals, array![5.0, 1.0]);
        assert_eq!(vecs.column(0).mapv(f64::abs), array![0.0, 1.0]);
    }
}
