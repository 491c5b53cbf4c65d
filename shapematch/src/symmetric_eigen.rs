use crate::error::{Result, ShapeMatchError};
use crate::matrix::Matrix;

/// Upper bound on QL sweeps per eigenvalue before giving up.
const MAX_QL_ITERATIONS: usize = 60;

/// Eigen-decomposition of a real symmetric matrix.
///
/// The matrix is first reduced to tridiagonal form with Householder reflections
/// and then diagonalised with the implicit QL algorithm (Wilkinson shifts).
///
/// - `eigenvalues` are sorted in **ascending** order.
/// - `eigenvectors` holds the matching unit eigenvectors as **columns**.
///
/// # Examples
/// ```
/// # use shapematch::matrix::Matrix;
/// # use shapematch::symmetric_eigen::SymmetricEigen;
/// let a = Matrix::from_rows(vec![vec![2.0, 1.0], vec![1.0, 2.0]]).unwrap();
/// let eig = SymmetricEigen::new(&a).unwrap();
/// assert!((eig.eigenvalues[0] - 1.0).abs() < 1e-12);
/// assert!((eig.eigenvalues[1] - 3.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    pub eigenvalues: Vec<f64>,
    pub eigenvectors: Matrix<f64>,
}

impl SymmetricEigen {
    /// Decomposes `a`.
    ///
    /// # Returns
    /// - `DimensionMismatch` if `a` is not square.
    /// - `InvalidInput` if `a` is not symmetric or has non-finite cells.
    /// - `NoConvergence` if the QL iteration stalls.
    pub fn new(a: &Matrix<f64>) -> Result<Self> {
        if !a.is_square() {
            return Err(ShapeMatchError::DimensionMismatch {
                operation: "symmetric_eigen",
                left: a.shape(),
                right: (a.cols(), a.rows()),
            });
        }
        let n = a.rows();
        let scale = a.as_slice().iter().fold(0.0f64, |m, v| m.max(v.abs()));
        if !scale.is_finite() {
            return Err(ShapeMatchError::InvalidInput(
                "matrix contains non-finite values".to_string(),
            ));
        }
        for r in 0..n {
            for c in r + 1..n {
                if (a[(r, c)] - a[(c, r)]).abs() > 1e-10 * scale.max(1.0) {
                    return Err(ShapeMatchError::InvalidInput(format!(
                        "matrix is not symmetric at ({r}, {c})"
                    )));
                }
            }
        }
        if n == 0 {
            return Ok(SymmetricEigen {
                eigenvalues: Vec::new(),
                eigenvectors: Matrix::new(0, 0),
            });
        }

        let mut v: Vec<Vec<f64>> = (0..n).map(|r| a.row(r)).collect();
        let mut d = vec![0.0; n];
        let mut e = vec![0.0; n];

        tridiagonalize(&mut v, &mut d, &mut e);
        diagonalize(&mut v, &mut d, &mut e)?;

        let mut eigenvectors = Matrix::new(n, n);
        for (r, row) in v.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                eigenvectors[(r, c)] = value;
            }
        }
        Ok(SymmetricEigen {
            eigenvalues: d,
            eigenvectors,
        })
    }

    /// The eigenvector belonging to `eigenvalues[index]`.
    pub fn eigenvector(&self, index: usize) -> Vec<f64> {
        self.eigenvectors.column(index)
    }
}

/// Householder reduction to tridiagonal form. On return `d` holds the
/// diagonal, `e[1..]` the sub-diagonal and `v` the accumulated transform.
fn tridiagonalize(v: &mut [Vec<f64>], d: &mut [f64], e: &mut [f64]) {
    let n = d.len();
    d.copy_from_slice(&v[n - 1]);

    for i in (1..n).rev() {
        let scale: f64 = d[..i].iter().map(|x| x.abs()).sum();
        let mut h = 0.0;

        if scale == 0.0 {
            e[i] = d[i - 1];
            for j in 0..i {
                d[j] = v[i - 1][j];
                v[i][j] = 0.0;
                v[j][i] = 0.0;
            }
        } else {
            for dk in d[..i].iter_mut() {
                *dk /= scale;
                h += *dk * *dk;
            }
            let mut f = d[i - 1];
            let mut g = h.sqrt();
            if f > 0.0 {
                g = -g;
            }
            e[i] = scale * g;
            h -= f * g;
            d[i - 1] = f - g;
            for ej in e[..i].iter_mut() {
                *ej = 0.0;
            }

            // Apply the similarity transformation to the remaining columns.
            for j in 0..i {
                f = d[j];
                v[j][i] = f;
                g = e[j] + v[j][j] * f;
                for k in j + 1..i {
                    g += v[k][j] * d[k];
                    e[k] += v[k][j] * f;
                }
                e[j] = g;
            }
            f = 0.0;
            for j in 0..i {
                e[j] /= h;
                f += e[j] * d[j];
            }
            let hh = f / (h + h);
            for j in 0..i {
                e[j] -= hh * d[j];
            }
            for j in 0..i {
                f = d[j];
                g = e[j];
                for k in j..i {
                    v[k][j] -= f * e[k] + g * d[k];
                }
                d[j] = v[i - 1][j];
                v[i][j] = 0.0;
            }
        }
        d[i] = h;
    }

    // Accumulate transformations.
    for i in 0..n - 1 {
        v[n - 1][i] = v[i][i];
        v[i][i] = 1.0;
        let h = d[i + 1];
        if h != 0.0 {
            for k in 0..=i {
                d[k] = v[k][i + 1] / h;
            }
            for j in 0..=i {
                let mut g = 0.0;
                for k in 0..=i {
                    g += v[k][i + 1] * v[k][j];
                }
                for k in 0..=i {
                    v[k][j] -= g * d[k];
                }
            }
        }
        for row in v.iter_mut().take(i + 1) {
            row[i + 1] = 0.0;
        }
    }
    for j in 0..n {
        d[j] = v[n - 1][j];
        v[n - 1][j] = 0.0;
    }
    v[n - 1][n - 1] = 1.0;
    e[0] = 0.0;
}

/// Implicit QL iteration on the tridiagonal matrix, followed by an ascending
/// sort of eigenvalues (and matching eigenvector columns).
fn diagonalize(v: &mut [Vec<f64>], d: &mut [f64], e: &mut [f64]) -> Result<()> {
    let n = d.len();
    for i in 1..n {
        e[i - 1] = e[i];
    }
    e[n - 1] = 0.0;

    let mut f = 0.0;
    let mut tst1 = 0.0f64;
    let eps = f64::EPSILON;

    for l in 0..n {
        tst1 = tst1.max(d[l].abs() + e[l].abs());
        let mut m = l;
        while m < n - 1 && e[m].abs() > eps * tst1 {
            m += 1;
        }

        if m > l {
            let mut iterations = 0;
            loop {
                iterations += 1;
                if iterations > MAX_QL_ITERATIONS {
                    return Err(ShapeMatchError::NoConvergence {
                        iterations: MAX_QL_ITERATIONS,
                    });
                }

                // Compute the implicit shift.
                let mut g = d[l];
                let mut p = (d[l + 1] - g) / (2.0 * e[l]);
                let mut r = p.hypot(1.0);
                if p < 0.0 {
                    r = -r;
                }
                d[l] = e[l] / (p + r);
                d[l + 1] = e[l] * (p + r);
                let dl1 = d[l + 1];
                let mut h = g - d[l];
                for di in d.iter_mut().skip(l + 2) {
                    *di -= h;
                }
                f += h;

                // Implicit QL transformation.
                p = d[m];
                let mut c = 1.0;
                let mut c2 = c;
                let mut c3 = c;
                let el1 = e[l + 1];
                let mut s = 0.0;
                let mut s2 = 0.0;
                for i in (l..m).rev() {
                    c3 = c2;
                    c2 = c;
                    s2 = s;
                    g = c * e[i];
                    h = c * p;
                    r = p.hypot(e[i]);
                    e[i + 1] = s * r;
                    s = e[i] / r;
                    c = p / r;
                    p = c * d[i] - s * g;
                    d[i + 1] = h + s * (c * g + s * d[i]);

                    for row in v.iter_mut() {
                        let hk = row[i + 1];
                        row[i + 1] = s * row[i] + c * hk;
                        row[i] = c * row[i] - s * hk;
                    }
                }
                p = -s * s2 * c3 * el1 * e[l] / dl1;
                e[l] = s * p;
                d[l] = c * p;

                if e[l].abs() <= eps * tst1 {
                    break;
                }
            }
        }
        d[l] += f;
        e[l] = 0.0;
    }

    // Selection sort, ascending.
    for i in 0..n.saturating_sub(1) {
        let mut k = i;
        let mut p = d[i];
        for (j, &dj) in d.iter().enumerate().skip(i + 1) {
            if dj < p {
                k = j;
                p = dj;
            }
        }
        if k != i {
            d[k] = d[i];
            d[i] = p;
            for row in v.iter_mut() {
                row.swap(i, k);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn check_decomposition(a: &Matrix<f64>) {
        let eig = SymmetricEigen::new(a).unwrap();
        let n = a.rows();
        for w in eig.eigenvalues.windows(2) {
            assert!(w[0] <= w[1]);
        }
        for k in 0..n {
            let vk = eig.eigenvector(k);
            let norm: f64 = vk.iter().map(|x| x * x).sum::<f64>().sqrt();
            assert_relative_eq!(norm, 1.0, epsilon = 1e-9);
            // A·v = λ·v
            for r in 0..n {
                let av: f64 = (0..n).map(|c| a[(r, c)] * vk[c]).sum();
                assert_relative_eq!(av, eig.eigenvalues[k] * vk[r], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_two_by_two() {
        let a = Matrix::from_rows(vec![vec![4.0, 1.0], vec![1.0, 3.0]]).unwrap();
        check_decomposition(&a);
    }

    #[test]
    fn test_four_by_four_matches_nalgebra() {
        let a = Matrix::from_rows(vec![
            vec![4.0, 1.0, -2.0, 2.0],
            vec![1.0, 2.0, 0.0, 1.0],
            vec![-2.0, 0.0, 3.0, -2.0],
            vec![2.0, 1.0, -2.0, -1.0],
        ])
        .unwrap();
        check_decomposition(&a);

        let eig = SymmetricEigen::new(&a).unwrap();
        let mut reference: Vec<f64> = nalgebra::DMatrix::from(&a)
            .symmetric_eigen()
            .eigenvalues
            .iter()
            .copied()
            .collect();
        reference.sort_by(|x, y| x.total_cmp(y));
        for (got, want) in eig.eigenvalues.iter().zip(&reference) {
            assert_relative_eq!(*got, *want, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_diagonal_keeps_axes() {
        let a = Matrix::from_rows(vec![vec![5.0, 0.0], vec![0.0, 2.0]]).unwrap();
        let eig = SymmetricEigen::new(&a).unwrap();
        assert_eq!(eig.eigenvalues, vec![2.0, 5.0]);
        assert_relative_eq!(eig.eigenvector(1)[0].abs(), 1.0);
        assert_relative_eq!(eig.eigenvector(0)[1].abs(), 1.0);
    }

    #[test]
    fn test_four_one_diagonal() {
        let a = Matrix::from_rows(vec![vec![4.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let eig = SymmetricEigen::new(&a).unwrap();
        assert_eq!(eig.eigenvalues, vec![1.0, 4.0]);
        let small = eig.eigenvector(0);
        let large = eig.eigenvector(1);
        assert_relative_eq!(small[0], 0.0);
        assert_relative_eq!(small[1].abs(), 1.0);
        assert_relative_eq!(large[0].abs(), 1.0);
        assert_relative_eq!(large[1], 0.0);
    }

    #[test]
    fn test_rejects_non_symmetric() {
        let a = Matrix::from_rows(vec![vec![1.0, 2.0], vec![0.0, 1.0]]).unwrap();
        assert!(matches!(
            SymmetricEigen::new(&a),
            Err(ShapeMatchError::InvalidInput(_))
        ));
        assert!(matches!(
            SymmetricEigen::new(&Matrix::new(2, 3)),
            Err(ShapeMatchError::DimensionMismatch { .. })
        ));
    }
}
