use crate::error::{Result, ShapeMatchError};
use crate::matrix::Matrix;

/// LU factorisation `P·A = L·U` of a square matrix, computed with partial
/// (row) pivoting.
///
/// `L` (unit diagonal, not stored) and `U` share one packed matrix. The factor
/// is only constructed for non-singular input: a pivot in column `k` whose
/// magnitude falls below `n · ε · max|A[·, k]|` (measured on the input column)
/// is reported as [`ShapeMatchError::SingularMatrix`]. An all-zero column is
/// always singular.
///
/// # Examples
/// ```
/// # use shapematch::matrix::Matrix;
/// # use shapematch::lu_decomposition::LuDecomposition;
/// let a = Matrix::from_rows(vec![vec![4.0, 3.0], vec![6.0, 3.0]]).unwrap();
/// let lu = LuDecomposition::new(&a).unwrap();
/// assert!((lu.determinant() + 6.0).abs() < 1e-12);
/// let inv = lu.inverse().unwrap();
/// let id = a.mul(&inv).unwrap();
/// assert!((id[(0, 0)] - 1.0).abs() < 1e-12);
/// assert!(id[(0, 1)].abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct LuDecomposition {
    lu: Matrix<f64>,
    /// `pivots[i]` is the original row that ended up at row `i`.
    pivots: Vec<usize>,
    /// +1 or -1 depending on the parity of the row permutation.
    sign: f64,
}

impl LuDecomposition {
    /// Factorises `a`.
    ///
    /// # Returns
    /// - `DimensionMismatch` if `a` is not square.
    /// - `SingularMatrix` if a pivot vanishes.
    pub fn new(a: &Matrix<f64>) -> Result<Self> {
        if !a.is_square() {
            return Err(ShapeMatchError::DimensionMismatch {
                operation: "lu_decomposition",
                left: a.shape(),
                right: (a.cols(), a.rows()),
            });
        }
        let n = a.rows();
        if a.as_slice().iter().any(|v| !v.is_finite()) {
            return Err(ShapeMatchError::InvalidInput(
                "matrix contains non-finite values".to_string(),
            ));
        }
        // Pivot tolerance of each column, scaled by that column alone.
        let tolerances: Vec<f64> = (0..n)
            .map(|c| {
                let scale = (0..n).fold(0.0f64, |m, r| m.max(a[(r, c)].abs()));
                n as f64 * f64::EPSILON * scale
            })
            .collect();

        let mut lu = a.clone();
        let mut pivots: Vec<usize> = (0..n).collect();
        let mut sign = 1.0;

        for k in 0..n {
            // Find the largest remaining entry in column k.
            let mut p = k;
            let mut best = lu[(k, k)].abs();
            for r in k + 1..n {
                let v = lu[(r, k)].abs();
                if v > best {
                    best = v;
                    p = r;
                }
            }
            if best == 0.0 || best <= tolerances[k] {
                return Err(ShapeMatchError::SingularMatrix(format!(
                    "zero pivot in column {k} of a {n}x{n} matrix"
                )));
            }
            if p != k {
                lu.swap_rows(p, k);
                pivots.swap(p, k);
                sign = -sign;
            }

            let pivot = lu[(k, k)];
            for r in k + 1..n {
                let factor = lu[(r, k)] / pivot;
                lu[(r, k)] = factor;
                if factor != 0.0 {
                    for c in k + 1..n {
                        let v = lu[(k, c)];
                        lu[(r, c)] -= factor * v;
                    }
                }
            }
        }

        Ok(LuDecomposition { lu, pivots, sign })
    }

    /// Order of the factorised matrix.
    pub fn size(&self) -> usize {
        self.lu.rows()
    }

    pub fn determinant(&self) -> f64 {
        (0..self.size()).fold(self.sign, |acc, i| acc * self.lu[(i, i)])
    }

    /// Solves `A·X = B` for `X`.
    ///
    /// # Returns
    /// `DimensionMismatch` if `b` does not have as many rows as `A`.
    pub fn solve(&self, b: &Matrix<f64>) -> Result<Matrix<f64>> {
        let n = self.size();
        if b.rows() != n {
            return Err(ShapeMatchError::DimensionMismatch {
                operation: "lu_solve",
                left: (n, n),
                right: b.shape(),
            });
        }
        let m = b.cols();
        let mut x = Matrix::new(n, m);
        for (i, &p) in self.pivots.iter().enumerate() {
            for c in 0..m {
                x[(i, c)] = b[(p, c)];
            }
        }

        // Forward substitution with the unit lower triangle.
        for k in 0..n {
            for r in k + 1..n {
                let factor = self.lu[(r, k)];
                if factor != 0.0 {
                    for c in 0..m {
                        let v = x[(k, c)];
                        x[(r, c)] -= factor * v;
                    }
                }
            }
        }

        // Back substitution with the upper triangle.
        for k in (0..n).rev() {
            let pivot = self.lu[(k, k)];
            for c in 0..m {
                x[(k, c)] /= pivot;
            }
            for r in 0..k {
                let factor = self.lu[(r, k)];
                if factor != 0.0 {
                    for c in 0..m {
                        let v = x[(k, c)];
                        x[(r, c)] -= factor * v;
                    }
                }
            }
        }
        Ok(x)
    }

    /// The inverse `A⁻¹`, solved column by column against the identity.
    pub fn inverse(&self) -> Result<Matrix<f64>> {
        self.solve(&Matrix::identity(self.size()))
    }
}

impl Matrix<f64> {
    /// Returns the inverse of this matrix.
    ///
    /// # Returns
    /// `DimensionMismatch` for non-square input, `SingularMatrix` when no
    /// inverse exists.
    pub fn inverse(&self) -> Result<Matrix<f64>> {
        LuDecomposition::new(self)?.inverse()
    }

    /// Inverts the matrix in place.
    ///
    /// # Returns
    /// `true` on success. On failure (singular or non-square) the matrix is left
    /// untouched and `false` is returned; callers are expected to check.
    pub fn try_invert_in_place(&mut self) -> bool {
        match self.inverse() {
            Ok(inv) => {
                *self = inv;
                true
            }
            Err(_) => false,
        }
    }

    /// Determinant; `0.0` for singular matrices.
    pub fn determinant(&self) -> Result<f64> {
        match LuDecomposition::new(self) {
            Ok(lu) => Ok(lu.determinant()),
            Err(ShapeMatchError::SingularMatrix(_)) => Ok(0.0),
            Err(e) => Err(e),
        }
    }

    /// Solves `self · X = b`.
    pub fn solve(&self, b: &Matrix<f64>) -> Result<Matrix<f64>> {
        LuDecomposition::new(self)?.solve(b)
    }
}
