use crate::error::{Result, ShapeMatchError};
use crate::matrix::Matrix;
use crate::symmetric_eigen::SymmetricEigen;
use std::f64::consts::PI;

/// Sample covariance of an already centered `M × N` data matrix (one variable
/// per row, one observation per column), using the unbiased `N - 1` divisor.
///
/// # Returns
/// `InsufficientSamples` when fewer than two observations are given.
pub fn covariance(centered: &Matrix<f64>) -> Result<Matrix<f64>> {
    let n = centered.cols();
    if n < 2 {
        return Err(ShapeMatchError::InsufficientSamples {
            requested: 2,
            available: n,
        });
    }
    Ok(centered.mul(&centered.transpose())?.divide((n - 1) as f64))
}

/// Principal component analysis of a 2-D point set stored as a `2 × N` matrix.
///
/// Holds every intermediate result so that callers (and the alignment built on
/// top of it) can inspect the per-axis means, the covariance, and the principal
/// axes.
#[derive(Debug, Clone)]
pub struct PcaTransform {
    /// Per-row means as a `2 × 1` column vector (the centroid).
    pub averages: Matrix<f64>,
    /// The input with the centroid subtracted.
    pub centered: Matrix<f64>,
    pub covariance: Matrix<f64>,
    /// Ascending: index 0 is the minor axis, index 1 the major axis.
    pub eigenvalues: Vec<f64>,
    /// Unit eigenvectors as columns, ordered like `eigenvalues`.
    pub eigenvectors: Matrix<f64>,
}

impl PcaTransform {
    /// Runs PCA over `points` (`2 × N`).
    ///
    /// # Returns
    /// - `DimensionMismatch` if `points` does not have two rows.
    /// - `InsufficientSamples` for fewer than two points.
    pub fn calculate(points: &Matrix<f64>) -> Result<Self> {
        if points.rows() != 2 {
            return Err(ShapeMatchError::DimensionMismatch {
                operation: "pca",
                left: points.shape(),
                right: (2, points.cols()),
            });
        }
        let averages = points.row_means();
        let centered = points.sub_column_vector(&averages)?;
        let covariance = covariance(&centered)?;
        let eigen = SymmetricEigen::new(&covariance)?;
        Ok(PcaTransform {
            averages,
            centered,
            covariance,
            eigenvalues: eigen.eigenvalues,
            eigenvectors: eigen.eigenvectors,
        })
    }

    pub fn centroid(&self) -> (f64, f64) {
        (self.averages[(0, 0)], self.averages[(1, 0)])
    }

    /// Variance along the major axis.
    pub fn major_variance(&self) -> f64 {
        self.eigenvalues[1]
    }

    /// Variance along the minor axis.
    pub fn minor_variance(&self) -> f64 {
        self.eigenvalues[0]
    }

    /// Direction of the major axis, in `[0, π)`.
    ///
    /// An eigenvector and its negation describe the same axis, so the angle is
    /// only defined modulo π.
    pub fn principal_angle(&self) -> f64 {
        let vx = self.eigenvectors[(0, 1)];
        let vy = self.eigenvectors[(1, 1)];
        normalize_half_turn(vy.atan2(vx))
    }
}

/// Angles this close below `π` are treated as a full half-turn, i.e. `0`.
const HALF_TURN_TOLERANCE: f64 = 1e-9;

/// Maps an angle into `[0, π)`.
pub(crate) fn normalize_half_turn(angle: f64) -> f64 {
    let a = angle.rem_euclid(PI);
    if a >= PI - HALF_TURN_TOLERANCE {
        0.0
    } else {
        a
    }
}
