use crate::error::{Result, ShapeMatchError};
use crate::matrix::Matrix;

/// A log-polar histogram describing where the other points of a set lie as
/// seen from one point.
///
/// Rows are radial bins (nearest first), columns are angular bins
/// (counter-clockwise from the positive x axis). Each cell counts the points
/// that fall into it.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeContextDescriptor {
    counts: Matrix<f64>,
}

impl ShapeContextDescriptor {
    /// Creates an empty descriptor with the given bin counts.
    pub fn new(radial_bins: usize, angular_bins: usize) -> Self {
        ShapeContextDescriptor {
            counts: Matrix::new(radial_bins, angular_bins),
        }
    }

    pub fn radial_bins(&self) -> usize {
        self.counts.rows()
    }

    pub fn angular_bins(&self) -> usize {
        self.counts.cols()
    }

    /// Adds one point to cell `(radial, angular)`.
    pub fn increment(&mut self, radial: usize, angular: usize) {
        self.counts[(radial, angular)] += 1.0;
    }

    /// The count in cell `(radial, angular)`.
    pub fn count(&self, radial: usize, angular: usize) -> f64 {
        self.counts[(radial, angular)]
    }

    /// Number of points that landed in any cell.
    pub fn total(&self) -> f64 {
        self.counts.sum()
    }

    pub fn counts(&self) -> &Matrix<f64> {
        &self.counts
    }

    /// The histogram scaled to sum to one. An empty histogram stays all-zero.
    pub fn normalized(&self) -> Matrix<f64> {
        let total = self.total();
        if total > 0.0 {
            self.counts.divide(total)
        } else {
            self.counts.clone()
        }
    }

    /// χ² distance between the normalised histograms:
    /// `½ Σ (a − b)² / (a + b)` over cells where `a + b > 0`.
    ///
    /// The result lies in `[0, 1]`; identical shapes score zero.
    ///
    /// # Returns
    /// `DimensionMismatch` if the two descriptors use different binning.
    ///
    /// # Examples
    /// ```
    /// # use shapematch::shape_context_descriptor::ShapeContextDescriptor;
    /// let mut a = ShapeContextDescriptor::new(2, 2);
    /// let mut b = ShapeContextDescriptor::new(2, 2);
    /// a.increment(0, 0);
    /// b.increment(1, 1);
    /// assert_eq!(a.chi_squared_cost(&a).unwrap(), 0.0);
    /// assert_eq!(a.chi_squared_cost(&b).unwrap(), 1.0);
    /// ```
    pub fn chi_squared_cost(&self, other: &ShapeContextDescriptor) -> Result<f64> {
        if self.counts.shape() != other.counts.shape() {
            return Err(ShapeMatchError::DimensionMismatch {
                operation: "chi_squared_cost",
                left: self.counts.shape(),
                right: other.counts.shape(),
            });
        }
        let a = self.normalized();
        let b = other.normalized();
        let cost = a
            .as_slice()
            .iter()
            .zip(b.as_slice())
            .filter(|(x, y)| **x + **y > 0.0)
            .map(|(x, y)| (x - y).powi(2) / (x + y))
            .sum::<f64>();
        Ok(0.5 * cost)
    }
}

/// Pairwise χ² costs between two equally sized descriptor sets.
///
/// Cell `(i, j)` is the cost of matching `source[i]` with `target[j]`.
///
/// # Returns
/// `DimensionMismatch` if the sets differ in length or binning.
pub fn cost_matrix(
    source: &[ShapeContextDescriptor],
    target: &[ShapeContextDescriptor],
) -> Result<Matrix<f64>> {
    if source.len() != target.len() {
        return Err(ShapeMatchError::DimensionMismatch {
            operation: "cost_matrix",
            left: (source.len(), 1),
            right: (target.len(), 1),
        });
    }
    let n = source.len();
    let mut costs = Matrix::new(n, n);
    for (i, s) in source.iter().enumerate() {
        for (j, t) in target.iter().enumerate() {
            costs[(i, j)] = s.chi_squared_cost(t)?;
        }
    }
    Ok(costs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn descriptor(cells: &[(usize, usize)]) -> ShapeContextDescriptor {
        let mut d = ShapeContextDescriptor::new(3, 4);
        for &(r, a) in cells {
            d.increment(r, a);
        }
        d
    }

    #[test]
    fn test_cost_is_symmetric_and_bounded() {
        let a = descriptor(&[(0, 0), (1, 1), (1, 1)]);
        let b = descriptor(&[(0, 0), (2, 3)]);
        let ab = a.chi_squared_cost(&b).unwrap();
        assert_relative_eq!(ab, b.chi_squared_cost(&a).unwrap());
        assert!(ab > 0.0 && ab <= 1.0);
    }

    #[test]
    fn test_cost_ignores_scale_of_counts() {
        let a = descriptor(&[(0, 0), (1, 2)]);
        let b = descriptor(&[(0, 0), (0, 0), (1, 2), (1, 2)]);
        assert_relative_eq!(a.chi_squared_cost(&b).unwrap(), 0.0);
    }

    #[test]
    fn test_empty_descriptors_compare_as_zero() {
        let empty = ShapeContextDescriptor::new(3, 4);
        assert_eq!(empty.chi_squared_cost(&empty).unwrap(), 0.0);
        assert_eq!(empty.chi_squared_cost(&descriptor(&[(2, 2)])).unwrap(), 0.5);
    }

    #[test]
    fn test_mismatched_binning() {
        let a = ShapeContextDescriptor::new(3, 4);
        let b = ShapeContextDescriptor::new(4, 3);
        assert!(a.chi_squared_cost(&b).is_err());
    }

    #[test]
    fn test_cost_matrix_shape() {
        let set = vec![descriptor(&[(0, 0)]), descriptor(&[(1, 1)])];
        let costs = cost_matrix(&set, &set).unwrap();
        assert_eq!(costs.shape(), (2, 2));
        assert_eq!(costs[(0, 0)], 0.0);
        assert_eq!(costs[(0, 1)], 1.0);
        assert!(cost_matrix(&set, &set[..1]).is_err());
    }
}
