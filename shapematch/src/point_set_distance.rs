use crate::error::{Result, ShapeMatchError};
use crate::point::Point;
use kd_tree::KdTree;

/// Scores how far apart two point sets are. Smaller is better.
///
/// The iterative matcher uses one of these to decide whether a warp improved
/// on the best result so far.
pub trait PointSetDistance {
    fn distance(&self, reference: &[Point], candidate: &[Point]) -> Result<f64>;
}

/// Sum of the distances between points with the same index.
///
/// Only meaningful when both sets are in correspondence order.
#[derive(Debug, Default, Clone, Copy)]
pub struct IndexedEuclidean;

impl PointSetDistance for IndexedEuclidean {
    fn distance(&self, reference: &[Point], candidate: &[Point]) -> Result<f64> {
        if reference.len() != candidate.len() {
            return Err(ShapeMatchError::DimensionMismatch {
                operation: "indexed_euclidean",
                left: (reference.len(), 2),
                right: (candidate.len(), 2),
            });
        }
        Ok(reference
            .iter()
            .zip(candidate)
            .map(|(a, b)| a.distance_to(b))
            .sum())
    }
}

/// Symmetric mean nearest-neighbour distance (a chamfer distance).
///
/// For each point of either set the distance to the closest point of the
/// other set is found with a [`KdTree`]; the result is the mean over both
/// directions. Works for sets of different sizes and in any order.
///
/// # Examples
/// ```
/// # use shapematch::point::Point;
/// # use shapematch::point_set_distance::{NearestNeighborDistance, PointSetDistance};
/// let a = [Point::new(0, 0), Point::new(10, 0)];
/// let b = [Point::new(10, 0), Point::new(0, 3)];
/// let d = NearestNeighborDistance.distance(&a, &b).unwrap();
/// assert!((d - 1.5).abs() < 1e-12);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct NearestNeighborDistance;

impl NearestNeighborDistance {
    fn directed_sum(tree: &KdTree<Point>, queries: &[Point]) -> f64 {
        queries
            .iter()
            .filter_map(|q| tree.nearest(q))
            .map(|found| (found.squared_distance as f64).sqrt())
            .sum()
    }
}

impl PointSetDistance for NearestNeighborDistance {
    fn distance(&self, reference: &[Point], candidate: &[Point]) -> Result<f64> {
        if reference.is_empty() || candidate.is_empty() {
            return Err(ShapeMatchError::InsufficientSamples {
                requested: 1,
                available: 0,
            });
        }
        let reference_tree = KdTree::build(reference.to_vec());
        let candidate_tree = KdTree::build(candidate.to_vec());
        let total = Self::directed_sum(&reference_tree, candidate)
            + Self::directed_sum(&candidate_tree, reference);
        Ok(total / (reference.len() + candidate.len()) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_indexed_euclidean() {
        let a = [Point::new(0, 0), Point::new(1, 1)];
        let b = [Point::new(3, 4), Point::new(1, 1)];
        assert_relative_eq!(IndexedEuclidean.distance(&a, &b).unwrap(), 5.0);
        assert!(IndexedEuclidean.distance(&a, &b[..1]).is_err());
    }

    #[test]
    fn test_nearest_neighbor_ignores_order() {
        let a: Vec<Point> = (0..20).map(|i| Point::new(i, 2 * i)).collect();
        let mut b = a.clone();
        b.reverse();
        assert_eq!(NearestNeighborDistance.distance(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_nearest_neighbor_shift() {
        let a: Vec<Point> = (0..5).map(|i| Point::new(10 * i, 0)).collect();
        let b: Vec<Point> = a.iter().map(|p| Point::new(p.x, 2)).collect();
        assert_relative_eq!(NearestNeighborDistance.distance(&a, &b).unwrap(), 2.0);
        assert!(NearestNeighborDistance.distance(&a, &[]).is_err());
    }
}
