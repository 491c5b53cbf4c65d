use crate::error::{Result, ShapeMatchError};
use crate::point::Point;
use crate::shape_context_descriptor::ShapeContextDescriptor;
use std::f64::consts::PI;

/// Inner edge of the radial range, in units of the normalising distance.
const INNER_RADIUS: f64 = 0.125;
/// Outer edge of the radial range. Points farther away are not counted.
const OUTER_RADIUS: f64 = 2.0;

/// Builds log-polar shape-context descriptors for every point of a set.
///
/// For each ordered pair of distinct points the offset is converted to polar
/// form. Angles are quantised into `angular_bins` equal sectors of `[0, 2π)`.
/// Distances are divided by twice the mean pairwise distance of the set (which
/// makes descriptors scale invariant) and quantised against `radial_bins`
/// edges spaced logarithmically between `0.125` and `2.0`: a distance goes to
/// the first bin whose edge it is below, and is dropped if it reaches the
/// last edge.
///
/// Each unordered pair is measured once and counted from both ends, so every
/// descriptor sees all other points and never its own.
///
/// # Examples
/// ```
/// # use shapematch::shape_context_builder::ShapeContextBuilder;
/// # use shapematch::point::Point;
/// let builder = ShapeContextBuilder::new(12, 5).unwrap();
/// let square = [Point::new(0, 0), Point::new(10, 0), Point::new(10, 10), Point::new(0, 10)];
/// let descriptors = builder.build(&square);
/// assert_eq!(descriptors.len(), 4);
/// assert_eq!(descriptors[0].total(), 3.0);
/// ```
#[derive(Debug, Clone)]
pub struct ShapeContextBuilder {
    angular_bins: usize,
    radial_bins: usize,
    radial_edges: Vec<f64>,
}

impl ShapeContextBuilder {
    /// Creates a builder.
    ///
    /// # Returns
    /// `InvalidInput` if either bin count is zero.
    pub fn new(angular_bins: usize, radial_bins: usize) -> Result<Self> {
        if angular_bins == 0 || radial_bins == 0 {
            return Err(ShapeMatchError::InvalidInput(format!(
                "shape context needs at least one bin, got {angular_bins} angular and {radial_bins} radial"
            )));
        }
        Ok(ShapeContextBuilder {
            angular_bins,
            radial_bins,
            radial_edges: log_space(INNER_RADIUS.log10(), OUTER_RADIUS.log10(), radial_bins),
        })
    }

    pub fn get_angular_bins(&self) -> usize {
        self.angular_bins
    }

    pub fn get_radial_bins(&self) -> usize {
        self.radial_bins
    }

    /// Upper edges of the radial bins, ascending.
    pub fn get_radial_edges(&self) -> &[f64] {
        &self.radial_edges
    }

    /// Builds one descriptor per point, in input order.
    pub fn build(&self, points: &[Point]) -> Vec<ShapeContextDescriptor> {
        let n = points.len();
        let mut descriptors = vec![ShapeContextDescriptor::new(self.radial_bins, self.angular_bins); n];
        let normalizer = 2.0 * mean_pairwise_distance(points);

        for i in 0..n {
            for j in i + 1..n {
                let dx = (points[j].x - points[i].x) as f64;
                let dy = (points[j].y - points[i].y) as f64;
                let mut distance = dx.hypot(dy);
                if normalizer > 0.0 {
                    distance /= normalizer;
                }
                let Some(radial) = self.radial_bin(distance) else {
                    continue;
                };
                let forward = dy.atan2(dx);
                descriptors[i].increment(radial, self.angular_bin(forward));
                descriptors[j].increment(radial, self.angular_bin(forward + PI));
            }
        }
        descriptors
    }

    /// The radial bin of a normalised distance, or `None` beyond the outer edge.
    fn radial_bin(&self, distance: f64) -> Option<usize> {
        self.radial_edges.iter().position(|&edge| distance < edge)
    }

    fn angular_bin(&self, angle: f64) -> usize {
        let angle = angle.rem_euclid(2.0 * PI);
        let sector = 2.0 * PI / self.angular_bins as f64;
        ((angle / sector).floor() as usize).min(self.angular_bins - 1)
    }
}

/// Mean Euclidean distance over all unordered pairs; zero for fewer than two points.
pub fn mean_pairwise_distance(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        for j in i + 1..n {
            sum += points[i].distance_to(&points[j]);
        }
    }
    sum / (n * (n - 1) / 2) as f64
}

/// `count` values whose base-10 logarithms are evenly spaced from `low` to `high`.
fn log_space(low: f64, high: f64, count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![10f64.powf(high)];
    }
    let step = (high - low) / (count - 1) as f64;
    (0..count)
        .map(|k| 10f64.powf(low + step * k as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_radial_edges_span_range() {
        let builder = ShapeContextBuilder::new(12, 5).unwrap();
        let edges = builder.get_radial_edges();
        assert_eq!(edges.len(), 5);
        assert_relative_eq!(edges[0], 0.125, epsilon = 1e-12);
        assert_relative_eq!(edges[2], 0.5, epsilon = 1e-12);
        assert_relative_eq!(edges[4], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_bins_rejected() {
        assert!(ShapeContextBuilder::new(0, 5).is_err());
        assert!(ShapeContextBuilder::new(12, 0).is_err());
    }

    #[test]
    fn test_every_point_sees_every_other_point() {
        let builder = ShapeContextBuilder::new(8, 4).unwrap();
        let points: Vec<Point> = (0..6).map(|i| Point::new(i * 3, (i * i) % 7)).collect();
        let descriptors = builder.build(&points);
        for d in &descriptors {
            assert_eq!(d.radial_bins(), 4);
            assert_eq!(d.angular_bins(), 8);
            // No pair is four times farther apart than the mean distance.
            assert_eq!(d.total(), 5.0);
        }
    }

    #[test]
    fn test_opposite_directions_use_opposite_sectors() {
        let builder = ShapeContextBuilder::new(4, 2).unwrap();
        let descriptors = builder.build(&[Point::new(0, 0), Point::new(10, 0)]);
        // Two points: distance equals the mean, normalised to 0.5.
        let radial = 1;
        assert_eq!(descriptors[0].count(radial, 0), 1.0);
        assert_eq!(descriptors[1].count(radial, 2), 1.0);
    }

    #[test]
    fn test_bins_are_sensitive_to_shape() {
        let builder = ShapeContextBuilder::new(12, 5).unwrap();
        let square = [Point::new(0, 0), Point::new(10, 0), Point::new(10, 10), Point::new(0, 10)];
        let d = builder.build(&square);
        assert!(d[0].chi_squared_cost(&d[2]).unwrap() > 0.0);
        assert_eq!(d[1].chi_squared_cost(&d[1]).unwrap(), 0.0);
    }

    #[test]
    fn test_mean_pairwise_distance() {
        let pts = [Point::new(0, 0), Point::new(3, 4), Point::new(6, 8)];
        assert_relative_eq!(mean_pairwise_distance(&pts), 20.0 / 3.0);
        assert_eq!(mean_pairwise_distance(&pts[..1]), 0.0);
    }
}
