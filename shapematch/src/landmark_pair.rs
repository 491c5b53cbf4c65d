//! Landmark pair type for correspondence matching

use crate::matching_config::OutlierMetric;
use crate::point::{CanvasSize, Point};

/// A pair of corresponding landmarks: a source point and the target point it
/// was matched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LandmarkPair(pub Point, pub Point);

impl LandmarkPair {
    /// Create a new landmark pair
    pub fn new(source: Point, target: Point) -> Self {
        Self(source, target)
    }

    /// Get the source landmark
    pub fn source(&self) -> Point {
        self.0
    }

    /// Get the target landmark
    pub fn target(&self) -> Point {
        self.1
    }

    /// Get both landmarks as a tuple
    pub fn as_tuple(&self) -> (Point, Point) {
        (self.0, self.1)
    }

    /// Distance between the two landmarks.
    pub fn length(&self) -> f64 {
        self.0.distance_to(&self.1)
    }

    /// Whether the pair has no displacement.
    pub fn is_fixed(&self) -> bool {
        self.0 == self.1
    }
}

/// Replaces implausibly long pairs with zero-displacement pairs by moving the
/// target landmark onto the source landmark.
///
/// The threshold is `percent` of the canvas diagonal for
/// [`OutlierMetric::Euclidean`]. For [`OutlierMetric::PerAxis`] each
/// coordinate is checked on its own against `percent` of the canvas width (x)
/// or height (y), and only the offending coordinate is replaced. A `percent`
/// of zero disables filtering.
///
/// # Returns
/// How many pairs were changed.
///
/// # Examples
/// ```
/// # use shapematch::landmark_pair::{replace_outliers, LandmarkPair};
/// # use shapematch::matching_config::OutlierMetric;
/// # use shapematch::point::{CanvasSize, Point};
/// let mut pairs = vec![
///     LandmarkPair::new(Point::new(0, 0), Point::new(3, 0)),
///     LandmarkPair::new(Point::new(50, 50), Point::new(90, 50)),
/// ];
/// let changed = replace_outliers(&mut pairs, 10.0, OutlierMetric::Euclidean, CanvasSize::new(100, 100));
/// assert_eq!(changed, 1);
/// assert!(pairs[1].is_fixed());
/// ```
pub fn replace_outliers(
    pairs: &mut [LandmarkPair],
    percent: f64,
    metric: OutlierMetric,
    canvas: CanvasSize,
) -> usize {
    if percent <= 0.0 {
        return 0;
    }
    let mut changed = 0;
    match metric {
        OutlierMetric::Euclidean => {
            let threshold = canvas.diagonal() / 100.0 * percent;
            for pair in pairs.iter_mut() {
                if pair.length() > threshold {
                    pair.1 = pair.0;
                    changed += 1;
                }
            }
        }
        OutlierMetric::PerAxis => {
            let threshold_x = canvas.width as f64 / 100.0 * percent;
            let threshold_y = canvas.height as f64 / 100.0 * percent;
            for pair in pairs.iter_mut() {
                let mut moved = false;
                if ((pair.1.x - pair.0.x) as f64).abs() > threshold_x {
                    pair.1.x = pair.0.x;
                    moved = true;
                }
                if ((pair.1.y - pair.0.y) as f64).abs() > threshold_y {
                    pair.1.y = pair.0.y;
                    moved = true;
                }
                if moved {
                    changed += 1;
                }
            }
        }
    }
    changed
}

/// Splits pairs into `(sources, targets)`.
pub fn unzip_pairs(pairs: &[LandmarkPair]) -> (Vec<Point>, Vec<Point>) {
    pairs.iter().map(|p| p.as_tuple()).unzip()
}
