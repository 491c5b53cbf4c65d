use crate::error::{Result, ShapeMatchError};
use crate::matrix::Matrix;
use crate::point::Point;

/// Represents a 2D affine transformation. It includes:
/// - A reference origin (`origin_x`, `origin_y`) in the input space.
/// - A 2×2 linear transform matrix (`a11`, `a12`, `a21`, `a22`).
/// - A translation offset (`translate_x`, `translate_y`) in the output space.
///
/// A point `(x, y)` is transformed into `(X, Y)` by:
///
/// ```text
///   let dx = x - origin_x;
///   let dy = y - origin_y;
///   X = (dx * a11) + (dy * a12) + translate_x;
///   Y = (dx * a21) + (dy * a22) + translate_y;
/// ```
///
/// Global PCA alignment produces one of these: the origin is the centroid of
/// the set being moved, the translation is the centroid of the reference set.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AffineTransform {
    /// Reference x-coordinate (the "origin" in the input space).
    pub origin_x: f64,

    /// Reference y-coordinate (the "origin" in the input space).
    pub origin_y: f64,

    /// Translation offset in the transformed space (x-direction).
    pub translate_x: f64,

    /// Translation offset in the transformed space (y-direction).
    pub translate_y: f64,

    /// Matrix entry: row 1, col 1.
    pub a11: f64,

    /// Matrix entry: row 1, col 2.
    pub a12: f64,

    /// Matrix entry: row 2, col 1.
    pub a21: f64,

    /// Matrix entry: row 2, col 2.
    pub a22: f64,
}

impl Default for AffineTransform {
    /// The identity transform.
    fn default() -> Self {
        AffineTransform {
            origin_x: 0.0,
            origin_y: 0.0,
            translate_x: 0.0,
            translate_y: 0.0,
            a11: 1.0,
            a12: 0.0,
            a21: 0.0,
            a22: 1.0,
        }
    }
}

impl AffineTransform {
    /// A pure counter-clockwise rotation by `angle` radians about the origin.
    ///
    /// # Examples
    /// ```
    /// # use shapematch::affine_transform::AffineTransform;
    /// let t = AffineTransform::rotation(std::f64::consts::FRAC_PI_2);
    /// let (x, y) = t.transform(1.0, 0.0);
    /// assert!(x.abs() < 1e-12 && (y - 1.0).abs() < 1e-12);
    /// ```
    pub fn rotation(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        AffineTransform {
            a11: cos,
            a12: -sin,
            a21: sin,
            a22: cos,
            ..Default::default()
        }
    }

    /// Builds a transform from a 2×2 linear part plus origin and translation.
    ///
    /// # Returns
    /// `DimensionMismatch` if `linear` is not 2×2.
    pub fn from_linear(linear: &Matrix<f64>, origin: (f64, f64), translate: (f64, f64)) -> Result<Self> {
        if linear.shape() != (2, 2) {
            return Err(ShapeMatchError::DimensionMismatch {
                operation: "affine_from_linear",
                left: linear.shape(),
                right: (2, 2),
            });
        }
        Ok(AffineTransform {
            origin_x: origin.0,
            origin_y: origin.1,
            translate_x: translate.0,
            translate_y: translate.1,
            a11: linear[(0, 0)],
            a12: linear[(0, 1)],
            a21: linear[(1, 0)],
            a22: linear[(1, 1)],
        })
    }

    /// The 2×2 linear part as a matrix.
    pub fn linear(&self) -> Matrix<f64> {
        let mut m = Matrix::new(2, 2);
        m[(0, 0)] = self.a11;
        m[(0, 1)] = self.a12;
        m[(1, 0)] = self.a21;
        m[(1, 1)] = self.a22;
        m
    }

    /// Transform a point (x, y) according to this affine transform.
    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        // Compute the offset from the origin
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;

        // Apply the transform matrix and add the translation
        let tx = self.a11 * dx + self.a12 * dy + self.translate_x;
        let ty = self.a21 * dx + self.a22 * dy + self.translate_y;

        (tx, ty)
    }

    /// Transforms an integer point, rounding the result to the nearest pixel.
    pub fn transform_point(&self, p: &Point) -> Point {
        let (x, y) = self.transform(p.x as f64, p.y as f64);
        Point::from_f64(x, y)
    }

    /// Transforms every point of a set.
    pub fn transform_points(&self, points: &[Point]) -> Vec<Point> {
        points.iter().map(|p| self.transform_point(p)).collect()
    }

    /// Magnitudes of the two rows of the linear part, i.e. the effective
    /// scale along x and y.
    pub fn row_scales(&self) -> (f64, f64) {
        (self.a11.hypot(self.a12), self.a21.hypot(self.a22))
    }
}
