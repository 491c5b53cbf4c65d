use crate::error::{Result, ShapeMatchError};
use crate::lu_decomposition::LuDecomposition;
use crate::matrix::Matrix;
use crate::point::{CanvasSize, Point};
use crate::warp_field::WarpField;
use log::debug;

/// Fewest landmarks that determine a thin-plate spline with a non-trivial
/// bending part.
pub const MIN_LANDMARKS: usize = 4;

/// The thin-plate radial basis `U(r) = r² ln r`, with `U(0) = 0`.
pub fn radial_basis(r: f64) -> f64 {
    if r <= 0.0 {
        0.0
    } else {
        r * r * r.ln()
    }
}

/// A 2-D thin-plate spline interpolating landmark correspondences.
///
/// The spline maps every `from` landmark exactly onto its `to` landmark and
/// bends the plane in between as little as possible. It consists of an
/// affine part plus one radial weight per landmark, for each output
/// coordinate:
///
/// ```text
///   f(x, y) = a0 + ax·x + ay·y + Σ wᵢ · U(|(x, y) − fromᵢ|)
/// ```
///
/// Coordinates are `(x, y)` = `(column, row)` throughout. Internally the
/// landmarks are centered on their bounding box and scaled into `[-1, 1]`
/// before the kernel is built, which keeps the kernel well conditioned on
/// large canvases. The interpolant itself does not depend on this.
///
/// # Examples
/// ```
/// # use shapematch::point::Point;
/// # use shapematch::thin_plate_spline::ThinPlateSpline;
/// let from = [Point::new(0, 0), Point::new(10, 0), Point::new(10, 10), Point::new(0, 10)];
/// let to: Vec<Point> = from.iter().map(|p| Point::new(p.x + 5, p.y - 2)).collect();
/// let spline = ThinPlateSpline::fit(&from, &to).unwrap();
/// let (x, y) = spline.evaluate(3.0, 4.0);
/// assert!((x - 8.0).abs() < 1e-9 && (y - 2.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct ThinPlateSpline {
    /// Landmarks in normalised coordinates.
    landmarks: Vec<(f64, f64)>,
    /// `(K + 3) × 2`: radial weights, then the affine rows `a0`, `ax`, `ay`.
    weights: Matrix<f64>,
    center: (f64, f64),
    scale: f64,
}

impl ThinPlateSpline {
    /// Solves for the spline taking each `from[i]` to `to[i]`.
    ///
    /// # Returns
    /// - `DimensionMismatch` if the landmark lists differ in length.
    /// - `InsufficientSamples` for fewer than [`MIN_LANDMARKS`] landmarks.
    /// - `SingularMatrix` if the landmarks are degenerate (duplicates, or all
    ///   on one line).
    pub fn fit(from: &[Point], to: &[Point]) -> Result<Self> {
        if from.len() != to.len() {
            return Err(ShapeMatchError::DimensionMismatch {
                operation: "thin_plate_spline",
                left: (from.len(), 2),
                right: (to.len(), 2),
            });
        }
        let k = from.len();
        if k < MIN_LANDMARKS {
            return Err(ShapeMatchError::InsufficientSamples {
                requested: MIN_LANDMARKS,
                available: k,
            });
        }

        let (center, scale) = normalization(from);
        let landmarks: Vec<(f64, f64)> = from
            .iter()
            .map(|p| ((p.x as f64 - center.0) / scale, (p.y as f64 - center.1) / scale))
            .collect();

        // Build the kernel [[U, P], [Pᵀ, 0]] with P's rows [1, x, y].
        let mut kernel = Matrix::new(k + 3, k + 3);
        for (i, &(xi, yi)) in landmarks.iter().enumerate() {
            for (j, &(xj, yj)) in landmarks.iter().enumerate().skip(i + 1) {
                let u = radial_basis((xi - xj).hypot(yi - yj));
                kernel[(i, j)] = u;
                kernel[(j, i)] = u;
            }
            for (c, v) in [1.0, xi, yi].into_iter().enumerate() {
                kernel[(i, k + c)] = v;
                kernel[(k + c, i)] = v;
            }
        }

        let mut target = Matrix::new(k + 3, 2);
        for (i, p) in to.iter().enumerate() {
            target[(i, 0)] = p.x as f64;
            target[(i, 1)] = p.y as f64;
        }

        let inverse = LuDecomposition::new(&kernel)
            .map_err(|e| match e {
                ShapeMatchError::SingularMatrix(_) => ShapeMatchError::SingularMatrix(format!(
                    "thin-plate kernel for {k} landmarks is not invertible"
                )),
                other => other,
            })?
            .inverse()?;
        let weights = inverse.mul(&target)?;
        debug!("tps: fitted {k} landmarks, scale {scale}");

        Ok(ThinPlateSpline {
            landmarks,
            weights,
            center,
            scale,
        })
    }

    /// Fits the spline and materialises it over `canvas`.
    pub fn calculate(from: &[Point], to: &[Point], canvas: CanvasSize) -> Result<WarpField> {
        Ok(Self::fit(from, to)?.warp_field(canvas))
    }

    pub fn landmark_count(&self) -> usize {
        self.landmarks.len()
    }

    /// The affine part as `[[a0x, a0y], [axx, axy], [ayx, ayy]]`, acting on
    /// normalised coordinates (see [`ThinPlateSpline::normalize`]).
    pub fn affine_part(&self) -> [[f64; 2]; 3] {
        let k = self.landmarks.len();
        let row = |r: usize| [self.weights[(r, 0)], self.weights[(r, 1)]];
        [row(k), row(k + 1), row(k + 2)]
    }

    /// Radial weight of landmark `i` for each output coordinate.
    pub fn radial_weight(&self, i: usize) -> (f64, f64) {
        (self.weights[(i, 0)], self.weights[(i, 1)])
    }

    /// Maps a pixel coordinate into the frame the kernel was built in.
    pub fn normalize(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.center.0) / self.scale, (y - self.center.1) / self.scale)
    }

    /// Evaluates the spline at `(x, y)`.
    pub fn evaluate(&self, x: f64, y: f64) -> (f64, f64) {
        let (x, y) = self.normalize(x, y);
        let [a0, ax, ay] = self.affine_part();
        let mut out_x = a0[0] + ax[0] * x + ay[0] * y;
        let mut out_y = a0[1] + ax[1] * x + ay[1] * y;
        for (i, &(lx, ly)) in self.landmarks.iter().enumerate() {
            let u = radial_basis((x - lx).hypot(y - ly));
            if u != 0.0 {
                out_x += self.weights[(i, 0)] * u;
                out_y += self.weights[(i, 1)] * u;
            }
        }
        (out_x, out_y)
    }

    /// Evaluates the spline at every pixel of `canvas`.
    pub fn warp_field(self, canvas: CanvasSize) -> WarpField {
        WarpField::from_spline(self, canvas)
    }
}

/// Bounding-box center and half the larger side (`1` for a single spot).
fn normalization(points: &[Point]) -> ((f64, f64), f64) {
    let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
    let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let center = ((min_x as f64 + max_x as f64) / 2.0, (min_y as f64 + max_y as f64) / 2.0);
    let half_side = (max_x as f64 - min_x as f64).max(max_y as f64 - min_y as f64) / 2.0;
    (center, if half_side > 0.0 { half_side } else { 1.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> Vec<Point> {
        vec![
            Point::new(10, 10),
            Point::new(40, 10),
            Point::new(40, 40),
            Point::new(10, 40),
            Point::new(25, 20),
        ]
    }

    #[test]
    fn test_radial_basis() {
        assert_eq!(radial_basis(0.0), 0.0);
        assert_eq!(radial_basis(1.0), 0.0);
        assert_relative_eq!(radial_basis(std::f64::consts::E), std::f64::consts::E.powi(2), epsilon = 1e-12);
    }

    #[test]
    fn test_identity_when_landmarks_coincide() {
        let pts = square();
        let spline = ThinPlateSpline::fit(&pts, &pts).unwrap();
        for i in 0..pts.len() {
            let (wx, wy) = spline.radial_weight(i);
            assert!(wx.abs() < 1e-9 && wy.abs() < 1e-9);
        }
        let (x, y) = spline.evaluate(17.0, 33.0);
        assert_relative_eq!(x, 17.0, epsilon = 1e-9);
        assert_relative_eq!(y, 33.0, epsilon = 1e-9);
    }

    #[test]
    fn test_interpolates_landmarks() {
        let from = square();
        let to: Vec<Point> = from
            .iter()
            .enumerate()
            .map(|(i, p)| Point::new(p.x + (i as i32 % 3), p.y - (i as i32 % 2) * 4))
            .collect();
        let spline = ThinPlateSpline::fit(&from, &to).unwrap();
        for (f, t) in from.iter().zip(&to) {
            let (x, y) = spline.evaluate(f.x as f64, f.y as f64);
            assert_relative_eq!(x, t.x as f64, epsilon = 1e-6);
            assert_relative_eq!(y, t.y as f64, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_rejects_too_few_landmarks() {
        let all = square();
        let pts = &all[..3];
        assert_eq!(
            ThinPlateSpline::fit(pts, pts).unwrap_err(),
            ShapeMatchError::InsufficientSamples { requested: 4, available: 3 }
        );
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let pts = square();
        assert!(matches!(
            ThinPlateSpline::fit(&pts, &pts[..4]),
            Err(ShapeMatchError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_many_landmarks_on_a_large_canvas() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        use std::collections::HashSet;

        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = HashSet::new();
        let mut from = Vec::new();
        while from.len() < 150 {
            let p = Point::new(rng.random_range(0..3000), rng.random_range(0..3000));
            if seen.insert(p) {
                from.push(p);
            }
        }
        let to: Vec<Point> = from
            .iter()
            .map(|p| Point::new(p.x + rng.random_range(-20..=20), p.y + rng.random_range(-20..=20)))
            .collect();

        let spline = ThinPlateSpline::fit(&from, &to).unwrap();
        for (f, t) in from.iter().zip(&to) {
            let (x, y) = spline.evaluate(f.x as f64, f.y as f64);
            assert!((x - t.x as f64).abs() < 1e-3, "x {x} vs {}", t.x);
            assert!((y - t.y as f64).abs() < 1e-3, "y {y} vs {}", t.y);
        }
    }

    #[test]
    fn test_collinear_landmarks_are_singular() {
        let line: Vec<Point> = (0..6).map(|i| Point::new(10 * i, 7)).collect();
        assert!(matches!(
            ThinPlateSpline::fit(&line, &line),
            Err(ShapeMatchError::SingularMatrix(_))
        ));
    }

    #[test]
    fn test_duplicate_landmarks_are_singular() {
        let mut pts = square();
        pts[4] = pts[0];
        assert!(matches!(
            ThinPlateSpline::fit(&pts, &pts),
            Err(ShapeMatchError::SingularMatrix(_))
        ));
    }
}
