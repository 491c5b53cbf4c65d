use crate::affine_transform::AffineTransform;
use crate::error::{Result, ShapeMatchError};
use crate::matrix::Matrix;
use crate::pca_transform::{normalize_half_turn, PcaTransform};
use crate::point::{points_to_matrix, Point};
use log::debug;

/// Relative variance below which a principal axis is considered degenerate.
const MIN_RELATIVE_VARIANCE: f64 = 1e-12;

/// Outcome of a global PCA alignment of a target set onto a source set.
#[derive(Debug, Clone)]
pub struct PcaAlignment {
    /// The aligned target as a `2 × N` matrix, unrounded.
    pub aligned: Matrix<f64>,
    /// The transform that produced `aligned` from the target.
    pub transform: AffineTransform,
    /// How far the target's major axis is rotated from the source's, in `[0, π)`.
    pub angle_from_source: f64,
    /// How much larger the target is than the source along the major axis.
    pub x_scale_from_source: f64,
    /// How much larger the target is than the source along the minor axis.
    pub y_scale_from_source: f64,
    pub source_pca: PcaTransform,
    pub target_pca: PcaTransform,
}

impl PcaAlignment {
    /// The aligned target rounded to pixels.
    pub fn aligned_points(&self) -> Vec<Point> {
        (0..self.aligned.cols())
            .map(|i| Point::from_f64(self.aligned[(0, i)], self.aligned[(1, i)]))
            .collect()
    }
}

/// Global alignment of two point sets by matching their principal axes.
///
/// The target is centered, rotated so its major axis lies on the source's
/// major axis, scaled along the source's principal axes so the variances match,
/// and moved onto the source centroid. The major axis is reported as "x" and
/// the minor axis as "y".
///
/// Axes are sign-ambiguous, so the result can be the source shape mirrored
/// through its centroid (a half-turn) for asymmetric inputs.
///
/// # Examples
/// ```
/// # use shapematch::pca_matching::PcaMatching;
/// # use shapematch::point::Point;
/// let source: Vec<Point> = (0..20).map(|i| Point::new(i, i % 3)).collect();
/// let target: Vec<Point> = source.iter().map(|p| Point::new(p.x + 40, p.y + 7)).collect();
/// let alignment = PcaMatching::align(&source, &target).unwrap();
/// assert!((alignment.x_scale_from_source - 1.0).abs() < 1e-9);
/// assert_eq!(alignment.aligned_points(), source);
/// ```
pub struct PcaMatching;

impl PcaMatching {
    /// Aligns `target` onto `source`.
    ///
    /// # Returns
    /// - `InsufficientSamples` if either set has fewer than two points.
    /// - `SingularMatrix` if either set has no spread along a principal axis
    ///   (all points coincide or are collinear).
    pub fn align(source: &[Point], target: &[Point]) -> Result<PcaAlignment> {
        let source_pca = PcaTransform::calculate(&points_to_matrix(source))?;
        let target_pca = PcaTransform::calculate(&points_to_matrix(target))?;
        check_variance(&source_pca, "source")?;
        check_variance(&target_pca, "target")?;

        let angle_from_source =
            normalize_half_turn(target_pca.principal_angle() - source_pca.principal_angle());
        let x_scale_from_source =
            (target_pca.major_variance() / source_pca.major_variance()).sqrt();
        let y_scale_from_source =
            (target_pca.minor_variance() / source_pca.minor_variance()).sqrt();
        debug!(
            "pca: angle {:.4} rad, scale {:.4} x {:.4}",
            angle_from_source, x_scale_from_source, y_scale_from_source
        );

        // Undo the rotation, then rescale along the source's own axes.
        let rotation = AffineTransform::rotation(-angle_from_source).linear();
        let axes = &source_pca.eigenvectors;
        let mut inverse_scale = Matrix::new(2, 2);
        inverse_scale[(0, 0)] = 1.0 / y_scale_from_source;
        inverse_scale[(1, 1)] = 1.0 / x_scale_from_source;
        let scale = axes.mul(&inverse_scale)?.mul(&axes.transpose())?;
        let linear = scale.mul(&rotation)?;

        let transform =
            AffineTransform::from_linear(&linear, target_pca.centroid(), source_pca.centroid())?;
        let aligned = linear
            .mul(&target_pca.centered)?
            .add_column_vector(&source_pca.averages)?;

        Ok(PcaAlignment {
            aligned,
            transform,
            angle_from_source,
            x_scale_from_source,
            y_scale_from_source,
            source_pca,
            target_pca,
        })
    }
}

fn check_variance(pca: &PcaTransform, which: &str) -> Result<()> {
    let major = pca.major_variance();
    if major <= 0.0 || pca.minor_variance() <= MIN_RELATIVE_VARIANCE * major {
        return Err(ShapeMatchError::SingularMatrix(format!(
            "{which} point set has zero variance along a principal axis"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn rectangle() -> Vec<Point> {
        let mut pts = Vec::new();
        for x in (50..=70).step_by(2) {
            for y in (50..=56).step_by(2) {
                pts.push(Point::new(x, y));
            }
        }
        pts
    }

    #[test]
    fn test_recovers_quarter_turn_and_double_scale() {
        let source = rectangle();
        // Rotate by 90 degrees about (60, 53), double the size, move elsewhere.
        let target: Vec<Point> = source
            .iter()
            .map(|p| Point::new(-2 * (p.y - 53) + 100, 2 * (p.x - 60) + 100))
            .collect();

        let alignment = PcaMatching::align(&source, &target).unwrap();
        assert_relative_eq!(alignment.angle_from_source, PI / 2.0, epsilon = 1e-9);
        assert_relative_eq!(alignment.x_scale_from_source, 2.0, epsilon = 1e-9);
        assert_relative_eq!(alignment.y_scale_from_source, 2.0, epsilon = 1e-9);

        // The rectangle is symmetric, so the half-turn ambiguity is invisible.
        let mut aligned = alignment.aligned_points();
        let mut expected = source.clone();
        aligned.sort();
        expected.sort();
        assert_eq!(aligned, expected);
    }

    #[test]
    fn test_anisotropic_scale() {
        let source = rectangle();
        let target: Vec<Point> = source
            .iter()
            .map(|p| Point::new(3 * (p.x - 60), p.y - 53))
            .collect();
        let alignment = PcaMatching::align(&source, &target).unwrap();
        assert_relative_eq!(alignment.angle_from_source, 0.0, epsilon = 1e-9);
        assert_relative_eq!(alignment.x_scale_from_source, 3.0, epsilon = 1e-9);
        assert_relative_eq!(alignment.y_scale_from_source, 1.0, epsilon = 1e-9);

        let (cx, cy) = alignment.transform.transform(0.0, 0.0);
        assert_relative_eq!(cx, 60.0, epsilon = 1e-9);
        assert_relative_eq!(cy, 53.0, epsilon = 1e-9);
    }

    #[test]
    fn test_collinear_set_is_degenerate() {
        let line: Vec<Point> = (0..10).map(|i| Point::new(i, 2 * i)).collect();
        let err = PcaMatching::align(&rectangle(), &line).unwrap_err();
        assert!(matches!(err, ShapeMatchError::SingularMatrix(_)));
    }

    #[test]
    fn test_single_point_is_insufficient() {
        let err = PcaMatching::align(&rectangle(), &[Point::new(1, 1)]).unwrap_err();
        assert!(matches!(err, ShapeMatchError::InsufficientSamples { .. }));
    }
}
