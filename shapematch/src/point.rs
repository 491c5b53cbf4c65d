use crate::error::{Result, ShapeMatchError};
use crate::matrix::Matrix;
use kd_tree::KdPoint;

/// An integer pixel coordinate. `x` is the column, `y` the row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    /// Rounds a floating point coordinate to the nearest pixel.
    pub fn from_f64(x: f64, y: f64) -> Self {
        Point {
            x: x.round() as i32,
            y: y.round() as i32,
        }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        dx.hypot(dy)
    }
}

impl KdPoint for Point {
    type Scalar = i64;
    type Dim = typenum::U2;
    fn at(&self, k: usize) -> i64 {
        if k == 0 {
            self.x as i64
        } else {
            self.y as i64
        }
    }
}

/// The rectangular pixel area a warp or distance field is defined over.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct CanvasSize {
    pub width: usize,
    pub height: usize,
}

impl CanvasSize {
    pub fn new(width: usize, height: usize) -> Self {
        CanvasSize { width, height }
    }

    /// Number of pixels on the canvas.
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// Length of the canvas diagonal.
    pub fn diagonal(&self) -> f64 {
        (self.width as f64).hypot(self.height as f64)
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as usize) < self.width && (p.y as usize) < self.height
    }

    /// Clamps a floating point position onto the canvas and rounds it.
    pub fn clamp(&self, x: f64, y: f64) -> Point {
        let max_x = self.width.saturating_sub(1) as f64;
        let max_y = self.height.saturating_sub(1) as f64;
        Point::from_f64(x.clamp(0.0, max_x), y.clamp(0.0, max_y))
    }

    /// Smallest canvas holding every point of both sets, plus a two pixel margin.
    pub fn enclosing(a: &[Point], b: &[Point]) -> CanvasSize {
        let (mut w, mut h) = (0i32, 0i32);
        for p in a.iter().chain(b) {
            w = w.max(p.x);
            h = h.max(p.y);
        }
        CanvasSize::new(w.max(0) as usize + 2, h.max(0) as usize + 2)
    }
}

/// Packs a point set into a `2 × N` matrix (row 0 = x, row 1 = y).
pub fn points_to_matrix(points: &[Point]) -> Matrix<f64> {
    let mut m = Matrix::new(2, points.len());
    for (i, p) in points.iter().enumerate() {
        m[(0, i)] = p.x as f64;
        m[(1, i)] = p.y as f64;
    }
    m
}

/// Unpacks a `2 × N` matrix into rounded points.
pub fn matrix_to_points(m: &Matrix<f64>) -> Result<Vec<Point>> {
    if m.rows() != 2 {
        return Err(ShapeMatchError::DimensionMismatch {
            operation: "matrix_to_points",
            left: m.shape(),
            right: (2, m.cols()),
        });
    }
    Ok((0..m.cols())
        .map(|i| Point::from_f64(m[(0, i)], m[(1, i)]))
        .collect())
}

/// Result of moving two point sets into the non-negative quadrant.
#[derive(Debug, Clone)]
pub struct ShiftedPair {
    pub source: Vec<Point>,
    pub target: Vec<Point>,
    /// Offset that was added to every point. Subtract it to return to the
    /// original frame.
    pub offset: Point,
    /// Canvas enclosing both shifted sets.
    pub canvas: CanvasSize,
}

/// Translates both sets by the same offset so that every coordinate is
/// non-negative, and sizes a canvas around them.
///
/// # Examples
/// ```
/// # use shapematch::point::{shift_to_positives, Point};
/// let shifted = shift_to_positives(&[Point::new(-3, 4)], &[Point::new(2, -1)]);
/// assert_eq!(shifted.offset, Point::new(3, 1));
/// assert_eq!(shifted.source, vec![Point::new(0, 5)]);
/// assert_eq!(shifted.target, vec![Point::new(5, 0)]);
/// assert_eq!((shifted.canvas.width, shifted.canvas.height), (7, 7));
/// ```
pub fn shift_to_positives(source: &[Point], target: &[Point]) -> ShiftedPair {
    let (mut min_x, mut min_y) = (0i32, 0i32);
    for p in source.iter().chain(target) {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
    }
    let offset = Point::new(-min_x, -min_y);
    let shift = |pts: &[Point]| -> Vec<Point> {
        pts.iter()
            .map(|p| Point::new(p.x + offset.x, p.y + offset.y))
            .collect()
    };
    let source = shift(source);
    let target = shift(target);
    let canvas = CanvasSize::enclosing(&source, &target);
    ShiftedPair {
        source,
        target,
        offset,
        canvas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_conversion() {
        let pts = vec![Point::new(1, 2), Point::new(-3, 4)];
        let m = points_to_matrix(&pts);
        assert_eq!(m.shape(), (2, 2));
        assert_eq!(m.row(1), vec![2.0, 4.0]);
        assert_eq!(matrix_to_points(&m).unwrap(), pts);
        assert!(matrix_to_points(&Matrix::new(3, 1)).is_err());
    }

    #[test]
    fn test_canvas_clamp_and_contains() {
        let canvas = CanvasSize::new(10, 5);
        assert_eq!(canvas.clamp(-2.0, 7.6), Point::new(0, 4));
        assert_eq!(canvas.clamp(3.4, 2.6), Point::new(3, 3));
        assert!(canvas.contains(&Point::new(9, 4)));
        assert!(!canvas.contains(&Point::new(10, 0)));
    }

    #[test]
    fn test_shift_keeps_positive_sets_in_place() {
        let shifted = shift_to_positives(&[Point::new(1, 1)], &[Point::new(4, 2)]);
        assert_eq!(shifted.offset, Point::new(0, 0));
        assert_eq!(shifted.canvas, CanvasSize::new(6, 4));
    }
}
