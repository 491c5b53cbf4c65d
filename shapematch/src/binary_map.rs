use crate::error::{Result, ShapeMatchError};
use crate::matrix::Matrix;
use crate::point::{CanvasSize, Point};

/// An occupancy grid: `1` where a shape pixel is present, `0` elsewhere.
///
/// Stored as a `height × width` matrix, so cell `(row, col)` is pixel
/// `(x = col, y = row)`. Every cell is guaranteed to be `0` or `1`.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMap {
    cells: Matrix<i32>,
}

impl BinaryMap {
    /// Wraps a grid after checking it only holds `0` and `1`.
    ///
    /// # Returns
    /// `NonBinaryValue` naming the first offending cell.
    pub fn new(cells: Matrix<i32>) -> Result<Self> {
        for r in 0..cells.rows() {
            for c in 0..cells.cols() {
                let value = cells[(r, c)];
                if value != 0 && value != 1 {
                    return Err(ShapeMatchError::NonBinaryValue {
                        row: r,
                        column: c,
                        value,
                    });
                }
            }
        }
        Ok(BinaryMap { cells })
    }

    /// An empty map covering `canvas`.
    pub fn empty(canvas: CanvasSize) -> Self {
        BinaryMap {
            cells: Matrix::new(canvas.height, canvas.width),
        }
    }

    /// Rasterises a point set. Points off the canvas are ignored.
    ///
    /// # Examples
    /// ```
    /// # use shapematch::binary_map::BinaryMap;
    /// # use shapematch::point::{CanvasSize, Point};
    /// let map = BinaryMap::from_points(&[Point::new(1, 2), Point::new(9, 9)], CanvasSize::new(4, 3));
    /// assert_eq!(map.occupied_points(), vec![Point::new(1, 2)]);
    /// ```
    pub fn from_points(points: &[Point], canvas: CanvasSize) -> Self {
        let mut map = Self::empty(canvas);
        for p in points.iter().filter(|p| canvas.contains(p)) {
            map.cells[(p.y as usize, p.x as usize)] = 1;
        }
        map
    }

    pub fn get_width(&self) -> usize {
        self.cells.cols()
    }

    pub fn get_height(&self) -> usize {
        self.cells.rows()
    }

    pub fn get_canvas(&self) -> CanvasSize {
        CanvasSize::new(self.get_width(), self.get_height())
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.cells.get(y, x) == Some(1)
    }

    /// Number of occupied pixels.
    pub fn count(&self) -> usize {
        self.cells.sum() as usize
    }

    /// The occupied pixels, row by row.
    pub fn occupied_points(&self) -> Vec<Point> {
        let mut points = Vec::with_capacity(self.count());
        for y in 0..self.get_height() {
            for x in 0..self.get_width() {
                if self.cells[(y, x)] == 1 {
                    points.push(Point::new(x as i32, y as i32));
                }
            }
        }
        points
    }

    /// The underlying `0`/`1` matrix.
    pub fn as_matrix(&self) -> &Matrix<i32> {
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_binary() {
        let grid = Matrix::from_rows(vec![vec![0, 1], vec![2, 0]]).unwrap();
        assert_eq!(
            BinaryMap::new(grid).unwrap_err(),
            ShapeMatchError::NonBinaryValue { row: 1, column: 0, value: 2 }
        );
    }

    #[test]
    fn test_round_trip_points() {
        let pts = vec![Point::new(0, 0), Point::new(3, 1), Point::new(2, 2)];
        let map = BinaryMap::from_points(&pts, CanvasSize::new(4, 3));
        assert_eq!(map.count(), 3);
        assert!(map.is_set(3, 1));
        assert!(!map.is_set(1, 3));
        assert_eq!(map.occupied_points(), pts);
    }
}
