use crate::binary_map::BinaryMap;
use crate::error::{Result, ShapeMatchError};
use crate::matrix::Matrix;
use log::debug;
use std::collections::VecDeque;

/// Distance recorded for cells that no occupied cell can reach (an empty map).
/// Small enough that two of them still add up inside an `i32`.
pub const UNREACHABLE: i32 = i16::MAX as i32;

/// Chamfer distance of every cell to the nearest occupied cell of `map`,
/// measured in 8-neighbour steps (i.e. the Chebyshev distance).
///
/// Computed by a breadth-first flood from all occupied cells at once: occupied
/// cells start at `0`, every neighbour is relaxed to `min(current, d + 1)` and
/// re-queued when it improves.
///
/// # Examples
/// ```
/// # use shapematch::binary_map::BinaryMap;
/// # use shapematch::hausdorff_matching::distance_field;
/// # use shapematch::point::{CanvasSize, Point};
/// let map = BinaryMap::from_points(&[Point::new(0, 0)], CanvasSize::new(3, 2));
/// let field = distance_field(&map);
/// assert_eq!(field.as_slice(), &[0, 1, 2, 1, 1, 2]);
/// ```
pub fn distance_field(map: &BinaryMap) -> Matrix<i32> {
    let (height, width) = (map.get_height(), map.get_width());
    let mut field = Matrix::filled(height, width, UNREACHABLE);
    let mut queue = VecDeque::new();
    for y in 0..height {
        for x in 0..width {
            if map.is_set(x, y) {
                field[(y, x)] = 0;
                queue.push_back((y, x));
            }
        }
    }

    while let Some((y, x)) = queue.pop_front() {
        let next = field[(y, x)] + 1;
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let ny = y as i64 + dy;
                let nx = x as i64 + dx;
                if ny < 0 || nx < 0 || ny >= height as i64 || nx >= width as i64 {
                    continue;
                }
                let cell = &mut field[(ny as usize, nx as usize)];
                if next < *cell {
                    *cell = next;
                    queue.push_back((ny as usize, nx as usize));
                }
            }
        }
    }
    field
}

/// Per-pixel mismatch maps between two shapes on the same canvas.
#[derive(Debug, Clone)]
pub struct HausdorffResult {
    /// For each pixel of the first shape, its distance to the second shape
    /// (zero elsewhere).
    pub first_on_second: Matrix<i32>,
    /// For each pixel of the second shape, its distance to the first shape
    /// (zero elsewhere).
    pub second_on_first: Matrix<i32>,
    /// Sum of the two one-sided maps.
    pub two_sided: Matrix<i32>,
}

impl HausdorffResult {
    /// Directed Hausdorff distance from the first shape to the second.
    pub fn directed_first_to_second(&self) -> i32 {
        self.first_on_second.max().unwrap_or(0)
    }

    /// Directed Hausdorff distance from the second shape to the first.
    pub fn directed_second_to_first(&self) -> i32 {
        self.second_on_first.max().unwrap_or(0)
    }

    /// Symmetric Hausdorff distance: the larger directed distance.
    pub fn hausdorff_distance(&self) -> i32 {
        self.directed_first_to_second()
            .max(self.directed_second_to_first())
    }
}

/// Hausdorff-style comparison of two occupancy grids.
pub struct HausdorffMatching;

impl HausdorffMatching {
    /// Builds the one-sided and two-sided mismatch maps.
    ///
    /// # Returns
    /// `DimensionMismatch` if the maps cover different canvases.
    pub fn calculate(first: &BinaryMap, second: &BinaryMap) -> Result<HausdorffResult> {
        if first.get_canvas() != second.get_canvas() {
            return Err(ShapeMatchError::DimensionMismatch {
                operation: "hausdorff",
                left: (first.get_height(), first.get_width()),
                right: (second.get_height(), second.get_width()),
            });
        }
        let first_on_second = distance_field(second).elementwise_mul(first.as_matrix())?;
        let second_on_first = distance_field(first).elementwise_mul(second.as_matrix())?;
        let two_sided = first_on_second.add(&second_on_first)?;
        debug!(
            "hausdorff: {}x{} canvas, distance {}",
            first.get_width(),
            first.get_height(),
            first_on_second.max().unwrap_or(0).max(second_on_first.max().unwrap_or(0))
        );
        Ok(HausdorffResult {
            first_on_second,
            second_on_first,
            two_sided,
        })
    }

    /// Same as [`HausdorffMatching::calculate`], validating raw grids first.
    ///
    /// # Returns
    /// `DimensionMismatch` for differently sized grids, `NonBinaryValue` for
    /// cells other than `0`/`1`.
    pub fn calculate_from_grids(first: &Matrix<i32>, second: &Matrix<i32>) -> Result<HausdorffResult> {
        if first.shape() != second.shape() {
            return Err(ShapeMatchError::DimensionMismatch {
                operation: "hausdorff",
                left: first.shape(),
                right: second.shape(),
            });
        }
        let first = BinaryMap::new(first.clone())?;
        let second = BinaryMap::new(second.clone())?;
        Self::calculate(&first, &second)
    }
}
