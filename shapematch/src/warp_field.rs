use crate::point::{CanvasSize, Point};
use crate::thin_plate_spline::ThinPlateSpline;

/// A thin-plate spline evaluated at every pixel of a canvas.
///
/// Each cell stores the position `(x2, y2)` that pixel `(x, y)` is carried to.
/// Cells are laid out row-major, so pixel `(x, y)` lives at `y * width + x`.
/// Looking up a point instead of re-evaluating the spline makes warping a
/// large point set cheap once the field exists.
#[derive(Debug, Clone)]
pub struct WarpField {
    canvas: CanvasSize,

    /// Internal storage, of length `width * height * 2`. Each cell stores
    /// `(x2, y2)` in consecutive slots.
    map_data: Vec<f64>,

    /// The spline the field was sampled from, used for points off the canvas.
    spline: ThinPlateSpline,
}

impl WarpField {
    /// Samples `spline` at every pixel of `canvas`.
    pub fn from_spline(spline: ThinPlateSpline, canvas: CanvasSize) -> Self {
        let mut map_data = Vec::with_capacity(canvas.area() * 2);
        for y in 0..canvas.height {
            for x in 0..canvas.width {
                let (x2, y2) = spline.evaluate(x as f64, y as f64);
                map_data.push(x2);
                map_data.push(y2);
            }
        }
        WarpField {
            canvas,
            map_data,
            spline,
        }
    }

    pub fn get_canvas(&self) -> CanvasSize {
        self.canvas
    }

    pub fn get_spline(&self) -> &ThinPlateSpline {
        &self.spline
    }

    /// Overrides the stored destination of pixel `(x, y)`.
    ///
    /// # Panics
    /// Panics if `(x, y)` is off the canvas.
    pub fn set_grid_coordinates(&mut self, x: usize, y: usize, x2: f64, y2: f64) {
        let index = (y * self.canvas.width + x) * 2;
        let slice = &mut self.map_data[index..index + 2];
        slice[0] = x2;
        slice[1] = y2;
    }

    /// The unclamped destination of pixel `(x, y)`.
    ///
    /// Returns `(NaN, NaN)` if the pixel is off the canvas.
    pub fn get_grid_coordinates(&self, x: usize, y: usize) -> (f64, f64) {
        if x >= self.canvas.width || y >= self.canvas.height {
            return (f64::NAN, f64::NAN);
        }
        let index = (y * self.canvas.width + x) * 2;
        (self.map_data[index], self.map_data[index + 1])
    }

    /// Warps one point and clamps the result onto the canvas.
    ///
    /// Points on the canvas are looked up; points off it fall back to
    /// evaluating the spline directly.
    pub fn warp_point(&self, p: &Point) -> Point {
        let (x2, y2) = if self.canvas.contains(p) {
            self.get_grid_coordinates(p.x as usize, p.y as usize)
        } else {
            self.spline.evaluate(p.x as f64, p.y as f64)
        };
        self.canvas.clamp(x2, y2)
    }

    /// Warps a whole point set, preserving order.
    pub fn warp_points(&self, points: &[Point]) -> Vec<Point> {
        points.iter().map(|p| self.warp_point(p)).collect()
    }

    /// Mean length of the displacement over all canvas pixels.
    pub fn mean_displacement(&self) -> f64 {
        if self.canvas.area() == 0 {
            return 0.0;
        }
        let mut total = 0.0;
        for y in 0..self.canvas.height {
            for x in 0..self.canvas.width {
                let (x2, y2) = self.get_grid_coordinates(x, y);
                total += (x2 - x as f64).hypot(y2 - y as f64);
            }
        }
        total / self.canvas.area() as f64
    }
}
