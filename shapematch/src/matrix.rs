use crate::error::{Result, ShapeMatchError};
use crate::scalar::Scalar;
use nalgebra::DMatrix;
use std::ops::{Index, IndexMut};

/// A dense, row-major matrix over any [`Scalar`] element type.
///
/// Shapes are fixed at construction. Every binary operation checks the shapes
/// of its operands and returns [`ShapeMatchError::DimensionMismatch`] instead of
/// panicking, so callers can propagate shape bugs with `?`.
///
/// Point sets are conventionally stored as `2 × N` matrices (row 0 holds the x
/// coordinates, row 1 the y coordinates), and occupancy grids as
/// `height × width` matrices of `0`/`1`.
///
/// # Examples
/// ```
/// # use shapematch::matrix::Matrix;
/// let a = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
/// let b = Matrix::<f64>::identity(2);
/// let c = a.mul(&b).unwrap();
/// assert_eq!(c, a);
/// assert_eq!(a.transpose()[(0, 1)], 3.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T: Scalar> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Scalar> Matrix<T> {
    /// Creates a `rows × cols` matrix filled with zeros.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, T::zero())
    }

    /// Creates a `rows × cols` matrix with every cell set to `value`.
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Matrix {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Creates an `n × n` identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::new(n, n);
        for i in 0..n {
            m[(i, i)] = T::one();
        }
        m
    }

    /// Builds a matrix from row-major data.
    ///
    /// # Returns
    /// `DimensionMismatch` if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(ShapeMatchError::DimensionMismatch {
                operation: "from_vec",
                left: (rows, cols),
                right: (data.len(), 1),
            });
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Builds a matrix from a list of rows. All rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.len());
        let row_count = rows.len();
        let mut data = Vec::with_capacity(row_count * cols);
        for row in rows {
            if row.len() != cols {
                return Err(ShapeMatchError::DimensionMismatch {
                    operation: "from_rows",
                    left: (row_count, cols),
                    right: (1, row.len()),
                });
            }
            data.extend(row);
        }
        Ok(Matrix {
            rows: row_count,
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Row-major view of the cells.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Returns the cell at `(row, col)`, or `None` when out of range.
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Copies out one row.
    pub fn row(&self, row: usize) -> Vec<T> {
        self.data[row * self.cols..(row + 1) * self.cols].to_vec()
    }

    /// Copies out one column.
    pub fn column(&self, col: usize) -> Vec<T> {
        (0..self.rows).map(|r| self[(r, col)]).collect()
    }

    pub fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for c in 0..self.cols {
            self.data.swap(a * self.cols + c, b * self.cols + c);
        }
    }

    /// Sets every cell to `value`.
    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|v| *v = value);
    }

    fn check_same_shape(&self, other: &Self, operation: &'static str) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(ShapeMatchError::DimensionMismatch {
                operation,
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(())
    }

    fn zip_with(&self, other: &Self, operation: &'static str, f: impl Fn(T, T) -> T) -> Result<Self> {
        self.check_same_shape(other, operation)?;
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&other.data).map(|(&a, &b)| f(a, b)).collect(),
        })
    }

    /// Cell-wise sum.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "add", T::add)
    }

    /// Cell-wise difference.
    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "sub", T::sub)
    }

    /// Cell-wise (Hadamard) product. Used to mask a distance field with an
    /// occupancy grid.
    pub fn elementwise_mul(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "elementwise_mul", T::mul)
    }

    /// Matrix product `self × other`.
    ///
    /// # Returns
    /// `DimensionMismatch` unless `self.cols() == other.rows()`.
    pub fn mul(&self, other: &Self) -> Result<Self> {
        if self.cols != other.rows {
            return Err(ShapeMatchError::DimensionMismatch {
                operation: "mul",
                left: self.shape(),
                right: other.shape(),
            });
        }
        let mut out = Self::new(self.rows, other.cols);
        for r in 0..self.rows {
            for k in 0..self.cols {
                let a = self[(r, k)];
                for c in 0..other.cols {
                    let cell = &mut out.data[r * other.cols + c];
                    *cell = cell.add(a.mul(other[(k, c)]));
                }
            }
        }
        Ok(out)
    }

    /// Multiplies every cell by `factor`.
    pub fn scale(&self, factor: T) -> Self {
        self.map(|v| v.mul(factor))
    }

    /// Divides every cell by `divisor`.
    ///
    /// # Panics
    /// For integer element types, panics when `divisor` is zero.
    pub fn divide(&self, divisor: T) -> Self {
        self.map(|v| v.div(divisor))
    }

    /// Adds `value` to every cell.
    pub fn add_scalar(&self, value: T) -> Self {
        self.map(|v| v.add(value))
    }

    pub fn transpose(&self) -> Self {
        let mut out = Self::new(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out[(c, r)] = self[(r, c)];
            }
        }
        out
    }

    /// Applies `f` to every cell, producing a new matrix.
    pub fn map<U: Scalar>(&self, f: impl Fn(T) -> U) -> Matrix<U> {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Applies `f(row, col, value)` to every cell, producing a new matrix.
    pub fn map_indexed<U: Scalar>(&self, f: impl Fn(usize, usize, T) -> U) -> Matrix<U> {
        let cols = self.cols;
        Matrix {
            rows: self.rows,
            cols,
            data: self
                .data
                .iter()
                .enumerate()
                .map(|(i, &v)| f(i / cols.max(1), i % cols.max(1), v))
                .collect(),
        }
    }

    /// Converts every cell to another element type through `f64`.
    pub fn convert<U: Scalar>(&self) -> Matrix<U> {
        self.map(|v| U::from_f64(v.to_f64()))
    }

    /// Sums each row, returning a `rows × 1` column vector.
    pub fn sum_rows(&self) -> Self {
        let mut out = Self::new(self.rows, 1);
        for r in 0..self.rows {
            out[(r, 0)] = (0..self.cols).fold(T::zero(), |acc, c| acc.add(self[(r, c)]));
        }
        out
    }

    /// Sums each column, returning a `1 × cols` row vector.
    pub fn sum_columns(&self) -> Self {
        let mut out = Self::new(1, self.cols);
        for c in 0..self.cols {
            out[(0, c)] = (0..self.rows).fold(T::zero(), |acc, r| acc.add(self[(r, c)]));
        }
        out
    }

    /// Sum of all cells.
    pub fn sum(&self) -> T {
        self.data.iter().fold(T::zero(), |acc, &v| acc.add(v))
    }

    /// Largest cell, or `None` for an empty matrix.
    pub fn max(&self) -> Option<T> {
        self.data
            .iter()
            .copied()
            .fold(None, |acc, v| match acc {
                Some(m) if m >= v => Some(m),
                _ => Some(v),
            })
    }

    /// Smallest cell, or `None` for an empty matrix.
    pub fn min(&self) -> Option<T> {
        self.data
            .iter()
            .copied()
            .fold(None, |acc, v| match acc {
                Some(m) if m <= v => Some(m),
                _ => Some(v),
            })
    }

    fn check_column_vector(&self, vector: &Self, operation: &'static str) -> Result<()> {
        if vector.rows != self.rows || vector.cols != 1 {
            return Err(ShapeMatchError::DimensionMismatch {
                operation,
                left: self.shape(),
                right: vector.shape(),
            });
        }
        Ok(())
    }

    /// Subtracts `vector[r]` from every cell of row `r`. `vector` must be a
    /// `rows × 1` column vector; this is how point sets are centered.
    pub fn sub_column_vector(&self, vector: &Self) -> Result<Self> {
        self.check_column_vector(vector, "sub_column_vector")?;
        Ok(self.map_indexed(|r, _, v| v.sub(vector[(r, 0)])))
    }

    /// Adds `vector[r]` to every cell of row `r`.
    pub fn add_column_vector(&self, vector: &Self) -> Result<Self> {
        self.check_column_vector(vector, "add_column_vector")?;
        Ok(self.map_indexed(|r, _, v| v.add(vector[(r, 0)])))
    }
}

impl Matrix<f64> {
    /// Per-row mean as a `rows × 1` column vector.
    pub fn row_means(&self) -> Matrix<f64> {
        let n = self.cols.max(1) as f64;
        self.sum_rows().divide(n)
    }
}

impl<T: Scalar> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        &self.data[row * self.cols + col]
    }
}

impl<T: Scalar> IndexMut<(usize, usize)> for Matrix<T> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        assert!(row < self.rows && col < self.cols, "matrix index out of bounds");
        &mut self.data[row * self.cols + col]
    }
}

impl From<&Matrix<f64>> for DMatrix<f64> {
    fn from(m: &Matrix<f64>) -> Self {
        DMatrix::from_row_slice(m.rows, m.cols, &m.data)
    }
}

impl From<&DMatrix<f64>> for Matrix<f64> {
    fn from(m: &DMatrix<f64>) -> Self {
        let mut out = Matrix::new(m.nrows(), m.ncols());
        for r in 0..m.nrows() {
            for c in 0..m.ncols() {
                out[(r, c)] = m[(r, c)];
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Matrix<i32> {
        Matrix::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap()
    }

    #[test]
    fn test_add_shape_mismatch() {
        let a = sample();
        let b = Matrix::<i32>::new(3, 2);
        let err = a.add(&b).unwrap_err();
        assert_eq!(
            err,
            ShapeMatchError::DimensionMismatch {
                operation: "add",
                left: (2, 3),
                right: (3, 2),
            }
        );
    }

    #[test]
    fn test_add_then_sub_restores() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(11);
        let mut random = |rows: usize, cols: usize| -> Matrix<f64> {
            let data = (0..rows * cols).map(|_| rng.random_range(-100.0..100.0)).collect();
            Matrix::from_vec(rows, cols, data).unwrap()
        };
        let a = random(3, 4);
        let b = random(3, 4);
        let back = a.add(&b).unwrap().sub(&b).unwrap();
        for (x, y) in back.as_slice().iter().zip(a.as_slice()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_mul_shapes() {
        let a = sample();
        let p = a.mul(&a.transpose()).unwrap();
        assert_eq!(p.shape(), (2, 2));
        assert_eq!(p[(0, 0)], 14);
        assert_eq!(p[(0, 1)], 32);
        assert_eq!(p[(1, 1)], 77);
        assert!(a.mul(&a).is_err());
    }

    #[test]
    fn test_mul_propagates_nan_through_zero() {
        let a = Matrix::from_rows(vec![vec![0.0, 1.0]]).unwrap();
        let b = Matrix::from_rows(vec![vec![f64::NAN], vec![2.0]]).unwrap();
        assert!(a.mul(&b).unwrap()[(0, 0)].is_nan());
    }

    #[test]
    fn test_row_and_column_sums() {
        let a = sample();
        assert_eq!(a.sum_rows().as_slice(), &[6, 15]);
        assert_eq!(a.sum_columns().as_slice(), &[5, 7, 9]);
        assert_eq!(a.sum(), 21);
        assert_eq!(a.max(), Some(6));
        assert_eq!(a.min(), Some(1));
    }

    #[test]
    fn test_elementwise_and_scalar_ops() {
        let a = sample();
        let sq = a.elementwise_mul(&a).unwrap();
        assert_eq!(sq.as_slice(), &[1, 4, 9, 16, 25, 36]);
        assert_eq!(a.add_scalar(1).as_slice(), &[2, 3, 4, 5, 6, 7]);
        assert_eq!(a.scale(2).divide(2), a);
    }

    #[test]
    fn test_centering_with_column_vector() {
        let a: Matrix<f64> = sample().convert();
        let means = a.row_means();
        assert_eq!(means.as_slice(), &[2.0, 5.0]);
        let centered = a.sub_column_vector(&means).unwrap();
        assert_eq!(centered.row(0), vec![-1.0, 0.0, 1.0]);
        assert_eq!(centered.add_column_vector(&means).unwrap(), a);
        assert!(a.sub_column_vector(&Matrix::new(3, 1)).is_err());
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        assert!(Matrix::from_rows(vec![vec![1.0], vec![1.0, 2.0]]).is_err());
        assert!(Matrix::from_vec(2, 2, vec![1, 2, 3]).is_err());
    }

    #[test]
    fn test_nalgebra_round_trip() {
        let a: Matrix<f64> = sample().convert();
        let d = DMatrix::from(&a);
        assert_eq!(d[(1, 2)], 6.0);
        assert_eq!(Matrix::from(&d), a);
    }

    #[test]
    fn test_map_indexed_sees_positions() {
        let a = sample();
        let m = a.map_indexed(|r, c, _| (r * 10 + c) as i32);
        assert_eq!(m.as_slice(), &[0, 1, 2, 10, 11, 12]);
    }
}
