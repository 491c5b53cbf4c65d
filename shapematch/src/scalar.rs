//! The numeric algebra a [`Matrix`](crate::matrix::Matrix) is built over.

use std::fmt::Debug;

/// Arithmetic required from a matrix element.
///
/// The operations are spelled out instead of relying on `std::ops` so that a
/// matrix can be generic over integer and floating point elements with a single
/// bound, and so that conversions between element types always go through `f64`.
///
/// # Examples
/// ```
/// # use shapematch::scalar::Scalar;
/// assert_eq!(<i32 as Scalar>::one().add(2), 3);
/// assert_eq!(<f64 as Scalar>::from_f64(2.6), 2.6);
/// assert_eq!(<i32 as Scalar>::from_f64(2.6), 3);
/// ```
pub trait Scalar: Copy + PartialOrd + Debug + Default + Send + Sync + 'static {
    fn zero() -> Self;
    fn one() -> Self;
    fn add(self, other: Self) -> Self;
    fn sub(self, other: Self) -> Self;
    fn mul(self, other: Self) -> Self;
    /// Division. Integer division by zero panics, as it does for the primitive.
    fn div(self, other: Self) -> Self;
    /// Converts from `f64`, rounding to the nearest value for integer types.
    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;

    fn neg(self) -> Self {
        Self::zero().sub(self)
    }

    fn abs(self) -> Self {
        if self < Self::zero() {
            self.neg()
        } else {
            self
        }
    }
}

macro_rules! impl_float_scalar {
    ($t:ty) => {
        impl Scalar for $t {
            fn zero() -> Self {
                0.0
            }
            fn one() -> Self {
                1.0
            }
            fn add(self, other: Self) -> Self {
                self + other
            }
            fn sub(self, other: Self) -> Self {
                self - other
            }
            fn mul(self, other: Self) -> Self {
                self * other
            }
            fn div(self, other: Self) -> Self {
                self / other
            }
            fn from_f64(value: f64) -> Self {
                value as $t
            }
            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

macro_rules! impl_integer_scalar {
    ($t:ty) => {
        impl Scalar for $t {
            fn zero() -> Self {
                0
            }
            fn one() -> Self {
                1
            }
            fn add(self, other: Self) -> Self {
                self + other
            }
            fn sub(self, other: Self) -> Self {
                self - other
            }
            fn mul(self, other: Self) -> Self {
                self * other
            }
            fn div(self, other: Self) -> Self {
                self / other
            }
            fn from_f64(value: f64) -> Self {
                value.round() as $t
            }
            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_float_scalar!(f64);
impl_float_scalar!(f32);
impl_integer_scalar!(i32);
impl_integer_scalar!(i64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_rounding() {
        assert_eq!(<i64 as Scalar>::from_f64(-2.5), -3);
        assert_eq!(<i32 as Scalar>::from_f64(1.49), 1);
    }

    #[test]
    fn test_abs_and_neg() {
        assert_eq!((-4i32).abs(), 4);
        assert_eq!(Scalar::neg(2.5f64), -2.5);
        assert_eq!(Scalar::abs(-0.5f32), 0.5);
    }
}
