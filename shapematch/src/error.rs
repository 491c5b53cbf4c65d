//! Error type shared by every stage of the matching pipeline.

use thiserror::Error;

/// Everything that can go wrong while aligning or matching two point sets.
///
/// Some kinds are "recoverable" from the point of view of the iterative
/// matcher: a degenerate sample draw can produce a singular kernel or an
/// ill-posed assignment, and the matcher simply skips that iteration. See
/// [`ShapeMatchError::is_recoverable`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeMatchError {
    /// Two operands of a matrix operation (or two grids) have incompatible shapes.
    #[error("dimension mismatch in {operation}: {left:?} vs {right:?}")]
    DimensionMismatch {
        operation: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    /// A matrix that had to be inverted (or a covariance that had to be
    /// normalised) is singular.
    #[error("singular matrix: {0}")]
    SingularMatrix(String),

    /// The symmetric eigen-solver ran out of iterations.
    #[error("eigen decomposition did not converge after {iterations} iterations")]
    NoConvergence { iterations: usize },

    /// Fewer points than required were available.
    #[error("insufficient samples: needed {requested}, got {available}")]
    InsufficientSamples { requested: usize, available: usize },

    /// An occupancy grid held something other than 0 or 1.
    #[error("non-binary value {value} at ({row}, {column})")]
    NonBinaryValue { row: usize, column: usize, value: i32 },

    /// The assignment solver was handed a non-square cost matrix.
    #[error("assignment needs a square cost matrix, got {rows}x{columns}")]
    AssignmentShape { rows: usize, columns: usize },

    /// A parameter or input value is outside its valid domain.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ShapeMatchError {
    /// Returns `true` when the iterative matcher may skip the failing
    /// iteration and carry on with the best result found so far.
    ///
    /// Shape mismatches and invalid inputs are programming or configuration
    /// errors and always abort the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ShapeMatchError::SingularMatrix(_)
                | ShapeMatchError::NoConvergence { .. }
                | ShapeMatchError::InsufficientSamples { .. }
                | ShapeMatchError::NonBinaryValue { .. }
                | ShapeMatchError::AssignmentShape { .. }
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ShapeMatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(ShapeMatchError::SingularMatrix("kernel".into()).is_recoverable());
        assert!(ShapeMatchError::InsufficientSamples { requested: 4, available: 3 }.is_recoverable());
        assert!(!ShapeMatchError::DimensionMismatch {
            operation: "add",
            left: (1, 2),
            right: (2, 1),
        }
        .is_recoverable());
        assert!(!ShapeMatchError::InvalidInput("percent".into()).is_recoverable());
    }

    #[test]
    fn test_display_mentions_shape() {
        let err = ShapeMatchError::AssignmentShape { rows: 2, columns: 3 };
        assert_eq!(err.to_string(), "assignment needs a square cost matrix, got 2x3");
    }
}
