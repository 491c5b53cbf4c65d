//! # ShapeMatch Library
//!
//! The `shapematch` library registers two 2-D shapes given as point sets (for
//! example the dark pixels of two drawings). It aligns them globally with PCA,
//! then refines the alignment non-rigidly: landmarks are described by
//! log-polar shape-context histograms, paired by an optimal assignment, and
//! the target is bent onto the source with a thin-plate spline. Hausdorff
//! chamfer maps measure what is left over.
//!
//! ## Overview of Modules
//!
//! - **`shape_context_matching`**: The iterative matcher. Samples landmarks,
//!   builds descriptors, solves the correspondence, warps the target and keeps
//!   the best iterate.
//!
//! - **`shape_match_processor`**: The piped pipeline: PCA alignment, Hausdorff
//!   maps used to bias sampling towards mismatched regions, then matching.
//!
//! - **`matrix`** and **`scalar`**: A dense row-major `Matrix<T>` over any type
//!   implementing the `Scalar` algebra (`f64`, `f32`, `i32`, `i64`).
//!
//! - **`lu_decomposition`** and **`symmetric_eigen`**: Matrix inverse,
//!   determinant and linear solves, and the eigen-decomposition of symmetric
//!   matrices.
//!
//! - **`pca_transform`** and **`pca_matching`**: Principal components of a
//!   point set, and the global alignment of one set onto another.
//!
//! - **`affine_transform`**: The `AffineTransform` struct for 2D linear maps
//!   about an origin followed by a translation.
//!
//! - **`shape_context_builder`** and **`shape_context_descriptor`**: Log-polar
//!   histograms of where the other landmarks lie, and their χ² cost.
//!
//! - **`hungarian_algorithm`**: Minimum-cost perfect assignment on a square
//!   cost matrix.
//!
//! - **`thin_plate_spline`** and **`warp_field`**: The smooth interpolating
//!   warp through landmark pairs, and its dense evaluation over a canvas.
//!
//! - **`binary_map`** and **`hausdorff_matching`**: Occupancy grids, chamfer
//!   distance fields and one-/two-sided mismatch maps.
//!
//! - **`landmark_pair`**, **`sample_selection`**, **`point_set_distance`**:
//!   Landmark correspondences and outlier replacement, sampling strategies, and
//!   the distance functions that judge an iterate.
//!
//! - **`point`**, **`matching_config`**, **`error`**: Shared point and canvas
//!   types, configuration, and the error type.

pub mod error;
pub mod scalar;
pub mod matrix;
pub mod lu_decomposition;
pub mod symmetric_eigen;

pub mod point;
pub mod affine_transform;
pub mod pca_transform;
pub mod pca_matching;

pub mod shape_context_descriptor;
pub mod shape_context_builder;
pub mod hungarian_algorithm;
pub mod landmark_pair;
pub mod thin_plate_spline;
pub mod warp_field;

pub mod binary_map;
pub mod hausdorff_matching;

pub mod matching_config;
pub mod sample_selection;
pub mod point_set_distance;
pub mod shape_context_matching;
pub mod shape_match_processor;

pub use error::{Result, ShapeMatchError};
pub use matching_config::MatchingConfig;
pub use point::{CanvasSize, Point};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
