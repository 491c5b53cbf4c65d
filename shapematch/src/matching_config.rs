//! Configuration for iterative shape-context matching.

use crate::error::{Result, ShapeMatchError};
use serde::{Deserialize, Serialize};

/// Auto sampling takes one point in this many from the smaller set.
pub const AUTO_SAMPLE_DIVISOR: usize = 50;

/// How many landmarks to draw from each point set per iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleCount {
    /// `min(|source|, |target|) / 50`, but never fewer than four.
    Auto,
    Fixed(usize),
}

/// How the outlier threshold compares a landmark pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMetric {
    /// Euclidean pair distance against a percentage of the canvas diagonal.
    Euclidean,
    /// Each coordinate difference against the same percentage of the canvas
    /// width (for x) or height (for y).
    PerAxis,
}

/// Configuration for [`ShapeContextMatching`](crate::shape_context_matching::ShapeContextMatching).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Landmarks drawn per set per iteration.
    /// Default: Auto
    pub number_of_samples: SampleCount,

    /// Correspondence + warp rounds to run.
    /// Default: 5
    pub number_of_iterations: usize,

    /// Angular sectors of each shape-context histogram.
    /// Default: 12
    pub number_of_angular_bins: usize,

    /// Log-spaced radial rings of each shape-context histogram.
    /// Default: 5
    pub number_of_radial_bins: usize,

    /// Matched pairs farther apart than this percentage of the canvas are
    /// replaced by a zero-displacement pair. `0` disables filtering.
    /// Must lie in `[0, 100]`.
    /// Default: 10.0
    pub distance_outlier_threshold_percent: f64,

    /// How the outlier threshold is applied.
    /// Default: Euclidean
    pub outlier_metric: OutlierMetric,

    /// Align the target globally with PCA before iterating.
    /// Default: true
    pub use_global_alignment_first: bool,

    /// Draw fresh source landmarks every iteration instead of once per run.
    /// Default: false
    pub resample_source_each_iteration: bool,

    /// With no distance function, accept every iterate instead of keeping the
    /// initial target.
    /// Default: false
    pub keep_unjudged_iterates: bool,

    /// Stop after this many consecutive iterations without improvement.
    /// Default: None (run every iteration)
    pub max_stagnant_iterations: Option<usize>,

    /// Also compute Hausdorff mismatch maps of the final result.
    /// Default: false
    pub with_distance_field: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            number_of_samples: SampleCount::Auto,
            number_of_iterations: 5,
            number_of_angular_bins: 12,
            number_of_radial_bins: 5,
            distance_outlier_threshold_percent: 10.0,
            outlier_metric: OutlierMetric::Euclidean,
            use_global_alignment_first: true,
            resample_source_each_iteration: false,
            keep_unjudged_iterates: false,
            max_stagnant_iterations: None,
            with_distance_field: false,
        }
    }
}

impl MatchingConfig {
    /// Replaces zero-valued counts (used as "unset" markers) with defaults.
    pub fn resolved(&self) -> Self {
        let defaults = Self::default();
        let or_default = |value: usize, default: usize| if value == 0 { default } else { value };
        Self {
            number_of_iterations: or_default(self.number_of_iterations, defaults.number_of_iterations),
            number_of_angular_bins: or_default(self.number_of_angular_bins, defaults.number_of_angular_bins),
            number_of_radial_bins: or_default(self.number_of_radial_bins, defaults.number_of_radial_bins),
            number_of_samples: match self.number_of_samples {
                SampleCount::Fixed(0) => SampleCount::Auto,
                other => other,
            },
            ..self.clone()
        }
    }

    /// Checks ranges that cannot be defaulted.
    ///
    /// # Returns
    /// `InvalidInput` if the outlier percentage is outside `[0, 100]`.
    pub fn validate(&self) -> Result<()> {
        let pct = self.distance_outlier_threshold_percent;
        if !(0.0..=100.0).contains(&pct) {
            return Err(ShapeMatchError::InvalidInput(format!(
                "distance outlier threshold must be within [0, 100], got {pct}"
            )));
        }
        Ok(())
    }

    /// Landmarks per iteration for sets of the given sizes.
    pub fn sample_count(&self, source_len: usize, target_len: usize) -> usize {
        match self.number_of_samples {
            SampleCount::Fixed(n) => n,
            SampleCount::Auto => (source_len.min(target_len) / AUTO_SAMPLE_DIVISOR).max(4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = MatchingConfig::default();
        assert_eq!(config.number_of_samples, SampleCount::Auto);
        assert_eq!(config.number_of_iterations, 5);
        assert_eq!(config.number_of_angular_bins, 12);
        assert_eq!(config.number_of_radial_bins, 5);
        assert!(config.use_global_alignment_first);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolved_replaces_unset_values() {
        let config = MatchingConfig {
            number_of_iterations: 0,
            number_of_radial_bins: 0,
            number_of_samples: SampleCount::Fixed(0),
            number_of_angular_bins: 8,
            ..Default::default()
        }
        .resolved();
        assert_eq!(config.number_of_iterations, 5);
        assert_eq!(config.number_of_radial_bins, 5);
        assert_eq!(config.number_of_angular_bins, 8);
        assert_eq!(config.number_of_samples, SampleCount::Auto);
    }

    #[test]
    fn test_threshold_range() {
        for bad in [-1.0, 100.5, f64::NAN] {
            let config = MatchingConfig {
                distance_outlier_threshold_percent: bad,
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_sample_count() {
        let mut config = MatchingConfig::default();
        assert_eq!(config.sample_count(1000, 600), 12);
        assert_eq!(config.sample_count(10, 600), 4);
        config.number_of_samples = SampleCount::Fixed(30);
        assert_eq!(config.sample_count(10, 600), 30);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: MatchingConfig = serde_json::from_str(
            r#"{ "number_of_samples": { "fixed": 40 }, "outlier_metric": "per_axis" }"#,
        )
        .unwrap();
        assert_eq!(config.number_of_samples, SampleCount::Fixed(40));
        assert_eq!(config.outlier_metric, OutlierMetric::PerAxis);
        assert_eq!(config.number_of_iterations, 5);

        let auto: MatchingConfig = serde_json::from_str(r#"{ "number_of_samples": "auto" }"#).unwrap();
        assert_eq!(auto.number_of_samples, SampleCount::Auto);
    }
}
