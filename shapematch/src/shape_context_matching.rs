use crate::binary_map::BinaryMap;
use crate::error::{Result, ShapeMatchError};
use crate::hausdorff_matching::{HausdorffMatching, HausdorffResult};
use crate::hungarian_algorithm::HungarianAlgorithm;
use crate::landmark_pair::{replace_outliers, unzip_pairs, LandmarkPair};
use crate::matching_config::MatchingConfig;
use crate::pca_matching::{PcaAlignment, PcaMatching};
use crate::point::{shift_to_positives, CanvasSize, Point};
use crate::point_set_distance::{NearestNeighborDistance, PointSetDistance};
use crate::sample_selection::{unique_points, RandomSampler, SampleSelector};
use crate::shape_context_builder::ShapeContextBuilder;
use crate::shape_context_descriptor::cost_matrix;
use crate::thin_plate_spline::{ThinPlateSpline, MIN_LANDMARKS};
use log::{debug, info, warn};

/// Where a matching run currently is. Every iteration walks
/// `Sampling → DescriptorBuilding → CorrespondenceSolving → Warping → Evaluating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchingStage {
    Initialized,
    Sampling,
    DescriptorBuilding,
    CorrespondenceSolving,
    Warping,
    Evaluating,
    Done,
}

/// Hook run at the start of every iteration with the working target, which
/// it may modify. Implemented for closures.
pub trait IterationObserver {
    fn on_iteration_start(&mut self, iteration: usize, working_target: &mut Vec<Point>);
}

impl<F> IterationObserver for F
where
    F: FnMut(usize, &mut Vec<Point>),
{
    fn on_iteration_start(&mut self, iteration: usize, working_target: &mut Vec<Point>) {
        self(iteration, working_target)
    }
}

/// What happened in one iteration.
#[derive(Debug, Clone)]
pub struct IterationReport {
    pub iteration: usize,
    /// The last stage entered.
    pub stage_reached: MatchingStage,
    /// Distance of this iteration's warp from the source, when measured.
    pub distance: Option<f64>,
    /// Whether the warp became the new best result.
    pub kept: bool,
    /// Landmark pairs replaced as outliers.
    pub outliers_replaced: usize,
    /// The recoverable error that ended the iteration early, if any.
    pub skipped: Option<ShapeMatchError>,
}

/// Final output of [`ShapeContextMatching::execute`].
///
/// All point sets are in the canvas frame; use
/// [`MatchingResult::result_in_input_frame`] to undo the shift applied by
/// preparation.
#[derive(Debug, Clone)]
pub struct MatchingResult {
    /// Best warped target found.
    pub result: Vec<Point>,
    /// Its distance from the source, if a distance function was supplied.
    pub best_distance: Option<f64>,
    /// The source set in the canvas frame.
    pub source: Vec<Point>,
    pub canvas: CanvasSize,
    /// Offset added to every input point during preparation.
    pub offset: Point,
    pub global_alignment: Option<PcaAlignment>,
    /// Landmark pairs of the last iteration that reached warping.
    pub last_landmarks: Vec<LandmarkPair>,
    pub reports: Vec<IterationReport>,
    /// Mismatch maps between `source` and `result`, when requested.
    pub hausdorff: Option<HausdorffResult>,
}

impl MatchingResult {
    /// `result` translated back into the coordinates the inputs were given in.
    pub fn result_in_input_frame(&self) -> Vec<Point> {
        self.result
            .iter()
            .map(|p| Point::new(p.x - self.offset.x, p.y - self.offset.y))
            .collect()
    }

    /// Number of iterations whose warp was kept.
    pub fn improvements(&self) -> usize {
        self.reports.iter().filter(|r| r.kept).count()
    }
}

/// The best warp found so far, replaced as a unit.
struct BestIterate {
    points: Vec<Point>,
    distance: Option<f64>,
}

struct IterationOutcome {
    trial: Vec<Point>,
    landmarks: Vec<LandmarkPair>,
    outliers_replaced: usize,
}

/// Iterative non-rigid matching of a target point set onto a source point set.
///
/// Preparation optionally aligns the target globally with PCA and moves both
/// sets onto a common non-negative canvas. Each iteration then:
/// 1. draws landmark samples (source samples once per run unless configured
///    otherwise, target samples every time),
/// 2. describes every sample by its shape-context histogram,
/// 3. pairs source and target samples by minimum total χ² cost,
/// 4. replaces outlier pairs by zero-displacement pairs,
/// 5. fits a thin-plate spline taking target landmarks onto source landmarks
///    and warps a copy of the whole working target with it,
/// 6. keeps the warp if it brings the target closer to the source.
///
/// Degenerate draws (singular kernels and the like) only skip their
/// iteration; shape errors abort the run.
///
/// # Examples
/// ```
/// # use shapematch::matching_config::{MatchingConfig, SampleCount};
/// # use shapematch::point::Point;
/// # use shapematch::shape_context_matching::ShapeContextMatching;
/// let source: Vec<Point> = (0..40).map(|i| Point::new(10 + i, 10 + (i * i) % 13)).collect();
/// let target: Vec<Point> = source.iter().map(|p| Point::new(p.x + 3, p.y + 1)).collect();
/// let config = MatchingConfig {
///     number_of_samples: SampleCount::Fixed(10),
///     number_of_iterations: 3,
///     ..Default::default()
/// };
/// let mut matching = ShapeContextMatching::prepare(source, target, config).unwrap();
/// let result = matching.execute_seeded(7).unwrap();
/// assert_eq!(result.reports.len(), 3);
/// assert_eq!(result.result.len(), 40);
/// ```
pub struct ShapeContextMatching {
    config: MatchingConfig,
    source: Vec<Point>,
    target: Vec<Point>,
    canvas: CanvasSize,
    offset: Point,
    alignment: Option<PcaAlignment>,
    sample_count: usize,
    stage: MatchingStage,
}

impl ShapeContextMatching {
    /// Validates the configuration, optionally aligns the target with PCA and
    /// places both sets on a canvas that encloses them.
    pub fn prepare(source: Vec<Point>, target: Vec<Point>, config: MatchingConfig) -> Result<Self> {
        Self::prepare_on_canvas(source, target, config, None)
    }

    /// Like [`ShapeContextMatching::prepare`], but makes the canvas at least
    /// `minimum_canvas` large (e.g. the size of the images the points came
    /// from).
    ///
    /// # Returns
    /// - `InvalidInput` for an invalid configuration.
    /// - `InsufficientSamples` if a set has fewer distinct points than one
    ///   iteration draws, or fewer landmarks are drawn than a spline needs.
    ///   The target is counted after alignment, whose rounding can merge
    ///   points.
    /// - Any PCA error when global alignment is enabled.
    pub fn prepare_on_canvas(
        source: Vec<Point>,
        target: Vec<Point>,
        config: MatchingConfig,
        minimum_canvas: Option<CanvasSize>,
    ) -> Result<Self> {
        let config = config.resolved();
        config.validate()?;

        let (target, alignment) = if config.use_global_alignment_first {
            let alignment = PcaMatching::align(&source, &target)?;
            (alignment.aligned_points(), Some(alignment))
        } else {
            (target, None)
        };

        let distinct_source = unique_points(&source).len();
        let distinct_target = unique_points(&target).len();
        let sample_count = config.sample_count(distinct_source, distinct_target);
        if sample_count < MIN_LANDMARKS {
            return Err(ShapeMatchError::InsufficientSamples {
                requested: MIN_LANDMARKS,
                available: sample_count,
            });
        }
        let available = distinct_source.min(distinct_target);
        if available < sample_count {
            return Err(ShapeMatchError::InsufficientSamples {
                requested: sample_count,
                available,
            });
        }

        let shifted = shift_to_positives(&source, &target);
        let mut canvas = shifted.canvas;
        if let Some(minimum) = minimum_canvas {
            canvas.width = canvas.width.max(minimum.width);
            canvas.height = canvas.height.max(minimum.height);
        }
        debug!(
            "prepared {} source / {} target points on a {}x{} canvas, {} samples",
            shifted.source.len(),
            shifted.target.len(),
            canvas.width,
            canvas.height,
            sample_count
        );

        Ok(ShapeContextMatching {
            config,
            source: shifted.source,
            target: shifted.target,
            canvas,
            offset: shifted.offset,
            alignment,
            sample_count,
            stage: MatchingStage::Initialized,
        })
    }

    pub fn get_config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn get_canvas(&self) -> CanvasSize {
        self.canvas
    }

    pub fn get_stage(&self) -> MatchingStage {
        self.stage
    }

    /// The source set in the canvas frame.
    pub fn get_source(&self) -> &[Point] {
        &self.source
    }

    /// The prepared (possibly PCA-aligned) target in the canvas frame.
    pub fn get_target(&self) -> &[Point] {
        &self.target
    }

    /// Runs with a seeded [`RandomSampler`] and [`NearestNeighborDistance`].
    pub fn execute_seeded(&mut self, seed: u64) -> Result<MatchingResult> {
        let mut sampler = RandomSampler::seeded(seed);
        self.execute(&mut sampler, Some(&NearestNeighborDistance), None)
    }

    /// Runs the configured number of iterations.
    ///
    /// # Parameters
    /// - `sampler`: draws landmark samples.
    /// - `distance`: judges whether a warp improved on the best result. With
    ///   `None`, warps are only accepted if `keep_unjudged_iterates` is set.
    /// - `observer`: optional hook run before each iteration.
    pub fn execute(
        &mut self,
        sampler: &mut dyn SampleSelector,
        distance: Option<&dyn PointSetDistance>,
        mut observer: Option<&mut dyn IterationObserver>,
    ) -> Result<MatchingResult> {
        let builder = ShapeContextBuilder::new(
            self.config.number_of_angular_bins,
            self.config.number_of_radial_bins,
        )?;

        let initial_distance = match distance {
            Some(f) => Some(f.distance(&self.source, &self.target)?),
            None => None,
        };
        let mut best = BestIterate {
            points: self.target.clone(),
            distance: initial_distance,
        };
        let mut working = self.target.clone();
        let mut source_samples: Option<Vec<Point>> = None;
        let mut last_landmarks = Vec::new();
        let mut reports = Vec::with_capacity(self.config.number_of_iterations);
        let mut stagnant = 0usize;

        for iteration in 0..self.config.number_of_iterations {
            if let Some(obs) = observer.as_mut() {
                obs.on_iteration_start(iteration, &mut working);
            }

            let mut report = IterationReport {
                iteration,
                stage_reached: MatchingStage::Sampling,
                distance: None,
                kept: false,
                outliers_replaced: 0,
                skipped: None,
            };

            match self.run_iteration(&builder, sampler, &mut source_samples, &working) {
                Ok(outcome) => {
                    report.outliers_replaced = outcome.outliers_replaced;
                    last_landmarks = outcome.landmarks;
                    self.enter(MatchingStage::Evaluating);

                    match distance {
                        Some(f) => {
                            let d = f.distance(&self.source, &outcome.trial)?;
                            report.distance = Some(d);
                            if best.distance.map_or(true, |b| d < b) {
                                best = BestIterate {
                                    points: outcome.trial,
                                    distance: Some(d),
                                };
                                report.kept = true;
                            }
                        }
                        None if self.config.keep_unjudged_iterates => {
                            best = BestIterate {
                                points: outcome.trial,
                                distance: None,
                            };
                            report.kept = true;
                        }
                        None => {}
                    }
                }
                Err(e) if e.is_recoverable() => {
                    warn!("iteration {iteration} skipped during {:?}: {e}", self.stage);
                    report.skipped = Some(e);
                }
                Err(e) => return Err(e),
            }
            report.stage_reached = self.stage;

            if report.kept {
                working = best.points.clone();
                stagnant = 0;
            } else {
                stagnant += 1;
            }
            debug!(
                "iteration {iteration}: distance {:?}, kept {}",
                report.distance, report.kept
            );
            reports.push(report);

            if let Some(limit) = self.config.max_stagnant_iterations {
                if stagnant >= limit {
                    info!("stopping after {limit} iterations without improvement");
                    break;
                }
            }
        }
        self.enter(MatchingStage::Done);

        let hausdorff = if self.config.with_distance_field {
            Some(HausdorffMatching::calculate(
                &BinaryMap::from_points(&self.source, self.canvas),
                &BinaryMap::from_points(&best.points, self.canvas),
            )?)
        } else {
            None
        };

        let result = MatchingResult {
            result: best.points,
            best_distance: best.distance,
            source: self.source.clone(),
            canvas: self.canvas,
            offset: self.offset,
            global_alignment: self.alignment.clone(),
            last_landmarks,
            reports,
            hausdorff,
        };
        info!(
            "shape context matching: {} iterations, {} improvements, distance {:?}",
            result.reports.len(),
            result.improvements(),
            result.best_distance
        );
        Ok(result)
    }

    fn enter(&mut self, stage: MatchingStage) {
        debug!("stage {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    fn run_iteration(
        &mut self,
        builder: &ShapeContextBuilder,
        sampler: &mut dyn SampleSelector,
        source_samples: &mut Option<Vec<Point>>,
        working: &[Point],
    ) -> Result<IterationOutcome> {
        self.enter(MatchingStage::Sampling);
        let sources = match source_samples.take() {
            Some(samples) if !self.config.resample_source_each_iteration => samples,
            _ => sampler.select(&self.source, self.sample_count)?,
        };
        let sources: &[Point] = source_samples.insert(sources);
        let targets = sampler.select(working, self.sample_count)?;

        self.enter(MatchingStage::DescriptorBuilding);
        let source_descriptors = builder.build(sources);
        let target_descriptors = builder.build(&targets);

        self.enter(MatchingStage::CorrespondenceSolving);
        let costs = cost_matrix(&source_descriptors, &target_descriptors)?;
        let assignment = HungarianAlgorithm::solve(&costs)?;
        let mut landmarks: Vec<LandmarkPair> = assignment
            .pairs()
            .map(|(s, t)| LandmarkPair::new(sources[s], targets[t]))
            .collect();
        let outliers_replaced = replace_outliers(
            &mut landmarks,
            self.config.distance_outlier_threshold_percent,
            self.config.outlier_metric,
            self.canvas,
        );

        self.enter(MatchingStage::Warping);
        let (to, from) = unzip_pairs(&landmarks);
        let field = ThinPlateSpline::calculate(&from, &to, self.canvas)?;
        let trial = field.warp_points(working);

        Ok(IterationOutcome {
            trial,
            landmarks,
            outliers_replaced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching_config::SampleCount;
    use crate::point_set_distance::IndexedEuclidean;

    fn square(offset_x: i32) -> Vec<Point> {
        vec![
            Point::new(10 + offset_x, 10),
            Point::new(30 + offset_x, 10),
            Point::new(30 + offset_x, 30),
            Point::new(10 + offset_x, 30),
        ]
    }

    fn corner_config(use_pca: bool) -> MatchingConfig {
        MatchingConfig {
            number_of_samples: SampleCount::Fixed(4),
            number_of_iterations: 1,
            distance_outlier_threshold_percent: 0.0,
            use_global_alignment_first: use_pca,
            ..Default::default()
        }
    }

    #[test]
    fn test_squares_converge_with_global_alignment() {
        let source = square(0);
        let target = square(50);
        let mut matching = ShapeContextMatching::prepare(source.clone(), target, corner_config(true)).unwrap();
        let result = matching.execute_seeded(1).unwrap();

        let alignment = result.global_alignment.as_ref().unwrap();
        assert!((alignment.x_scale_from_source - 1.0).abs() < 1e-9);
        assert_eq!(result.result_in_input_frame(), source);
        assert!(result.best_distance.unwrap() < 1e-9);
        assert_eq!(matching.get_stage(), MatchingStage::Done);
    }

    #[test]
    fn test_squares_converge_from_correspondences_alone() {
        let source = square(0);
        let target = square(50);
        let mut matching = ShapeContextMatching::prepare(source.clone(), target, corner_config(false)).unwrap();
        let result = matching.execute_seeded(2).unwrap();

        assert_eq!(result.reports.len(), 1);
        assert!(result.reports[0].kept);
        assert_eq!(result.reports[0].stage_reached, MatchingStage::Evaluating);
        assert_eq!(result.result_in_input_frame(), source);
        for pair in &result.last_landmarks {
            assert_eq!(pair.target().x - pair.source().x, 50);
            assert_eq!(pair.target().y, pair.source().y);
        }
        // Corresponding corners end up on top of each other.
        let residual = IndexedEuclidean.distance(&result.source, &result.result).unwrap();
        assert!(residual < 1e-9);
    }

    #[test]
    fn test_outliers_become_fixed_pairs() {
        let mut config = corner_config(false);
        config.distance_outlier_threshold_percent = 10.0;
        let mut matching = ShapeContextMatching::prepare(square(0), square(50), config).unwrap();
        let result = matching.execute_seeded(3).unwrap();
        // Every pair is 50 pixels long, far beyond 10% of the canvas diagonal.
        assert_eq!(result.reports[0].outliers_replaced, 4);
        assert!(result.last_landmarks.iter().all(|p| p.is_fixed()));
        assert!(!result.reports[0].kept);
        assert_eq!(result.result_in_input_frame(), square(50));
    }

    #[test]
    fn test_degenerate_iteration_is_skipped() {
        // Four collinear points make every kernel singular.
        let source = vec![Point::new(0, 0), Point::new(5, 0), Point::new(10, 0), Point::new(15, 0)];
        let target = source.clone();
        let mut matching = ShapeContextMatching::prepare(source, target, corner_config(false)).unwrap();
        let result = matching.execute_seeded(4).unwrap();
        assert!(matches!(
            result.reports[0].skipped,
            Some(ShapeMatchError::SingularMatrix(_))
        ));
        assert_eq!(result.reports[0].stage_reached, MatchingStage::Warping);
    }

    #[test]
    fn test_unjudged_iterates_follow_configuration() {
        let mut sampler = RandomSampler::seeded(5);
        let mut keep = corner_config(false);
        keep.keep_unjudged_iterates = true;
        let mut matching = ShapeContextMatching::prepare(square(0), square(50), keep).unwrap();
        let result = matching.execute(&mut sampler, None, None).unwrap();
        assert!(result.reports[0].kept);
        assert_eq!(result.best_distance, None);
        assert_eq!(result.result_in_input_frame(), square(0));

        let mut matching = ShapeContextMatching::prepare(square(0), square(50), corner_config(false)).unwrap();
        let result = matching.execute(&mut sampler, None, None).unwrap();
        assert!(!result.reports[0].kept);
        assert_eq!(result.result_in_input_frame(), square(50));
    }

    #[test]
    fn test_observer_and_pinned_sampler() {
        let mut calls = Vec::new();
        let mut observer = |i: usize, working: &mut Vec<Point>| calls.push((i, working.len()));
        let mut first_n = |pts: &[Point], n: usize| -> Result<Vec<Point>> { Ok(pts[..n].to_vec()) };
        let mut config = corner_config(false);
        config.number_of_iterations = 3;
        let mut matching = ShapeContextMatching::prepare(square(0), square(50), config).unwrap();
        let result = matching
            .execute(&mut first_n, Some(&NearestNeighborDistance), Some(&mut observer))
            .unwrap();
        assert_eq!(result.reports.len(), 3);
        assert_eq!(result.improvements(), 1);
        assert_eq!(calls, vec![(0, 4), (1, 4), (2, 4)]);
    }

    #[test]
    fn test_stagnation_stops_early() {
        let mut config = corner_config(false);
        config.number_of_iterations = 10;
        config.max_stagnant_iterations = Some(2);
        let mut matching = ShapeContextMatching::prepare(square(0), square(50), config).unwrap();
        let result = matching.execute_seeded(6).unwrap();
        // The first iteration fixes everything, the next two cannot improve.
        assert_eq!(result.reports.len(), 3);
    }

    #[test]
    fn test_distance_field_on_request() {
        let mut config = corner_config(false);
        config.with_distance_field = true;
        let mut matching = ShapeContextMatching::prepare(square(0), square(50), config).unwrap();
        let result = matching.execute_seeded(8).unwrap();
        let maps = result.hausdorff.unwrap();
        assert_eq!(maps.hausdorff_distance(), 0);
    }

    #[test]
    fn test_prepare_rejects_bad_input() {
        let too_few = ShapeContextMatching::prepare(square(0)[..3].to_vec(), square(5), corner_config(false));
        assert!(matches!(too_few, Err(ShapeMatchError::InsufficientSamples { .. })));

        let mut config = corner_config(false);
        config.distance_outlier_threshold_percent = 120.0;
        assert!(matches!(
            ShapeContextMatching::prepare(square(0), square(5), config),
            Err(ShapeMatchError::InvalidInput(_))
        ));

        let mut config = corner_config(false);
        config.number_of_samples = SampleCount::Fixed(3);
        assert!(ShapeContextMatching::prepare(square(0), square(5), config).is_err());
    }

    #[test]
    fn test_prepare_counts_distinct_points() {
        let repeated: Vec<Point> = square(5).into_iter().flat_map(|p| [p; 3]).collect();
        let mut config = corner_config(false);
        config.number_of_samples = SampleCount::Fixed(5);
        assert!(matches!(
            ShapeContextMatching::prepare(square(0).repeat(2), repeated, config),
            Err(ShapeMatchError::InsufficientSamples { requested: 5, available: 4 })
        ));
    }

    #[test]
    fn test_downscaled_target_with_repeated_pixels() {
        // Halving a filled block maps every target pixel four times.
        let source: Vec<Point> = (0..16).flat_map(|y| (0..16).map(move |x| Point::new(x, y))).collect();
        let target: Vec<Point> = source.iter().map(|p| Point::new(40 + p.x / 2, p.y / 2)).collect();
        let config = MatchingConfig {
            number_of_samples: SampleCount::Fixed(8),
            number_of_iterations: 3,
            distance_outlier_threshold_percent: 0.0,
            use_global_alignment_first: false,
            ..Default::default()
        };
        let mut matching = ShapeContextMatching::prepare(source, target, config).unwrap();
        let result = matching.execute_seeded(12).unwrap();

        assert_eq!(result.reports.len(), 3);
        for report in &result.reports {
            assert!(
                !matches!(report.skipped, Some(ShapeMatchError::SingularMatrix(_))),
                "iteration {} hit a singular kernel",
                report.iteration
            );
        }
        assert!(result.reports[0].skipped.is_none());
    }

    #[test]
    fn test_negative_inputs_are_shifted_back() {
        let source: Vec<Point> = square(0).iter().map(|p| Point::new(p.x - 40, p.y - 20)).collect();
        let target: Vec<Point> = square(50).iter().map(|p| Point::new(p.x - 40, p.y - 20)).collect();
        let mut matching = ShapeContextMatching::prepare(source.clone(), target, corner_config(false)).unwrap();
        assert_eq!(matching.get_source().iter().map(|p| p.x).min(), Some(0));
        let result = matching.execute_seeded(9).unwrap();
        assert_eq!(result.offset, Point::new(30, 10));
        assert_eq!(result.result_in_input_frame(), source);
    }
}
