use crate::binary_map::BinaryMap;
use crate::error::Result;
use crate::hausdorff_matching::{HausdorffMatching, HausdorffResult};
use crate::matching_config::MatchingConfig;
use crate::pca_matching::{PcaAlignment, PcaMatching};
use crate::point::{shift_to_positives, CanvasSize, Point};
use crate::point_set_distance::NearestNeighborDistance;
use crate::sample_selection::WeightedBankSampler;
use crate::shape_context_matching::{MatchingResult, ShapeContextMatching};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Mismatch (in pixels) a point may have before it gets extra weight in the
/// sample bank.
pub const DEFAULT_BANK_FLOOR: i32 = 2;

/// Everything the piped pipeline produced.
#[derive(Debug, Clone)]
pub struct ProcessorOutput {
    /// The global PCA alignment of the target onto the source.
    pub alignment: PcaAlignment,
    /// Mismatch maps between the source and the PCA-aligned target.
    pub initial_maps: HausdorffResult,
    /// The shape-context matching of the aligned target. Its `offset` maps
    /// back to the input frame.
    pub matching: MatchingResult,
    /// Mismatch maps between the source and the matched target.
    pub final_maps: HausdorffResult,
}

/// Runs the full matching pipeline on two point sets:
/// 1. **Global alignment** of the target onto the source with PCA.
/// 2. **Shift** of both sets onto a common non-negative canvas.
/// 3. **Hausdorff maps** of the aligned pair, used to weight a sample bank so
///    that badly matched regions are sampled more often.
/// 4. **Shape-context matching** drawing its landmarks from that bank.
/// 5. Hausdorff maps of the final result.
pub struct ShapeMatchProcessor {
    source: Vec<Point>,
    target: Vec<Point>,
    config: MatchingConfig,
    minimum_canvas: Option<CanvasSize>,
    bank_floor: i32,
    seed: u64,
}

impl ShapeMatchProcessor {
    /// Creates a processor matching `target` onto `source`.
    ///
    /// `config.use_global_alignment_first` is ignored: the pipeline always
    /// aligns first.
    pub fn new(source: Vec<Point>, target: Vec<Point>, config: MatchingConfig) -> Self {
        ShapeMatchProcessor {
            source,
            target,
            config,
            minimum_canvas: None,
            bank_floor: DEFAULT_BANK_FLOOR,
            seed: 0,
        }
    }

    /// Makes the working canvas at least this large.
    pub fn with_canvas(mut self, canvas: CanvasSize) -> Self {
        self.minimum_canvas = Some(canvas);
        self
    }

    pub fn with_bank_floor(mut self, floor: i32) -> Self {
        self.bank_floor = floor;
        self
    }

    /// Seeds the sample bank's shuffling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Runs every stage in order.
    ///
    /// # Returns
    /// The first error of any stage; see [`PcaMatching::align`] and
    /// [`ShapeContextMatching::prepare_on_canvas`].
    pub fn run(&self) -> Result<ProcessorOutput> {
        let alignment = PcaMatching::align(&self.source, &self.target)?;
        let shifted = shift_to_positives(&self.source, &alignment.aligned_points());
        let mut canvas = shifted.canvas;
        if let Some(minimum) = self.minimum_canvas {
            canvas.width = canvas.width.max(minimum.width);
            canvas.height = canvas.height.max(minimum.height);
        }

        let initial_maps = HausdorffMatching::calculate(
            &BinaryMap::from_points(&shifted.source, canvas),
            &BinaryMap::from_points(&shifted.target, canvas),
        )?;
        info!(
            "piped: aligned at {:.4} rad, hausdorff distance {}",
            alignment.angle_from_source,
            initial_maps.hausdorff_distance()
        );

        let config = MatchingConfig {
            use_global_alignment_first: false,
            ..self.config.clone()
        };
        // Both sets are already non-negative, so preparation adds no offset.
        let mut matching =
            ShapeContextMatching::prepare_on_canvas(shifted.source, shifted.target, config, Some(canvas))?;
        let mut sampler = WeightedBankSampler::new(
            StdRng::seed_from_u64(self.seed),
            initial_maps.two_sided.clone(),
            self.bank_floor,
        );
        let mut result = matching.execute(&mut sampler, Some(&NearestNeighborDistance), None)?;
        result.offset = shifted.offset;
        result.global_alignment = Some(alignment.clone());

        let final_maps = HausdorffMatching::calculate(
            &BinaryMap::from_points(&result.source, result.canvas),
            &BinaryMap::from_points(&result.result, result.canvas),
        )?;
        info!(
            "piped: hausdorff distance {} -> {}",
            initial_maps.hausdorff_distance(),
            final_maps.hausdorff_distance()
        );

        Ok(ProcessorOutput {
            alignment,
            initial_maps,
            matching: result,
            final_maps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShapeMatchError;
    use crate::matching_config::SampleCount;

    fn letter_l(dx: i32, dy: i32) -> Vec<Point> {
        let mut pts: Vec<Point> = (0..30).map(|i| Point::new(dx, dy + i)).collect();
        pts.extend((1..15).map(|i| Point::new(dx + i, dy + 29)));
        pts
    }

    fn config() -> MatchingConfig {
        MatchingConfig {
            number_of_samples: SampleCount::Fixed(8),
            number_of_iterations: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_translated_copy_is_matched_exactly() {
        let source = letter_l(-5, 3);
        let target = letter_l(40, 60);
        let output = ShapeMatchProcessor::new(source.clone(), target, config())
            .with_seed(11)
            .run()
            .unwrap();

        assert_eq!(output.initial_maps.hausdorff_distance(), 0);
        assert_eq!(output.final_maps.hausdorff_distance(), 0);
        assert_eq!(output.matching.offset, Point::new(5, 0));
        let mut matched = output.matching.result_in_input_frame();
        matched.sort();
        let mut expected = source;
        expected.sort();
        assert_eq!(matched, expected);
        assert_eq!(output.matching.reports.len(), 2);
    }

    #[test]
    fn test_canvas_is_at_least_requested_size() {
        let output = ShapeMatchProcessor::new(letter_l(0, 0), letter_l(3, 3), config())
            .with_canvas(CanvasSize::new(200, 150))
            .run()
            .unwrap();
        assert_eq!(output.matching.canvas, CanvasSize::new(200, 150));
        assert_eq!(output.final_maps.two_sided.shape(), (150, 200));
    }

    #[test]
    fn test_collinear_input_fails_alignment() {
        let line: Vec<Point> = (0..20).map(|i| Point::new(i, 4)).collect();
        let result = ShapeMatchProcessor::new(line.clone(), line, config()).run();
        assert!(matches!(result, Err(ShapeMatchError::SingularMatrix(_))));
    }
}
