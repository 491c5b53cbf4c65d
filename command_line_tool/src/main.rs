use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use image::{Rgb, RgbImage};
use log::info;
use serde::Serialize;
use shapematch::binary_map::BinaryMap;
use shapematch::hausdorff_matching::{HausdorffMatching, HausdorffResult};
use shapematch::landmark_pair::LandmarkPair;
use shapematch::matching_config::{MatchingConfig, SampleCount};
use shapematch::pca_matching::{PcaAlignment, PcaMatching};
use shapematch::shape_context_matching::{MatchingResult, ShapeContextMatching};
use shapematch::shape_match_processor::ShapeMatchProcessor;
use shapematch::{CanvasSize, Point};
use std::fs;
use std::io::Write;

const SOURCE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const RESULT_COLOR: Rgb<u8> = Rgb([0, 160, 0]);
const MATCHING_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Which algorithm to run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
enum Mode {
    /// Global alignment only.
    Pca,
    /// Iterative shape-context matching.
    ShapeContext,
    /// Mismatch maps between the two shapes as drawn.
    Hausdorff,
    /// PCA, Hausdorff-weighted sampling, then shape-context matching.
    Piped,
}

/// Command line arguments structure.
#[derive(Parser, Debug)]
#[command(author, version, about = "CLI for matching the shapes drawn in two images.")]
struct Args {
    /// Source image filename (the shape to match onto)
    #[arg()]
    source: String,

    /// Target image filename (the shape that gets moved)
    #[arg()]
    target: String,

    /// Algorithm to run.
    #[arg(long, value_enum, default_value_t = Mode::Piped)]
    mode: Mode,

    /// A pixel belongs to the shape when every channel is below this
    /// threshold, given as "r,g,b".
    #[arg(long, default_value = "200,200,200")]
    threshold: String,

    /// JSON file with a matching configuration. Missing fields use defaults.
    #[arg(long)]
    config: Option<String>,

    /// Overrides the configured number of samples per iteration.
    #[arg(long)]
    samples: Option<usize>,

    /// Overrides the configured number of iterations.
    #[arg(long)]
    iterations: Option<usize>,

    /// Seed for landmark sampling.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Output image: an overlay of source and result, or the colour-coded
    /// distance map in hausdorff mode.
    #[arg(long, default_value = "result.png")]
    output: String,

    /// Draw the last landmark correspondences into the overlay.
    #[arg(long)]
    draw_correspondences: bool,

    /// Optionally write the scalar results as JSON.
    #[arg(long)]
    summary: Option<String>,
}

#[derive(Debug, Default, Serialize)]
struct Summary {
    mode: Option<Mode>,
    source_points: usize,
    target_points: usize,
    angle_from_source: Option<f64>,
    x_scale_from_source: Option<f64>,
    y_scale_from_source: Option<f64>,
    best_distance: Option<f64>,
    iterations_run: Option<usize>,
    improvements: Option<usize>,
    skipped_iterations: Option<usize>,
    hausdorff_distance: Option<i32>,
    directed_source_to_target: Option<i32>,
    directed_target_to_source: Option<i32>,
}

impl Summary {
    fn add_alignment(&mut self, alignment: &PcaAlignment) {
        self.angle_from_source = Some(alignment.angle_from_source);
        self.x_scale_from_source = Some(alignment.x_scale_from_source);
        self.y_scale_from_source = Some(alignment.y_scale_from_source);
    }

    fn add_matching(&mut self, result: &MatchingResult) {
        self.best_distance = result.best_distance;
        self.iterations_run = Some(result.reports.len());
        self.improvements = Some(result.improvements());
        self.skipped_iterations = Some(result.reports.iter().filter(|r| r.skipped.is_some()).count());
        if let Some(alignment) = &result.global_alignment {
            self.add_alignment(alignment);
        }
    }

    fn add_hausdorff(&mut self, maps: &HausdorffResult) {
        self.hausdorff_distance = Some(maps.hausdorff_distance());
        self.directed_source_to_target = Some(maps.directed_first_to_second());
        self.directed_target_to_source = Some(maps.directed_second_to_first());
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{}] {} - {}", record.level(), record.target(), record.args()))
        .init();

    let args = Args::parse();
    let threshold = parse_threshold(&args.threshold)?;
    let config = load_config(&args)?;

    let source_image = read_image(&args.source)?;
    let target_image = read_image(&args.target)?;
    let canvas = CanvasSize::new(
        source_image.width().max(target_image.width()) as usize,
        source_image.height().max(target_image.height()) as usize,
    );
    let source = extract_points(&source_image, threshold);
    let target = extract_points(&target_image, threshold);
    info!("extracted {} source and {} target points", source.len(), target.len());

    let mut summary = Summary {
        mode: Some(args.mode),
        source_points: source.len(),
        target_points: target.len(),
        ..Default::default()
    };

    match args.mode {
        Mode::Pca => {
            let alignment = PcaMatching::align(&source, &target)?;
            summary.add_alignment(&alignment);
            save_image(overlay(canvas, &source, &alignment.aligned_points(), &[]), &args.output)?;
        }
        Mode::ShapeContext => {
            let mut matching = ShapeContextMatching::prepare_on_canvas(source.clone(), target, config, Some(canvas))?;
            let result = matching.execute_seeded(args.seed)?;
            summary.add_matching(&result);
            if let Some(maps) = &result.hausdorff {
                summary.add_hausdorff(maps);
            }
            let lines = correspondence_lines(&result, args.draw_correspondences);
            save_image(overlay(canvas, &source, &result.result_in_input_frame(), &lines), &args.output)?;
        }
        Mode::Hausdorff => {
            let first = BinaryMap::from_points(&source, canvas);
            let second = BinaryMap::from_points(&target, canvas);
            let maps = HausdorffMatching::calculate(&first, &second)?;
            summary.add_hausdorff(&maps);
            save_image(distance_image(&maps, &first, &second), &args.output)?;
        }
        Mode::Piped => {
            let output = ShapeMatchProcessor::new(source.clone(), target, config)
                .with_canvas(canvas)
                .with_seed(args.seed)
                .run()?;
            summary.add_matching(&output.matching);
            summary.add_hausdorff(&output.final_maps);
            let lines = correspondence_lines(&output.matching, args.draw_correspondences);
            save_image(
                overlay(canvas, &source, &output.matching.result_in_input_frame(), &lines),
                &args.output,
            )?;
        }
    }

    if let Some(path) = &args.summary {
        let text = serde_json::to_string_pretty(&summary)?;
        fs::write(path, text).with_context(|| format!("could not write summary to {path}"))?;
        info!("summary written to {path}");
    }

    println!("Done.");
    Ok(())
}

/// Parses "r,g,b" into three channel thresholds.
fn parse_threshold(text: &str) -> Result<[u8; 3]> {
    let channels: Vec<&str> = text.split(',').map(str::trim).collect();
    if channels.len() != 3 {
        bail!("threshold must be three comma separated values, got {text:?}");
    }
    let mut threshold = [0u8; 3];
    for (slot, channel) in threshold.iter_mut().zip(channels) {
        *slot = channel
            .parse()
            .with_context(|| format!("invalid threshold channel {channel:?}"))?;
    }
    Ok(threshold)
}

fn load_config(args: &Args) -> Result<MatchingConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("could not read config {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("invalid config {path}"))?
        }
        None => MatchingConfig::default(),
    };
    if let Some(samples) = args.samples {
        config.number_of_samples = SampleCount::Fixed(samples);
    }
    if let Some(iterations) = args.iterations {
        config.number_of_iterations = iterations;
    }
    Ok(config)
}

fn read_image(filename: &str) -> Result<RgbImage> {
    info!("Reading image file: {filename}");
    let img = image::open(filename).with_context(|| format!("could not load image {filename}"))?;
    Ok(img.to_rgb8())
}

fn save_image(img: RgbImage, filename: &str) -> Result<()> {
    info!("Writing image {filename}");
    img.save(filename).with_context(|| format!("could not write image {filename}"))
}

/// Every pixel whose channels are all below `threshold`.
fn extract_points(img: &RgbImage, threshold: [u8; 3]) -> Vec<Point> {
    img.enumerate_pixels()
        .filter(|(_, _, px)| px.0.iter().zip(threshold).all(|(&c, t)| c < t))
        .map(|(x, y, _)| Point::new(x as i32, y as i32))
        .collect()
}

/// Last landmark pairs of a matching run, moved back to the input frame.
fn correspondence_lines(result: &MatchingResult, enabled: bool) -> Vec<(Point, Point)> {
    if !enabled {
        return Vec::new();
    }
    let back = |p: Point| Point::new(p.x - result.offset.x, p.y - result.offset.y);
    result
        .last_landmarks
        .iter()
        .map(|pair: &LandmarkPair| (back(pair.source()), back(pair.target())))
        .collect()
}

fn put(img: &mut RgbImage, p: Point, color: Rgb<u8>) {
    if p.x >= 0 && p.y >= 0 && (p.x as u32) < img.width() && (p.y as u32) < img.height() {
        img.put_pixel(p.x as u32, p.y as u32, color);
    }
}

fn draw_line(img: &mut RgbImage, a: Point, b: Point, color: Rgb<u8>) {
    let steps = (b.x - a.x).abs().max((b.y - a.y).abs()).max(1);
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let x = a.x as f64 + t * (b.x - a.x) as f64;
        let y = a.y as f64 + t * (b.y - a.y) as f64;
        put(img, Point::from_f64(x, y), color);
    }
}

/// Source in red, result in green, correspondences in black.
fn overlay(canvas: CanvasSize, source: &[Point], result: &[Point], lines: &[(Point, Point)]) -> RgbImage {
    let mut img = RgbImage::from_pixel(canvas.width as u32, canvas.height as u32, BACKGROUND);
    for &(a, b) in lines {
        draw_line(&mut img, a, b, MATCHING_COLOR);
    }
    for &p in source {
        put(&mut img, p, SOURCE_COLOR);
    }
    for &p in result {
        put(&mut img, p, RESULT_COLOR);
    }
    img
}

/// The two-sided mismatch map over both shapes: blue for perfectly matched
/// pixels shading to red for the worst ones, white off the shapes.
fn distance_image(maps: &HausdorffResult, first: &BinaryMap, second: &BinaryMap) -> RgbImage {
    let (height, width) = maps.two_sided.shape();
    let local_max = maps.two_sided.max().unwrap_or(0).max(1) as f64;
    let mut img = RgbImage::from_pixel(width as u32, height as u32, BACKGROUND);
    for y in 0..height {
        for x in 0..width {
            if !first.is_set(x, y) && !second.is_set(x, y) {
                continue;
            }
            let t = maps.two_sided[(y, x)] as f64 / local_max;
            let red = (255.0 * t).round() as u8;
            let blue = (255.0 * (1.0 - t)).round() as u8;
            img.put_pixel(x as u32, y as u32, Rgb([red, 0, blue]));
        }
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_threshold() {
        assert_eq!(parse_threshold("200,200,200").unwrap(), [200, 200, 200]);
        assert_eq!(parse_threshold(" 10, 20 ,30").unwrap(), [10, 20, 30]);
        assert!(parse_threshold("200,200").is_err());
        assert!(parse_threshold("300,0,0").is_err());
    }

    #[test]
    fn test_extract_points_uses_every_channel() {
        let mut img = RgbImage::from_pixel(3, 2, BACKGROUND);
        img.put_pixel(1, 0, Rgb([0, 0, 0]));
        img.put_pixel(2, 1, Rgb([10, 250, 10]));
        let points = extract_points(&img, [200, 200, 200]);
        assert_eq!(points, vec![Point::new(1, 0)]);
    }

    #[test]
    fn test_draw_line_reaches_both_ends() {
        let mut img = RgbImage::from_pixel(10, 10, BACKGROUND);
        draw_line(&mut img, Point::new(1, 1), Point::new(8, 4), MATCHING_COLOR);
        assert_eq!(*img.get_pixel(1, 1), MATCHING_COLOR);
        assert_eq!(*img.get_pixel(8, 4), MATCHING_COLOR);
    }

    #[test]
    fn test_distance_image_colours_only_shape_pixels() {
        let canvas = CanvasSize::new(6, 1);
        let first = BinaryMap::from_points(&[Point::new(0, 0)], canvas);
        let second = BinaryMap::from_points(&[Point::new(0, 0), Point::new(4, 0)], canvas);
        let maps = HausdorffMatching::calculate(&first, &second).unwrap();
        let img = distance_image(&maps, &first, &second);
        assert_eq!(*img.get_pixel(0, 0), Rgb([0, 0, 255]));
        assert_eq!(*img.get_pixel(4, 0), Rgb([255, 0, 0]));
        assert_eq!(*img.get_pixel(2, 0), BACKGROUND);
    }
}
