//! Strategies for picking the landmark subset used in one matching iteration.

use crate::error::{Result, ShapeMatchError};
use crate::matrix::Matrix;
use crate::point::Point;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

/// Upper bound on how many times a single point is repeated in a sample bank.
const MAX_BANK_WEIGHT: i32 = 64;

/// Picks `count` distinct points from a full point set. Repeated entries in
/// the set count once.
///
/// Implemented for closures too, so tests and callers can pin the sample.
pub trait SampleSelector {
    /// # Returns
    /// `InsufficientSamples` if `points` holds fewer than `count` distinct
    /// points.
    fn select(&mut self, points: &[Point], count: usize) -> Result<Vec<Point>>;
}

impl<F> SampleSelector for F
where
    F: FnMut(&[Point], usize) -> Result<Vec<Point>>,
{
    fn select(&mut self, points: &[Point], count: usize) -> Result<Vec<Point>> {
        self(points, count)
    }
}

/// The distinct points of `points`, in order of first occurrence.
pub fn unique_points(points: &[Point]) -> Vec<Point> {
    let mut seen = HashSet::with_capacity(points.len());
    points.iter().copied().filter(|p| seen.insert(*p)).collect()
}

fn check_available(available: usize, count: usize) -> Result<()> {
    if available < count {
        return Err(ShapeMatchError::InsufficientSamples {
            requested: count,
            available,
        });
    }
    Ok(())
}

/// Uniform sampling without replacement from an injectable random source.
///
/// # Examples
/// ```
/// # use shapematch::point::Point;
/// # use shapematch::sample_selection::{RandomSampler, SampleSelector};
/// let points: Vec<Point> = (0..10).map(|i| Point::new(i, 0)).collect();
/// let mut sampler = RandomSampler::seeded(42);
/// let picked = sampler.select(&points, 4).unwrap();
/// assert_eq!(picked.len(), 4);
/// assert!(sampler.select(&points, 11).is_err());
/// ```
pub struct RandomSampler<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomSampler<R> {
    pub fn new(rng: R) -> Self {
        RandomSampler { rng }
    }
}

impl RandomSampler<StdRng> {
    /// A reproducible sampler.
    pub fn seeded(seed: u64) -> Self {
        RandomSampler::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> SampleSelector for RandomSampler<R> {
    fn select(&mut self, points: &[Point], count: usize) -> Result<Vec<Point>> {
        let unique = unique_points(points);
        check_available(unique.len(), count)?;
        Ok(rand::seq::index::sample(&mut self.rng, unique.len(), count)
            .into_iter()
            .map(|i| unique[i])
            .collect())
    }
}

/// Sampling biased towards badly matched points.
///
/// Each point is put into a bank once, plus once more for every unit its
/// value in `distances` (a per-pixel mismatch map such as a one-sided
/// Hausdorff map, indexed `(y, x)`) exceeds `floor`. The bank is shuffled and
/// the first `count` distinct points are taken.
pub struct WeightedBankSampler<R: Rng> {
    rng: R,
    distances: Matrix<i32>,
    floor: i32,
}

impl<R: Rng> WeightedBankSampler<R> {
    pub fn new(rng: R, distances: Matrix<i32>, floor: i32) -> Self {
        WeightedBankSampler {
            rng,
            distances,
            floor,
        }
    }

    /// How many copies of `p` go into the bank.
    pub fn weight(&self, p: &Point) -> usize {
        if p.x < 0 || p.y < 0 {
            return 1;
        }
        let excess = self
            .distances
            .get(p.y as usize, p.x as usize)
            .map_or(0, |d| (d - self.floor).clamp(0, MAX_BANK_WEIGHT));
        1 + excess as usize
    }
}

impl<R: Rng> SampleSelector for WeightedBankSampler<R> {
    fn select(&mut self, points: &[Point], count: usize) -> Result<Vec<Point>> {
        let unique = unique_points(points);
        check_available(unique.len(), count)?;
        let mut bank: Vec<Point> = Vec::new();
        for p in &unique {
            bank.extend(std::iter::repeat(*p).take(self.weight(p)));
        }
        bank.shuffle(&mut self.rng);

        let mut taken = HashSet::with_capacity(count);
        let mut picked = Vec::with_capacity(count);
        for p in bank {
            if picked.len() == count {
                break;
            }
            if taken.insert(p) {
                picked.push(p);
            }
        }
        Ok(picked)
    }
}
