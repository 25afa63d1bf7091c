//! The random variate service. A single seeded generator is owned by the simulation and passed
//! explicitly to every rule that draws from it, so a run is fully determined by its seed.

mod sampling;

use log::trace;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};

pub use sampling::{sample_multiple_from_known_length, sample_single};

/// Seed value requesting a randomized seed.
pub const RANDOM_SEED: i64 = -1;

#[derive(Debug, Clone)]
pub struct RandomVariates {
    rng: SmallRng,
    seed: u64,
}

/// Maps a configured seed to a concrete one. Negative values draw a fresh seed from the thread
/// generator.
fn resolve_seed(seed: i64) -> u64 {
    if seed < 0 {
        rand::rng().random()
    } else {
        seed.unsigned_abs()
    }
}

impl RandomVariates {
    #[must_use]
    pub fn new(seed: i64) -> Self {
        let seed = resolve_seed(seed);
        trace!("initializing random variates (seed={seed})");
        Self {
            rng: SmallRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Restarts the stream. Two services reseeded with the same non-negative seed produce
    /// identical sequences.
    pub fn reseed(&mut self, seed: i64) {
        self.seed = resolve_seed(seed);
        trace!("reseeding random variates (seed={})", self.seed);
        self.rng = SmallRng::seed_from_u64(self.seed);
    }

    /// The seed actually in use, after resolving [`RANDOM_SEED`].
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// A uniform draw on `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// A uniform draw on `[min, max)`, computed as `min + (max - min) * u`. A degenerate range
    /// returns `min`.
    pub fn uniform_between(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.uniform()
    }

    /// An exponential draw with the given mean. A non-positive mean never fires.
    pub fn exponential(&mut self, mean: f64) -> f64 {
        match Exp::new(mean.recip()) {
            Ok(distr) if mean > 0.0 => distr.sample(&mut self.rng),
            _ => f64::INFINITY,
        }
    }

    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        match Normal::new(mean, std_dev) {
            Ok(distr) => distr.sample(&mut self.rng),
            Err(_) => mean,
        }
    }

    /// Redraws from `Normal(mean, std_dev)` until the value is non-negative. The mean is
    /// validated non-negative at configuration time, so this terminates.
    pub fn non_negative_normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        if std_dev <= 0.0 {
            return mean.max(0.0);
        }
        loop {
            let value = self.normal(mean, std_dev);
            if value >= 0.0 {
                return value;
            }
        }
    }

    /// Returns true with probability `p` (a uniform draw strictly below `p`).
    pub fn probability_met(&mut self, p: f64) -> bool {
        self.uniform() < p
    }

    /// A uniform index in `0..n`. `n` must be positive.
    pub fn index(&mut self, n: usize) -> usize {
        self.rng.random_range(0..n)
    }

    pub fn choose<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        sample_single(&mut self.rng, items)
    }

    pub fn choose_multiple<T: Copy>(&mut self, items: &[T], requested: usize) -> Vec<T> {
        sample_multiple_from_known_length(&mut self.rng, items, requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn same_seed_same_stream() {
        let mut a = RandomVariates::new(8_675_309);
        let mut b = RandomVariates::new(8_675_309);
        for _ in 0..100 {
            assert_eq!(a.uniform().to_bits(), b.uniform().to_bits());
        }
    }

    #[test]
    fn reseed_restarts_stream() {
        let mut rv = RandomVariates::new(42);
        let first: Vec<f64> = (0..5).map(|_| rv.uniform()).collect();
        rv.reseed(42);
        let second: Vec<f64> = (0..5).map(|_| rv.uniform()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn random_seed_is_resolved() {
        let a = RandomVariates::new(RANDOM_SEED);
        let b = RandomVariates::new(RANDOM_SEED);
        // Two fresh seeds colliding is vanishingly unlikely.
        assert_ne!(a.seed(), b.seed());
    }

    #[test]
    fn uniform_between_bounds() {
        let mut rv = RandomVariates::new(1);
        for _ in 0..1_000 {
            let x = rv.uniform_between(6.0, 9.0);
            assert!((6.0..9.0).contains(&x));
        }
        assert_approx_eq!(rv.uniform_between(14.0, 14.0), 14.0);
    }

    #[test]
    fn exponential_mean() {
        let mut rv = RandomVariates::new(7);
        let n = 100_000;
        let total: f64 = (0..n).map(|_| rv.exponential(3.0)).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = total / n as f64;
        assert_approx_eq!(mean, 3.0, 0.05);
        assert!(rv.exponential(0.0).is_infinite());
    }

    #[test]
    fn non_negative_normal_is_non_negative() {
        let mut rv = RandomVariates::new(3);
        for _ in 0..10_000 {
            assert!(rv.non_negative_normal(17.6, 8.6) >= 0.0);
        }
    }

    #[test]
    fn probability_extremes() {
        let mut rv = RandomVariates::new(3);
        for _ in 0..1_000 {
            assert!(rv.probability_met(1.0));
            assert!(!rv.probability_met(0.0));
        }
    }
}
