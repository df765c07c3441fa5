//! Seeded random source shared by every draw the simulator makes.
//!
//! The original Python implementation seeds a single global
//! `numpy.random` generator and closes over it inside `ExponentialDist` /
//! `UniformDist` lambdas (see `examples/original_source/.../generators.py`).
//! There are no per-process globals in this port: a single `RandomSource`
//! is owned by `Simulation` and threaded by `&mut` reference into every
//! call site that used to read a lambda, the same "stored seeded random
//! source plus inline draws" collapse called for in the design notes.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};

/// Deterministic source of exponential/uniform draws and random choices.
///
/// Every method takes `&mut self`: callers must hold the one instance
/// owned by the running `Simulation` rather than constructing their own,
/// or two runs with the same seed will not reproduce identical event
/// orderings (testable property 8 in the spec).
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    pub fn new(seed: u64) -> Self {
        RandomSource {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw from Exp(rate) where `rate` is interpreted as a mean (matches
    /// `numpy.random.exponential(scale)`, not the rate parameterization).
    pub fn exponential(&mut self, mean: f64) -> f64 {
        debug_assert!(mean > 0.0, "exponential mean must be positive");
        let dist = Exp::new(1.0 / mean).expect("exponential mean must be positive");
        dist.sample(&mut self.rng)
    }

    /// Uniform draw in `[low, high)`.
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        self.rng.gen_range(low..high)
    }

    /// Uniform integer draw in `[low, high]` inclusive, matching
    /// `numpy.random.integers(low, high)` (exclusive of high in numpy's
    /// legacy API is NOT what's used upstream; the original calls
    /// `integers(1, self.balance)` meaning `[1, balance)`). We keep that
    /// exclusive-of-high behavior here.
    pub fn integer(&mut self, low: i64, high_exclusive: i64) -> i64 {
        self.rng.gen_range(low..high_exclusive)
    }

    /// Uniform integer draw in `[low, high]`, both inclusive.
    pub fn integer_inclusive(&mut self, low: i64, high: i64) -> i64 {
        self.rng.gen_range(low..=high)
    }

    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_same_sequence() {
        let mut a = RandomSource::new(7);
        let mut b = RandomSource::new(7);
        for _ in 0..20 {
            assert_eq!(a.exponential(10.0), b.exponential(10.0));
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = RandomSource::new(1);
        let mut b = RandomSource::new(2);
        let draws_a: Vec<f64> = (0..10).map(|_| a.exponential(10.0)).collect();
        let draws_b: Vec<f64> = (0..10).map(|_| b.exponential(10.0)).collect();
        assert_ne!(draws_a, draws_b);
    }

    #[test]
    fn integer_is_exclusive_of_high() {
        let mut r = RandomSource::new(3);
        for _ in 0..200 {
            let v = r.integer(1, 5);
            assert!((1..5).contains(&v));
        }
    }
}
