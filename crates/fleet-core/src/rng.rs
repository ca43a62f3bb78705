//! Deterministic, stream-splittable RNG.
//!
//! # Determinism strategy
//!
//! A simulation never shares one RNG across unrelated draws.  Instead each
//! logical stream (one simulated hour of arrivals, the robot-behaviour model,
//! …) gets its own `SmallRng` seeded by:
//!
//!   seed = global_seed XOR (stream * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive stream numbers uniformly across the seed space.
//! Hour `h` therefore draws the same values whether the scheduler was filled
//! eagerly for the whole horizon or one day at a time.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Poisson draws above this mean are split into chunks, because Knuth's
/// product method underflows `exp(-lambda)` for large `lambda`.
const POISSON_CHUNK: f64 = 30.0;

/// Simulation-level RNG.
///
/// Used only in single-threaded contexts.  Derive an independent stream with
/// [`SimRng::stream`] rather than sharing one instance.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// An independent RNG for logical stream `stream` under `global_seed`.
    pub fn stream(global_seed: u64, stream: u64) -> Self {
        let seed = global_seed ^ stream.wrapping_add(1).wrapping_mul(MIXING_CONSTANT);
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Uniform `f64` in `[0, 1)`.
    #[inline]
    pub fn unit(&mut self) -> f64 {
        self.0.r#gen::<f64>()
    }

    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Poisson-distributed count with mean `lambda`.
    ///
    /// Returns 0 for non-positive or non-finite `lambda`.
    pub fn poisson(&mut self, lambda: f64) -> u32 {
        if !lambda.is_finite() || lambda <= 0.0 {
            return 0;
        }
        // Sum of independent Poissons is Poisson with the summed mean.
        let mut remaining = lambda;
        let mut total = 0u32;
        while remaining > 0.0 {
            let chunk = remaining.min(POISSON_CHUNK);
            remaining -= chunk;
            total += self.poisson_knuth(chunk);
        }
        total
    }

    fn poisson_knuth(&mut self, lambda: f64) -> u32 {
        let limit = (-lambda).exp();
        let mut product = self.unit();
        let mut count = 0u32;
        while product > limit {
            count += 1;
            product *= self.unit();
        }
        count
    }

    /// A value jittered uniformly within `±fraction` of `mean`.
    pub fn jitter(&mut self, mean: f64, fraction: f64) -> f64 {
        let spread = mean.abs() * fraction.clamp(0.0, 1.0);
        if spread == 0.0 {
            return mean;
        }
        self.0.gen_range(mean - spread..=mean + spread)
    }
}
