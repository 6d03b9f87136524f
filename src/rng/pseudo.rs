//! Seeded pseudo-random stream for sequential path generation
//!
//! Wraps ChaCha8 so that a pricing run is fully determined by its 64-bit
//! seed. For parallel execution use the stateless generators in
//! [`crate::rng::hash`] instead; this stream is strictly sequential.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

/// Smallest distance a uniform draw is kept away from 0 and 1, so that
/// logarithms and Box-Muller never see a degenerate input.
pub const UNIFORM_EPS: f64 = 1e-12;

/// Seeded random stream owned by a single simulation call.
pub struct PathRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl PathRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed this stream was created with
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Standard normal variate
    pub fn gauss(&mut self) -> f64 {
        StandardNormal.sample(&mut self.inner)
    }

    /// Uniform variate clamped into (0, 1)
    pub fn uniform(&mut self) -> f64 {
        let u: f64 = self.inner.gen();
        u.clamp(UNIFORM_EPS, 1.0 - UNIFORM_EPS)
    }

    /// Pair of standard normals with correlation `rho`:
    /// z2 = rho * z1 + sqrt(1 - rho²) * z1'
    pub fn correlated_pair(&mut self, rho: f64) -> (f64, f64) {
        let z1 = self.gauss();
        let z2 = rho * z1 + (1.0 - rho * rho).max(0.0).sqrt() * self.gauss();
        (z1, z2)
    }
}
