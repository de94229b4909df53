//! Random-number facade for the whole generator.
//!
//! Every stage draws through one seeded [`GenRng`] so that a run is fully
//! reproducible from its seed.  The facade exposes exactly the draws the
//! pipeline needs: a unit uniform, uniform integer ranges, normal and gamma
//! variates for document lengths, and a piecewise-linear inverse-CDF draw
//! for segmented length models.

use anyhow::{bail, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Gamma, Normal};

pub struct GenRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl GenRng {
    /// A generator seeded with `seed`.  Seed 0 means "pick one from the
    /// wall clock"; the chosen seed is retrievable via [`GenRng::seed`] so
    /// it can be reported and the run reproduced.
    pub fn seeded(seed: u64) -> GenRng {
        let seed = if seed == 0 {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64 % 100_000)
                .unwrap_or(1)
                .max(1)
        } else {
            seed
        };
        GenRng {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform f64 in [0, 1).
    #[inline]
    pub fn unit(&mut self) -> f64 {
        self.inner.random::<f64>()
    }

    /// Uniform index in [0, n).
    #[inline]
    pub fn index(&mut self, n: usize) -> usize {
        self.inner.random_range(0..n)
    }

    /// Uniform integer in [min, max], both inclusive.
    #[inline]
    pub fn range_u64(&mut self, min: u64, max: u64) -> u64 {
        self.inner.random_range(min..=max)
    }

    /// One draw from Normal(mean, stdev).  A zero stdev yields `mean`.
    pub fn normal(&mut self, mean: f64, stdev: f64) -> Result<f64> {
        match Normal::new(mean, stdev) {
            Ok(dist) => Ok(dist.sample(&mut self.inner)),
            Err(e) => bail!("invalid normal parameters ({mean}, {stdev}): {e}"),
        }
    }

    /// One draw from Gamma(shape, scale).
    pub fn gamma(&mut self, shape: f64, scale: f64) -> Result<f64> {
        match Gamma::new(shape, scale) {
            Ok(dist) => Ok(dist.sample(&mut self.inner)),
            Err(e) => bail!("invalid gamma parameters ({shape}, {scale}): {e}"),
        }
    }

    /// Inverse-CDF draw from a piecewise-linear cumulative distribution.
    ///
    /// `cumprobs` must be nondecreasing with a final value of 1.0 and
    /// `xvals` holds the x coordinate of each segment end.  The draw picks
    /// the first segment whose cumulative probability covers the uniform,
    /// then interpolates linearly inside it.  The segment list is expected
    /// to be short, so the search is linear.
    pub fn cumdist(&mut self, cumprobs: &[f64], xvals: &[f64]) -> Result<f64> {
        debug_assert_eq!(cumprobs.len(), xvals.len());
        let unirand = self.unit();
        for s in 0..cumprobs.len() {
            if unirand <= cumprobs[s] {
                let (loprob, loxval) = if s == 0 {
                    (0.0, 1.0)
                } else {
                    (cumprobs[s - 1], xvals[s - 1])
                };
                let probstep = cumprobs[s] - loprob;
                let frac = if probstep > 0.0 {
                    (unirand - loprob) / probstep
                } else {
                    0.0
                };
                return Ok(loxval + frac * (xvals[s] - loxval));
            }
        }
        bail!("piecewise length distribution does not reach 1.0 (drew {unirand})");
    }
}

impl rand::RngCore for GenRng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }
}
