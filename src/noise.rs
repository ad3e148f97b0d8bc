use log::{error, warn};
use nalgebra::DMatrix;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::error::Error;

/// Maximal number of draws when a strictly positive sample is required
const MAX_POSITIVE_DRAWS: usize = 10_000;

/// Measurement noise generator. Each adapter owns one, so that
/// simulations are reproducible from a seed and cloned adapters
/// draw the same sequence.
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    rng: SmallRng,
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl NoiseGenerator {
    /// Builds a new [NoiseGenerator], seeded when `seed` is provided,
    /// from system entropy otherwise.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let mut generator = rand::rng();
                SmallRng::from_rng(&mut generator)
            },
        };
        Self { rng }
    }

    /// Draws from N(mean, sigma). Returns `mean` for null sigma.
    pub fn gaussian(&mut self, mean: f64, sigma: f64) -> f64 {
        if sigma <= 0.0 {
            return mean;
        }
        match Normal::new(mean, sigma) {
            Ok(normal) => normal.sample(&mut self.rng),
            Err(e) => {
                warn!("invalid noise distribution N({}, {}): {}", mean, sigma, e);
                mean
            },
        }
    }

    /// Draws from N(mean, sigma) until the sample is strictly positive.
    /// Returns `mean` for null sigma. Fails after `MAX_POSITIVE_DRAWS` draws.
    pub fn positive_gaussian(&mut self, mean: f64, sigma: f64) -> Result<f64, Error> {
        if sigma <= 0.0 {
            return Ok(mean);
        }

        for _ in 0..MAX_POSITIVE_DRAWS {
            let value = self.gaussian(mean, sigma);
            if value > 0.0 {
                return Ok(value);
            }
        }

        error!(
            "no positive sample of N({}, {}) after {} draws",
            mean, sigma, MAX_POSITIVE_DRAWS
        );

        Err(Error::NonPositiveNoise {
            mean,
            sigma,
            draws: MAX_POSITIVE_DRAWS,
        })
    }

    /// Picks an index in `0..len` (len > 0)
    pub fn pick(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }
}

/// Diagonal measurement error covariance: sigma² per signal path,
/// unity where sigma is null.
pub(crate) fn diagonal_covariance(sigmas: &[f64]) -> DMatrix<f64> {
    let mut covariance = DMatrix::zeros(sigmas.len(), sigmas.len());
    for (i, sigma) in sigmas.iter().enumerate() {
        covariance[(i, i)] = if *sigma == 0.0 { 1.0 } else { sigma * sigma };
    }
    covariance
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn seeded_sequences() {
        let mut a = NoiseGenerator::new(Some(42));
        let mut b = a.clone();
        for _ in 0..100 {
            assert_eq!(a.gaussian(10.0, 1.0), b.gaussian(10.0, 1.0));
        }
        let mut c = NoiseGenerator::new(Some(42));
        let mut d = NoiseGenerator::new(Some(42));
        assert_eq!(c.pick(3), d.pick(3));
    }

    #[test]
    fn null_sigma() {
        let mut rng = NoiseGenerator::new(Some(1));
        assert_eq!(rng.gaussian(12.5, 0.0), 12.5);
        assert_eq!(rng.positive_gaussian(12.5, 0.0), Ok(12.5));
    }

    #[test]
    fn positive_samples() {
        let mut rng = NoiseGenerator::new(Some(7));
        for _ in 0..10_000 {
            assert!(rng.positive_gaussian(3.0, 0.99).unwrap() > 0.0);
        }
        // heavily truncated distribution still produces positive values
        for _ in 0..1000 {
            assert!(rng.positive_gaussian(0.1, 1.0).unwrap() > 0.0);
        }
    }

    #[test]
    fn no_positive_sample() {
        let mut rng = NoiseGenerator::new(Some(7));
        assert_eq!(
            rng.positive_gaussian(-1.0E6, 1.0),
            Err(Error::NonPositiveNoise {
                mean: -1.0E6,
                sigma: 1.0,
                draws: MAX_POSITIVE_DRAWS,
            })
        );
    }

    #[test]
    fn covariance() {
        let covar = diagonal_covariance(&[0.0, 2.0]);
        assert_eq!(covar[(0, 0)], 1.0);
        assert_eq!(covar[(1, 1)], 4.0);
        assert_eq!(covar[(0, 1)], 0.0);
    }
}
