//! Univariate Gaussian distributions.
//!
//! Used for numerical residual models inside foreign predictors and as the
//! component density of [`GaussianMixture`](crate::GaussianMixture).
//!
//! # Example
//!
//! ```rust
//! use composer_prob::GaussianDist;
//!
//! let g = GaussianDist::new(1.0, 2.0).unwrap();
//! assert!((g.log_pdf(1.0) - (-0.5 * (2.0 * std::f64::consts::PI).ln() - 2.0_f64.ln())).abs() < 1e-12);
//! ```

use std::f64::consts::PI;

use rand::Rng;

use crate::ProbError;

/// A univariate Gaussian (Normal) distribution.
///
/// Represents N(μ, σ²) where:
/// - μ (mean) is the center of the distribution
/// - σ (std dev) is non-negative; σ = 0 is a point mass
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianDist {
    /// Mean (μ)
    pub mean: f64,
    /// Standard deviation (σ)
    pub std_dev: f64,
}

impl GaussianDist {
    /// Create a new Gaussian distribution N(mean, std_dev²).
    ///
    /// # Errors
    /// Returns error if std_dev is negative or either parameter is not finite.
    pub fn new(mean: f64, std_dev: f64) -> Result<Self, ProbError> {
        if !mean.is_finite() {
            return Err(ProbError::InvalidParameter {
                name: "mean".to_string(),
                reason: "mean must be finite".to_string(),
            });
        }
        if std_dev < 0.0 || !std_dev.is_finite() {
            return Err(ProbError::InvalidParameter {
                name: "std_dev".to_string(),
                reason: "standard deviation must be finite and non-negative".to_string(),
            });
        }
        Ok(Self { mean, std_dev })
    }

    /// Create the standard normal distribution N(0, 1).
    pub fn standard() -> Self {
        Self {
            mean: 0.0,
            std_dev: 1.0,
        }
    }

    /// Maximum-likelihood fit to a set of observations.
    ///
    /// # Errors
    /// Returns `EmptyDistribution` when `xs` is empty.
    pub fn fit(xs: &[f64]) -> Result<Self, ProbError> {
        if xs.is_empty() {
            return Err(ProbError::EmptyDistribution);
        }
        let n = xs.len() as f64;
        let mean = xs.iter().sum::<f64>() / n;
        let var = xs.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
        Self::new(mean, var.sqrt())
    }

    /// The variance σ².
    pub fn variance(&self) -> f64 {
        self.std_dev * self.std_dev
    }

    /// Log probability density at x.
    ///
    /// log pdf(x) = -0.5 * log(2πσ²) - (x-μ)²/(2σ²)
    pub fn log_pdf(&self, x: f64) -> f64 {
        if self.std_dev == 0.0 {
            if (x - self.mean).abs() < 1e-10 {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            }
        } else {
            let z = (x - self.mean) / self.std_dev;
            -0.5 * (2.0 * PI).ln() - self.std_dev.ln() - 0.5 * z * z
        }
    }

    /// Draw one value (Box-Muller).
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        // u1 in (0, 1] keeps the logarithm finite
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = rng.gen::<f64>();
        let epsilon = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        self.mean + self.std_dev * epsilon
    }
}
