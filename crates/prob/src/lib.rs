//! # Composer Prob - Numeric Building Blocks
//!
//! Distributions and log-space estimators shared by the composer metamodel:
//!
//! - **Finite distributions**: [`Dist`] over {0..n-1}, built from weights or
//!   log-weights, sampled with an injected random source
//! - **Gaussians**: [`GaussianDist`] for numerical residuals
//! - **Importance sampling**: `logsumexp`, marginal-likelihood estimates,
//!   effective sample size, resampling
//! - **Mixtures**: [`GaussianMixture`] fitted by EM with BIC selection, and
//!   the imputation confidence derived from it
//!
//! ## Example: resampling a weighted set
//!
//! ```rust
//! use composer_prob::{resample, logsumexp};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let log_w = [f64::NEG_INFINITY, 0.0];
//! let mut rng = StdRng::seed_from_u64(0);
//! let picks = resample(&log_w, 5, &mut rng).unwrap();
//! assert!(picks.iter().all(|&i| i == 1));
//! assert_eq!(logsumexp(&log_w), 0.0);
//! ```

mod dist;
mod error;
mod gaussian;
mod importance;
mod mixture;

pub use dist::Dist;
pub use error::ProbError;
pub use gaussian::GaussianDist;
pub use importance::{
    effective_sample_size, logmeanexp, logsumexp, marginal_estimate, resample,
    ImportanceEstimate,
};
pub use mixture::{continuous_imputation_confidence, FitOptions, GaussianMixture};
