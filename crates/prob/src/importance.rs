//! Importance sampling in log space.
//!
//! Weighted sample sets are carried as log-weights so that products of many
//! small likelihoods do not underflow. This module provides:
//! - `logsumexp` / `logmeanexp`
//! - Importance estimates of marginal likelihoods
//! - Effective sample size diagnostics
//! - Importance resampling (drawing indices proportionally to weight)

use rand::Rng;

use crate::dist::Dist;
use crate::error::ProbError;

/// `log(Σ exp(xᵢ))`, computed stably.
///
/// Returns `-inf` for an empty slice or when every entry is `-inf`.
pub fn logsumexp(xs: &[f64]) -> f64 {
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let sum: f64 = xs.iter().map(|x| (x - max).exp()).sum();
    max + sum.ln()
}

/// `log((1/n) Σ exp(xᵢ))`.
pub fn logmeanexp(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NEG_INFINITY;
    }
    logsumexp(xs) - (xs.len() as f64).ln()
}

/// Result of an importance estimate of a marginal likelihood.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportanceEstimate {
    /// `log((1/n) Σ wᵢ)`; `-inf` when every weight is zero.
    pub log_estimate: f64,
    /// Effective sample size of the weights.
    pub effective_sample_size: f64,
    /// Number of samples used.
    pub n_samples: usize,
}

/// Importance estimate of the marginal likelihood of the evidence that
/// produced `log_weights`.
///
/// With draws from the prior and `log wᵢ = log p(evidence | drawᵢ)`, the
/// mean weight is an unbiased estimate of `p(evidence)`. Conditional
/// densities follow as the difference of two such estimates:
/// `log p(q | y) ≈ log p̂(q, y) - log p̂(y)`.
///
/// # Errors
///
/// - `EmptyDistribution` if no samples are given
/// - `InvalidParameter` if any log-weight is NaN
///
/// # Example
///
/// ```rust
/// use composer_prob::marginal_estimate;
///
/// let log_w = [0.9_f64.ln(), 0.1_f64.ln()];
/// let est = marginal_estimate(&log_w).unwrap();
/// assert!((est.log_estimate.exp() - 0.5).abs() < 1e-12);
/// assert_eq!(est.n_samples, 2);
/// ```
pub fn marginal_estimate(log_weights: &[f64]) -> Result<ImportanceEstimate, ProbError> {
    if log_weights.is_empty() {
        return Err(ProbError::EmptyDistribution);
    }
    if log_weights.iter().any(|w| w.is_nan()) {
        return Err(ProbError::InvalidParameter {
            name: "log_weights".to_string(),
            reason: "NaN log-weight".to_string(),
        });
    }

    Ok(ImportanceEstimate {
        log_estimate: logmeanexp(log_weights),
        effective_sample_size: effective_sample_size(log_weights),
        n_samples: log_weights.len(),
    })
}

/// Effective sample size: `(Σwᵢ)² / Σwᵢ²`, from log-weights.
///
/// Equals n when all weights are equal; approaches 1 when a single sample
/// carries all the weight. Returns 0 when every weight is zero.
pub fn effective_sample_size(log_weights: &[f64]) -> f64 {
    let total = logsumexp(log_weights);
    if total == f64::NEG_INFINITY {
        return 0.0;
    }
    let doubled: Vec<f64> = log_weights.iter().map(|w| 2.0 * w).collect();
    (2.0 * total - logsumexp(&doubled)).exp()
}

/// Draw `n` indices with probability proportional to `exp(log_weights)`.
///
/// This is the resampling step of sampling-importance-resampling.
pub fn resample<R: Rng + ?Sized>(
    log_weights: &[f64],
    n: usize,
    rng: &mut R,
) -> Result<Vec<usize>, ProbError> {
    let dist = Dist::from_log_weights(log_weights)?;
    Ok((0..n).map(|_| dist.sample(&mut *rng)).collect())
}
