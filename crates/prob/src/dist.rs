//! Probability distributions over finite sets.

use rand::Rng;

use crate::error::ProbError;
use crate::importance::logsumexp;

/// A probability distribution over a finite set {0, 1, ..., n-1}.
///
/// Built only from weights, so the probabilities are non-negative and sum
/// to 1 up to rounding.
///
/// # Example
///
/// ```rust
/// use composer_prob::Dist;
///
/// // Importance weights kept in log space
/// let d = Dist::from_log_weights(&[0.0, 2.0_f64.ln()]).unwrap();
/// assert!((d.p[1] - 2.0 / 3.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Dist {
    /// Probability vector (sums to 1).
    pub p: Vec<f64>,
}

impl Dist {
    /// Create a distribution from unnormalized weights.
    ///
    /// ```rust
    /// use composer_prob::Dist;
    ///
    /// let d = Dist::from_weights(vec![1.0, 2.0, 3.0]).unwrap();
    /// assert!((d.p[0] - 1.0 / 6.0).abs() < 1e-9);
    /// ```
    pub fn from_weights(weights: Vec<f64>) -> Result<Self, ProbError> {
        if weights.is_empty() {
            return Err(ProbError::EmptyDistribution);
        }

        if weights.iter().any(|&x| x < 0.0) {
            return Err(ProbError::NegativeProbability);
        }

        let sum: f64 = weights.iter().sum();
        if sum <= 0.0 || !sum.is_finite() {
            return Err(ProbError::ZeroWeights);
        }

        let p: Vec<f64> = weights.iter().map(|w| w / sum).collect();
        Ok(Self { p })
    }

    /// Create a distribution from log-weights, normalizing in log space.
    ///
    /// Entries of `-inf` get probability 0. Fails with `ZeroWeights` when
    /// every entry is `-inf`.
    pub fn from_log_weights(log_weights: &[f64]) -> Result<Self, ProbError> {
        if log_weights.is_empty() {
            return Err(ProbError::EmptyDistribution);
        }
        if log_weights.iter().any(|w| w.is_nan()) {
            return Err(ProbError::InvalidParameter {
                name: "log_weights".to_string(),
                reason: "NaN log-weight".to_string(),
            });
        }

        let total = logsumexp(log_weights);
        if total == f64::NEG_INFINITY {
            return Err(ProbError::ZeroWeights);
        }

        let p = log_weights.iter().map(|w| (w - total).exp()).collect();
        Ok(Self { p })
    }

    /// Draw one index by inverse transform sampling.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let u: f64 = rng.gen();
        let mut cumsum = 0.0;
        for (i, &p) in self.p.iter().enumerate() {
            cumsum += p;
            if u < cumsum {
                return i;
            }
        }
        // u close to 1.0 and rounding in the cumulative sum
        self.p.iter().rposition(|&p| p > 0.0).unwrap_or(self.p.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_from_weights_negative() {
        let result = Dist::from_weights(vec![-0.5, 1.5]);
        assert!(matches!(result, Err(ProbError::NegativeProbability)));
        assert_eq!(Dist::from_weights(vec![0.0, 0.0]), Err(ProbError::ZeroWeights));
    }

    #[test]
    fn test_dist_from_weights() {
        let d = Dist::from_weights(vec![1.0, 2.0, 3.0]).unwrap();
        assert!((d.p[1] - 2.0 / 6.0).abs() < 1e-12);
        assert!((d.p[2] - 3.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_log_weights_handles_large_magnitudes() {
        // exp(-1000) underflows; normalization in log space must not
        let d = Dist::from_log_weights(&[-1000.0, -1000.0 + 3.0_f64.ln()]).unwrap();
        assert!((d.p[0] - 0.25).abs() < 1e-9);
        assert!((d.p[1] - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_from_log_weights_zero_mass() {
        let result = Dist::from_log_weights(&[f64::NEG_INFINITY, f64::NEG_INFINITY]);
        assert_eq!(result, Err(ProbError::ZeroWeights));
    }

    #[test]
    fn test_from_log_weights_partial_zero() {
        let d = Dist::from_log_weights(&[f64::NEG_INFINITY, 0.0]).unwrap();
        assert_eq!(d.p, vec![0.0, 1.0]);
    }

    #[test]
    fn test_sample_frequencies() {
        let d = Dist::from_weights(vec![1.0, 3.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let ones = (0..4000).filter(|_| d.sample(&mut rng) == 1).count();
        assert!((ones as f64 / 4000.0 - 0.75).abs() < 0.03);
    }

    #[test]
    fn test_sample_never_picks_zero_mass() {
        let d = Dist::from_weights(vec![0.0, 1.0, 0.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert_eq!(d.sample(&mut rng), 1);
        }
    }
}
