//! One-dimensional Gaussian mixtures fitted by EM.
//!
//! The imputation engine needs a number in [0, 1] that says how concentrated
//! a set of numerical samples is around a single mode. We fit mixtures with
//! 1..=K components, keep the one with the lowest BIC, and report the weight
//! of its heaviest component: a unimodal sample set selects one component and
//! scores 1.0, two well separated equal modes score about 0.5.

use crate::error::ProbError;
use crate::gaussian::GaussianDist;
use crate::importance::logsumexp;

/// Options for fitting mixtures.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    /// Largest number of components tried during model selection.
    pub max_components: usize,
    /// EM iterations per fit.
    pub max_iterations: usize,
    /// Relative change in log-likelihood treated as convergence.
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_components: 5,
            max_iterations: 1000,
            tolerance: 1e-6,
        }
    }
}

/// A fitted mixture of univariate Gaussians.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianMixture {
    /// Mixing weights (sum to 1).
    pub weights: Vec<f64>,
    /// Component densities.
    pub components: Vec<GaussianDist>,
    /// Log-likelihood of the data under the fit.
    pub log_likelihood: f64,
    /// Number of observations used to fit.
    pub n_obs: usize,
}

impl GaussianMixture {
    /// Fit a `k`-component mixture with EM.
    ///
    /// Components are initialized from contiguous quantile blocks of the
    /// sorted data, so the fit is deterministic.
    pub fn fit(xs: &[f64], k: usize, options: &FitOptions) -> Result<Self, ProbError> {
        if xs.is_empty() {
            return Err(ProbError::EmptyDistribution);
        }
        if k == 0 || k > xs.len() {
            return Err(ProbError::InvalidParameter {
                name: "k".to_string(),
                reason: format!("need 1..={} components, got {}", xs.len(), k),
            });
        }
        if xs.iter().any(|x| !x.is_finite()) {
            return Err(ProbError::InvalidParameter {
                name: "xs".to_string(),
                reason: "observations must be finite".to_string(),
            });
        }

        let n = xs.len();
        let overall = GaussianDist::fit(xs)?;
        let var_floor = (overall.variance() * 1e-3).max(1e-12);

        let mut sorted = xs.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mut weights = Vec::with_capacity(k);
        let mut means = Vec::with_capacity(k);
        let mut variances = Vec::with_capacity(k);
        for block in 0..k {
            let lo = block * n / k;
            let hi = (block + 1) * n / k;
            let chunk = &sorted[lo..hi];
            let g = GaussianDist::fit(chunk)?;
            weights.push(chunk.len() as f64 / n as f64);
            means.push(g.mean);
            variances.push(g.variance().max(var_floor));
        }

        let mut resp = vec![vec![0.0; k]; n];
        let mut log_likelihood = f64::NEG_INFINITY;

        for _ in 0..options.max_iterations.max(1) {
            // E-step
            let mut ll = 0.0;
            for (i, &x) in xs.iter().enumerate() {
                let mut log_r: Vec<f64> = (0..k)
                    .map(|j| {
                        let g = GaussianDist {
                            mean: means[j],
                            std_dev: variances[j].sqrt(),
                        };
                        weights[j].ln() + g.log_pdf(x)
                    })
                    .collect();
                let norm = logsumexp(&log_r);
                ll += norm;
                for r in log_r.iter_mut() {
                    *r = (*r - norm).exp();
                }
                resp[i] = log_r;
            }

            // M-step
            for j in 0..k {
                let nk: f64 = resp.iter().map(|r| r[j]).sum();
                if nk < 1e-10 {
                    weights[j] = 0.0;
                    continue;
                }
                let mean = resp.iter().zip(xs).map(|(r, x)| r[j] * x).sum::<f64>() / nk;
                let var = resp
                    .iter()
                    .zip(xs)
                    .map(|(r, x)| r[j] * (x - mean) * (x - mean))
                    .sum::<f64>()
                    / nk;
                weights[j] = nk / n as f64;
                means[j] = mean;
                variances[j] = var.max(var_floor);
            }

            let converged = (ll - log_likelihood).abs() <= options.tolerance * ll.abs().max(1.0);
            log_likelihood = ll;
            if converged {
                break;
            }
        }

        let components = means
            .iter()
            .zip(&variances)
            .map(|(&mean, &var)| GaussianDist::new(mean, var.sqrt()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            weights,
            components,
            log_likelihood,
            n_obs: n,
        })
    }

    /// Number of components.
    pub fn k(&self) -> usize {
        self.components.len()
    }

    /// Bayesian information criterion (lower is better).
    pub fn bic(&self) -> f64 {
        let params = (3 * self.k() - 1) as f64;
        -2.0 * self.log_likelihood + params * (self.n_obs as f64).ln()
    }

    /// Log density of the mixture at x.
    pub fn log_pdf(&self, x: f64) -> f64 {
        let terms: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.components)
            .map(|(w, g)| w.ln() + g.log_pdf(x))
            .collect();
        logsumexp(&terms)
    }

    /// Weight of the heaviest component.
    pub fn max_weight(&self) -> f64 {
        self.weights.iter().copied().fold(0.0, f64::max)
    }

    /// Fit mixtures with 1..=`max_components` components and keep the best BIC.
    pub fn select(xs: &[f64], options: &FitOptions) -> Result<Self, ProbError> {
        if options.max_components == 0 {
            return Err(ProbError::InvalidParameter {
                name: "max_components".to_string(),
                reason: "at least one component is required".to_string(),
            });
        }
        let mut distinct = xs.to_vec();
        distinct.sort_by(f64::total_cmp);
        distinct.dedup();
        let max_k = options.max_components.min(distinct.len()).max(1);

        let mut best = Self::fit(xs, 1, options)?;
        for k in 2..=max_k {
            let candidate = Self::fit(xs, k, options)?;
            if candidate.bic() < best.bic() {
                best = candidate;
            }
        }
        Ok(best)
    }
}

/// Confidence that a set of numerical samples is concentrated on one mode.
///
/// Returns the heaviest component weight of the BIC-selected mixture. Sample
/// sets with fewer than two points or no spread are fully concentrated.
///
/// # Example
///
/// ```rust
/// use composer_prob::{continuous_imputation_confidence, FitOptions};
///
/// let tight = [10.0, 10.1, 9.9, 10.05, 9.95, 10.02, 9.98, 10.0];
/// let conf = continuous_imputation_confidence(&tight, &FitOptions::default()).unwrap();
/// assert!(conf > 0.9);
/// ```
pub fn continuous_imputation_confidence(
    xs: &[f64],
    options: &FitOptions,
) -> Result<f64, ProbError> {
    if xs.is_empty() {
        return Err(ProbError::EmptyDistribution);
    }
    let spread = GaussianDist::fit(xs)?;
    if xs.len() < 2 || spread.std_dev == 0.0 {
        return Ok(1.0);
    }
    let mixture = GaussianMixture::select(xs, options)?;
    Ok(mixture.max_weight().clamp(0.0, 1.0))
}
