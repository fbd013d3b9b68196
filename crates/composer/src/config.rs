//! Configuration for composed generators.
//!
//! Two documents drive a generator:
//! - [`ComposerConfig`]: sample counts and numeric options for inference
//! - [`CompositionSpec`]: which columns are foreign, which predictor kind
//!   models each of them, and their condition columns
//!
//! Both load from JSON and fill unspecified fields with defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use composer_prob::FitOptions;
use serde::{Deserialize, Serialize};

/// Inference settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposerConfig {
    /// Size of each weighted sample set drawn by the forward sampler.
    #[serde(default = "default_importance_samples")]
    pub importance_samples: usize,

    /// Samples drawn per imputation when the caller gives no count.
    #[serde(default = "default_imputation_samples")]
    pub imputation_samples: usize,

    /// Monte Carlo draws for mutual information when the caller gives no count.
    #[serde(default = "default_mutual_information_samples")]
    pub mutual_information_samples: usize,

    /// Delegate all-local queries straight to the base model.
    #[serde(default = "default_true")]
    pub fast_path: bool,

    /// Mixture fit used for numerical imputation confidence.
    #[serde(default)]
    pub mixture: MixtureConfig,
}

fn default_importance_samples() -> usize {
    100
}

fn default_imputation_samples() -> usize {
    50
}

fn default_mutual_information_samples() -> usize {
    100
}

fn default_true() -> bool {
    true
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            importance_samples: default_importance_samples(),
            imputation_samples: default_imputation_samples(),
            mutual_information_samples: default_mutual_information_samples(),
            fast_path: true,
            mixture: MixtureConfig::default(),
        }
    }
}

/// Gaussian mixture options for numerical imputation confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureConfig {
    #[serde(default = "default_max_components")]
    pub max_components: usize,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_max_components() -> usize {
    5
}

fn default_max_iterations() -> usize {
    1000
}

fn default_tolerance() -> f64 {
    1e-6
}

impl Default for MixtureConfig {
    fn default() -> Self {
        Self {
            max_components: default_max_components(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

impl From<&MixtureConfig> for FitOptions {
    fn from(config: &MixtureConfig) -> Self {
        FitOptions {
            max_components: config.max_components,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
        }
    }
}

impl ComposerConfig {
    /// Parse from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content).map_err(ConfigError::Json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Reject settings that would make inference loops empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("importance_samples", self.importance_samples),
            ("imputation_samples", self.imputation_samples),
            ("mutual_information_samples", self.mutual_information_samples),
            ("mixture.max_components", self.mixture.max_components),
            ("mixture.max_iterations", self.mixture.max_iterations),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field: field.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        if self.mixture.tolerance.is_nan() || self.mixture.tolerance <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "mixture.tolerance".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Declares the foreign columns of a generator.
///
/// ```json
/// {
///   "foreign": {
///     "Period_minutes": {
///       "predictor": "keplers_law",
///       "conditions": ["Apogee_km", "Perigee_km"]
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositionSpec {
    /// Foreign target column name → how it is modeled.
    #[serde(default)]
    pub foreign: BTreeMap<String, ForeignSpec>,
}

/// How one foreign column is modeled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignSpec {
    /// Registry key of the predictor kind.
    pub predictor: String,
    /// Condition (parent) column names, in the order the predictor sees them.
    pub conditions: Vec<String>,
}

impl CompositionSpec {
    /// Parse from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(ConfigError::Json)
    }

    /// Load from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Add a foreign column.
    pub fn with_foreign(
        mut self,
        target: impl Into<String>,
        predictor: impl Into<String>,
        conditions: &[&str],
    ) -> Self {
        self.foreign.insert(
            target.into(),
            ForeignSpec {
                predictor: predictor.into(),
                conditions: conditions.iter().map(|c| c.to_string()).collect(),
            },
        );
        self
    }
}

/// Options forwarded to the base model's analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeOptions {
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default)]
    pub max_seconds: Option<f64>,
    #[serde(default)]
    pub ckpt_iterations: Option<usize>,
    #[serde(default)]
    pub ckpt_seconds: Option<f64>,
}

fn default_iterations() -> usize {
    1
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            max_seconds: None,
            ckpt_iterations: None,
            ckpt_seconds: None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse JSON config: {0}")]
    Json(#[source] serde_json::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = ComposerConfig::from_json("{}").unwrap();
        assert_eq!(config, ComposerConfig::default());
        assert_eq!(config.importance_samples, 100);
        assert_eq!(config.imputation_samples, 50);
        assert!(config.fast_path);
    }

    #[test]
    fn test_partial_override() {
        let config =
            ComposerConfig::from_json(r#"{"importance_samples": 500, "mixture": {"max_components": 2}}"#)
                .unwrap();
        assert_eq!(config.importance_samples, 500);
        assert_eq!(config.mixture.max_components, 2);
        assert_eq!(config.mixture.max_iterations, 1000);
    }

    #[test]
    fn test_zero_samples_rejected() {
        let err = ComposerConfig::from_json(r#"{"importance_samples": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "importance_samples"));
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            ComposerConfig::from_json("{not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_composition_spec_json() {
        let spec = CompositionSpec::from_json(
            r#"{"foreign": {"Period_minutes": {"predictor": "keplers_law", "conditions": ["Apogee_km", "Perigee_km"]}}}"#,
        )
        .unwrap();
        let expected = CompositionSpec::default().with_foreign(
            "Period_minutes",
            "keplers_law",
            &["Apogee_km", "Perigee_km"],
        );
        assert_eq!(spec, expected);
    }

    #[test]
    fn test_mixture_options_conversion() {
        let options = FitOptions::from(&MixtureConfig::default());
        assert_eq!(options, FitOptions::default());
    }
}
