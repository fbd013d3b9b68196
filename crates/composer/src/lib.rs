//! # Composer - Foreign Predictors over a Base Model
//!
//! A composed generator models one table with two kinds of columns:
//!
//! - **Local columns**: modeled jointly by an opaque [`BaseModel`]
//! - **Foreign columns**: each modeled by its own [`ForeignPredictor`],
//!   conditioned on other columns (local or foreign)
//! - **Dependency graph**: conditions must form a DAG; foreign columns are
//!   visited in topological order
//! - **Inference**: conditional densities as ratios of importance estimates
//!   over forward draws, simulation by resampling, structural dependence and
//!   Monte Carlo mutual information
//! - **Imputation**: recursive, with confidences combined by min across
//!   sibling conditions and product down the recursion
//!
//! Queries touching only local columns are delegated to the base model
//! unchanged.
//!
//! ## Example
//!
//! ```rust,ignore
//! let spec = CompositionSpec::default()
//!     .with_foreign("Period_minutes", "keplers_law", &["Apogee_km", "Perigee_km"]);
//! let mut composer = Composer::create(
//!     catalog,
//!     GeneratorId(1),
//!     GeneratorId(2),
//!     Box::new(base_model),
//!     &spec,
//!     PredictorRegistry::with_builtins(),
//!     ComposerConfig::default(),
//! )?;
//! composer.initialize_models(&[0])?;
//! let draws = composer.simulate(None, &[(apogee, 1000.0.into())], &[period], 10, &mut rng)?;
//! ```

pub mod base;
pub mod catalog;
pub mod column;
pub mod composer;
pub mod config;
pub mod error;
pub mod graph;
pub mod predictor;
pub mod predictors;
pub mod sampler;
pub mod value;

mod impute;
mod inference;

// Re-export key types at crate root for convenience
pub use base::{BaseAdapter, BaseModel};
pub use catalog::{Catalog, MemoryCatalog};
pub use column::{Column, ColumnMode, ColumnSet};
pub use composer::Composer;
pub use config::{AnalyzeOptions, ComposerConfig, CompositionSpec, ConfigError, ForeignSpec, MixtureConfig};
pub use error::{BoxError, ComposerError, Result};
pub use graph::DependencyGraph;
pub use predictor::{ColumnSpec, Conditions, ForeignPredictor, PredictorRegistry, TrainingData};
pub use sampler::ForwardSampler;
pub use value::{
    BaseColNo, ColNo, GeneratorId, ModelNo, Row, RowId, Sample, StatType, Value, WeightedSample,
    WeightedSampleSet,
};
