//! Foreign predictors and the registry that builds them.
//!
//! A foreign predictor models one target column given its condition
//! columns. Predictor kinds are looked up by name in a
//! [`PredictorRegistry`] handed to the generator when it is created.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use rand::RngCore;

use crate::error::{ComposerError, Result};
use crate::value::{Row, Value};

/// Condition values keyed by column name.
pub type Conditions = BTreeMap<String, Value>;

// ============================================================================
// ForeignPredictor Trait
// ============================================================================

/// A trained model of one column given its conditions.
pub trait ForeignPredictor: Send + Sync {
    /// `n` independent draws of the target given `conditions`.
    fn simulate(&self, n: usize, conditions: &Conditions, rng: &mut dyn RngCore)
        -> Result<Vec<Value>>;

    /// Log density (or log probability) of `value` given `conditions`.
    fn logpdf(&self, value: &Value, conditions: &Conditions) -> Result<f64>;
}

/// Name and declared stattype of a predictor's target or condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub stattype: String,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, stattype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stattype: stattype.into(),
        }
    }
}

/// Observed table contents a predictor is trained on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingData {
    /// Column names, aligned with every row.
    pub names: Vec<String>,
    pub rows: Vec<Row>,
}

impl TrainingData {
    pub fn new(names: Vec<String>, rows: Vec<Row>) -> Self {
        Self { names, rows }
    }

    /// Position of a column, if present.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Rows with a value in every listed column, projected onto them.
    pub fn complete(&self, columns: &[&str]) -> Result<Vec<Vec<&Value>>> {
        let idx = columns
            .iter()
            .map(|name| {
                self.position(name)
                    .ok_or_else(|| ComposerError::UnknownColumnName {
                        name: name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(self
            .rows
            .iter()
            .filter_map(|row| {
                idx.iter()
                    .map(|&i| row.get(i).and_then(Option::as_ref))
                    .collect::<Option<Vec<_>>>()
            })
            .collect())
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Builds a trained predictor from data, target and conditions.
pub type PredictorFactory = Box<
    dyn Fn(&TrainingData, &ColumnSpec, &[ColumnSpec]) -> Result<Box<dyn ForeignPredictor>>
        + Send
        + Sync,
>;

/// Predictor kinds available to a generator, keyed by name.
#[derive(Default)]
pub struct PredictorRegistry {
    factories: HashMap<String, PredictorFactory>,
}

impl PredictorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every predictor kind shipped in [`crate::predictors`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::predictors::register_builtins(&mut registry);
        registry
    }

    /// Register (or replace) a predictor kind.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&TrainingData, &ColumnSpec, &[ColumnSpec]) -> Result<Box<dyn ForeignPredictor>>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn has_kind(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Train a predictor of the given kind.
    pub fn create(
        &self,
        kind: &str,
        data: &TrainingData,
        target: &ColumnSpec,
        conditions: &[ColumnSpec],
    ) -> Result<Box<dyn ForeignPredictor>> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| ComposerError::UnknownPredictor {
                kind: kind.to_string(),
            })?;
        factory(data, target, conditions)
    }
}

impl fmt::Debug for PredictorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredictorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
