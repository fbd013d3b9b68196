//! Cell values, samples and the small identifier types shared by every module.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ComposerError, Result};

/// Column number in the composed generator's numbering.
pub type ColNo = usize;

/// Model index within a generator.
pub type ModelNo = usize;

/// Table row identifier.
pub type RowId = i64;

/// One table row, positionally aligned with the generator's column list.
pub type Row = Vec<Option<Value>>;

/// Identifier of a generator in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GeneratorId(pub u64);

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Column number in the base model's own numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BaseColNo(pub usize);

impl fmt::Display for BaseColNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// The numeric content, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(x) => Some(*x),
            Value::Text(_) => None,
        }
    }

    /// The numeric content, or a `NotNumeric` error naming the column.
    pub fn expect_number(&self, colno: ColNo) -> Result<f64> {
        self.as_f64().ok_or_else(|| ComposerError::NotNumeric {
            colno,
            value: self.to_string(),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Declared statistical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatType {
    Categorical,
    Numerical,
}

impl FromStr for StatType {
    type Err = ComposerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "categorical" => Ok(StatType::Categorical),
            "numerical" => Ok(StatType::Numerical),
            _ => Err(ComposerError::UnknownStatType {
                stattype: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for StatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatType::Categorical => write!(f, "categorical"),
            StatType::Numerical => write!(f, "numerical"),
        }
    }
}

/// One joint draw: a value for every column it covers.
///
/// Samples are extended by value ([`Sample::with`]) so each step of a
/// topological walk yields a new sample instead of mutating a shared one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample(BTreeMap<ColNo, Value>);

impl Sample {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sample extended with `colno = value`.
    #[must_use]
    pub fn with(mut self, colno: ColNo, value: Value) -> Self {
        self.0.insert(colno, value);
        self
    }

    pub fn get(&self, colno: ColNo) -> Option<&Value> {
        self.0.get(&colno)
    }

    pub fn contains(&self, colno: ColNo) -> bool {
        self.0.contains_key(&colno)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColNo, &Value)> {
        self.0.iter().map(|(c, v)| (*c, v))
    }
}

impl FromIterator<(ColNo, Value)> for Sample {
    fn from_iter<I: IntoIterator<Item = (ColNo, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A sample with its log importance weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedSample {
    pub sample: Sample,
    /// Log-likelihood of the evidence under this sample's latent values.
    pub log_weight: f64,
}

/// Ordered weighted draws produced by the forward sampler.
pub type WeightedSampleSet = Vec<WeightedSample>;
