//! Conditional probability tables for categorical targets.
//!
//! P(target | conditions) is estimated by counting training rows per
//! configuration of condition values, with add-α smoothing over the target
//! categories seen in training. Configurations never observed fall back
//! to the smoothed marginal of the target.

use std::collections::HashMap;

use composer_prob::Dist;
use rand::RngCore;

use crate::error::{ComposerError, Result};
use crate::predictor::{ColumnSpec, Conditions, ForeignPredictor, TrainingData};
use crate::value::{StatType, Value};

use super::CONDITIONAL_TABLE;

/// Pseudo-count added to every cell.
pub const DEFAULT_ALPHA: f64 = 1.0;

/// A smoothed CPT over a categorical target.
#[derive(Debug, Clone)]
pub struct ConditionalTable {
    conditions: Vec<String>,
    /// Target categories in first-seen order.
    categories: Vec<Value>,
    /// Condition configuration → counts per category.
    counts: HashMap<Vec<String>, Vec<f64>>,
    marginal: Vec<f64>,
    alpha: f64,
}

impl ConditionalTable {
    pub fn train(data: &TrainingData, target: &ColumnSpec, conditions: &[ColumnSpec]) -> Result<Self> {
        Self::train_with_alpha(data, target, conditions, DEFAULT_ALPHA)
    }

    pub fn train_with_alpha(
        data: &TrainingData,
        target: &ColumnSpec,
        conditions: &[ColumnSpec],
        alpha: f64,
    ) -> Result<Self> {
        if target.stattype.parse::<StatType>()? != StatType::Categorical {
            return Err(invalid(format!("target {} must be categorical", target.name)));
        }
        if alpha.is_nan() || alpha <= 0.0 {
            return Err(invalid(format!("smoothing must be positive, got {alpha}")));
        }

        let mut columns: Vec<&str> = vec![target.name.as_str()];
        columns.extend(conditions.iter().map(|c| c.name.as_str()));
        let rows = data.complete(&columns)?;

        let mut categories: Vec<Value> = Vec::new();
        let mut observations: Vec<(usize, Vec<String>)> = Vec::with_capacity(rows.len());
        for row in &rows {
            let idx = match categories.iter().position(|c| c == row[0]) {
                Some(i) => i,
                None => {
                    categories.push(row[0].clone());
                    categories.len() - 1
                }
            };
            let key = row[1..].iter().map(|v| v.to_string()).collect();
            observations.push((idx, key));
        }
        if categories.is_empty() {
            return Err(invalid(format!("no observed values for {}", target.name)));
        }

        let k = categories.len();
        let mut counts: HashMap<Vec<String>, Vec<f64>> = HashMap::new();
        let mut marginal = vec![0.0; k];
        for (idx, key) in observations {
            counts.entry(key).or_insert_with(|| vec![0.0; k])[idx] += 1.0;
            marginal[idx] += 1.0;
        }

        Ok(Self {
            conditions: conditions.iter().map(|c| c.name.clone()).collect(),
            categories,
            counts,
            marginal,
            alpha,
        })
    }

    /// Target categories in first-seen order.
    pub fn categories(&self) -> &[Value] {
        &self.categories
    }

    /// Smoothed distribution over [`Self::categories`] given `conditions`.
    pub fn distribution(&self, conditions: &Conditions) -> Result<Dist> {
        let key = self
            .conditions
            .iter()
            .map(|name| {
                conditions
                    .get(name)
                    .map(Value::to_string)
                    .ok_or_else(|| ComposerError::MissingConditionValue { name: name.clone() })
            })
            .collect::<Result<Vec<_>>>()?;
        let counts = self.counts.get(&key).unwrap_or(&self.marginal);
        let weights = counts.iter().map(|c| c + self.alpha).collect();
        Ok(Dist::from_weights(weights)?)
    }
}

fn invalid(reason: String) -> ComposerError {
    ComposerError::InvalidPredictor {
        kind: CONDITIONAL_TABLE.to_string(),
        reason,
    }
}

impl ForeignPredictor for ConditionalTable {
    fn simulate(
        &self,
        n: usize,
        conditions: &Conditions,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Value>> {
        let dist = self.distribution(conditions)?;
        Ok((0..n)
            .map(|_| self.categories[dist.sample(&mut *rng)].clone())
            .collect())
    }

    fn logpdf(&self, value: &Value, conditions: &Conditions) -> Result<f64> {
        let dist = self.distribution(conditions)?;
        Ok(match self.categories.iter().position(|c| c == value) {
            Some(i) => dist.p[i].ln(),
            None => f64::NEG_INFINITY,
        })
    }
}
