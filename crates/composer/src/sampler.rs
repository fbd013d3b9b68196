//! Forward sampling over local and foreign columns.
//!
//! A draw starts from the base model: local evidence is scored once (shared
//! by every draw) and the remaining local columns are simulated given it.
//! Foreign columns are then visited in dependency order. Observed foreign
//! columns add their predictor's log density to the draw's weight; latent
//! ones are drawn from their predictor. This is likelihood weighting over
//! the composed model, and the only place foreign predictors generate
//! values.

use std::collections::BTreeMap;

use rand::RngCore;
use tracing::debug;

use crate::base::BaseAdapter;
use crate::column::ColumnSet;
use crate::error::{ComposerError, Result};
use crate::predictor::{Conditions, ForeignPredictor};
use crate::value::{ColNo, ModelNo, Sample, Value, WeightedSample, WeightedSampleSet};

/// Trained predictors keyed by their target column.
pub type Predictors = BTreeMap<ColNo, Box<dyn ForeignPredictor>>;

/// Likelihood-weighted joint sampler over a generator's columns.
pub struct ForwardSampler<'a> {
    columns: &'a ColumnSet,
    base: &'a BaseAdapter,
    predictors: &'a Predictors,
}

impl<'a> ForwardSampler<'a> {
    pub fn new(columns: &'a ColumnSet, base: &'a BaseAdapter, predictors: &'a Predictors) -> Self {
        Self {
            columns,
            base,
            predictors,
        }
    }

    /// The trained predictor of a foreign column.
    pub fn predictor(&self, colno: ColNo) -> Result<&'a dyn ForeignPredictor> {
        self.predictors
            .get(&colno)
            .map(|p| p.as_ref())
            .ok_or(ComposerError::PredictorNotTrained { colno })
    }

    /// Condition values of `target`, keyed by column name, read from `known`.
    pub fn conditions_of(&self, target: ColNo, known: &Sample) -> Result<Conditions> {
        let conditions = self
            .columns
            .conditions(target)
            .ok_or(ComposerError::UnknownColumn { colno: target })?;
        conditions
            .iter()
            .map(|&condition| {
                let value = known
                    .get(condition)
                    .ok_or(ComposerError::MissingCondition { target, condition })?;
                Ok((self.columns.get(condition)?.name.clone(), value.clone()))
            })
            .collect()
    }

    /// `n` joint draws of every column, each weighted by the likelihood of
    /// `evidence` under the draw's latent values.
    pub fn sample(
        &self,
        modelno: Option<ModelNo>,
        evidence: &[(ColNo, Value)],
        n: usize,
        rng: &mut dyn RngCore,
    ) -> Result<WeightedSampleSet> {
        self.columns.ensure_known(evidence.iter().map(|(c, _)| *c))?;

        let local_evidence: Vec<(ColNo, Value)> = evidence
            .iter()
            .filter(|(c, _)| self.columns.is_local(*c))
            .cloned()
            .collect();

        let w0 = if local_evidence.is_empty() {
            0.0
        } else {
            self.base
                .local_joint_log_density(modelno, &local_evidence, &[])?
        };

        let fixed: Sample = evidence.iter().cloned().collect();
        let latent: Vec<ColNo> = self
            .columns
            .local()
            .map(|c| c.colno)
            .filter(|c| !fixed.contains(*c))
            .collect();

        debug!(
            n,
            evidence = evidence.len(),
            latent_local = latent.len(),
            "forward sampling"
        );

        let local_draws = if latent.is_empty() {
            vec![Vec::new(); n]
        } else {
            self.base
                .simulate(modelno, &local_evidence, &latent, n, rng)?
        };

        let mut set = Vec::with_capacity(n);
        for draw in local_draws {
            let start = latent
                .iter()
                .copied()
                .zip(draw)
                .fold(fixed.clone(), |s, (c, v)| s.with(c, v));
            set.push(self.walk_foreign(start, w0, rng)?);
        }
        Ok(set)
    }

    /// Extend a draw through the foreign columns in dependency order.
    fn walk_foreign(
        &self,
        start: Sample,
        w0: f64,
        rng: &mut dyn RngCore,
    ) -> Result<WeightedSample> {
        let mut sample = start;
        let mut log_weight = w0;

        for (target, _) in self.columns.graph().order() {
            let target = *target;
            let conditions = self.conditions_of(target, &sample)?;
            let predictor = self.predictor(target)?;

            if let Some(observed) = sample.get(target) {
                log_weight += predictor.logpdf(observed, &conditions)?;
                continue;
            }

            let value = predictor
                .simulate(1, &conditions, rng)?
                .into_iter()
                .next()
                .ok_or_else(|| ComposerError::InvalidPredictor {
                    kind: format!("foreign predictor of column {target}"),
                    reason: "simulate returned no values".to_string(),
                })?;
            sample = sample.with(target, value);
        }

        Ok(WeightedSample { sample, log_weight })
    }
}
