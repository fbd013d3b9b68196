//! Imputation of missing cells with a confidence.
//!
//! Local columns are imputed by the base model unless a foreign column
//! observed in the same row depends on them, in which case the composed
//! model is simulated given the rest of the row. Foreign columns are drawn
//! from their predictor after any missing conditions have been imputed
//! first (recursively).
//!
//! Two rules combine confidences and they are not interchangeable: sibling
//! conditions contribute the minimum of their confidences, and that minimum
//! multiplies the confidence of the column imputed from them.

use composer_prob::{continuous_imputation_confidence, FitOptions, ProbError};
use rand::RngCore;
use tracing::debug;

use crate::composer::Composer;
use crate::error::{ComposerError, Result};
use crate::predictor::Conditions;
use crate::value::{ColNo, ModelNo, RowId, Sample, StatType, Value};

/// Most frequent value and its count; ties go to the value seen first.
fn mode(values: &[Value]) -> Option<(Value, usize)> {
    let mut counts: Vec<(&Value, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }
    let mut best: Option<(&Value, usize)> = None;
    for (value, n) in counts {
        if best.map_or(true, |(_, m)| n > m) {
            best = Some((value, n));
        }
    }
    best.map(|(v, n)| (v.clone(), n))
}

impl Composer {
    /// Impute `colno` in row `rowid`, returning the value and a
    /// confidence in [0, 1].
    pub fn predict_confidence(
        &self,
        modelno: Option<ModelNo>,
        colno: ColNo,
        rowid: RowId,
        numsamples: Option<usize>,
        rng: &mut dyn RngCore,
    ) -> Result<(Value, f64)> {
        self.columns.ensure_known([colno])?;
        let numsamples = numsamples.unwrap_or(self.config.imputation_samples);

        let names = self.column_names();
        let row = self
            .catalog()
            .fetch_row(self.table(), &names, rowid)?
            .ok_or_else(|| ComposerError::RowNotFound {
                table: self.table().to_string(),
                generator: self.generator(),
                rowid,
            })?;
        let observed: Sample = self
            .columns
            .colnos()
            .zip(row)
            .filter_map(|(c, v)| v.map(|v| (c, v)))
            .collect();

        self.impute(modelno, colno, rowid, &observed, numsamples, rng)
    }

    fn impute(
        &self,
        modelno: Option<ModelNo>,
        colno: ColNo,
        rowid: RowId,
        observed: &Sample,
        numsamples: usize,
        rng: &mut dyn RngCore,
    ) -> Result<(Value, f64)> {
        if self.columns.is_foreign(colno) {
            self.impute_foreign(modelno, colno, rowid, observed, numsamples, rng)
        } else {
            self.impute_local(modelno, colno, rowid, observed, numsamples, rng)
        }
    }

    fn impute_local(
        &self,
        modelno: Option<ModelNo>,
        colno: ColNo,
        rowid: RowId,
        observed: &Sample,
        numsamples: usize,
        rng: &mut dyn RngCore,
    ) -> Result<(Value, f64)> {
        let children = self.columns.children(colno);
        if !children.iter().any(|&c| observed.contains(c)) {
            return self.base.predict_confidence(modelno, colno, rowid);
        }

        debug!(colno, rowid, "imputing local column through observed dependents");
        let constraints: Vec<(ColNo, Value)> = observed
            .iter()
            .filter(|(c, _)| *c != colno)
            .map(|(c, v)| (c, v.clone()))
            .collect();
        let samples: Vec<Value> = self
            .simulate(modelno, &constraints, &[colno], numsamples, rng)?
            .into_iter()
            .filter_map(|draw| draw.into_iter().next())
            .collect();

        match self.columns.get(colno)?.stattype()? {
            StatType::Categorical => {
                let (value, count) = mode(&samples).ok_or(ProbError::EmptyDistribution)?;
                Ok((value, count as f64 / samples.len() as f64))
            }
            StatType::Numerical => self.numerical_estimate(colno, &samples),
        }
    }

    fn impute_foreign(
        &self,
        modelno: Option<ModelNo>,
        colno: ColNo,
        rowid: RowId,
        observed: &Sample,
        numsamples: usize,
        rng: &mut dyn RngCore,
    ) -> Result<(Value, f64)> {
        let stattype = self.columns.get(colno)?.stattype()?;
        let condition_cols = self.columns.conditions(colno).unwrap_or_default();

        let mut conditions = Conditions::new();
        let mut parent_conf: f64 = 1.0;
        for &condition in condition_cols {
            let name = self.columns.get(condition)?.name.clone();
            let value = match observed.get(condition) {
                Some(value) => value.clone(),
                None => {
                    let (value, conf) =
                        self.impute(modelno, condition, rowid, observed, numsamples, rng)?;
                    debug!(colno, condition, confidence = conf, "imputed missing condition");
                    parent_conf = parent_conf.min(conf);
                    value
                }
            };
            conditions.insert(name, value);
        }

        let predictor = self.predictor(colno)?;
        let samples = predictor.simulate(numsamples, &conditions, rng)?;

        let (value, conf) = match stattype {
            StatType::Categorical => {
                let (value, _) = mode(&samples).ok_or(ProbError::EmptyDistribution)?;
                let conf = predictor.logpdf(&value, &conditions)?.exp();
                (value, conf)
            }
            StatType::Numerical => self.numerical_estimate(colno, &samples)?,
        };
        Ok((value, conf * parent_conf))
    }

    /// Sample mean and the mixture-based concentration of the samples.
    fn numerical_estimate(&self, colno: ColNo, samples: &[Value]) -> Result<(Value, f64)> {
        let xs = samples
            .iter()
            .map(|v| v.expect_number(colno))
            .collect::<Result<Vec<f64>>>()?;
        let conf = continuous_imputation_confidence(&xs, &FitOptions::from(&self.config.mixture))?;
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        Ok((Value::Number(mean), conf))
    }
}
