//! Queries over the composed joint distribution.
//!
//! Queries touching only local columns go straight to the base model.
//! Everything else is answered from forward samples. A conditional density
//! is the ratio of two importance estimates, log p(q, y) - log p(y), and a
//! simulation resamples one weighted set. Dependence is read structurally
//! from the conditions; mutual information is a Monte Carlo average over
//! the density estimator.

use composer_prob::{effective_sample_size, logmeanexp, marginal_estimate, resample};
use rand::RngCore;
use tracing::{debug, warn};

use crate::composer::Composer;
use crate::error::{ComposerError, Result};
use crate::value::{ColNo, ModelNo, RowId, Value};

/// Drop query entries that are fixed by the evidence (or repeated in the
/// query). `None` if any of them disagree.
fn reconcile(query: &[(ColNo, Value)], evidence: &[(ColNo, Value)]) -> Option<Vec<(ColNo, Value)>> {
    let mut kept: Vec<(ColNo, Value)> = Vec::with_capacity(query.len());
    for (colno, value) in query {
        let fixed = evidence
            .iter()
            .chain(kept.iter())
            .find(|(c, _)| c == colno)
            .map(|(_, v)| v);
        match fixed {
            Some(v) if v == value => {}
            Some(_) => return None,
            None => kept.push((*colno, value.clone())),
        }
    }
    Some(kept)
}

impl Composer {
    fn fast_path(&self, colnos: impl IntoIterator<Item = ColNo>) -> bool {
        self.config.fast_path && self.columns.all_local(colnos)
    }

    /// Models to average over when the caller names none.
    fn model_list(&self) -> Result<Vec<ModelNo>> {
        let models: Vec<ModelNo> = self.models().collect();
        if models.is_empty() {
            return Err(ComposerError::NoModels);
        }
        Ok(models)
    }

    // ------------------------------------------------------------------------
    // Densities
    // ------------------------------------------------------------------------

    /// Log density of the assignment `query` given `evidence`.
    pub fn joint_log_density(
        &self,
        modelno: Option<ModelNo>,
        query: &[(ColNo, Value)],
        evidence: &[(ColNo, Value)],
        rng: &mut dyn RngCore,
    ) -> Result<f64> {
        self.columns
            .ensure_known(query.iter().chain(evidence).map(|(c, _)| *c))?;

        let Some(query) = reconcile(query, evidence) else {
            return Ok(f64::NEG_INFINITY);
        };
        if query.is_empty() {
            return Ok(0.0);
        }

        if self.fast_path(query.iter().chain(evidence).map(|(c, _)| *c)) {
            debug!(query = query.len(), "fast path: local joint density");
            return self
                .base
                .local_joint_log_density(modelno, &query, evidence);
        }

        let joint: Vec<(ColNo, Value)> = query.iter().chain(evidence).cloned().collect();
        let log_evidence = if evidence.is_empty() {
            0.0
        } else {
            self.log_marginal(modelno, evidence, rng)?
        };
        if log_evidence == f64::NEG_INFINITY {
            warn!(
                evidence = evidence.len(),
                "every importance weight is zero; evidence is impossible under the model"
            );
            return Ok(f64::NEG_INFINITY);
        }
        let log_joint = self.log_marginal(modelno, &joint, rng)?;
        Ok(log_joint - log_evidence)
    }

    /// Importance estimate of log p(`observed`) from one weighted set.
    ///
    /// Every observed column, query or evidence, contributes its likelihood
    /// to the weights, so observed children of a query column are scored
    /// against the queried value rather than a sampled one.
    fn log_marginal(
        &self,
        modelno: Option<ModelNo>,
        observed: &[(ColNo, Value)],
        rng: &mut dyn RngCore,
    ) -> Result<f64> {
        let set = self
            .sampler()
            .sample(modelno, observed, self.config.importance_samples, rng)?;
        let log_weights: Vec<f64> = set.iter().map(|ws| ws.log_weight).collect();
        let estimate = marginal_estimate(&log_weights)?;
        debug!(
            observed = observed.len(),
            samples = estimate.n_samples,
            ess = estimate.effective_sample_size,
            "importance estimate"
        );
        Ok(estimate.log_estimate)
    }

    /// Probability (density) of `colno = value` given `constraints`.
    ///
    /// Without a model number the per-model densities are averaged.
    pub fn column_value_probability(
        &self,
        modelno: Option<ModelNo>,
        colno: ColNo,
        value: &Value,
        constraints: &[(ColNo, Value)],
        rng: &mut dyn RngCore,
    ) -> Result<f64> {
        let query = [(colno, value.clone())];
        let log_p = match modelno {
            Some(m) => self.joint_log_density(Some(m), &query, constraints, rng)?,
            None => {
                let per_model = self
                    .model_list()?
                    .into_iter()
                    .map(|m| self.joint_log_density(Some(m), &query, constraints, rng))
                    .collect::<Result<Vec<f64>>>()?;
                logmeanexp(&per_model)
            }
        };
        Ok(log_p.exp())
    }

    /// Retired; use [`Composer::column_value_probability`].
    pub fn row_column_predictive_probability(
        &self,
        _modelno: Option<ModelNo>,
        _rowid: RowId,
        _colno: ColNo,
    ) -> Result<f64> {
        Err(ComposerError::unsupported(
            "row_column_predictive_probability is retired; use column_value_probability",
        ))
    }

    // ------------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------------

    /// `numpredictions` draws of `targets` given `constraints`.
    ///
    /// Outside the fast path a single weighted set of
    /// `importance_samples` draws is resampled `numpredictions` times.
    pub fn simulate(
        &self,
        modelno: Option<ModelNo>,
        constraints: &[(ColNo, Value)],
        targets: &[ColNo],
        numpredictions: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Vec<Value>>> {
        self.columns.ensure_known(
            targets
                .iter()
                .copied()
                .chain(constraints.iter().map(|(c, _)| *c)),
        )?;

        if self.fast_path(
            targets
                .iter()
                .copied()
                .chain(constraints.iter().map(|(c, _)| *c)),
        ) {
            debug!(targets = targets.len(), "fast path: simulate");
            return self
                .base
                .simulate(modelno, constraints, targets, numpredictions, rng);
        }

        let set = self
            .sampler()
            .sample(modelno, constraints, self.config.importance_samples, rng)?;
        let log_weights: Vec<f64> = set.iter().map(|ws| ws.log_weight).collect();
        debug!(
            samples = set.len(),
            ess = effective_sample_size(&log_weights),
            numpredictions,
            "resampling weighted set"
        );

        resample(&log_weights, numpredictions, rng)?
            .into_iter()
            .map(|i| {
                targets
                    .iter()
                    .map(|&t| {
                        set[i]
                            .sample
                            .get(t)
                            .cloned()
                            .ok_or(ComposerError::UnknownColumn { colno: t })
                    })
                    .collect::<Result<Vec<Value>>>()
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Column relations
    // ------------------------------------------------------------------------

    /// Probability that two columns are dependent.
    ///
    /// Without a model number the per-model answers are averaged.
    pub fn column_dependence_probability(
        &self,
        modelno: Option<ModelNo>,
        colno0: ColNo,
        colno1: ColNo,
    ) -> Result<f64> {
        self.columns.ensure_known([colno0, colno1])?;
        match modelno {
            Some(m) => self.dependence_in_model(m, colno0, colno1),
            None => {
                let models = self.model_list()?;
                let mut total = 0.0;
                for &m in &models {
                    total += self.dependence_in_model(m, colno0, colno1)?;
                }
                Ok(total / models.len() as f64)
            }
        }
    }

    fn dependence_in_model(&self, modelno: ModelNo, colno0: ColNo, colno1: ColNo) -> Result<f64> {
        if colno0 == colno1 {
            return Ok(1.0);
        }

        let conds0 = self.columns.conditions(colno0);
        let conds1 = self.columns.conditions(colno1);

        match (conds0, conds1) {
            (None, None) => self
                .base
                .column_dependence_probability(Some(modelno), colno0, colno1),
            _ if conds0.is_some_and(|c| c.contains(&colno1))
                || conds1.is_some_and(|c| c.contains(&colno0)) =>
            {
                Ok(1.0)
            }
            (Some(conds), None) => self.any_dependent(modelno, conds, &[colno1]),
            (None, Some(conds)) => self.any_dependent(modelno, &[colno0], conds),
            (Some(c0), Some(c1)) => self.any_dependent(modelno, c0, c1),
        }
    }

    /// 1 if any pair across `left` × `right` is dependent, else 0.
    fn any_dependent(&self, modelno: ModelNo, left: &[ColNo], right: &[ColNo]) -> Result<f64> {
        for &a in left {
            for &b in right {
                if self.dependence_in_model(modelno, a, b)? > 0.0 {
                    return Ok(1.0);
                }
            }
        }
        Ok(0.0)
    }

    /// Mutual information between two columns.
    ///
    /// With a foreign column involved this is the Monte Carlo average of
    /// log p(x, y) − log p(x) − log p(y) over `numsamples` joint draws.
    pub fn column_mutual_information(
        &self,
        modelno: Option<ModelNo>,
        colno0: ColNo,
        colno1: ColNo,
        numsamples: Option<usize>,
        rng: &mut dyn RngCore,
    ) -> Result<f64> {
        self.columns.ensure_known([colno0, colno1])?;
        let numsamples = numsamples.unwrap_or(self.config.mutual_information_samples);

        if self.fast_path([colno0, colno1]) {
            debug!("fast path: mutual information");
            return self
                .base
                .column_mutual_information(modelno, colno0, colno1, numsamples);
        }

        let draws = self.simulate(modelno, &[], &[colno0, colno1], numsamples, rng)?;
        if draws.is_empty() {
            return Ok(0.0);
        }

        let mut total = 0.0;
        for draw in &draws {
            let qx = [(colno0, draw[0].clone())];
            let qy = [(colno1, draw[1].clone())];
            let qxy = [qx[0].clone(), qy[0].clone()];
            let log_px = self.joint_log_density(modelno, &qx, &[], rng)?;
            let log_py = self.joint_log_density(modelno, &qy, &[], rng)?;
            let log_pxy = self.joint_log_density(modelno, &qxy, &[], rng)?;
            total += log_pxy - log_px - log_py;
        }
        Ok(total / draws.len() as f64)
    }

    /// Similarity of two rows; always answered by the base model.
    pub fn row_similarity(
        &self,
        modelno: Option<ModelNo>,
        rowid: RowId,
        target_rowid: RowId,
        colnos: &[ColNo],
    ) -> Result<f64> {
        self.columns.ensure_known(colnos.iter().copied())?;
        self.base
            .row_similarity(modelno, rowid, target_rowid, colnos)
    }
}
