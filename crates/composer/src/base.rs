//! The base model and the adapter that speaks to it.
//!
//! Local columns are modeled by an external engine that knows nothing
//! about foreign columns and uses its own column numbering. The adapter
//! owns that engine plus the translation table from this generator's
//! column numbers to the engine's, and forwards queries that involve
//! local columns only.

use std::collections::BTreeMap;
use std::fmt;

use rand::RngCore;
use tracing::debug;

use crate::catalog::Catalog;
use crate::column::ColumnSet;
use crate::config::AnalyzeOptions;
use crate::error::{ComposerError, Result};
use crate::value::{BaseColNo, ColNo, GeneratorId, ModelNo, RowId, Value};

// ============================================================================
// BaseModel Trait
// ============================================================================

/// The delegate inference engine for local columns.
///
/// Every column argument is in the engine's own numbering. `modelno = None`
/// leaves aggregation over models to the engine.
pub trait BaseModel: Send + Sync {
    /// `n` joint draws of `targets` given `constraints`, one row per draw,
    /// positionally aligned with `targets`.
    fn simulate(
        &self,
        modelno: Option<ModelNo>,
        constraints: &[(BaseColNo, Value)],
        targets: &[BaseColNo],
        n: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Vec<Value>>>;

    /// Probability (or density) of `colno = value` given `constraints`.
    fn column_value_probability(
        &self,
        modelno: Option<ModelNo>,
        colno: BaseColNo,
        value: &Value,
        constraints: &[(BaseColNo, Value)],
    ) -> Result<f64>;

    fn column_dependence_probability(
        &self,
        modelno: Option<ModelNo>,
        colno0: BaseColNo,
        colno1: BaseColNo,
    ) -> Result<f64>;

    fn column_mutual_information(
        &self,
        modelno: Option<ModelNo>,
        colno0: BaseColNo,
        colno1: BaseColNo,
        numsamples: usize,
    ) -> Result<f64>;

    fn row_similarity(
        &self,
        modelno: Option<ModelNo>,
        rowid: RowId,
        target_rowid: RowId,
        colnos: &[BaseColNo],
    ) -> Result<f64>;

    /// Imputed value of a cell with a confidence in [0, 1].
    fn predict_confidence(
        &self,
        modelno: Option<ModelNo>,
        colno: BaseColNo,
        rowid: RowId,
    ) -> Result<(Value, f64)>;

    /// Run the engine's own inference. `None` means all models.
    fn analyze_models(
        &mut self,
        modelnos: Option<&[ModelNo]>,
        options: &AnalyzeOptions,
    ) -> Result<()>;
}

// ============================================================================
// Adapter
// ============================================================================

/// A base model bound to one composed generator.
pub struct BaseAdapter {
    model: Box<dyn BaseModel>,
    generator: GeneratorId,
    /// Local column → base column.
    to_base: BTreeMap<ColNo, BaseColNo>,
    names: BTreeMap<ColNo, String>,
}

impl fmt::Debug for BaseAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseAdapter")
            .field("generator", &self.generator)
            .field("to_base", &self.to_base)
            .finish()
    }
}

impl BaseAdapter {
    /// Resolve every local column of `columns` in the base generator by name.
    pub fn new(
        model: Box<dyn BaseModel>,
        catalog: &dyn Catalog,
        generator: GeneratorId,
        columns: &ColumnSet,
    ) -> Result<Self> {
        let mut to_base = BTreeMap::new();
        for column in columns.local() {
            let base = catalog
                .column_number(generator, &column.name)
                .map_err(|err| match err {
                    ComposerError::UnknownColumnName { name } => {
                        ComposerError::BaseColumnMissing { name }
                    }
                    other => other,
                })?;
            to_base.insert(column.colno, BaseColNo(base));
        }
        let names = columns
            .colnos()
            .filter_map(|c| columns.get(c).ok().map(|col| (c, col.name.clone())))
            .collect();

        Ok(Self {
            model,
            generator,
            to_base,
            names,
        })
    }

    /// The base generator's identifier.
    pub fn generator(&self) -> GeneratorId {
        self.generator
    }

    pub fn model_mut(&mut self) -> &mut dyn BaseModel {
        self.model.as_mut()
    }

    /// Base-model numbering of one column.
    pub fn translate(&self, colno: ColNo) -> Result<BaseColNo> {
        self.to_base.get(&colno).copied().ok_or_else(|| {
            match self.names.get(&colno) {
                Some(name) => ComposerError::BaseColumnMissing { name: name.clone() },
                None => ComposerError::UnknownColumn { colno },
            }
        })
    }

    pub fn translate_all(&self, colnos: &[ColNo]) -> Result<Vec<BaseColNo>> {
        colnos.iter().map(|&c| self.translate(c)).collect()
    }

    pub fn translate_pairs(&self, pairs: &[(ColNo, Value)]) -> Result<Vec<(BaseColNo, Value)>> {
        pairs
            .iter()
            .map(|(c, v)| Ok((self.translate(*c)?, v.clone())))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Delegation
    // ------------------------------------------------------------------------

    pub fn simulate(
        &self,
        modelno: Option<ModelNo>,
        constraints: &[(ColNo, Value)],
        targets: &[ColNo],
        n: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Vec<Value>>> {
        let constraints = self.translate_pairs(constraints)?;
        let targets = self.translate_all(targets)?;
        debug!(n, targets = targets.len(), "delegating simulate to base model");
        self.model.simulate(modelno, &constraints, &targets, n, rng)
    }

    pub fn column_dependence_probability(
        &self,
        modelno: Option<ModelNo>,
        colno0: ColNo,
        colno1: ColNo,
    ) -> Result<f64> {
        let (b0, b1) = (self.translate(colno0)?, self.translate(colno1)?);
        self.model.column_dependence_probability(modelno, b0, b1)
    }

    pub fn column_mutual_information(
        &self,
        modelno: Option<ModelNo>,
        colno0: ColNo,
        colno1: ColNo,
        numsamples: usize,
    ) -> Result<f64> {
        let (b0, b1) = (self.translate(colno0)?, self.translate(colno1)?);
        self.model
            .column_mutual_information(modelno, b0, b1, numsamples)
    }

    pub fn row_similarity(
        &self,
        modelno: Option<ModelNo>,
        rowid: RowId,
        target_rowid: RowId,
        colnos: &[ColNo],
    ) -> Result<f64> {
        let colnos = self.translate_all(colnos)?;
        self.model
            .row_similarity(modelno, rowid, target_rowid, &colnos)
    }

    pub fn predict_confidence(
        &self,
        modelno: Option<ModelNo>,
        colno: ColNo,
        rowid: RowId,
    ) -> Result<(Value, f64)> {
        let base = self.translate(colno)?;
        self.model.predict_confidence(modelno, base, rowid)
    }

    /// Log density of the local assignment `query` given local `evidence`.
    ///
    /// Columns fixed in both lists must agree: a conflict has log density
    /// −∞, agreement removes the column from the query. The rest is the
    /// chain rule over `query`, each factor conditioned on the evidence
    /// plus the query columns before it.
    pub fn local_joint_log_density(
        &self,
        modelno: Option<ModelNo>,
        query: &[(ColNo, Value)],
        evidence: &[(ColNo, Value)],
    ) -> Result<f64> {
        for (colno, _) in query.iter().chain(evidence) {
            if !self.to_base.contains_key(colno) {
                return Err(ComposerError::ForeignColumnInLocalQuery { colno: *colno });
            }
        }

        let mut remaining = Vec::with_capacity(query.len());
        for (cq, vq) in query {
            match evidence.iter().find(|(cy, _)| cy == cq) {
                Some((_, vy)) if vy == vq => {}
                Some(_) => return Ok(f64::NEG_INFINITY),
                None => remaining.push((*cq, vq.clone())),
            }
        }

        let mut given = self.translate_pairs(evidence)?;
        let mut log_density = 0.0;
        for (colno, value) in remaining {
            let base = self.translate(colno)?;
            let p = self
                .model
                .column_value_probability(modelno, base, &value, &given)?;
            if p == 0.0 {
                return Ok(f64::NEG_INFINITY);
            }
            log_density += p.ln();
            given.push((base, value));
        }
        Ok(log_density)
    }
}
