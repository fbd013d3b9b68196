//! The composed generator and its lifecycle.
//!
//! A [`Composer`] is created once over a catalog generator, trains its
//! foreign predictors when models are initialized, and then answers
//! queries (see the `inference` and `impute` modules for the query side).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::base::{BaseAdapter, BaseModel};
use crate::catalog::Catalog;
use crate::column::{Column, ColumnMode, ColumnSet};
use crate::config::{AnalyzeOptions, ComposerConfig, CompositionSpec};
use crate::error::{ComposerError, Result};
use crate::predictor::{ColumnSpec, ForeignPredictor, PredictorRegistry, TrainingData};
use crate::sampler::{ForwardSampler, Predictors};
use crate::value::{ColNo, GeneratorId, ModelNo};

/// A base model composed with foreign predictors over one table.
pub struct Composer {
    generator: GeneratorId,
    table: String,
    catalog: Arc<dyn Catalog>,
    pub(crate) columns: ColumnSet,
    pub(crate) base: BaseAdapter,
    registry: PredictorRegistry,
    /// Foreign column → predictor kind.
    kinds: BTreeMap<ColNo, String>,
    pub(crate) predictors: Predictors,
    pub(crate) config: ComposerConfig,
    models: BTreeSet<ModelNo>,
}

impl fmt::Debug for Composer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composer")
            .field("generator", &self.generator)
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("base", &self.base)
            .field("kinds", &self.kinds)
            .field("trained", &self.predictors.keys().collect::<Vec<_>>())
            .field("models", &self.models)
            .finish()
    }
}

impl Composer {
    /// Compose `base_model` (fitted on `base_generator`) with the foreign
    /// columns declared in `spec`.
    ///
    /// Fails if a declared column or condition is not part of the
    /// generator, a predictor kind is not registered, a local column is
    /// missing from the base generator, or the conditions are cyclic.
    pub fn create(
        catalog: Arc<dyn Catalog>,
        generator: GeneratorId,
        base_generator: GeneratorId,
        base_model: Box<dyn BaseModel>,
        spec: &CompositionSpec,
        registry: PredictorRegistry,
        config: ComposerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let table = catalog.generator_table(generator)?;

        let mut kinds = BTreeMap::new();
        let mut foreign = BTreeMap::new();
        for (name, fs) in &spec.foreign {
            if !registry.has_kind(&fs.predictor) {
                return Err(ComposerError::UnknownPredictor {
                    kind: fs.predictor.clone(),
                });
            }
            let colno = catalog.column_number(generator, name)?;
            let conditions = fs
                .conditions
                .iter()
                .map(|c| catalog.column_number(generator, c))
                .collect::<Result<Vec<_>>>()?;
            kinds.insert(colno, fs.predictor.clone());
            foreign.insert(colno, conditions);
        }

        let mut columns = Vec::new();
        for colno in catalog.column_numbers(generator)? {
            columns.push(Column {
                colno,
                name: catalog.column_name(generator, colno)?,
                declared_stattype: catalog.column_stattype(generator, colno)?,
                mode: match foreign.remove(&colno) {
                    Some(conditions) => ColumnMode::Foreign { conditions },
                    None => ColumnMode::Local,
                },
            });
        }
        let columns = ColumnSet::build(columns)?;
        let base = BaseAdapter::new(base_model, catalog.as_ref(), base_generator, &columns)?;

        info!(
            generator = %generator,
            base_generator = %base_generator,
            table = %table,
            local = columns.local().count(),
            foreign = columns.foreign().count(),
            "created composed generator"
        );

        Ok(Self {
            generator,
            table,
            catalog,
            columns,
            base,
            registry,
            kinds,
            predictors: BTreeMap::new(),
            config,
            models: BTreeSet::new(),
        })
    }

    pub fn generator(&self) -> GeneratorId {
        self.generator
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub(crate) fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    /// Model numbers initialized so far, ascending.
    pub fn models(&self) -> impl Iterator<Item = ModelNo> + '_ {
        self.models.iter().copied()
    }

    /// The trained predictor of a foreign column.
    pub fn predictor(&self, colno: ColNo) -> Result<&dyn ForeignPredictor> {
        self.sampler().predictor(colno)
    }

    pub(crate) fn sampler(&self) -> ForwardSampler<'_> {
        ForwardSampler::new(&self.columns, &self.base, &self.predictors)
    }

    /// Column names in column-number order, as used for row fetches.
    pub(crate) fn column_names(&self) -> Vec<String> {
        self.columns
            .colnos()
            .filter_map(|c| self.columns.get(c).ok().map(|col| col.name.clone()))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Record `modelnos` and train every foreign predictor on the table.
    ///
    /// The base model's own models are initialized by its owner; the base
    /// and foreign predictors are never trained jointly.
    pub fn initialize_models(&mut self, modelnos: &[ModelNo]) -> Result<()> {
        let names = self.column_names();
        let rows = self.catalog.fetch_table(&self.table, &names)?;
        let n_rows = rows.len();
        let data = TrainingData::new(names, rows);

        for (&colno, kind) in &self.kinds {
            let spec = |c: ColNo| -> Result<ColumnSpec> {
                let column = self.columns.get(c)?;
                Ok(ColumnSpec::new(
                    column.name.clone(),
                    column.declared_stattype.clone(),
                ))
            };
            let target = spec(colno)?;
            let conditions = self
                .columns
                .conditions(colno)
                .unwrap_or_default()
                .iter()
                .map(|&c| spec(c))
                .collect::<Result<Vec<_>>>()?;

            let predictor = self.registry.create(kind, &data, &target, &conditions)?;
            self.predictors.insert(colno, predictor);
        }

        self.models.extend(modelnos.iter().copied());
        info!(
            generator = %self.generator,
            models = modelnos.len(),
            predictors = self.predictors.len(),
            rows = n_rows,
            "initialized models"
        );
        Ok(())
    }

    /// Run the base model's analysis. Foreign predictors are not retrained.
    pub fn analyze_models(
        &mut self,
        modelnos: Option<&[ModelNo]>,
        options: &AnalyzeOptions,
    ) -> Result<()> {
        info!(
            generator = %self.generator,
            iterations = options.iterations,
            "analyzing base models"
        );
        self.base.model_mut().analyze_models(modelnos, options)
    }

    /// Always fails: composed generators cannot be dropped yet.
    pub fn drop_generator(&mut self) -> Result<()> {
        Err(ComposerError::unsupported(
            "drop_generator: composed generators cannot be dropped",
        ))
    }

    /// Always fails: models of a composed generator cannot be dropped yet.
    pub fn drop_models(&mut self, _modelnos: Option<&[ModelNo]>) -> Result<()> {
        Err(ComposerError::unsupported(
            "drop_models: models of composed generators cannot be dropped",
        ))
    }
}
