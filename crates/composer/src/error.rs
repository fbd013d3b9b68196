//! Error types for the composer metamodel.

use composer_prob::ProbError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::value::{ColNo, GeneratorId, RowId};

/// Boxed error raised by a collaborator (base model, predictor, catalog).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while building or querying a composed generator.
#[derive(Debug, Error)]
pub enum ComposerError {
    /// The foreign columns' conditions form a cycle.
    #[error("Cyclic dependency among foreign columns {columns:?}")]
    CyclicDependency { columns: Vec<ColNo> },

    /// Imputation was asked for a row that does not exist.
    #[error("No such row in table {table} for generator {generator}: {rowid}")]
    RowNotFound {
        table: String,
        generator: GeneratorId,
        rowid: RowId,
    },

    /// The operation is deliberately not supported.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// A foreign column reached a computation that only accepts local columns.
    #[error("Foreign column {colno} in a local-only joint density; only local columns may appear in the query and constraints")]
    ForeignColumnInLocalQuery { colno: ColNo },

    /// A declared statistical type the imputation engine cannot handle.
    #[error("Unknown stattype {stattype} encountered in predict_confidence")]
    UnknownStatType { stattype: String },

    /// Generator not registered in the catalog.
    #[error("Unknown generator {generator}")]
    UnknownGenerator { generator: GeneratorId },

    /// Table not present in the catalog.
    #[error("Unknown table {table}")]
    UnknownTable { table: String },

    /// Column number not part of the generator.
    #[error("Unknown column number {colno}")]
    UnknownColumn { colno: ColNo },

    /// Column name not part of the generator.
    #[error("Unknown column name {name}")]
    UnknownColumnName { name: String },

    /// The base model has no column of this name.
    #[error("Base model has no column named {name}")]
    BaseColumnMissing { name: String },

    /// A foreign column was evaluated before one of its conditions had a value.
    #[error("Condition column {condition} of foreign column {target} has no value")]
    MissingCondition { target: ColNo, condition: ColNo },

    /// A predictor was called without a value for one of its conditions.
    #[error("No value supplied for predictor condition {name}")]
    MissingConditionValue { name: String },

    /// A foreign column declared with no conditions.
    #[error("Foreign column {colno} must have at least one condition column")]
    EmptyConditions { colno: ColNo },

    /// No constructor registered under this predictor kind.
    #[error("Unknown foreign predictor kind {kind}")]
    UnknownPredictor { kind: String },

    /// A predictor cannot be trained or queried with the given columns or values.
    #[error("Invalid use of predictor {kind}: {reason}")]
    InvalidPredictor { kind: String, reason: String },

    /// A foreign column was queried before its predictor was trained.
    #[error("Foreign predictor for column {colno} has not been trained; initialize models first")]
    PredictorNotTrained { colno: ColNo },

    /// A numerical computation received a non-numerical value.
    #[error("Column {colno} expected a numerical value, got {value}")]
    NotNumeric { colno: ColNo, value: String },

    /// An aggregate over models was requested before any model exists.
    #[error("Generator has no models")]
    NoModels,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Probability error: {0}")]
    Prob(#[from] ProbError),

    /// Failure raised by a collaborator, passed through unchanged.
    #[error(transparent)]
    Backend(#[from] BoxError),
}

impl ComposerError {
    /// Wrap a collaborator failure.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }

    /// Shorthand for [`ComposerError::Unsupported`].
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ComposerError>;
