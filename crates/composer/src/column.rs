//! Column classification.
//!
//! Every column of a composed generator is either local (modeled by the
//! base model) or foreign (modeled by its own predictor, conditioned on
//! other columns). The split, the conditions of each foreign column and
//! their evaluation order are fixed when the generator is created.

use std::collections::BTreeMap;

use crate::error::{ComposerError, Result};
use crate::graph::DependencyGraph;
use crate::value::{ColNo, StatType};

/// How a column is modeled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnMode {
    Local,
    Foreign { conditions: Vec<ColNo> },
}

/// One column of a composed generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub colno: ColNo,
    pub name: String,
    /// Stattype as declared in the schema. Parsed on use, since only
    /// imputation needs to understand it.
    pub declared_stattype: String,
    pub mode: ColumnMode,
}

impl Column {
    pub fn stattype(&self) -> Result<StatType> {
        self.declared_stattype.parse()
    }

    pub fn is_foreign(&self) -> bool {
        matches!(self.mode, ColumnMode::Foreign { .. })
    }
}

/// The validated local/foreign split of a generator's columns.
#[derive(Debug, Clone)]
pub struct ColumnSet {
    columns: BTreeMap<ColNo, Column>,
    graph: DependencyGraph,
    /// Column → foreign columns that list it as a condition.
    children: BTreeMap<ColNo, Vec<ColNo>>,
}

impl ColumnSet {
    /// Validate the split and order the foreign columns.
    pub fn build(columns: Vec<Column>) -> Result<Self> {
        let columns: BTreeMap<ColNo, Column> =
            columns.into_iter().map(|c| (c.colno, c)).collect();

        let mut parents = BTreeMap::new();
        let mut children: BTreeMap<ColNo, Vec<ColNo>> = BTreeMap::new();
        for column in columns.values() {
            if let ColumnMode::Foreign { conditions } = &column.mode {
                if conditions.is_empty() {
                    return Err(ComposerError::EmptyConditions {
                        colno: column.colno,
                    });
                }
                for &condition in conditions {
                    if !columns.contains_key(&condition) {
                        return Err(ComposerError::UnknownColumn { colno: condition });
                    }
                    children.entry(condition).or_default().push(column.colno);
                }
                parents.insert(column.colno, conditions.clone());
            }
        }

        let graph = DependencyGraph::build(&parents)?;
        Ok(Self {
            columns,
            graph,
            children,
        })
    }

    pub fn get(&self, colno: ColNo) -> Result<&Column> {
        self.columns
            .get(&colno)
            .ok_or(ComposerError::UnknownColumn { colno })
    }

    /// Fail on the first column number that is not part of the generator.
    pub fn ensure_known(&self, colnos: impl IntoIterator<Item = ColNo>) -> Result<()> {
        for colno in colnos {
            self.get(colno)?;
        }
        Ok(())
    }

    pub fn is_local(&self, colno: ColNo) -> bool {
        matches!(
            self.columns.get(&colno).map(|c| &c.mode),
            Some(ColumnMode::Local)
        )
    }

    pub fn is_foreign(&self, colno: ColNo) -> bool {
        self.columns.get(&colno).is_some_and(Column::is_foreign)
    }

    /// Conditions of a foreign column, `None` for local columns.
    pub fn conditions(&self, colno: ColNo) -> Option<&[ColNo]> {
        match &self.columns.get(&colno)?.mode {
            ColumnMode::Foreign { conditions } => Some(conditions),
            ColumnMode::Local => None,
        }
    }

    /// Foreign columns that directly condition on `colno`.
    pub fn children(&self, colno: ColNo) -> &[ColNo] {
        self.children
            .get(&colno)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True iff every column given is local.
    pub fn all_local(&self, colnos: impl IntoIterator<Item = ColNo>) -> bool {
        colnos.into_iter().all(|c| self.is_local(c))
    }

    pub fn colnos(&self) -> impl Iterator<Item = ColNo> + '_ {
        self.columns.keys().copied()
    }

    pub fn local(&self) -> impl Iterator<Item = &Column> {
        self.columns.values().filter(|c| !c.is_foreign())
    }

    pub fn foreign(&self) -> impl Iterator<Item = &Column> {
        self.columns.values().filter(|c| c.is_foreign())
    }

    /// Foreign columns with their conditions, conditions first.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }
}
