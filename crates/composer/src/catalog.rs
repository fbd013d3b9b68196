//! Table and column metadata lookups.
//!
//! The composer never owns table storage. Everything it needs from the
//! schema layer (names, stattypes, rows) goes through [`Catalog`].

use std::collections::{BTreeMap, HashMap};

use crate::error::{ComposerError, Result};
use crate::value::{ColNo, GeneratorId, Row, RowId};

/// Schema and row access for generators and their tables.
pub trait Catalog: Send + Sync {
    /// Name of the table a generator models.
    fn generator_table(&self, generator: GeneratorId) -> Result<String>;

    /// Column numbers of a generator, in ascending order.
    fn column_numbers(&self, generator: GeneratorId) -> Result<Vec<ColNo>>;

    fn column_name(&self, generator: GeneratorId, colno: ColNo) -> Result<String>;

    fn column_number(&self, generator: GeneratorId, name: &str) -> Result<ColNo>;

    /// Declared stattype, as written in the schema.
    fn column_stattype(&self, generator: GeneratorId, colno: ColNo) -> Result<String>;

    /// One row restricted to `columns`, or `None` if `rowid` is absent.
    fn fetch_row(&self, table: &str, columns: &[String], rowid: RowId) -> Result<Option<Row>>;

    /// Every row restricted to `columns`, ordered by row id.
    fn fetch_table(&self, table: &str, columns: &[String]) -> Result<Vec<Row>>;
}

#[derive(Debug, Clone)]
struct MemoryGenerator {
    table: String,
    /// (name, stattype), indexed by column number.
    columns: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    columns: Vec<String>,
    rows: BTreeMap<RowId, Row>,
}

/// In-memory [`Catalog`] for tests and demos.
///
/// A generator's column numbers are the positions of its columns in the
/// list passed to [`MemoryCatalog::add_generator`].
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    generators: HashMap<GeneratorId, MemoryGenerator>,
    tables: HashMap<String, MemoryTable>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table with the given column names.
    pub fn add_table(&mut self, name: &str, columns: &[&str]) {
        self.tables.insert(
            name.to_string(),
            MemoryTable {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows: BTreeMap::new(),
            },
        );
    }

    /// Insert or replace a row. Cells are aligned with the table's columns.
    pub fn insert_row(&mut self, table: &str, rowid: RowId, row: Row) -> Result<()> {
        let entry = self
            .tables
            .get_mut(table)
            .ok_or_else(|| ComposerError::UnknownTable {
                table: table.to_string(),
            })?;
        entry.rows.insert(rowid, row);
        Ok(())
    }

    /// Register a generator over `table` with `(name, stattype)` columns.
    pub fn add_generator(&mut self, generator: GeneratorId, table: &str, columns: &[(&str, &str)]) {
        self.generators.insert(
            generator,
            MemoryGenerator {
                table: table.to_string(),
                columns: columns
                    .iter()
                    .map(|(n, s)| (n.to_string(), s.to_string()))
                    .collect(),
            },
        );
    }

    fn generator(&self, generator: GeneratorId) -> Result<&MemoryGenerator> {
        self.generators
            .get(&generator)
            .ok_or(ComposerError::UnknownGenerator { generator })
    }

    fn table(&self, table: &str) -> Result<&MemoryTable> {
        self.tables
            .get(table)
            .ok_or_else(|| ComposerError::UnknownTable {
                table: table.to_string(),
            })
    }

    fn project(table: &MemoryTable, columns: &[String], row: &Row) -> Result<Row> {
        columns
            .iter()
            .map(|name| {
                let idx = table
                    .columns
                    .iter()
                    .position(|c| c == name)
                    .ok_or_else(|| ComposerError::UnknownColumnName { name: name.clone() })?;
                Ok(row.get(idx).cloned().flatten())
            })
            .collect()
    }
}

impl Catalog for MemoryCatalog {
    fn generator_table(&self, generator: GeneratorId) -> Result<String> {
        Ok(self.generator(generator)?.table.clone())
    }

    fn column_numbers(&self, generator: GeneratorId) -> Result<Vec<ColNo>> {
        Ok((0..self.generator(generator)?.columns.len()).collect())
    }

    fn column_name(&self, generator: GeneratorId, colno: ColNo) -> Result<String> {
        self.generator(generator)?
            .columns
            .get(colno)
            .map(|(name, _)| name.clone())
            .ok_or(ComposerError::UnknownColumn { colno })
    }

    fn column_number(&self, generator: GeneratorId, name: &str) -> Result<ColNo> {
        self.generator(generator)?
            .columns
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| ComposerError::UnknownColumnName {
                name: name.to_string(),
            })
    }

    fn column_stattype(&self, generator: GeneratorId, colno: ColNo) -> Result<String> {
        self.generator(generator)?
            .columns
            .get(colno)
            .map(|(_, stattype)| stattype.clone())
            .ok_or(ComposerError::UnknownColumn { colno })
    }

    fn fetch_row(&self, table: &str, columns: &[String], rowid: RowId) -> Result<Option<Row>> {
        let t = self.table(table)?;
        t.rows
            .get(&rowid)
            .map(|row| Self::project(t, columns, row))
            .transpose()
    }

    fn fetch_table(&self, table: &str, columns: &[String]) -> Result<Vec<Row>> {
        let t = self.table(table)?;
        t.rows
            .values()
            .map(|row| Self::project(t, columns, row))
            .collect()
    }
}
