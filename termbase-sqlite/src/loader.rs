//! Loading source tables into the store.
//!
//! A load runs in stages:
//!
//! 1. (re)create the shared relations and every selected table, in one
//!    transaction;
//! 2. per table, in declaration order: read the source, check the header,
//!    validate and insert each row, then run the tree checks. Each table is
//!    its own transaction; a table whose source cannot be used is rolled back
//!    and reported as failed while the others carry on;
//! 3. foreign-key and `under` checks, once every table is in;
//! 4. replace the violations of every selected table, then the prefixes.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;

use indexmap::IndexMap;
use rusqlite::types::Value;
use rusqlite::{Connection, ErrorCode as SqliteCode, Statement, params_from_iter};
use smol_str::SmolStr;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use termbase_schema::compiler::{PREFIX_TABLE, ROW_NUMBER, VIOLATION_TABLE};
use termbase_schema::parser::tsv::TsvSheet;
use termbase_schema::validator::{check_foreign_keys, check_tree, check_under};
use termbase_schema::{
    ColumnValues, CompiledSchema, CompiledTable, Level, SchemaError, TableValidator,
    UnderConstraint, Violation, quote_ident,
};

use crate::error::StoreError;
use crate::source::SourceReader;
use crate::store::read_column;
use crate::types::cell_to_sqlite;

/// Errors raised while loading.
///
/// `Table*` variants fail one table only and end up in its [`TableReport`];
/// the others abort the load.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read table `{table}` from `{location}`: {source}")]
    TableRead {
        table: String,
        location: String,
        #[source]
        source: io::Error,
    },

    #[error("header of table `{table}` does not match its columns: {message}")]
    TableHeader { table: String, message: String },

    #[error("row {row} of table `{table}` has {found} field(s), expected {expected}")]
    TableFieldCount {
        table: String,
        /// 1-based data row.
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("table `{0}` is not a declared data table")]
    UnknownTable(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LoadError {
    /// Check if this error fails a single table rather than the load.
    pub fn is_table_failure(&self) -> bool {
        matches!(
            self,
            Self::TableRead { .. } | Self::TableHeader { .. } | Self::TableFieldCount { .. }
        )
    }

    /// The table a per-table failure belongs to.
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::TableRead { table, .. }
            | Self::TableHeader { table, .. }
            | Self::TableFieldCount { table, .. } => Some(table),
            Self::UnknownTable(table) => Some(table),
            Self::Schema(_) | Self::Store(_) => None,
        }
    }
}

impl From<rusqlite::Error> for LoadError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store(err.into())
    }
}

/// Which tables a load covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    /// Every data table.
    #[default]
    All,
    /// Only the named tables; they still load in declaration order.
    Tables(Vec<String>),
}

impl Selection {
    pub fn tables<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            Self::All
        } else {
            Self::Tables(names)
        }
    }

    fn resolve<'s>(&self, schema: &'s CompiledSchema) -> Result<Vec<&'s CompiledTable>, LoadError> {
        match self {
            Self::All => Ok(schema.tables.values().collect()),
            Self::Tables(names) => {
                if let Some(unknown) = names.iter().find(|n| schema.table(n).is_none()) {
                    return Err(LoadError::UnknownTable(unknown.clone()));
                }
                Ok(schema
                    .tables
                    .values()
                    .filter(|t| names.iter().any(|n| n == t.name.as_str()))
                    .collect())
            }
        }
    }
}

/// Violation counts per level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl LevelCounts {
    pub fn add(&mut self, level: Level) {
        match level {
            Level::Error => self.error += 1,
            Level::Warning => self.warning += 1,
            Level::Info => self.info += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.error + self.warning + self.info
    }
}

impl fmt::Display for LevelCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error(s), {} warning(s), {} info",
            self.error, self.warning, self.info
        )
    }
}

/// Outcome of one table.
#[derive(Debug)]
pub enum TableStatus {
    Loaded,
    Failed(LoadError),
}

/// Per-table part of a [`LoadReport`].
#[derive(Debug)]
pub struct TableReport {
    pub table: SmolStr,
    pub status: TableStatus,
    /// Rows stored in the main table.
    pub rows: usize,
    /// Rows stored in the conflict table.
    pub conflict_rows: usize,
    pub counts: LevelCounts,
}

impl TableReport {
    pub fn is_loaded(&self) -> bool {
        matches!(self.status, TableStatus::Loaded)
    }

    pub fn error(&self) -> Option<&LoadError> {
        match &self.status {
            TableStatus::Failed(e) => Some(e),
            TableStatus::Loaded => None,
        }
    }
}

/// Result of a load.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Tables in load order.
    pub tables: Vec<TableReport>,
    /// Every violation found, in table/row/column order.
    pub violations: Vec<Violation>,
}

impl LoadReport {
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    pub fn failed(&self) -> impl Iterator<Item = &TableReport> {
        self.tables.iter().filter(|t| !t.is_loaded())
    }

    /// Counts across every table.
    pub fn counts(&self) -> LevelCounts {
        let mut counts = LevelCounts::default();
        for v in &self.violations {
            counts.add(v.level);
        }
        counts
    }

    /// No table failed and no `error` violation was found.
    pub fn is_clean(&self) -> bool {
        self.failed().next().is_none() && self.counts().error == 0
    }

    pub fn violations_for<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations.iter().filter(move |v| v.table == table)
    }
}

/// What a successfully loaded table leaves behind for the later stages.
struct LoadedTable {
    rows: usize,
    conflict_rows: usize,
    violations: Vec<Violation>,
    values: IndexMap<SmolStr, ColumnValues>,
}

/// Loads source tables for one compiled schema.
pub struct Loader<'a> {
    schema: &'a CompiledSchema,
    source: &'a dyn SourceReader,
}

impl<'a> Loader<'a> {
    pub fn new(schema: &'a CompiledSchema, source: &'a dyn SourceReader) -> Self {
        Self { schema, source }
    }

    /// Load the selected tables into `conn`.
    #[instrument(skip_all)]
    pub fn load(&self, conn: &mut Connection, selection: &Selection) -> Result<LoadReport, LoadError> {
        let tables = selection.resolve(self.schema)?;
        info!(tables = tables.len(), "Loading dataset");

        create_relations(conn, &tables)?;

        let mut collected: HashMap<SmolStr, IndexMap<SmolStr, ColumnValues>> = HashMap::new();
        let mut reports = Vec::with_capacity(tables.len());
        let mut violations = Vec::new();

        for table in &tables {
            match self.load_table(conn, table) {
                Ok(loaded) => {
                    info!(
                        table = %table.name,
                        rows = loaded.rows,
                        conflicts = loaded.conflict_rows,
                        "Loaded table"
                    );
                    reports.push(TableReport {
                        table: table.name.clone(),
                        status: TableStatus::Loaded,
                        rows: loaded.rows,
                        conflict_rows: loaded.conflict_rows,
                        counts: LevelCounts::default(),
                    });
                    violations.extend(loaded.violations);
                    collected.insert(table.name.clone(), loaded.values);
                }
                Err(e) if e.is_table_failure() => {
                    warn!(table = %table.name, error = %e, "Table failed to load");
                    reports.push(TableReport {
                        table: table.name.clone(),
                        status: TableStatus::Failed(e),
                        rows: 0,
                        conflict_rows: 0,
                        counts: LevelCounts::default(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        for table in &tables {
            let Some(values) = collected.get(&table.name) else {
                continue;
            };
            for fk in &table.foreign_keys {
                let Some(column_values) = values.get(&fk.column) else {
                    continue;
                };
                let targets = self
                    .values_of(conn, &collected, &fk.target_table, &fk.target_column)?
                    .map(|v| v.into_values().collect::<HashSet<_>>());
                violations.extend(check_foreign_keys(
                    &table.name,
                    fk,
                    column_values,
                    targets.as_ref(),
                ));
            }
            for under in &table.unders {
                let Some(column_values) = values.get(&under.column) else {
                    continue;
                };
                let (children, parents) = self.tree_of(conn, &collected, under)?;
                violations.extend(check_under(
                    &table.name,
                    under,
                    column_values,
                    &children,
                    &parents,
                ));
            }
        }

        violations.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        for report in &mut reports {
            for v in violations.iter().filter(|v| v.table == report.table) {
                report.counts.add(v.level);
            }
        }

        write_violations(conn, &tables, &violations)?;
        write_prefixes(conn, self.schema)?;

        let report = LoadReport {
            tables: reports,
            violations,
        };
        info!(counts = %report.counts(), "Load finished");
        Ok(report)
    }

    #[instrument(skip_all, fields(table = %table.name))]
    fn load_table(&self, conn: &mut Connection, table: &CompiledTable) -> Result<LoadedTable, LoadError> {
        let text = self.source.read(table).map_err(|source| LoadError::TableRead {
            table: table.name.to_string(),
            location: self.source.location(table),
            source,
        })?;
        let sheet = TsvSheet::parse(&text);
        let order = header_order(table, &sheet.headers)?;

        let tx = conn.transaction()?;
        let mut validator = TableValidator::new(self.schema, table);
        let mut violations = Vec::new();
        let (mut rows, mut conflict_rows) = (0, 0);

        {
            let mut insert_main = tx.prepare(&insert_sql(&table.name, table))?;
            let mut insert_conflict = tx.prepare(&insert_sql(&table.conflict_name(), table))?;

            for record in &sheet.records {
                let row = sheet.data_row(record);
                if record.fields.len() != sheet.headers.len() {
                    // Dropping the transaction rolls the table back.
                    return Err(LoadError::TableFieldCount {
                        table: table.name.to_string(),
                        row,
                        expected: sheet.headers.len(),
                        found: record.fields.len(),
                    });
                }

                let values: Vec<String> = order
                    .iter()
                    .map(|&h| record.fields.get(h).cloned().unwrap_or_default())
                    .collect();
                let found = validator.validate(row, &values);
                let params = row_params(table, row, &values);

                if route_row(
                    &mut insert_main,
                    &mut insert_conflict,
                    validator.is_conflict(&found),
                    &params,
                )? {
                    conflict_rows += 1;
                } else {
                    rows += 1;
                }
                violations.extend(found);
            }
        }

        for tree in &table.trees {
            let empty = ColumnValues::new();
            let children = validator.values(&tree.child).unwrap_or(&empty);
            let parents = validator.values(&tree.parent).unwrap_or(&empty);
            violations.extend(check_tree(&table.name, tree, children, parents));
        }

        tx.commit()?;

        Ok(LoadedTable {
            rows,
            conflict_rows,
            violations,
            values: validator.into_values(),
        })
    }

    /// Values of `table.column` from this load, else from the store.
    fn values_of(
        &self,
        conn: &Connection,
        collected: &HashMap<SmolStr, IndexMap<SmolStr, ColumnValues>>,
        table: &str,
        column: &str,
    ) -> Result<Option<ColumnValues>, LoadError> {
        if let Some(values) = collected.get(table) {
            return Ok(Some(values.get(column).cloned().unwrap_or_default()));
        }
        match self.schema.table(table) {
            Some(compiled) => Ok(read_column(conn, compiled, column)?),
            None => Ok(None),
        }
    }

    /// Child and parent values of the tree an `under` constraint refers to.
    fn tree_of(
        &self,
        conn: &Connection,
        collected: &HashMap<SmolStr, IndexMap<SmolStr, ColumnValues>>,
        under: &UnderConstraint,
    ) -> Result<(ColumnValues, ColumnValues), LoadError> {
        let parent = self
            .schema
            .table(&under.tree_table)
            .and_then(|t| t.trees.iter().find(|tree| tree.child == under.tree_child))
            .map(|tree| tree.parent.clone());
        let Some(parent) = parent else {
            return Ok((ColumnValues::new(), ColumnValues::new()));
        };

        let children = self
            .values_of(conn, collected, &under.tree_table, &under.tree_child)?
            .unwrap_or_default();
        let parents = self
            .values_of(conn, collected, &under.tree_table, &parent)?
            .unwrap_or_default();
        Ok((children, parents))
    }
}

/// Map each declared column to its position in the header.
fn header_order(table: &CompiledTable, headers: &[String]) -> Result<Vec<usize>, LoadError> {
    let header_error = |message: String| LoadError::TableHeader {
        table: table.name.to_string(),
        message,
    };

    if headers.is_empty() {
        return Err(header_error("missing header row".into()));
    }

    let mut seen = HashSet::new();
    let duplicates: Vec<&str> = headers
        .iter()
        .filter(|h| !seen.insert(h.as_str()))
        .map(String::as_str)
        .collect();
    let missing: Vec<&str> = table
        .column_names()
        .filter(|c| !headers.iter().any(|h| h == c))
        .collect();
    let unexpected: Vec<&str> = headers
        .iter()
        .map(String::as_str)
        .filter(|h| !table.has_column(h))
        .collect();

    let mut problems = Vec::new();
    if !missing.is_empty() {
        problems.push(format!("missing {}", missing.join(", ")));
    }
    if !unexpected.is_empty() {
        problems.push(format!("unexpected {}", unexpected.join(", ")));
    }
    if !duplicates.is_empty() {
        problems.push(format!("duplicate {}", duplicates.join(", ")));
    }
    if !problems.is_empty() {
        return Err(header_error(problems.join("; ")));
    }

    Ok(table
        .column_names()
        .filter_map(|c| headers.iter().position(|h| h == c))
        .collect())
}

pub(crate) fn insert_sql(relation: &str, table: &CompiledTable) -> String {
    let columns: Vec<String> = std::iter::once(ROW_NUMBER.to_string())
        .chain(table.column_names().map(str::to_string))
        .chain(table.source_columns())
        .map(|c| quote_ident(&c))
        .collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(relation),
        columns.join(", "),
        placeholders
    )
}

/// Parameters for [`insert_sql`]: the row number, the declared cells, then
/// the source text of each numeric cell.
pub(crate) fn row_params(table: &CompiledTable, row: usize, values: &[String]) -> Vec<Value> {
    let cell = |i: usize| values.get(i).map(String::as_str).unwrap_or("");
    let sources = table
        .columns
        .values()
        .enumerate()
        .filter(|(_, column)| column.sql_type.is_numeric())
        .map(|(i, _)| cell_to_sqlite(cell(i)));
    std::iter::once(Value::Integer(row as i64))
        .chain((0..table.columns.len()).map(|i| cell_to_sqlite(cell(i))))
        .chain(sources)
        .collect()
}

/// Insert a row into the main table, or into the conflict table when it
/// breaks a key. Returns `true` for the conflict table.
pub(crate) fn route_row(
    main: &mut Statement<'_>,
    conflict: &mut Statement<'_>,
    breaks_key: bool,
    params: &[Value],
) -> rusqlite::Result<bool> {
    let to_conflict = breaks_key
        || match main.execute(params_from_iter(params.iter())) {
            Ok(_) => false,
            // Values that collide only after type affinity still violate the
            // main table's keys.
            Err(e) if is_constraint(&e) => {
                debug!(error = %e, "Row rejected by main table");
                true
            }
            Err(e) => return Err(e),
        };
    if to_conflict {
        conflict.execute(params_from_iter(params.iter()))?;
    }
    Ok(to_conflict)
}

fn is_constraint(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, SqliteCode::ConstraintViolation | SqliteCode::TypeMismatch)
    )
}

fn create_relations(conn: &mut Connection, tables: &[&CompiledTable]) -> Result<(), LoadError> {
    let tx = conn.transaction()?;
    for statement in CompiledSchema::store_ddl()
        .into_iter()
        .chain(tables.iter().flat_map(|t| t.ddl()))
    {
        debug!(sql = %statement, "Executing DDL");
        tx.execute(&statement, [])?;
    }
    tx.commit()?;
    Ok(())
}

fn write_violations(
    conn: &mut Connection,
    tables: &[&CompiledTable],
    violations: &[Violation],
) -> Result<(), LoadError> {
    let relation = quote_ident(VIOLATION_TABLE);
    let tx = conn.transaction()?;
    {
        let mut delete = tx.prepare(&format!("DELETE FROM {} WHERE \"table\" = ?1", relation))?;
        for table in tables {
            delete.execute([table.name.as_str()])?;
        }

        insert_violations(&tx, violations)?;
    }
    tx.commit()?;
    debug!(count = violations.len(), "Stored violations");
    Ok(())
}

pub(crate) fn insert_violations(conn: &Connection, violations: &[Violation]) -> rusqlite::Result<()> {
    let mut insert = conn.prepare_cached(&format!(
        "INSERT INTO {} (\"table\", \"row\", \"column\", \"level\", \"rule\", \"message\", \"value\") \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        quote_ident(VIOLATION_TABLE)
    ))?;
    for v in violations {
        insert.execute(rusqlite::params![
            v.table.as_str(),
            v.row as i64,
            v.column.as_str(),
            v.level.as_str(),
            v.rule.as_str(),
            v.message,
            v.value,
        ])?;
    }
    Ok(())
}

fn write_prefixes(conn: &mut Connection, schema: &CompiledSchema) -> Result<(), LoadError> {
    let relation = quote_ident(PREFIX_TABLE);
    let tx = conn.transaction()?;
    tx.execute(&format!("DELETE FROM {}", relation), [])?;
    {
        let mut insert = tx.prepare(&format!(
            "INSERT INTO {} (\"prefix\", \"base\") VALUES (?1, ?2)",
            relation
        ))?;
        for prefix in &schema.prefixes {
            insert.execute([prefix.prefix.as_str(), prefix.base.as_str()])?;
        }
    }
    tx.commit()?;
    Ok(())
}
