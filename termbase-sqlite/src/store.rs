//! The SQLite-backed dataset.
//!
//! A [`Dataset`] owns one connection behind a mutex. Loading holds the lock
//! for the whole load, so a query never observes a half-loaded dataset;
//! queries hold it only while their statements run.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use tracing::{debug, info, instrument, trace};

use termbase_query::{
    CellViolation, QueryError, QueryOptions, QueryPlanner, QueryRequest, QueryResult, ResultRow,
    ResultSet, SqlBuilder,
};
use termbase_schema::compiler::{ROW_NUMBER, VIOLATION_TABLE};
use termbase_schema::validator::subtree;
use termbase_schema::{
    ColumnValues, CompiledColumn, CompiledSchema, CompiledTable, Condition, Level, TermbaseConfig,
    Violation, ViolationRule, quote_ident,
};

use crate::config::{DatabasePath, SqliteConfig};
use crate::edit::{RowEdit, ensure_loaded, next_row, ordered_values, row_exists, write_row};
use crate::error::{StoreError, StoreResult};
use crate::loader::{LoadError, LoadReport, Loader, Selection};
use crate::source::SourceReader;
use crate::types::{get_cell_at_index, to_params, to_raw_text};

/// Row numbers per violation lookup statement.
const VIOLATION_CHUNK: usize = 500;

/// A compiled schema bound to its SQLite store.
#[derive(Debug)]
pub struct Dataset {
    conn: Mutex<Connection>,
    schema: Arc<CompiledSchema>,
    options: QueryOptions,
    log_sql: bool,
}

impl Dataset {
    /// Open (or create) the store described by `config`.
    pub fn open(schema: impl Into<Arc<CompiledSchema>>, config: &SqliteConfig) -> StoreResult<Self> {
        let conn = match &config.path {
            DatabasePath::Memory => Connection::open_in_memory()?,
            DatabasePath::File(path) => {
                if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                    fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                        path: dir.display().to_string(),
                        source,
                    })?;
                }
                Connection::open(path)?
            }
        };
        conn.execute_batch(&config.init_sql())?;
        info!(path = %config.path_str(), "Opened dataset");

        Ok(Self {
            conn: Mutex::new(conn),
            schema: schema.into(),
            options: QueryOptions::default(),
            log_sql: false,
        })
    }

    /// Open an in-memory store.
    pub fn open_in_memory(schema: impl Into<Arc<CompiledSchema>>) -> StoreResult<Self> {
        Self::open(schema, &SqliteConfig::memory())
    }

    /// Open the store named by the `[database]`, `[query]` and `[debug]`
    /// sections of `termbase.toml`.
    pub fn from_config(
        schema: impl Into<Arc<CompiledSchema>>,
        config: &TermbaseConfig,
    ) -> StoreResult<Self> {
        let sqlite = SqliteConfig::from_database_config(&config.database)?;
        Ok(Self::open(schema, &sqlite)?
            .with_options(QueryOptions::from(&config.query))
            .with_sql_logging(config.debug.log_sql))
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Log every statement at debug level instead of trace.
    pub fn with_sql_logging(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    pub fn options(&self) -> QueryOptions {
        self.options
    }

    /// Load the selected tables from `source`, replacing their rows and
    /// violations.
    pub fn load(
        &self,
        source: &dyn SourceReader,
        selection: &Selection,
    ) -> Result<LoadReport, LoadError> {
        let mut conn = self.conn.lock();
        Loader::new(&self.schema, source).load(&mut conn, selection)
    }

    /// Run a query, attaching each returned cell's persisted violations.
    #[instrument(skip(self, request), fields(table = %request.table))]
    pub fn query(&self, request: &QueryRequest) -> QueryResult<ResultSet> {
        let plan = QueryPlanner::new(&self.schema, self.options).prepare(request)?;
        let conn = self.conn.lock();

        self.log_statement(&plan.count_sql);
        let total: i64 = conn
            .query_row(
                &plan.count_sql,
                params_from_iter(to_params(&plan.count_params)),
                |row| row.get(0),
            )
            .map_err(|e| sql_error(e, &plan.count_sql))?;

        let mut rows = Vec::new();
        if let Some(sql) = &plan.data_sql {
            self.log_statement(sql);
            let mut stmt = conn.prepare(sql).map_err(|e| sql_error(e, sql))?;
            let mapped = stmt
                .query_map(params_from_iter(to_params(&plan.data_params)), |row| {
                    let row_number: i64 = row.get(0)?;
                    let values = plan
                        .sources
                        .iter()
                        .enumerate()
                        .map(|(i, source)| get_cell_at_index(row, i + 1, *source))
                        .collect();
                    Ok(ResultRow::new(row_number, values))
                })
                .map_err(|e| sql_error(e, sql))?;
            rows = mapped
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| sql_error(e, sql))?;
        }

        self.attach_violations(&conn, &plan.table, &plan.columns, &mut rows)?;
        debug!(rows = rows.len(), total, "Query finished");

        Ok(ResultSet {
            table: plan.table,
            columns: plan.columns,
            rows,
            total: u64::try_from(total).unwrap_or(0),
            limit: plan.limit,
            offset: plan.offset,
        })
    }

    fn attach_violations(
        &self,
        conn: &Connection,
        table: &str,
        columns: &[smol_str::SmolStr],
        rows: &mut [ResultRow],
    ) -> QueryResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let positions: HashMap<i64, usize> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| (r.row_number, i))
            .collect();
        let row_numbers: Vec<i64> = rows.iter().map(|r| r.row_number).collect();

        for chunk in row_numbers.chunks(VIOLATION_CHUNK) {
            let mut builder = SqlBuilder::new();
            builder
                .push("SELECT \"row\", \"column\", \"level\", \"rule\", \"message\" FROM ")
                .push_identifier(VIOLATION_TABLE)
                .push(" WHERE \"table\" = ")
                .push_param(table)
                .push(" AND \"row\" IN (")
                .push_list(chunk.iter().copied(), ", ", |b, row| {
                    b.push_param(row);
                })
                .push(") ORDER BY \"row\", \"column\", \"rule\"");
            let (sql, params) = builder.build();
            self.log_statement(&sql);

            let mut stmt = conn.prepare(&sql).map_err(|e| sql_error(e, &sql))?;
            let mut found = stmt
                .query(params_from_iter(to_params(&params)))
                .map_err(|e| sql_error(e, &sql))?;
            while let Some(row) = found.next().map_err(|e| sql_error(e, &sql))? {
                let row_number: i64 = row.get(0).map_err(|e| sql_error(e, &sql))?;
                let column: String = row.get(1).map_err(|e| sql_error(e, &sql))?;
                let level: String = row.get(2).map_err(|e| sql_error(e, &sql))?;
                let Some(&index) = positions.get(&row_number) else {
                    continue;
                };
                let Some(cell) = columns.iter().position(|c| *c == column) else {
                    continue;
                };
                let level = Level::from_str(&level)
                    .ok_or_else(|| StoreError::corrupt(format!("unknown level `{}`", level)))?;
                rows[index].violations[cell].push(CellViolation {
                    level,
                    rule: row.get(3).map_err(|e| sql_error(e, &sql))?,
                    message: row.get(4).map_err(|e| sql_error(e, &sql))?,
                });
            }
        }
        Ok(())
    }

    /// Persisted violations, optionally for one table, in table/row/column order.
    ///
    /// Returns nothing when no load has run yet.
    pub fn violations(&self, table: Option<&str>) -> StoreResult<Vec<Violation>> {
        if let Some(name) = table {
            if self.schema.table(name).is_none() {
                return Err(StoreError::UnknownTable(name.to_string()));
            }
        }

        let mut builder = SqlBuilder::new();
        builder
            .push("SELECT \"table\", \"row\", \"column\", \"level\", \"rule\", \"message\", \"value\" FROM ")
            .push_identifier(VIOLATION_TABLE);
        if let Some(name) = table {
            builder.push(" WHERE \"table\" = ").push_param(name);
        }
        let (sql, params) = builder.build();

        let conn = self.conn.lock();
        if !relation_exists(&conn, VIOLATION_TABLE)? {
            return Ok(Vec::new());
        }
        self.log_statement(&sql);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(to_params(&params)), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?;

        let mut violations = Vec::new();
        for row in rows {
            let (table, row, column, level, rule, message, value) = row?;
            violations.push(Violation {
                table: table.into(),
                row: usize::try_from(row)
                    .map_err(|_| StoreError::corrupt(format!("invalid violation row {}", row)))?,
                column: column.into(),
                level: Level::from_str(&level)
                    .ok_or_else(|| StoreError::corrupt(format!("unknown level `{}`", level)))?,
                rule: ViolationRule::from_str(&rule)
                    .ok_or_else(|| StoreError::corrupt(format!("unknown rule `{}`", rule)))?,
                message,
                value: value.unwrap_or_default(),
            });
        }
        violations.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Ok(violations)
    }

    /// Every stored row of `table` (main and conflict), as raw text in row
    /// order. NULL cells read as empty.
    pub fn table_rows(&self, table: &str) -> StoreResult<Vec<(i64, Vec<String>)>> {
        let compiled = self.data_table(table)?;
        let conn = self.conn.lock();
        read_rows(&conn, compiled)
    }

    /// Number of rows stored for `table` (main and conflict).
    pub fn row_count(&self, table: &str) -> StoreResult<u64> {
        let compiled = self.data_table(table)?;
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&compiled.view_name()));
        let conn = self.conn.lock();
        self.log_statement(&sql);
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Replace row `row` of `table`. `values` names every declared column.
    ///
    /// The row is validated against the other stored rows, moved between the
    /// main and conflict tables as its keys require, and its stored
    /// violations are replaced.
    pub fn update_row<I, K, V>(&self, table: &str, row: usize, values: I) -> StoreResult<RowEdit>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let compiled = self.data_table(table)?;
        let values = ordered_values(compiled, values)?;
        let mut conn = self.conn.lock();
        ensure_loaded(&conn, compiled)?;
        if !row_exists(&conn, compiled, row)? {
            return Err(StoreError::RowNotFound {
                table: table.to_string(),
                row,
            });
        }
        let edit = write_row(&mut conn, &self.schema, compiled, row, &values)?;
        info!(table, row, conflict = edit.conflict, "Updated row");
        Ok(edit)
    }

    /// Add a row to `table` after the last stored one. `values` names every
    /// declared column.
    pub fn insert_row<I, K, V>(&self, table: &str, values: I) -> StoreResult<RowEdit>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let compiled = self.data_table(table)?;
        let values = ordered_values(compiled, values)?;
        let mut conn = self.conn.lock();
        ensure_loaded(&conn, compiled)?;
        let row = next_row(&conn, compiled)?;
        let edit = write_row(&mut conn, &self.schema, compiled, row, &values)?;
        info!(table, row, conflict = edit.conflict, "Inserted row");
        Ok(edit)
    }

    /// Candidate values for a cell of `table.column` that contain `matching`,
    /// ignoring case. An empty `matching` keeps every candidate.
    ///
    /// Candidates are the arguments of an `in(...)` condition on the column's
    /// datatype chain; failing that, the values of its `from(...)` target;
    /// failing that, the nodes of the tree at or below its `under(...)`
    /// anchor. Columns with none of these have no candidates.
    pub fn matching_values(
        &self,
        table: &str,
        column: &str,
        matching: &str,
    ) -> StoreResult<Vec<String>> {
        let compiled = self.data_table(table)?;
        let declared = compiled
            .column(column)
            .ok_or_else(|| StoreError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            })?;

        let needle = matching.to_lowercase();
        let keep = |value: &str| value.to_lowercase().contains(&needle);

        let options = self.schema.datatype_of(declared).and_then(|datatype| {
            datatype.chain.iter().find_map(|p| match &p.condition {
                Condition::In(options) => Some(options),
                _ => None,
            })
        });
        if let Some(options) = options {
            return Ok(options.iter().filter(|o| keep(o.as_str())).cloned().collect());
        }

        let conn = self.conn.lock();
        let candidates: Vec<String> =
            if let Some(fk) = compiled.foreign_keys.iter().find(|fk| fk.column == column) {
                match self.schema.table(&fk.target_table) {
                    Some(target) => read_column(&conn, target, &fk.target_column)?
                        .unwrap_or_default()
                        .into_values()
                        .collect(),
                    None => Vec::new(),
                }
            } else if let Some(under) = compiled.unders.iter().find(|u| u.column == column) {
                let (children, parents) =
                    read_tree(&conn, &self.schema, &under.tree_table, &under.tree_child)?;
                let nodes = subtree(&children, &parents, &under.value);
                children
                    .values()
                    .filter(|child| nodes.contains(child.as_str()))
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            };

        let mut seen = HashSet::new();
        Ok(candidates
            .into_iter()
            .filter(|value| keep(value.as_str()) && seen.insert(value.clone()))
            .collect())
    }

    fn data_table(&self, table: &str) -> StoreResult<&CompiledTable> {
        self.schema
            .table(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }

    fn log_statement(&self, sql: &str) {
        if self.log_sql {
            debug!(sql = %sql, "Executing statement");
        } else {
            trace!(sql = %sql, "Executing statement");
        }
    }
}

fn sql_error(err: rusqlite::Error, sql: &str) -> QueryError {
    QueryError::from(StoreError::from(err)).with_sql(sql)
}

/// Check whether a table or view exists.
pub(crate) fn relation_exists(conn: &Connection, name: &str) -> StoreResult<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE name = ?1 AND type IN ('table', 'view')",
            [name],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

/// SQL reading a column's raw cell text: the source text of a numeric cell,
/// the stored value otherwise.
fn raw_column_sql(column: &CompiledColumn) -> String {
    match column.source_column() {
        Some(source) => format!(
            "COALESCE({}, {})",
            quote_ident(&source),
            quote_ident(&column.name)
        ),
        None => quote_ident(&column.name),
    }
}

/// Read every stored row of `table` as raw text, in row order.
pub(crate) fn read_rows(conn: &Connection, table: &CompiledTable) -> StoreResult<Vec<(i64, Vec<String>)>> {
    let mut builder = SqlBuilder::new();
    builder
        .push("SELECT ")
        .push_identifier(ROW_NUMBER)
        .push(", ")
        .push_list(table.columns.values(), ", ", |b, column| {
            b.push(&raw_column_sql(column));
        })
        .push(" FROM ")
        .push_identifier(&table.view_name())
        .push(" ORDER BY ")
        .push_identifier(ROW_NUMBER);
    let (sql, _) = builder.build();
    trace!(sql = %sql, "Reading stored rows");

    let width = table.columns.len();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        let row_number: i64 = row.get(0)?;
        let mut values = Vec::with_capacity(width);
        for i in 1..=width {
            values.push(to_raw_text(row.get_ref(i)?));
        }
        Ok((row_number, values))
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Stored child and parent values of the tree on `tree_table` whose child
/// column is `tree_child`. Empty when there is no such tree or it was never
/// loaded.
pub(crate) fn read_tree(
    conn: &Connection,
    schema: &CompiledSchema,
    tree_table: &str,
    tree_child: &str,
) -> StoreResult<(ColumnValues, ColumnValues)> {
    let Some(table) = schema.table(tree_table) else {
        return Ok(Default::default());
    };
    let Some(tree) = table.trees.iter().find(|tree| tree.child == tree_child) else {
        return Ok(Default::default());
    };
    let children = read_column(conn, table, &tree.child)?.unwrap_or_default();
    let parents = read_column(conn, table, &tree.parent)?.unwrap_or_default();
    Ok((children, parents))
}

/// Read the stored non-null values of one column (main and conflict rows).
///
/// `None` when the table has never been created in this store.
pub(crate) fn read_column(
    conn: &Connection,
    table: &CompiledTable,
    column: &str,
) -> StoreResult<Option<ColumnValues>> {
    let view = table.view_name();
    if !relation_exists(conn, &view)? {
        return Ok(None);
    }

    let raw = table
        .column(column)
        .map(raw_column_sql)
        .unwrap_or_else(|| quote_ident(column));
    let sql = format!(
        "SELECT {row}, {raw} FROM {view} WHERE {col} IS NOT NULL ORDER BY {row}",
        row = quote_ident(ROW_NUMBER),
        col = quote_ident(column),
        view = quote_ident(&view),
    );
    trace!(sql = %sql, "Reading stored column");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        let row_number: i64 = row.get(0)?;
        Ok((row_number, to_raw_text(row.get_ref(1)?)))
    })?;

    let mut values = ColumnValues::new();
    for row in rows {
        let (row_number, value) = row?;
        let row_number = usize::try_from(row_number)
            .map_err(|_| StoreError::corrupt(format!("invalid row number {}", row_number)))?;
        values.insert(row_number, value);
    }
    Ok(Some(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use termbase_query::ErrorCode;
    use termbase_schema::{ColumnDecl, DatatypeDecl, Declarations, SqlType, TableDecl, compile};

    fn schema() -> CompiledSchema {
        let decls = Declarations::new()
            .table(TableDecl::new("subject", "subject.tsv"))
            .datatype(DatatypeDecl::new("text").sql_type(SqlType::Text))
            .datatype(DatatypeDecl::new("empty").parent("text").condition("equals('')"))
            .datatype(
                DatatypeDecl::new("integer")
                    .parent("text")
                    .condition("match(/-?[0-9]+/)")
                    .sql_type(SqlType::Integer),
            )
            .datatype(
                DatatypeDecl::new("positive_integer")
                    .parent("integer")
                    .condition("match(/[1-9][0-9]*/)"),
            )
            .column(ColumnDecl::new("subject", "id", "positive_integer").structure("primary"))
            .column(ColumnDecl::new("subject", "age", "positive_integer"))
            .column(ColumnDecl::new("subject", "name", "text").nulltype("empty"));
        compile(&decls).unwrap()
    }

    fn loaded() -> Dataset {
        let dataset = Dataset::open_in_memory(schema()).unwrap();
        let source = MemorySource::new().table(
            "subject",
            "id\tage\tname\n1\t17\tAnn\n2\t25\t\n3\t40\tCid\n4\t-5\tDee\n",
        );
        dataset.load(&source, &Selection::All).unwrap();
        dataset
    }

    #[test]
    fn test_query_scenario() {
        let dataset = loaded();
        let request = QueryRequest::from_params(
            "subject",
            [("age", "gte.18"), ("order", "age.desc"), ("limit", "2")],
        )
        .unwrap();
        let result = dataset.query(&request).unwrap();

        assert_eq!(result.column_values("id"), vec![&json!(3), &json!(2)]);
        assert_eq!(result.total, 2);
        assert_eq!(result.rows[1].values[2], serde_json::Value::Null);
    }

    #[test]
    fn test_limit_zero_counts_only() {
        let dataset = loaded();
        let result = dataset.query(&QueryRequest::new("subject").limit(0)).unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.total, 4);
    }

    #[test]
    fn test_cell_violations_attached() {
        let dataset = loaded();
        let request = QueryRequest::from_params("subject", [("violations", "error.age")]).unwrap();
        let result = dataset.query(&request).unwrap();

        assert_eq!(result.len(), 1);
        let row = &result.rows[0];
        assert_eq!(row.row_number, 4);
        assert_eq!(row.values[1], json!(-5));
        assert_eq!(row.violations[1].len(), 1);
        assert_eq!(row.violations[1][0].rule, "datatype");
        assert!(row.violations[0].is_empty());
    }

    #[test]
    fn test_unknown_column_rejected() {
        let dataset = loaded();
        let request = QueryRequest::from_params("subject", [("weight", "eq.1")]).unwrap();
        let err = dataset.query(&request).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownColumn);
    }

    #[test]
    fn test_query_before_load() {
        let dataset = Dataset::open_in_memory(schema()).unwrap();
        let err = dataset.query(&QueryRequest::new("subject")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(dataset.violations(None).unwrap().is_empty());
    }

    #[test]
    fn test_violations_and_rows() {
        let dataset = loaded();
        let violations = dataset.violations(Some("subject")).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].row, 4);
        assert_eq!(violations[0].value, "-5");

        let rows = dataset.table_rows("subject").unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], (2, vec!["2".to_string(), "25".into(), "".into()]));
        assert_eq!(dataset.row_count("subject").unwrap(), 4);

        assert!(matches!(
            dataset.violations(Some("nope")),
            Err(StoreError::UnknownTable(_))
        ));
    }

    #[test]
    fn test_file_store_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = SqliteConfig::file(dir.path().join("build/termbase.db"));
        let dataset = Dataset::open(schema(), &config).unwrap();
        assert!(dir.path().join("build/termbase.db").exists());
        drop(dataset);
    }

    fn stored(dataset: &Dataset, relation: &str) -> i64 {
        dataset
            .conn
            .lock()
            .query_row(&format!("SELECT COUNT(*) FROM {}", quote_ident(relation)), [], |r| {
                r.get(0)
            })
            .unwrap()
    }

    #[test]
    fn test_numeric_cells_keep_source_text() {
        let decls = Declarations::new()
            .table(TableDecl::new("dose", "dose.tsv"))
            .datatype(DatatypeDecl::new("text").sql_type(SqlType::Text))
            .datatype(
                DatatypeDecl::new("decimal")
                    .parent("text")
                    .condition(r"match(/-?[0-9]+(\.[0-9]+)?/)")
                    .sql_type(SqlType::Real),
            )
            .datatype(
                DatatypeDecl::new("integer")
                    .parent("text")
                    .condition("match(/-?[0-9]+/)")
                    .sql_type(SqlType::Integer),
            )
            .datatype(
                DatatypeDecl::new("positive_integer")
                    .parent("integer")
                    .condition("match(/[1-9][0-9]*/)"),
            )
            .column(ColumnDecl::new("dose", "id", "decimal").structure("primary"))
            .column(ColumnDecl::new("dose", "amount", "positive_integer"));
        let dataset = Dataset::open_in_memory(compile(&decls).unwrap()).unwrap();
        let source = MemorySource::new().table("dose", "id\tamount\n1.50\t05\n2\t7\n");
        dataset.load(&source, &Selection::All).unwrap();

        let rows = dataset.table_rows("dose").unwrap();
        assert_eq!(
            rows,
            vec![
                (1, vec!["1.50".to_string(), "05".into()]),
                (2, vec!["2".to_string(), "7".into()]),
            ]
        );

        let result = dataset.query(&QueryRequest::new("dose")).unwrap();
        assert_eq!(result.rows[0].values, vec![json!("1.50"), json!("05")]);
        assert_eq!(result.rows[1].values, vec![json!(2.0), json!(7)]);

        // Filters still compare the stored numbers.
        let request = QueryRequest::from_params("dose", [("amount", "eq.5")]).unwrap();
        assert_eq!(dataset.query(&request).unwrap().total, 1);
    }

    #[test]
    fn test_update_row_clears_violation() {
        let dataset = loaded();
        let edit = dataset
            .update_row("subject", 4, [("id", "4"), ("age", "50"), ("name", "Dee")])
            .unwrap();
        assert_eq!(edit.row, 4);
        assert!(!edit.conflict);
        assert!(edit.is_valid());

        assert!(dataset.violations(Some("subject")).unwrap().is_empty());
        let rows = dataset.table_rows("subject").unwrap();
        assert_eq!(rows[3], (4, vec!["4".to_string(), "50".into(), "Dee".into()]));
    }

    #[test]
    fn test_update_row_moves_between_main_and_conflict() {
        let dataset = loaded();
        let edit = dataset
            .update_row("subject", 2, [("id", "1"), ("age", "25"), ("name", "")])
            .unwrap();
        assert!(edit.conflict);
        assert_eq!(edit.violations.len(), 1);
        assert_eq!(edit.violations[0].rule, ViolationRule::Unique);
        assert_eq!(stored(&dataset, "subject_conflict"), 1);
        assert_eq!(dataset.row_count("subject").unwrap(), 4);
        assert_eq!(dataset.violations(Some("subject")).unwrap().len(), 2);

        let edit = dataset
            .update_row("subject", 2, [("id", "2"), ("age", "25"), ("name", "")])
            .unwrap();
        assert!(!edit.conflict);
        assert_eq!(stored(&dataset, "subject_conflict"), 0);
        assert_eq!(stored(&dataset, "subject"), 4);
        assert_eq!(dataset.violations(Some("subject")).unwrap().len(), 1);
    }

    #[test]
    fn test_insert_row() {
        let dataset = loaded();
        let edit = dataset
            .insert_row("subject", [("name", "Eve"), ("age", "33"), ("id", "5")])
            .unwrap();
        assert_eq!(edit.row, 5);
        assert!(edit.is_valid());
        assert_eq!(
            dataset.table_rows("subject").unwrap()[4],
            (5, vec!["5".to_string(), "33".into(), "Eve".into()])
        );

        let edit = dataset
            .insert_row("subject", [("id", "3"), ("age", ""), ("name", "")])
            .unwrap();
        assert_eq!(edit.row, 6);
        assert!(edit.conflict);
        let rules: Vec<ViolationRule> = edit.violations.iter().map(|v| v.rule).collect();
        assert_eq!(rules, vec![ViolationRule::NotNull, ViolationRule::Unique]);
        assert_eq!(dataset.row_count("subject").unwrap(), 6);
    }

    #[test]
    fn test_edit_errors() {
        let dataset = Dataset::open_in_memory(schema()).unwrap();
        let full = [("id", "1"), ("age", "2"), ("name", "")];
        assert!(matches!(
            dataset.insert_row("subject", full),
            Err(StoreError::NotLoaded(_))
        ));

        let dataset = loaded();
        assert!(matches!(
            dataset.update_row("subject", 99, full),
            Err(StoreError::RowNotFound { row: 99, .. })
        ));
        assert!(matches!(
            dataset.insert_row("subject", [("id", "9"), ("age", "2")]),
            Err(StoreError::MissingValue { ref column, .. }) if column == "name"
        ));
        assert!(matches!(
            dataset.insert_row("subject", [("id", "9"), ("weight", "2")]),
            Err(StoreError::UnknownColumn { ref column, .. }) if column == "weight"
        ));
        assert!(matches!(
            dataset.insert_row("nope", full),
            Err(StoreError::UnknownTable(_))
        ));
        assert_eq!(dataset.row_count("subject").unwrap(), 4);
    }

    fn vocabulary() -> Dataset {
        let decls = Declarations::new()
            .table(TableDecl::new("term", "term.tsv"))
            .table(TableDecl::new("sample", "sample.tsv"))
            .datatype(DatatypeDecl::new("text").sql_type(SqlType::Text))
            .datatype(DatatypeDecl::new("empty").parent("text").condition("equals('')"))
            .datatype(DatatypeDecl::new("word").parent("text").condition(r"exclude(/\s/)"))
            .datatype(
                DatatypeDecl::new("sex")
                    .parent("word")
                    .condition("in('female', 'male', 'unknown')"),
            )
            .column(ColumnDecl::new("term", "label", "word").structure("primary"))
            .column(
                ColumnDecl::new("term", "parent", "word")
                    .nulltype("empty")
                    .structure("tree(label)"),
            )
            .column(ColumnDecl::new("sample", "id", "word").structure("primary"))
            .column(ColumnDecl::new("sample", "kind", "word").structure("under(term.label, 'animal')"))
            .column(ColumnDecl::new("sample", "source", "word").structure("from(term.label)"))
            .column(ColumnDecl::new("sample", "sex", "sex"));
        let dataset = Dataset::open_in_memory(compile(&decls).unwrap()).unwrap();
        let source = MemorySource::new()
            .table(
                "term",
                "label\tparent\nthing\t\nanimal\tthing\ndog\tanimal\nrock\tthing\ncat\tanimal\n",
            )
            .table("sample", "id\tkind\tsource\tsex\ns1\tdog\trock\tmale\n");
        dataset.load(&source, &Selection::All).unwrap();
        dataset
    }

    #[test]
    fn test_matching_values() {
        let dataset = vocabulary();

        assert_eq!(
            dataset.matching_values("sample", "sex", "").unwrap(),
            vec!["female", "male", "unknown"]
        );
        assert_eq!(dataset.matching_values("sample", "sex", "MAL").unwrap(), vec!["female", "male"]);
        assert_eq!(
            dataset.matching_values("sample", "source", "o").unwrap(),
            vec!["dog", "rock"]
        );
        assert_eq!(
            dataset.matching_values("sample", "kind", "").unwrap(),
            vec!["animal", "dog", "cat"]
        );
        assert_eq!(dataset.matching_values("sample", "kind", "a").unwrap(), vec!["animal", "cat"]);
        assert!(dataset.matching_values("sample", "id", "").unwrap().is_empty());

        assert!(matches!(
            dataset.matching_values("sample", "weight", ""),
            Err(StoreError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_edit_checks_references() {
        let dataset = vocabulary();
        let edit = dataset
            .update_row(
                "sample",
                1,
                [("id", "s1"), ("kind", "rock"), ("source", "ghost"), ("sex", "male")],
            )
            .unwrap();
        let found: Vec<(&str, ViolationRule)> = edit
            .violations
            .iter()
            .map(|v| (v.column.as_str(), v.rule))
            .collect();
        assert_eq!(
            found,
            vec![("kind", ViolationRule::Under), ("source", ViolationRule::ForeignKey)]
        );
        assert!(!edit.conflict);

        let edit = dataset
            .insert_row("term", [("label", "pug"), ("parent", "dog")])
            .unwrap();
        assert!(edit.is_valid());
        assert_eq!(dataset.matching_values("sample", "kind", "pug").unwrap(), vec!["pug"]);

        let edit = dataset
            .update_row("term", 2, [("label", "animal"), ("parent", "pug")])
            .unwrap();
        assert_eq!(edit.violations.len(), 1);
        assert_eq!(edit.violations[0].rule, ViolationRule::Tree);
    }
}
