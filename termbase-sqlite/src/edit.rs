//! Editing single rows of a loaded table.
//!
//! An edited row is checked against the rows already stored, the way a load
//! checks it against the rows before it: keys must stay unique, references
//! must resolve and tree values must sit in their tree. The row then lands in
//! the main or conflict table as its key checks require, and its violations
//! replace the stored ones.

use std::collections::HashSet;

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, instrument};

use termbase_schema::compiler::{ROW_NUMBER, VIOLATION_TABLE};
use termbase_schema::validator::{check_foreign_keys, check_tree, check_under};
use termbase_schema::{
    ColumnValues, CompiledSchema, CompiledTable, TableValidator, Violation, quote_ident,
};

use crate::error::{StoreError, StoreResult};
use crate::loader::{insert_sql, insert_violations, route_row, row_params};
use crate::store::{read_column, read_rows, read_tree, relation_exists};

/// Outcome of writing one row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowEdit {
    pub row: usize,
    /// The row is stored in the conflict table.
    pub conflict: bool,
    /// The row's violations, ordered by column name.
    pub violations: Vec<Violation>,
}

impl RowEdit {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Arrange named cells in declaration order. Every declared column must be
/// given; an empty value is an empty cell.
pub(crate) fn ordered_values<I, K, V>(table: &CompiledTable, values: I) -> StoreResult<Vec<String>>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut cells: Vec<Option<String>> = vec![None; table.columns.len()];
    for (name, value) in values {
        let name = name.as_ref();
        let index = table
            .columns
            .get_index_of(name)
            .ok_or_else(|| StoreError::UnknownColumn {
                table: table.name.to_string(),
                column: name.to_string(),
            })?;
        cells[index] = Some(value.into());
    }

    cells
        .into_iter()
        .zip(table.column_names())
        .map(|(cell, column)| {
            cell.ok_or_else(|| StoreError::MissingValue {
                table: table.name.to_string(),
                column: column.to_string(),
            })
        })
        .collect()
}

pub(crate) fn ensure_loaded(conn: &Connection, table: &CompiledTable) -> StoreResult<()> {
    if relation_exists(conn, &table.view_name())? {
        Ok(())
    } else {
        Err(StoreError::NotLoaded(table.name.to_string()))
    }
}

pub(crate) fn row_exists(conn: &Connection, table: &CompiledTable, row: usize) -> StoreResult<bool> {
    let sql = format!(
        "SELECT 1 FROM {} WHERE {} = ?1",
        quote_ident(&table.view_name()),
        quote_ident(ROW_NUMBER)
    );
    Ok(conn
        .query_row(&sql, [row as i64], |_| Ok(()))
        .optional()?
        .is_some())
}

/// The row number a new row of `table` gets: one past the highest stored.
pub(crate) fn next_row(conn: &Connection, table: &CompiledTable) -> StoreResult<usize> {
    let sql = format!(
        "SELECT COALESCE(MAX({}), 0) + 1 FROM {}",
        quote_ident(ROW_NUMBER),
        quote_ident(&table.view_name())
    );
    let next: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    usize::try_from(next).map_err(|_| StoreError::corrupt(format!("invalid row number {}", next)))
}

/// Check `values` as row `row` of `table` against every other stored row,
/// then store it in place of any row with that number.
#[instrument(skip(conn, schema, table, values), fields(table = %table.name))]
pub(crate) fn write_row(
    conn: &mut Connection,
    schema: &CompiledSchema,
    table: &CompiledTable,
    row: usize,
    values: &[String],
) -> StoreResult<RowEdit> {
    let mut validator = TableValidator::new(schema, table);
    for (stored, cells) in read_rows(conn, table)? {
        let stored = usize::try_from(stored)
            .map_err(|_| StoreError::corrupt(format!("invalid row number {}", stored)))?;
        if stored != row {
            validator.seed(stored, &cells);
        }
    }

    let mut violations = validator.validate(row, values);
    let breaks_key = validator.is_conflict(&violations);
    violations.extend(deferred_violations(conn, schema, table, &validator, row)?);
    violations.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    let params = row_params(table, row, values);
    let tx = conn.transaction()?;
    let conflict = {
        for relation in [table.name.to_string(), table.conflict_name()] {
            tx.execute(
                &format!(
                    "DELETE FROM {} WHERE {} = ?1",
                    quote_ident(&relation),
                    quote_ident(ROW_NUMBER)
                ),
                [row as i64],
            )?;
        }
        tx.execute(
            &format!(
                "DELETE FROM {} WHERE \"table\" = ?1 AND \"row\" = ?2",
                quote_ident(VIOLATION_TABLE)
            ),
            rusqlite::params![table.name.as_str(), row as i64],
        )?;

        let mut insert_main = tx.prepare(&insert_sql(&table.name, table))?;
        let mut insert_conflict = tx.prepare(&insert_sql(&table.conflict_name(), table))?;
        let conflict = route_row(&mut insert_main, &mut insert_conflict, breaks_key, &params)?;
        insert_violations(&tx, &violations)?;
        conflict
    };
    tx.commit()?;

    debug!(row, conflict, violations = violations.len(), "Stored row");
    Ok(RowEdit {
        row,
        conflict,
        violations,
    })
}

/// Foreign-key, tree and `under` violations of one row. Values of the row's
/// own table come from `validator`, which holds every stored row plus this one.
fn deferred_violations(
    conn: &Connection,
    schema: &CompiledSchema,
    table: &CompiledTable,
    validator: &TableValidator<'_>,
    row: usize,
) -> StoreResult<Vec<Violation>> {
    let own = |column: &str| -> ColumnValues {
        validator
            .values(column)
            .and_then(|values| values.get(&row))
            .map(|value| std::iter::once((row, value.clone())).collect())
            .unwrap_or_default()
    };

    let mut violations = Vec::new();

    for fk in &table.foreign_keys {
        let targets = if fk.target_table == table.name {
            validator.values(&fk.target_column).cloned()
        } else {
            match schema.table(&fk.target_table) {
                Some(target) => read_column(conn, target, &fk.target_column)?,
                None => None,
            }
        };
        let targets = targets.map(|v| v.into_values().collect::<HashSet<_>>());
        violations.extend(check_foreign_keys(
            &table.name,
            fk,
            &own(fk.column.as_str()),
            targets.as_ref(),
        ));
    }

    for tree in &table.trees {
        let empty = ColumnValues::new();
        let children = validator.values(&tree.child).unwrap_or(&empty);
        let parents = validator.values(&tree.parent).unwrap_or(&empty);
        violations.extend(
            check_tree(&table.name, tree, children, parents)
                .into_iter()
                .filter(|v| v.row == row),
        );
    }

    for under in &table.unders {
        let (children, parents) = if under.tree_table == table.name {
            let parent = table
                .trees
                .iter()
                .find(|tree| tree.child == under.tree_child)
                .and_then(|tree| validator.values(&tree.parent));
            match parent {
                Some(parents) => (
                    validator.values(&under.tree_child).cloned().unwrap_or_default(),
                    parents.clone(),
                ),
                None => (ColumnValues::new(), ColumnValues::new()),
            }
        } else {
            read_tree(conn, schema, &under.tree_table, &under.tree_child)?
        };
        violations.extend(check_under(
            &table.name,
            under,
            &own(under.column.as_str()),
            &children,
            &parents,
        ));
    }

    Ok(violations)
}
