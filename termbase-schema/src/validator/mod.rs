//! Row validation.
//!
//! [`TableValidator`] checks one table's rows as they stream in. Per cell, in
//! column order:
//!
//! 1. null: empty, or accepted by the column's nulltype. An empty value in a
//!    column that is not nullable is a `not-null` error. Null cells skip the
//!    datatype and uniqueness checks.
//! 2. datatype: the chain is tested leaf first and the first failing
//!    predicate yields a single `datatype` error.
//! 3. uniqueness for key columns, against the values seen earlier in the load.
//! 4. conditional rules whose when column is this column.
//!
//! Checks that need other rows or other tables live in [`deferred`].

pub mod deferred;
mod violation;

use std::collections::HashMap;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::compiler::{CompiledColumn, CompiledSchema, CompiledTable};
use crate::registry::{CompiledDatatype, DatatypeRegistry};

pub use deferred::{ColumnValues, check_foreign_keys, check_tree, check_under, subtree};
pub use violation::{Violation, ViolationRule};

/// Streaming validator for the rows of one table.
#[derive(Debug)]
pub struct TableValidator<'a> {
    table: &'a CompiledTable,
    registry: &'a DatatypeRegistry,
    /// Key column → value → first row it was seen on.
    seen: HashMap<SmolStr, HashMap<String, usize>>,
    /// Non-null values per column, for the deferred checks.
    collected: IndexMap<SmolStr, ColumnValues>,
    rows: usize,
}

impl<'a> TableValidator<'a> {
    /// Create a validator for `table`, which must belong to `schema`.
    pub fn new(schema: &'a CompiledSchema, table: &'a CompiledTable) -> Self {
        Self {
            table,
            registry: schema.registry.as_ref(),
            seen: HashMap::new(),
            collected: table
                .columns
                .keys()
                .map(|name| (name.clone(), ColumnValues::new()))
                .collect(),
            rows: 0,
        }
    }

    pub fn table(&self) -> &CompiledTable {
        self.table
    }

    /// Number of rows validated so far.
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Validate one row. `values` holds one raw value per declared column, in
    /// declaration order; missing trailing values read as empty.
    pub fn validate(&mut self, row: usize, values: &[String]) -> Vec<Violation> {
        self.rows += 1;
        let table = self.table;
        let mut violations = Vec::new();

        let cells: Vec<(&CompiledColumn, &str)> = table
            .columns
            .values()
            .enumerate()
            .map(|(i, column)| (column, values.get(i).map(String::as_str).unwrap_or("")))
            .collect();

        let nulls: HashMap<&str, bool> = cells
            .iter()
            .map(|(column, value)| (column.name.as_str(), self.is_null(column, value)))
            .collect();

        for (column, value) in &cells {
            let is_null = nulls.get(column.name.as_str()).copied().unwrap_or(false);
            self.check_cell(row, column, value, is_null, &mut violations);

            for rule in table.rules_for(&column.name) {
                if !rule.when.holds(value, is_null) {
                    continue;
                }
                let then_value = cells
                    .iter()
                    .find(|(c, _)| c.name == rule.then_column)
                    .map(|(_, v)| *v)
                    .unwrap_or("");
                let then_null = nulls
                    .get(rule.then_column.as_str())
                    .copied()
                    .unwrap_or(true);
                if !rule.then.holds(then_value, then_null) {
                    let message = if rule.description.is_empty() {
                        format!("rule {} on {} failed", rule.number, column.name)
                    } else {
                        rule.description.clone()
                    };
                    violations.push(
                        Violation::error(
                            table.name.clone(),
                            row,
                            column.name.clone(),
                            ViolationRule::Rule,
                            message,
                            *value,
                        )
                        .with_level(rule.level),
                    );
                }
            }
        }

        violations
    }

    /// Record a stored row without checking it, so rows validated afterwards
    /// see its key values and the deferred checks see its cells.
    pub fn seed(&mut self, row: usize, values: &[String]) {
        let table = self.table;
        for (i, column) in table.columns.values().enumerate() {
            let value = values.get(i).map(String::as_str).unwrap_or("");
            if value.is_empty() || self.is_null(column, value) {
                continue;
            }
            if let Some(collected) = self.collected.get_mut(&column.name) {
                collected.insert(row, value.to_string());
            }
            if column.is_key() && self.datatype(column).is_none_or(|dt| dt.accepts(value)) {
                self.seen
                    .entry(column.name.clone())
                    .or_default()
                    .entry(value.to_string())
                    .or_insert(row);
            }
        }
    }

    fn check_cell(
        &mut self,
        row: usize,
        column: &CompiledColumn,
        value: &str,
        is_null: bool,
        violations: &mut Vec<Violation>,
    ) {
        if is_null {
            return;
        }
        if value.is_empty() {
            violations.push(Violation::error(
                self.table.name.clone(),
                row,
                column.name.clone(),
                ViolationRule::NotNull,
                format!("{} must not be empty", column.name),
                value,
            ));
            return;
        }

        if let Some(values) = self.collected.get_mut(&column.name) {
            values.insert(row, value.to_string());
        }

        if let Some(predicate) = self
            .datatype(column)
            .and_then(|dt| dt.first_failure(value))
        {
            violations.push(Violation::error(
                self.table.name.clone(),
                row,
                column.name.clone(),
                ViolationRule::Datatype,
                predicate.failure_message(&column.name),
                value,
            ));
            return;
        }

        if column.is_key() {
            let seen = self.seen.entry(column.name.clone()).or_default();
            match seen.get(value) {
                Some(first) => violations.push(Violation::error(
                    self.table.name.clone(),
                    row,
                    column.name.clone(),
                    ViolationRule::Unique,
                    format!(
                        "Values of {} must be unique; `{}` first appears on row {}",
                        column.name, value, first
                    ),
                    value,
                )),
                None => {
                    seen.insert(value.to_string(), row);
                }
            }
        }
    }

    fn datatype(&self, column: &CompiledColumn) -> Option<&'a CompiledDatatype> {
        self.registry.resolve(&column.datatype)
    }

    /// Check whether a raw value counts as null for `column`.
    pub fn is_null(&self, column: &CompiledColumn, value: &str) -> bool {
        if value.is_empty() {
            return column.nullable;
        }
        column
            .nulltype
            .as_ref()
            .and_then(|name| self.registry.resolve(name))
            .is_some_and(|nt| nt.accepts(value))
    }

    /// Check whether a row with these violations must go to the conflict table.
    pub fn is_conflict(&self, violations: &[Violation]) -> bool {
        violations.iter().any(|v| {
            self.table
                .column(&v.column)
                .is_some_and(|c| c.is_key() && v.level == crate::ast::Level::Error)
        })
    }

    /// Non-null values seen for `column`, keyed by row.
    pub fn values(&self, column: &str) -> Option<&ColumnValues> {
        self.collected.get(column)
    }

    /// Consume the validator, keeping the collected values.
    pub fn into_values(self) -> IndexMap<SmolStr, ColumnValues> {
        self.collected
    }
}
