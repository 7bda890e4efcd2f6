//! TSV export of stored tables and violations.

use std::io::{self, Write};

use termbase_schema::Violation;
use termbase_schema::parser::tsv::join_fields;

use crate::error::{StoreError, StoreResult};
use crate::store::Dataset;

/// Header of an exported violation sheet.
pub const VIOLATION_HEADER: [&str; 7] = ["table", "row", "column", "level", "rule", "message", "value"];

/// Write violations as TSV, one per line, in the given order.
pub fn write_violations_tsv<W: Write>(out: &mut W, violations: &[Violation]) -> io::Result<()> {
    writeln!(out, "{}", join_fields(VIOLATION_HEADER))?;
    for v in violations {
        let row = v.row.to_string();
        writeln!(
            out,
            "{}",
            join_fields([
                v.table.as_str(),
                row.as_str(),
                v.column.as_str(),
                v.level.as_str(),
                v.rule.as_str(),
                v.message.as_str(),
                v.value.as_str(),
            ])
        )?;
    }
    Ok(())
}

/// Write the stored rows of `table` (main and conflict, in row order) as
/// TSV with its declared columns. Returns the number of rows written.
pub fn write_table_tsv<W: Write>(dataset: &Dataset, table: &str, out: &mut W) -> StoreResult<usize> {
    let compiled = dataset
        .schema()
        .table(table)
        .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
    let rows = dataset.table_rows(table)?;

    let io_error = |source| StoreError::Io {
        path: format!("<{}>", table),
        source,
    };
    writeln!(out, "{}", join_fields(compiled.column_names())).map_err(io_error)?;
    for (_, values) in &rows {
        writeln!(out, "{}", join_fields(values)).map_err(io_error)?;
    }
    Ok(rows.len())
}
