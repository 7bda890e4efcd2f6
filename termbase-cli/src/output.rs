//! Styled terminal output utilities.

use owo_colors::OwoColorize;
use serde_json::Value;

use termbase_query::{CellViolation, ResultSet};
use termbase_schema::Level;

/// Print a header/title
pub fn header(text: &str) {
    println!();
    println!("{}", text.bold().cyan());
    println!("{}", "─".repeat(text.chars().count()).dimmed());
    println!();
}

/// Print a section header
pub fn section(text: &str) {
    println!("{}", text.bold().white());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a success message
pub fn success(text: &str) {
    println!("{} {}", "✔".green().bold(), text.green());
}

/// Print an info message
pub fn info(text: &str) {
    println!("{} {}", "ℹ".blue().bold(), text);
}

/// Print a warning message
pub fn warn(text: &str) {
    println!("{} {}", "⚠".yellow().bold(), text.yellow());
}

/// Print an error message
pub fn error(text: &str) {
    eprintln!("{} {}", "✖".red().bold(), text.red());
}

/// Print a step indicator
pub fn step(current: usize, total: usize, text: &str) {
    println!("{} {}", format!("[{}/{}]", current, total).dimmed(), text);
}

/// Print a list item
pub fn list_item(text: &str) {
    println!("  {} {}", "•".dimmed(), text);
}

/// Print a newline
pub fn newline() {
    println!();
}

/// Print dimmed text
pub fn dim(text: &str) {
    println!("{}", text.dimmed());
}

/// Style text as error (red)
pub fn style_error(text: &str) -> String {
    text.red().to_string()
}

/// Style a level name by severity
pub fn style_level(level: Level) -> String {
    match level {
        Level::Error => level.as_str().red().to_string(),
        Level::Warning => level.as_str().yellow().to_string(),
        Level::Info => level.as_str().blue().to_string(),
    }
}

/// Display text of a result cell; null is blank.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The most severe level among a cell's violations.
fn worst(violations: &[CellViolation]) -> Option<Level> {
    violations.iter().map(|v| v.level).min()
}

/// Print a result set as an aligned table. Cells with violations are
/// coloured by their most severe level and listed below the table.
pub fn result_table(result: &ResultSet) {
    let mut headers = vec!["row_number".to_string()];
    headers.extend(result.columns.iter().map(|c| c.to_string()));

    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| {
            std::iter::once(row.row_number.to_string())
                .chain(row.values.iter().map(cell_text))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<w$}", h, w = w).bold().to_string())
        .collect();
    println!("{}", line.join("  "));
    let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    println!("{}", rule.join("  ").dimmed());

    for (row, cells) in result.rows.iter().zip(&rows) {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, w))| {
                let padded = format!("{:<w$}", cell, w = w);
                let level = i
                    .checked_sub(1)
                    .and_then(|c| row.violations.get(c))
                    .and_then(|v| worst(v));
                match level {
                    Some(Level::Error) => padded.red().to_string(),
                    Some(Level::Warning) => padded.yellow().to_string(),
                    Some(Level::Info) => padded.blue().to_string(),
                    None => padded,
                }
            })
            .collect();
        println!("{}", line.join("  "));
    }

    let columns = &result.columns;
    let flagged: Vec<String> = result
        .rows
        .iter()
        .flat_map(move |row| {
            columns
                .iter()
                .zip(&row.violations)
                .flat_map(move |(column, found)| {
                    found.iter().map(move |v| {
                        format!(
                            "row {} {}: {} {} ({})",
                            row.row_number,
                            column,
                            style_level(v.level),
                            v.message,
                            v.rule
                        )
                    })
                })
        })
        .collect();
    if !flagged.is_empty() {
        newline();
        section("Violations");
        for item in &flagged {
            list_item(item);
        }
    }
}

/// Print a result set as TSV, header first.
pub fn result_tsv(result: &ResultSet) {
    let mut header = vec!["row_number".to_string()];
    header.extend(result.columns.iter().map(|c| c.to_string()));
    println!("{}", header.join("\t"));
    for row in &result.rows {
        let cells: Vec<String> = std::iter::once(row.row_number.to_string())
            .chain(row.values.iter().map(|v| cell_text(v).replace(['\t', '\n'], " ")))
            .collect();
        println!("{}", cells.join("\t"));
    }
}
