//! Conversions between SQLite values and termbase values.

use rusqlite::types::{Value, ValueRef};
use serde_json::Value as JsonValue;

use termbase_query::filter::FilterValue;

/// Convert a bound parameter to a SQLite value.
pub fn filter_value_to_sqlite(value: &FilterValue) -> Value {
    match value {
        FilterValue::Null => Value::Null,
        FilterValue::Int(i) => Value::Integer(*i),
        FilterValue::Float(f) => Value::Real(*f),
        FilterValue::String(s) => Value::Text(s.clone()),
    }
}

/// Convert a list of parameters for binding.
pub fn to_params(values: &[FilterValue]) -> Vec<Value> {
    values.iter().map(filter_value_to_sqlite).collect()
}

/// The stored form of a raw cell: empty cells are NULL, everything else the
/// raw text (SQLite applies the column's affinity).
pub fn cell_to_sqlite(raw: &str) -> Value {
    if raw.is_empty() {
        Value::Null
    } else {
        Value::Text(raw.to_string())
    }
}

/// Convert a SQLite value to JSON for query results.
pub fn from_sqlite_value(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            JsonValue::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Convert a SQLite value back to raw cell text; NULL reads as empty.
pub fn to_raw_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Get a JSON value from a row at the given column index.
pub fn get_value_at_index(row: &rusqlite::Row<'_>, index: usize) -> JsonValue {
    row.get_ref(index)
        .map(from_sqlite_value)
        .unwrap_or(JsonValue::Null)
}

/// Get a query result cell. A numeric cell whose source text renders
/// differently from its stored value (`05`, `1.50`) returns that text.
pub fn get_cell_at_index(row: &rusqlite::Row<'_>, index: usize, source: Option<usize>) -> JsonValue {
    let value = get_value_at_index(row, index);
    let Some(source) = source else {
        return value;
    };
    match (row.get_ref(index), row.get_ref(source)) {
        (Ok(stored), Ok(ValueRef::Text(text))) => {
            let text = String::from_utf8_lossy(text);
            if to_raw_text(stored) == text {
                value
            } else {
                JsonValue::String(text.into_owned())
            }
        }
        _ => value,
    }
}
