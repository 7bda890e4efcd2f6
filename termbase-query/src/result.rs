//! Query results.

use serde::Serialize;
use serde_json::Value;
use smol_str::SmolStr;

use termbase_schema::Level;

/// A persisted violation attached to a returned cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellViolation {
    pub level: Level,
    pub rule: String,
    pub message: String,
}

/// One returned row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    /// 1-based source row.
    pub row_number: i64,
    /// One value per selected column, in order. Null cells are `Value::Null`.
    pub values: Vec<Value>,
    /// Violations per selected column, parallel to `values`.
    pub violations: Vec<Vec<CellViolation>>,
}

impl ResultRow {
    pub fn new(row_number: i64, values: Vec<Value>) -> Self {
        let violations = vec![Vec::new(); values.len()];
        Self {
            row_number,
            values,
            violations,
        }
    }

    /// Check whether any cell carries a violation.
    pub fn has_violations(&self) -> bool {
        self.violations.iter().any(|v| !v.is_empty())
    }
}

/// The result of a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub table: SmolStr,
    pub columns: Vec<SmolStr>,
    pub rows: Vec<ResultRow>,
    /// Number of matching rows ignoring limit and offset.
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

impl ResultSet {
    /// Position of a returned column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// The values of one column across all rows.
    pub fn column_values(&self, name: &str) -> Vec<&Value> {
        match self.column_index(name) {
            Some(i) => self.rows.iter().filter_map(|r| r.values.get(i)).collect(),
            None => Vec::new(),
        }
    }

    /// Whether rows exist past this page.
    pub fn has_more(&self) -> bool {
        ((self.offset + self.rows.len()) as u64) < self.total
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result() -> ResultSet {
        let mut row = ResultRow::new(2, vec![json!(2), json!(-5)]);
        row.violations[1].push(CellViolation {
            level: Level::Error,
            rule: "datatype".into(),
            message: "age must be a positive integer".into(),
        });
        ResultSet {
            table: "subject".into(),
            columns: vec!["id".into(), "age".into()],
            rows: vec![ResultRow::new(1, vec![json!(1), json!(30)]), row],
            total: 3,
            limit: 2,
            offset: 0,
        }
    }

    #[test]
    fn test_column_values() {
        let result = result();
        assert_eq!(result.column_values("age"), vec![&json!(30), &json!(-5)]);
        assert!(result.column_values("weight").is_empty());
        assert!(result.has_more());
    }

    #[test]
    fn test_has_more_at_last_page() {
        let mut result = result();
        result.offset = 1;
        assert!(!result.has_more());
        assert_eq!(result.len(), 2);

        result.rows.clear();
        result.offset = 3;
        assert!(!result.has_more());
        assert!(result.is_empty());
    }

    #[test]
    fn test_row_violations() {
        let result = result();
        assert!(!result.rows[0].has_violations());
        assert!(result.rows[1].has_violations());
    }

    #[test]
    fn test_serialize() {
        let value = serde_json::to_value(result()).unwrap();
        assert_eq!(value["rows"][1]["violations"][1][0]["level"], "error");
        assert_eq!(value["total"], 3);
    }
}
