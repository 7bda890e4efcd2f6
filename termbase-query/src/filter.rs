//! Filter types for building WHERE clauses.

use serde::{Deserialize, Serialize};

use crate::sql::SqlBuilder;

/// A value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null value.
    Null,
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
}

impl FilterValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<usize> for FilterValue {
    fn from(v: usize) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// A filter that can be converted to SQL.
///
/// Column names held here must already be checked against the schema; they
/// are quoted but never validated by this type.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// No filter (always true).
    #[default]
    None,

    /// Equals comparison.
    Equals(String, FilterValue),
    /// Not equals comparison. Null cells do not match.
    NotEquals(String, FilterValue),

    /// Less than comparison.
    Lt(String, FilterValue),
    /// Less than or equal comparison.
    Lte(String, FilterValue),
    /// Greater than comparison.
    Gt(String, FilterValue),
    /// Greater than or equal comparison.
    Gte(String, FilterValue),

    /// In a list of values.
    In(String, Vec<FilterValue>),

    /// SQL LIKE with `\` as the escape character.
    Like(String, String),

    /// Is null check.
    IsNull(String),
    /// Is not null check.
    IsNotNull(String),

    /// Rows carrying at least one persisted violation.
    HasViolation {
        table: String,
        level: Option<String>,
        column: Option<String>,
    },

    /// Logical AND of multiple filters.
    And(Vec<Filter>),
}

impl Filter {
    /// Check if this filter is empty.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Create an AND filter.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::And(filters),
        }
    }

    /// Convert a `like` operand to a LIKE pattern: `*` is the wildcard and
    /// an operand without one matches as a substring.
    pub fn like_pattern(operand: &str) -> String {
        let mut escaped = String::with_capacity(operand.len() + 2);
        for c in operand.chars() {
            match c {
                '%' | '_' | '\\' => {
                    escaped.push('\\');
                    escaped.push(c);
                }
                '*' => escaped.push('%'),
                _ => escaped.push(c),
            }
        }
        if operand.contains('*') {
            escaped
        } else {
            format!("%{}%", escaped)
        }
    }

    /// Append this filter to `builder`, qualifying columns with `alias`.
    pub fn write_sql(&self, builder: &mut SqlBuilder, alias: &str) {
        match self {
            Self::None => {
                builder.push("1 = 1");
            }
            Self::Equals(col, val) if val.is_null() => {
                builder.push_column(alias, col).push(" IS NULL");
            }
            Self::Equals(col, val) => {
                builder.push_column(alias, col).push(" = ").push_param(val.clone());
            }
            Self::NotEquals(col, val) if val.is_null() => {
                builder.push_column(alias, col).push(" IS NOT NULL");
            }
            Self::NotEquals(col, val) => {
                builder.push_column(alias, col).push(" != ").push_param(val.clone());
            }
            Self::Lt(col, val) => {
                builder.push_column(alias, col).push(" < ").push_param(val.clone());
            }
            Self::Lte(col, val) => {
                builder.push_column(alias, col).push(" <= ").push_param(val.clone());
            }
            Self::Gt(col, val) => {
                builder.push_column(alias, col).push(" > ").push_param(val.clone());
            }
            Self::Gte(col, val) => {
                builder.push_column(alias, col).push(" >= ").push_param(val.clone());
            }
            Self::In(_, values) if values.is_empty() => {
                builder.push("1 = 0");
            }
            Self::In(col, values) => {
                builder.push_column(alias, col).push(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        builder.push(", ");
                    }
                    builder.push_param(value.clone());
                }
                builder.push(")");
            }
            Self::Like(col, pattern) => {
                builder
                    .push_column(alias, col)
                    .push(" LIKE ")
                    .push_param(pattern.as_str())
                    .push(" ESCAPE '\\'");
            }
            Self::IsNull(col) => {
                builder.push_column(alias, col).push(" IS NULL");
            }
            Self::IsNotNull(col) => {
                builder.push_column(alias, col).push(" IS NOT NULL");
            }
            Self::HasViolation { table, level, column } => {
                builder
                    .push("EXISTS (SELECT 1 FROM ")
                    .push_identifier(termbase_schema::compiler::VIOLATION_TABLE)
                    .push(" v WHERE v.\"table\" = ")
                    .push_param(table.as_str())
                    .push(" AND v.\"row\" = ")
                    .push_column(alias, termbase_schema::compiler::ROW_NUMBER);
                if let Some(level) = level {
                    builder.push(" AND v.\"level\" = ").push_param(level.as_str());
                }
                if let Some(column) = column {
                    builder.push(" AND v.\"column\" = ").push_param(column.as_str());
                }
                builder.push(")");
            }
            Self::And(filters) if filters.is_empty() => {
                builder.push("1 = 1");
            }
            Self::And(filters) => {
                builder.push("(");
                for (i, filter) in filters.iter().enumerate() {
                    if i > 0 {
                        builder.push(" AND ");
                    }
                    filter.write_sql(builder, alias);
                }
                builder.push(")");
            }
        }
    }

    /// Generate SQL for this filter with `?` placeholders.
    /// Returns (sql, params) where params are the values to bind in order.
    pub fn to_sql(&self, alias: &str) -> (String, Vec<FilterValue>) {
        let mut builder = SqlBuilder::new();
        self.write_sql(&mut builder, alias);
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_filter_value_from() {
        assert_eq!(FilterValue::from(42i32), FilterValue::Int(42));
        assert_eq!(FilterValue::from("hello"), FilterValue::String("hello".to_string()));
        assert_eq!(FilterValue::from(None::<i64>), FilterValue::Null);
    }

    #[test]
    fn test_equals() {
        let (sql, params) = Filter::Equals("age".into(), FilterValue::Int(18)).to_sql("t");
        assert_eq!(sql, r#"t."age" = ?"#);
        assert_eq!(params, vec![FilterValue::Int(18)]);
    }

    #[test]
    fn test_and() {
        let combined = Filter::and([
            Filter::Gte("age".into(), FilterValue::Int(18)),
            Filter::None,
            Filter::IsNull("note".into()),
        ]);
        let (sql, params) = combined.to_sql("t");
        assert_eq!(sql, r#"(t."age" >= ? AND t."note" IS NULL)"#);
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_and_single_unwraps() {
        let filter = Filter::and([Filter::IsNotNull("a".into())]);
        assert_eq!(filter, Filter::IsNotNull("a".into()));
        assert!(Filter::and([]).is_none());
    }

    #[test]
    fn test_in() {
        let filter = Filter::In("sex".into(), vec!["F".into(), "M".into()]);
        let (sql, params) = filter.to_sql("t");
        assert_eq!(sql, r#"t."sex" IN (?, ?)"#);
        assert_eq!(params.len(), 2);

        let (sql, params) = Filter::In("sex".into(), vec![]).to_sql("t");
        assert_eq!(sql, "1 = 0");
        assert!(params.is_empty());
    }

    #[test]
    fn test_like_pattern() {
        assert_eq!(Filter::like_pattern("blood"), "%blood%");
        assert_eq!(Filter::like_pattern("blood*"), "blood%");
        assert_eq!(Filter::like_pattern("50%_x"), r"%50\%\_x%");
    }

    #[test]
    fn test_like_sql() {
        let (sql, params) = Filter::Like("name".into(), "%a%".into()).to_sql("t");
        assert_eq!(sql, r#"t."name" LIKE ? ESCAPE '\'"#);
        assert_eq!(params, vec![FilterValue::String("%a%".into())]);
    }

    #[test]
    fn test_values_are_never_inlined() {
        let hostile = "x'; DROP TABLE subject; --";
        let (sql, params) = Filter::Equals("name".into(), hostile.into()).to_sql("t");
        assert!(!sql.contains("DROP"));
        assert_eq!(params, vec![FilterValue::String(hostile.into())]);
    }

    #[test]
    fn test_has_violation() {
        let filter = Filter::HasViolation {
            table: "subject".into(),
            level: Some("error".into()),
            column: None,
        };
        let (sql, params) = filter.to_sql("t");
        assert_eq!(
            sql,
            r#"EXISTS (SELECT 1 FROM "violation" v WHERE v."table" = ? AND v."row" = t."row_number" AND v."level" = ?)"#
        );
        assert_eq!(params, vec![FilterValue::from("subject"), FilterValue::from("error")]);
    }
}
