//! SQL generation utilities.
//!
//! Identifiers are always quoted; values only ever reach a statement as
//! bound parameters.

use crate::filter::FilterValue;

/// Escape a string for use in SQL (for identifiers, not values).
pub fn escape_identifier(name: &str) -> String {
    // Double any existing quotes
    let escaped = name.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// A SQL builder using SQLite `?` placeholders.
#[derive(Debug, Clone, Default)]
pub struct SqlBuilder {
    sql: String,
    params: Vec<FilterValue>,
}

impl SqlBuilder {
    /// Create a new SQL builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a literal SQL string.
    pub fn push(&mut self, sql: impl AsRef<str>) -> &mut Self {
        self.sql.push_str(sql.as_ref());
        self
    }

    /// Push a placeholder and record its value.
    pub fn push_param(&mut self, value: impl Into<FilterValue>) -> &mut Self {
        self.sql.push('?');
        self.params.push(value.into());
        self
    }

    /// Push a quoted identifier.
    pub fn push_identifier(&mut self, name: &str) -> &mut Self {
        self.sql.push_str(&escape_identifier(name));
        self
    }

    /// Push `alias."column"`.
    pub fn push_column(&mut self, alias: &str, column: &str) -> &mut Self {
        self.sql.push_str(alias);
        self.sql.push('.');
        self.push_identifier(column)
    }

    /// Push items separated by `sep`, rendering each with `f`.
    pub fn push_list<T>(
        &mut self,
        items: impl IntoIterator<Item = T>,
        sep: &str,
        mut f: impl FnMut(&mut Self, T),
    ) -> &mut Self {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(sep);
            }
            f(self, item);
        }
        self
    }

    /// Build the final SQL string and parameters.
    pub fn build(self) -> (String, Vec<FilterValue>) {
        (self.sql, self.params)
    }

    /// Get the current SQL string (without consuming).
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Get the current parameters.
    pub fn params(&self) -> &[FilterValue] {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier("order"), "\"order\"");
        assert_eq!(escape_identifier("my_table"), "\"my_table\"");
        assert_eq!(escape_identifier("has\"quote"), "\"has\"\"quote\"");
    }

    #[test]
    fn test_sql_builder() {
        let mut builder = SqlBuilder::new();
        builder
            .push("SELECT * FROM ")
            .push_identifier("subject_view")
            .push(" t WHERE ")
            .push_column("t", "id")
            .push(" = ")
            .push_param(42i32);

        assert_eq!(builder.params().len(), 1);
        let (sql, params) = builder.build();
        assert_eq!(sql, r#"SELECT * FROM "subject_view" t WHERE t."id" = ?"#);
        assert_eq!(params, vec![FilterValue::Int(42)]);
    }

    #[test]
    fn test_push_list() {
        let mut builder = SqlBuilder::new();
        builder.push_list(["a", "b"], ", ", |b, name| {
            b.push_identifier(name);
        });
        assert_eq!(builder.sql(), r#""a", "b""#);
    }
}
