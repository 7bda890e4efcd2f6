//! The complete set of declarations for one dataset.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{ColumnDecl, DatatypeDecl, Prefix, RuleDecl, TableDecl};

/// Everything read from the declaration sheets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Declarations {
    /// Tables in table sheet order, declaration sheets included.
    pub tables: Vec<TableDecl>,
    /// Columns in column sheet order.
    pub columns: Vec<ColumnDecl>,
    /// Datatypes in datatype sheet order.
    pub datatypes: Vec<DatatypeDecl>,
    pub prefixes: Vec<Prefix>,
    pub rules: Vec<RuleDecl>,
    /// Directory table paths are relative to.
    pub base_dir: PathBuf,
}

impl Declarations {
    /// Create an empty declaration set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table.
    pub fn table(mut self, table: TableDecl) -> Self {
        self.tables.push(table);
        self
    }

    /// Add a column.
    pub fn column(mut self, column: ColumnDecl) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a datatype.
    pub fn datatype(mut self, datatype: DatatypeDecl) -> Self {
        self.datatypes.push(datatype);
        self
    }

    /// Add a prefix.
    pub fn prefix(mut self, prefix: Prefix) -> Self {
        self.prefixes.push(prefix);
        self
    }

    /// Add a conditional rule.
    pub fn rule(mut self, rule: RuleDecl) -> Self {
        self.rules.push(rule);
        self
    }

    /// Set the base directory for table paths.
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Get a table declaration by name.
    pub fn get_table(&self, name: &str) -> Option<&TableDecl> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Get the columns declared for a table, in order.
    pub fn columns_of<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a ColumnDecl> + 'a {
        self.columns.iter().filter(move |c| c.table == table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let decls = Declarations::new()
            .table(TableDecl::new("subject", "subject.tsv"))
            .column(ColumnDecl::new("subject", "id", "integer"))
            .column(ColumnDecl::new("subject", "age", "integer"))
            .column(ColumnDecl::new("specimen", "id", "integer"))
            .datatype(DatatypeDecl::new("integer"));

        assert!(decls.get_table("subject").is_some());
        assert!(decls.get_table("specimen").is_none());
        assert_eq!(decls.columns_of("subject").count(), 2);
    }
}
