//! Column declarations.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A column of a declared table, as written in the column sheet.
///
/// The `structure` cell stays raw here; the compiler parses it into
/// [`Structure`](super::Structure) values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDecl {
    /// Owning table.
    pub table: SmolStr,
    /// Column name.
    pub name: SmolStr,
    /// Datatype name.
    pub datatype: SmolStr,
    /// Datatype whose condition marks a value as null.
    pub nulltype: Option<SmolStr>,
    /// Empty values allowed even without a nulltype.
    pub nullable: bool,
    /// Raw structure cell.
    pub structure: String,
    /// Column description.
    pub description: String,
}

impl ColumnDecl {
    /// Create a required column with no structure.
    pub fn new(
        table: impl Into<SmolStr>,
        name: impl Into<SmolStr>,
        datatype: impl Into<SmolStr>,
    ) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            datatype: datatype.into(),
            nulltype: None,
            nullable: false,
            structure: String::new(),
            description: String::new(),
        }
    }

    /// Set the nulltype.
    pub fn nulltype(mut self, nulltype: impl Into<SmolStr>) -> Self {
        self.nulltype = Some(nulltype.into());
        self
    }

    /// Allow empty values.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Set the structure cell.
    pub fn structure(mut self, structure: impl Into<String>) -> Self {
        self.structure = structure.into();
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Check if empty values are accepted.
    pub fn is_nullable(&self) -> bool {
        self.nullable || self.nulltype.is_some()
    }

    /// `table.column` form, used in messages.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_from_nulltype() {
        let col = ColumnDecl::new("subject", "note", "text");
        assert!(!col.is_nullable());
        assert!(col.clone().nulltype("empty").is_nullable());
        assert!(col.nullable().is_nullable());
    }

    #[test]
    fn test_qualified_name() {
        let col = ColumnDecl::new("subject", "id", "integer").structure("primary");
        assert_eq!(col.qualified_name(), "subject.id");
        assert_eq!(col.structure, "primary");
    }
}
