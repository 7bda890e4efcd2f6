//! Table and prefix declarations.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::TableType;

/// An entry of the table sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDecl {
    /// Table name.
    pub name: SmolStr,
    /// Source file, relative to the declaration directory.
    pub path: String,
    /// Sheet role.
    pub table_type: TableType,
    /// Table description.
    pub description: String,
}

impl TableDecl {
    /// Create a data table declaration.
    pub fn new(name: impl Into<SmolStr>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            table_type: TableType::Data,
            description: String::new(),
        }
    }

    /// Set the sheet role.
    pub fn with_type(mut self, table_type: TableType) -> Self {
        self.table_type = table_type;
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A CURIE prefix and the IRI base it expands to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefix {
    pub prefix: SmolStr,
    pub base: String,
}

impl Prefix {
    pub fn new(prefix: impl Into<SmolStr>, base: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            base: base.into(),
        }
    }
}
