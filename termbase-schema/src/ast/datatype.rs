//! Datatype declarations.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::SqlType;

/// A named value-matching rule, optionally inheriting from a parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatatypeDecl {
    /// Datatype name.
    pub name: SmolStr,
    /// Parent datatype name.
    pub parent: Option<SmolStr>,
    /// Condition expression text, e.g. `match(/[0-9]+/)`.
    pub condition: Option<String>,
    /// Declared SQL type. Inherited from the parent chain when absent.
    pub sql_type: Option<SqlType>,
    /// Human-readable description, used in violation messages.
    pub description: String,
    /// When set, this condition replaces the ancestors' conditions.
    pub override_parent: bool,
}

impl DatatypeDecl {
    /// Create a datatype with no parent and no condition.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            condition: None,
            sql_type: None,
            description: String::new(),
            override_parent: false,
        }
    }

    /// Set the parent datatype.
    pub fn parent(mut self, parent: impl Into<SmolStr>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the condition.
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Set the SQL type.
    pub fn sql_type(mut self, sql_type: SqlType) -> Self {
        self.sql_type = Some(sql_type);
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark this datatype as overriding its ancestors' conditions.
    pub fn overriding(mut self) -> Self {
        self.override_parent = true;
        self
    }
}
