//! Conditional rule declarations.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// "When `when_column` satisfies `when_condition`, `then_column` must satisfy
/// `then_condition`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDecl {
    pub table: SmolStr,
    pub when_column: SmolStr,
    /// A condition expression, `null` or `not null`.
    pub when_condition: String,
    pub then_column: SmolStr,
    /// A condition expression, `null` or `not null`.
    pub then_condition: String,
    /// Level name; checked by the compiler.
    pub level: String,
    /// Message recorded on the violation.
    pub description: String,
}

impl RuleDecl {
    /// Create an `error` level rule.
    pub fn new(
        table: impl Into<SmolStr>,
        when_column: impl Into<SmolStr>,
        when_condition: impl Into<String>,
        then_column: impl Into<SmolStr>,
        then_condition: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            when_column: when_column.into(),
            when_condition: when_condition.into(),
            then_column: then_column.into(),
            then_condition: then_condition.into(),
            level: "error".to_string(),
            description: String::new(),
        }
    }

    /// Set the level.
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
