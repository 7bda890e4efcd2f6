//! Violation records.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::ast::Level;

/// Which check produced a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationRule {
    NotNull,
    Datatype,
    Unique,
    ForeignKey,
    Tree,
    Under,
    Rule,
}

impl ViolationRule {
    /// Get the rule name as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotNull => "not-null",
            Self::Datatype => "datatype",
            Self::Unique => "unique",
            Self::ForeignKey => "foreign-key",
            Self::Tree => "tree",
            Self::Under => "under",
            Self::Rule => "rule",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "not-null" => Some(Self::NotNull),
            "datatype" => Some(Self::Datatype),
            "unique" => Some(Self::Unique),
            "foreign-key" => Some(Self::ForeignKey),
            "tree" => Some(Self::Tree),
            "under" => Some(Self::Under),
            "rule" => Some(Self::Rule),
            _ => None,
        }
    }
}

impl std::fmt::Display for ViolationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A located finding that one cell failed one check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Violation {
    pub table: SmolStr,
    /// 1-based data row (the header is not counted).
    pub row: usize,
    pub column: SmolStr,
    pub level: Level,
    pub rule: ViolationRule,
    pub message: String,
    /// The offending raw value.
    pub value: String,
}

impl Violation {
    /// Create an `error` level violation.
    pub fn error(
        table: impl Into<SmolStr>,
        row: usize,
        column: impl Into<SmolStr>,
        rule: ViolationRule,
        message: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            row,
            column: column.into(),
            level: Level::Error,
            rule,
            message: message.into(),
            value: value.into(),
        }
    }

    /// Set the level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sort key giving a stable order: table, row, then column.
    pub fn sort_key(&self) -> (&str, usize, &str, ViolationRule) {
        (&self.table, self.row, &self.column, self.rule)
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{} [{} {}] {}",
            self.table, self.row, self.column, self.level, self.rule, self.message
        )
    }
}
