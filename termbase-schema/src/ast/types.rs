//! Scalar enums shared by the declaration records.

use serde::{Deserialize, Serialize};

/// SQL storage class a datatype maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    /// Maps to TEXT.
    Text,
    /// Maps to INTEGER.
    Integer,
    /// Maps to REAL.
    Real,
    /// Maps to BLOB.
    Blob,
}

impl SqlType {
    /// Parse an SQL type from a declaration cell (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "varchar" | "string" => Some(Self::Text),
            "integer" | "int" | "bigint" => Some(Self::Integer),
            "real" | "float" | "numeric" | "decimal" => Some(Self::Real),
            "blob" => Some(Self::Blob),
            _ => None,
        }
    }

    /// The SQL keyword for this type.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
        }
    }

    /// Check if values of this type are ordered numerically.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Real)
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// Role of an entry in the table sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableType {
    /// An ordinary data table.
    #[default]
    Data,
    /// The table sheet itself.
    Table,
    /// The column sheet.
    Column,
    /// The datatype sheet.
    Datatype,
    /// The prefix sheet.
    Prefix,
    /// The conditional rule sheet.
    Rule,
}

impl TableType {
    /// Parse the `type` cell of the table sheet. An empty cell is a data table.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "" => Some(Self::Data),
            "table" => Some(Self::Table),
            "column" => Some(Self::Column),
            "datatype" => Some(Self::Datatype),
            "prefix" => Some(Self::Prefix),
            "rule" => Some(Self::Rule),
            _ => None,
        }
    }

    /// Check if this entry declares a sheet rather than data.
    pub fn is_declaration(&self) -> bool {
        !matches!(self, Self::Data)
    }

    /// Get the type name as written in the table sheet.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "",
            Self::Table => "table",
            Self::Column => "column",
            Self::Datatype => "datatype",
            Self::Prefix => "prefix",
            Self::Rule => "rule",
        }
    }
}

/// Severity attached to a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Must be fixed.
    Error,
    /// Should be looked at.
    Warning,
    /// Informational only.
    Info,
}

impl Level {
    /// All levels, most severe first.
    pub const ALL: [Level; 3] = [Level::Error, Level::Warning, Level::Info];

    /// Parse a level name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "error" => Some(Self::Error),
            "warning" | "warn" => Some(Self::Warning),
            "info" => Some(Self::Info),
            _ => None,
        }
    }

    /// Get the level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse a yes/no cell from a declaration sheet.
pub(crate) fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "no" | "0" => Some(false),
        "true" | "yes" | "1" | "x" => Some(true),
        _ => None,
    }
}
