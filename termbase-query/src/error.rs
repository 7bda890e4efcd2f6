//! Error types for query operations with actionable messages.
//!
//! # Error Codes
//!
//! Error codes follow a pattern: Q{category}{number}
//! - 1xxx: Request errors (unknown table or column, malformed clause)
//! - 5xxx: Execution errors (store failures)
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use termbase_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::unknown_column("subject", "weight");
//! assert_eq!(err.code, ErrorCode::UnknownColumn);
//! assert!(err.to_string().contains("weight"));
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Request errors (1xxx)
    /// The table is not a declared data table (Q1001).
    UnknownTable = 1001,
    /// The column is not declared for the table (Q1002).
    UnknownColumn = 1002,
    /// Invalid where clause (Q1003).
    InvalidFilter = 1003,
    /// Invalid select list (Q1004).
    InvalidSelect = 1004,
    /// Invalid order list (Q1005).
    InvalidOrder = 1005,
    /// Invalid limit or offset (Q1006).
    InvalidPagination = 1006,
    /// Invalid violation filter (Q1007).
    InvalidViolationFilter = 1007,
    /// Operator not applicable to the column's kind (Q1008).
    IncompatibleOperator = 1008,

    // Execution errors (5xxx)
    /// General database error (Q5001).
    DatabaseError = 5001,

    // Configuration errors (7xxx)
    /// Invalid configuration (Q7001).
    InvalidConfiguration = 7001,

    // Internal errors (9xxx)
    /// Internal error (Q9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "Q1001").
    pub fn code(&self) -> String {
        format!("Q{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::UnknownTable => "Unknown table",
            Self::UnknownColumn => "Unknown column",
            Self::InvalidFilter => "Invalid filter condition",
            Self::InvalidSelect => "Invalid select list",
            Self::InvalidOrder => "Invalid order list",
            Self::InvalidPagination => "Invalid limit or offset",
            Self::InvalidViolationFilter => "Invalid violation filter",
            Self::IncompatibleOperator => "Operator not applicable to column",
            Self::DatabaseError => "Database error",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }

    /// Check whether the error was caused by the request itself.
    pub fn is_request_error(&self) -> bool {
        (*self as u16) < 2000
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The table involved.
    pub table: Option<String>,
    /// The column involved.
    pub column: Option<String>,
    /// The offending request clause, as written.
    pub clause: Option<String>,
    /// The SQL statement (if available).
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur during query operations.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(suggestion.into());
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the table.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.context.table = Some(table.into());
        self
    }

    /// Set the column.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.context.column = Some(column.into());
        self
    }

    /// Set the offending clause.
    pub fn with_clause(mut self, clause: impl Into<String>) -> Self {
        self.context.clause = Some(clause.into());
        self
    }

    /// Set the SQL statement.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create an unknown table error.
    pub fn unknown_table(table: impl Into<String>) -> Self {
        let table = table.into();
        Self::new(
            ErrorCode::UnknownTable,
            format!("Table `{}` is not a declared data table", table),
        )
        .with_table(&table)
        .with_suggestion("Check the table sheet for the declared table names")
    }

    /// Create an unknown column error.
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        let table = table.into();
        let column = column.into();
        Self::new(
            ErrorCode::UnknownColumn,
            format!("Column `{}` is not declared for table `{}`", column, table),
        )
        .with_table(&table)
        .with_column(&column)
    }

    /// Create an invalid filter error.
    pub fn invalid_filter(column: impl Into<String>, clause: impl Into<String>, message: impl Into<String>) -> Self {
        let column = column.into();
        let clause = clause.into();
        Self::new(
            ErrorCode::InvalidFilter,
            format!("Invalid filter `{}={}`: {}", column, clause, message.into()),
        )
        .with_column(&column)
        .with_clause(&clause)
        .with_help("Filters are written as `column=operator.operand`, e.g. `age=gte.18`")
    }

    /// Create an incompatible operator error.
    pub fn incompatible_operator(
        column: impl Into<String>,
        operator: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        let column = column.into();
        let operator = operator.into();
        Self::new(
            ErrorCode::IncompatibleOperator,
            format!(
                "Operator `{}` cannot be applied to {} column `{}`",
                operator,
                kind.into(),
                column
            ),
        )
        .with_column(&column)
        .with_clause(&operator)
    }

    /// Create an invalid parameter error for a reserved key.
    pub fn invalid_parameter(code: ErrorCode, key: impl Into<String>, message: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(code, format!("Invalid `{}`: {}", key, message.into())).with_clause(&key)
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
            .with_suggestion("Check that the dataset has been loaded")
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
    }

    // ============== Error Checks ==============

    /// Check if this error names an undeclared table or column.
    pub fn is_unknown_name(&self) -> bool {
        matches!(self.code, ErrorCode::UnknownTable | ErrorCode::UnknownColumn)
    }

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = format!("Error [{}]: {}\n", self.code.code(), self.message);

        if let Some(ref table) = self.context.table {
            output.push_str(&format!("  -> Table: {}\n", table));
        }
        if let Some(ref column) = self.context.column {
            output.push_str(&format!("  -> Column: {}\n", column));
        }
        if let Some(ref sql) = self.context.sql {
            let sql_display = if sql.chars().count() > 200 {
                format!("{}...", sql.chars().take(200).collect::<String>())
            } else {
                sql.clone()
            };
            output.push_str(&format!("  -> SQL: {}\n", sql_display));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}
