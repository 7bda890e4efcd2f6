//! CLI error types and result alias.

use miette::Diagnostic;
use thiserror::Error;

use termbase_query::QueryError;
use termbase_schema::SchemaError;
use termbase_sqlite::{LoadError, StoreError};

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(termbase::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(termbase::config))]
    Config(String),

    /// Declarations could not be read or compiled
    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),

    /// The load was aborted
    #[error("Load error: {0}")]
    #[diagnostic(code(termbase::load))]
    Load(#[from] LoadError),

    /// Store error
    #[error("Database error: {0}")]
    #[diagnostic(code(termbase::database))]
    Store(#[from] StoreError),

    /// The request was rejected or failed
    #[error("{}", .0.display_full().trim_end())]
    #[diagnostic(code(termbase::query))]
    Query(#[from] QueryError),

    /// Validation found problems and `--strict` was given
    #[error("Validation error: {0}")]
    #[diagnostic(code(termbase::validation))]
    Validation(String),

    /// Command error
    #[error("Command error: {0}")]
    #[diagnostic(code(termbase::command))]
    Command(String),
}
