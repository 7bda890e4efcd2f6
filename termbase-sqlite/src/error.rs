//! Error types for store operations.

use thiserror::Error;

use termbase_query::error::{ErrorCode, QueryError};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the SQLite store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite driver error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The database file's directory could not be created.
    #[error("failed to prepare `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A persisted value could not be read back.
    #[error("Corrupt store: {0}")]
    Corrupt(String),

    /// The table is not a declared data table.
    #[error("Table `{0}` is not a declared data table")]
    UnknownTable(String),

    /// The column is not declared on the table.
    #[error("Column `{column}` is not declared on `{table}`")]
    UnknownColumn { table: String, column: String },

    /// An edited row left out a declared column.
    #[error("No value given for column `{column}` of `{table}`")]
    MissingValue { table: String, column: String },

    /// The table has never been loaded into this store.
    #[error("Table `{0}` has not been loaded")]
    NotLoaded(String),

    /// No stored row has this row number.
    #[error("Table `{table}` has no row {row}")]
    RowNotFound { table: String, row: usize },
}

impl StoreError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    /// Check if SQLite reported a missing table, i.e. nothing has been loaded.
    pub fn is_missing_table(&self) -> bool {
        matches!(self, Self::Sqlite(e) if e.to_string().contains("no such table"))
    }
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Config(msg) => QueryError::configuration(msg),
            StoreError::Corrupt(msg) => QueryError::new(ErrorCode::DatabaseError, msg),
            StoreError::UnknownTable(table) => QueryError::unknown_table(table),
            StoreError::UnknownColumn { table, column } => QueryError::unknown_column(table, column),
            err @ StoreError::NotLoaded(_) => QueryError::database(err.to_string())
                .with_help("Run `termbase load` before querying"),
            err @ StoreError::Sqlite(_) if err.is_missing_table() => {
                QueryError::database(err.to_string())
                    .with_help("Run `termbase load` before querying")
                    .with_source(err)
            }
            err => QueryError::database(err.to_string()).with_source(err),
        }
    }
}
