//! SQLite store for termbase datasets.
//!
//! This crate loads source tables into SQLite, persists their violations and
//! runs planned queries against the stored rows.
//!
//! # Features
//!
//! - Staged loads with one transaction per table
//! - Conflict tables for rows that break a key
//! - Foreign-key, tree and `under` checks across tables
//! - Query execution with per-cell violations
//! - Single-row updates and inserts, checked against the stored rows
//! - TSV export of tables and violations
//!
//! # Example
//!
//! ```rust,ignore
//! use termbase_schema::{compile, load_declarations};
//! use termbase_sqlite::{Dataset, Selection, SqliteConfig, TsvSource};
//!
//! let schema = compile(&load_declarations("schema/table.tsv")?)?;
//! let dataset = Dataset::open(schema, &SqliteConfig::from_url("sqlite://./build/termbase.db")?)?;
//!
//! let report = dataset.load(&TsvSource::new("schema"), &Selection::All)?;
//! println!("{}", report.counts());
//! ```

pub mod config;
pub mod edit;
pub mod error;
pub mod export;
pub mod loader;
pub mod source;
pub mod store;
pub mod types;

pub use config::{DatabasePath, JournalMode, SqliteConfig, SynchronousMode};
pub use edit::RowEdit;
pub use error::{StoreError, StoreResult};
pub use export::{write_table_tsv, write_violations_tsv};
pub use loader::{LevelCounts, LoadError, LoadReport, Loader, Selection, TableReport, TableStatus};
pub use source::{MemorySource, SourceReader, TsvSource};
pub use store::Dataset;
