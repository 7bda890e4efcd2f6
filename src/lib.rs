//! # termbase
//!
//! Compile, load, validate and query tabular controlled vocabularies.
//!
//! termbase provides:
//! - Declaration sheets (tables, columns, datatypes, prefixes, rules) compiled
//!   into a relational schema
//! - Cell-by-cell validation with located, levelled violations
//! - A SQLite store with conflict tables for rows that break a key
//! - A parameterized query interface with per-cell violations
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use termbase::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let schema = compile(&load_declarations("src/table.tsv")?)?;
//!     let source = TsvSource::new(&schema.base_dir);
//!     let dataset = Dataset::open(schema, &SqliteConfig::from_url("sqlite://build/termbase.db")?)?;
//!
//!     let report = dataset.load(&source, &Selection::All)?;
//!     println!("{}", report.counts());
//!
//!     let request = QueryRequest::from_params(
//!         "subject",
//!         [("age", "gte.18"), ("order", "age.desc"), ("limit", "2")],
//!     )?;
//!     for row in dataset.query(&request)?.rows {
//!         println!("{} {:?}", row.row_number, row.values);
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Declarations, schema compilation and row validation.
pub mod schema {
    pub use termbase_schema::*;
}

/// Request parsing and SQL planning.
pub mod query {
    pub use termbase_query::*;
}

/// The SQLite store and loader.
pub mod store {
    pub use termbase_sqlite::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::query::{QueryError, QueryRequest, ResultRow, ResultSet};
    pub use crate::schema::{
        CompiledSchema, Declarations, Level, SchemaError, TermbaseConfig, Violation,
        ViolationRule, compile, load_declarations,
    };
    pub use crate::store::{
        Dataset, LoadError, LoadReport, MemorySource, RowEdit, Selection, SqliteConfig, TsvSource,
    };
}

// Re-export key types at the crate root
pub use query::{QueryError, QueryRequest, ResultSet};
pub use schema::{CompiledSchema, SchemaError, Violation};
pub use store::{Dataset, LoadReport};
