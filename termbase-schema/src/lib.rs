//! # termbase-schema
//!
//! Declarations, schema compilation and row validation for termbase.
//!
//! This crate provides:
//! - Readers for the tab-separated declaration sheets (tables, columns,
//!   datatypes, prefixes, rules)
//! - A pest grammar for condition and structure expressions
//! - The datatype registry and the schema compiler producing per-table DDL
//! - The row validator and the deferred foreign-key, tree and under checks
//! - Configuration parser for `termbase.toml` files
//!
//! ## Example
//!
//! ```rust,ignore
//! use termbase_schema::{compile, load_declarations, TableValidator};
//!
//! let decls = load_declarations("src/table.tsv")?;
//! let schema = compile(&decls)?;
//!
//! let table = schema.table("subject").unwrap();
//! let mut validator = TableValidator::new(&schema, table);
//! let violations = validator.validate(1, &["1".into(), "-5".into()]);
//! ```

pub mod ast;
pub mod compiler;
pub mod condition;
pub mod config;
pub mod error;
pub mod parser;
pub mod registry;
pub mod validator;

pub use ast::*;
pub use compiler::{
    CompiledColumn, CompiledRule, CompiledSchema, CompiledTable, ForeignKey, RuleCondition,
    TreeConstraint, UnderConstraint, compile, compile_parts, quote_ident,
};
pub use condition::Condition;
pub use config::TermbaseConfig;
pub use error::{SchemaError, SchemaResult};
pub use parser::{DeclarationSheets, load_declarations, parse_condition, parse_declarations, parse_structure};
pub use registry::{CompiledDatatype, DatatypeRegistry, Predicate};
pub use validator::{ColumnValues, TableValidator, Violation, ViolationRule};
