//! Error types for declaration reading and schema compilation.

// Diagnostic fields are read through the derive macros.
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while reading declarations or compiling a schema.
///
/// Every variant is fatal to compilation and is raised before any table is
/// created or any row is read.
#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    /// Error reading a file.
    #[error("failed to read file: {path}")]
    #[diagnostic(code(termbase::schema::io_error))]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Syntax error in a condition or structure expression.
    #[error("syntax error in expression `{src}`: {message}")]
    #[diagnostic(code(termbase::schema::syntax_error))]
    SyntaxError {
        #[source_code]
        src: String,
        #[label("error here")]
        span: miette::SourceSpan,
        message: String,
    },

    /// A declaration sheet is missing a header or a required value.
    #[error("invalid declaration in `{path}` (line {line}): {message}")]
    #[diagnostic(code(termbase::schema::invalid_declaration))]
    InvalidDeclaration {
        path: String,
        line: usize,
        message: String,
    },

    /// A column (or nulltype) names a datatype that is not declared.
    #[error("unknown datatype `{datatype}` in `{table}.{column}`")]
    #[diagnostic(code(termbase::schema::unknown_datatype))]
    UnknownDatatype {
        table: String,
        column: String,
        datatype: String,
    },

    /// A datatype names a parent that is not declared.
    #[error("datatype `{datatype}` has unknown parent `{parent}`")]
    #[diagnostic(code(termbase::schema::unknown_parent))]
    UnknownParent { datatype: String, parent: String },

    /// The datatype parent chain contains a cycle.
    #[error("cyclic datatype hierarchy: {}", cycle.join(" -> "))]
    #[diagnostic(code(termbase::schema::cyclic_datatype))]
    CyclicDatatype { cycle: Vec<String> },

    /// A datatype condition could not be compiled.
    #[error("invalid condition `{condition}` for datatype `{datatype}`: {message}")]
    #[diagnostic(code(termbase::schema::invalid_condition))]
    InvalidCondition {
        datatype: String,
        condition: String,
        message: String,
    },

    /// A column is declared for a table that does not exist.
    #[error("column `{column}` declared for unknown table `{table}`")]
    #[diagnostic(code(termbase::schema::unknown_table))]
    UnknownTable { table: String, column: String },

    /// A foreign key targets an undeclared table or column.
    #[error("invalid foreign key `{table}.{column}` -> `{target}`: {message}")]
    #[diagnostic(code(termbase::schema::invalid_foreign_key))]
    InvalidForeignKey {
        table: String,
        column: String,
        target: String,
        message: String,
    },

    /// A structure annotation is not valid for its column.
    #[error("invalid structure on `{table}.{column}`: {message}")]
    #[diagnostic(code(termbase::schema::invalid_structure))]
    InvalidStructure {
        table: String,
        column: String,
        message: String,
    },

    /// A conditional rule is not valid.
    #[error("invalid rule for table `{table}`: {message}")]
    #[diagnostic(code(termbase::schema::invalid_rule))]
    InvalidRule { table: String, message: String },

    /// Duplicate definition.
    #[error("duplicate {kind} `{name}`")]
    #[diagnostic(code(termbase::schema::duplicate))]
    Duplicate { kind: String, name: String },

    /// A declared name collides with a name the store reserves.
    #[error("`{name}` is reserved: {message}")]
    #[diagnostic(code(termbase::schema::reserved_name))]
    ReservedName { name: String, message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    #[diagnostic(code(termbase::schema::config_error))]
    ConfigError { message: String },

    /// TOML parsing error.
    #[error("failed to parse TOML")]
    #[diagnostic(code(termbase::schema::toml_error))]
    TomlError {
        #[source]
        source: toml::de::Error,
    },

    /// Compilation failed with multiple issues.
    #[error("schema compilation failed with {count} error(s)")]
    #[diagnostic(code(termbase::schema::validation_failed))]
    ValidationFailed {
        count: usize,
        #[related]
        errors: Vec<SchemaError>,
    },
}

impl SchemaError {
    /// Create a syntax error with source location.
    pub fn syntax(
        src: impl Into<String>,
        offset: usize,
        len: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::SyntaxError {
            src: src.into(),
            span: (offset, len).into(),
            message: message.into(),
        }
    }

    /// Create an invalid declaration error.
    pub fn declaration(path: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::InvalidDeclaration {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Create an unknown datatype error.
    pub fn unknown_datatype(
        table: impl Into<String>,
        column: impl Into<String>,
        datatype: impl Into<String>,
    ) -> Self {
        Self::UnknownDatatype {
            table: table.into(),
            column: column.into(),
            datatype: datatype.into(),
        }
    }

    /// Create an invalid structure error.
    pub fn invalid_structure(
        table: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidStructure {
            table: table.into(),
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an invalid foreign key error.
    pub fn invalid_foreign_key(
        table: impl Into<String>,
        column: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidForeignKey {
            table: table.into(),
            column: column.into(),
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate definition error.
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a reserved name error.
    pub fn reserved(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReservedName {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Combine collected errors: a single error is returned as is, several are
    /// wrapped in `ValidationFailed`.
    pub fn collect(mut errors: Vec<SchemaError>) -> Self {
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            Self::ValidationFailed {
                count: errors.len(),
                errors,
            }
        }
    }

    /// Flatten a `ValidationFailed` into its individual errors.
    pub fn into_errors(self) -> Vec<SchemaError> {
        match self {
            Self::ValidationFailed { errors, .. } => errors,
            other => vec![other],
        }
    }
}
