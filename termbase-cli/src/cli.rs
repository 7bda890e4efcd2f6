//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// termbase - Compile, load and query tabular vocabularies
#[derive(Parser, Debug)]
#[command(name = "termbase")]
#[command(version)]
#[command(about = "termbase - Compile, load and query tabular vocabularies", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file (defaults to ./termbase.toml if present)
    #[arg(short, long, global = true, env = "TERMBASE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Configuration environment to apply
    #[arg(short, long, global = true, env = "TERMBASE_ENV")]
    pub env: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile the declarations and report schema errors
    Check(CheckArgs),

    /// Load source tables into the store and validate them
    Load(LoadArgs),

    /// Query a loaded table
    Query(QueryArgs),

    /// Export violations or table rows as TSV
    Export(ExportArgs),

    /// List the values a column accepts
    Values(ValuesArgs),

    /// Display version information
    Version,
}

/// Where the declarations and the store are found
#[derive(Args, Debug, Clone, Default)]
pub struct DatasetArgs {
    /// Path to the table sheet (overrides `dataset.table`)
    #[arg(short, long)]
    pub table_sheet: Option<PathBuf>,

    /// Database URL or path (overrides `database.path`)
    #[arg(short, long)]
    pub database: Option<String>,
}

// =============================================================================
// Check Command
// =============================================================================

/// Arguments for the `check` command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the table sheet (overrides `dataset.table`)
    #[arg(short, long)]
    pub table_sheet: Option<PathBuf>,
}

// =============================================================================
// Load Command
// =============================================================================

/// Arguments for the `load` command
#[derive(Args, Debug)]
pub struct LoadArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Tables to load (all data tables when omitted)
    pub tables: Vec<String>,

    /// Exit with an error if any table fails or any error violation is found
    #[arg(long)]
    pub strict: bool,
}

// =============================================================================
// Query Command
// =============================================================================

/// Arguments for the `query` command
#[derive(Args, Debug)]
pub struct QueryArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Table to query
    pub table: String,

    /// Request parameters as KEY=VALUE (e.g. age=gte.18 order=age.desc limit=10)
    pub params: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// How query results are printed
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Tsv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Tsv => write!(f, "tsv"),
        }
    }
}

// =============================================================================
// Export Command
// =============================================================================

/// Arguments for the `export` command
#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(subcommand)]
    pub command: ExportSubcommand,
}

/// Export subcommands
#[derive(Subcommand, Debug)]
pub enum ExportSubcommand {
    /// Export stored violations
    Violations(ExportViolationsArgs),

    /// Export the stored rows of one table
    Table(ExportTableArgs),
}

/// Arguments for `export violations`
#[derive(Args, Debug)]
pub struct ExportViolationsArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Only export violations of this table
    #[arg(long = "for")]
    pub table: Option<String>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for `export table`
#[derive(Args, Debug)]
pub struct ExportTableArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Table to export
    pub table: String,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

// =============================================================================
// Values Command
// =============================================================================

/// Arguments for the `values` command
#[derive(Args, Debug)]
pub struct ValuesArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Table of the column
    pub table: String,

    /// Column to list values for
    pub column: String,

    /// Only list values containing this text (case-insensitive)
    pub matching: Option<String>,

    /// Output format (`json` prints id/label/order objects)
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}
