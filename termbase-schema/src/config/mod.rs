//! Configuration file parsing for `termbase.toml`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::{SchemaError, SchemaResult};

/// Main configuration structure for `termbase.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TermbaseConfig {
    /// Declaration settings.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Store settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Query defaults.
    #[serde(default)]
    pub query: QueryConfig,

    /// Debug/logging settings.
    #[serde(default)]
    pub debug: DebugConfig,

    /// Environment-specific overrides.
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentOverride>,
}

impl TermbaseConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        let mut config = Self::from_str(&content)?;
        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> SchemaResult<Self> {
        let expanded = expand_env_vars(content)?;
        let config: Self =
            toml::from_str(&expanded).map_err(|e| SchemaError::TomlError { source: e })?;
        config.check()?;
        Ok(config)
    }

    /// Apply environment-specific overrides.
    pub fn with_environment(mut self, env: &str) -> Self {
        if let Some(overrides) = self.environments.remove(env) {
            if let Some(db) = overrides.database {
                if let Some(path) = db.path {
                    self.database.path = path;
                }
                if let Some(journal_mode) = db.journal_mode {
                    self.database.journal_mode = journal_mode;
                }
            }
            if let Some(debug) = overrides.debug {
                if let Some(log_sql) = debug.log_sql {
                    self.debug.log_sql = log_sql;
                }
            }
        }
        self
    }

    /// Make relative paths relative to the directory holding the config file.
    fn resolve_paths(&mut self, dir: &Path) {
        if self.dataset.table.is_relative() {
            self.dataset.table = dir.join(&self.dataset.table);
        }
        if self.database.path != MEMORY_PATH && Path::new(&self.database.path).is_relative() {
            self.database.path = dir.join(&self.database.path).display().to_string();
        }
    }

    fn check(&self) -> SchemaResult<()> {
        if self.query.default_limit > self.query.max_limit {
            return Err(SchemaError::ConfigError {
                message: format!(
                    "query.default_limit ({}) exceeds query.max_limit ({})",
                    self.query.default_limit, self.query.max_limit
                ),
            });
        }
        Ok(())
    }
}

/// Declaration settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    /// Path to the table sheet; the other sheets are found through it.
    #[serde(default = "default_table_sheet")]
    pub table: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            table: default_table_sheet(),
        }
    }
}

fn default_table_sheet() -> PathBuf {
    PathBuf::from("src/table.tsv")
}

/// Path that selects an in-memory store.
pub const MEMORY_PATH: &str = ":memory:";

/// Store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database file (supports `${ENV_VAR}` interpolation).
    #[serde(default = "default_database_path")]
    pub path: String,

    /// SQLite journal mode.
    #[serde(default = "default_journal_mode")]
    pub journal_mode: String,

    /// SQLite synchronous setting.
    #[serde(default = "default_synchronous")]
    pub synchronous: String,

    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            journal_mode: default_journal_mode(),
            synchronous: default_synchronous(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

fn default_database_path() -> String { "build/termbase.db".to_string() }
fn default_journal_mode() -> String { "wal".to_string() }
fn default_synchronous() -> String { "normal".to_string() }
fn default_busy_timeout() -> u64 { 5000 }

/// Query defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Limit applied when a request names none.
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Largest limit a request may ask for.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_limit() -> usize { 100 }
fn default_max_limit() -> usize { 10_000 }

/// Debug/logging configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    /// Log every SQL statement at debug level.
    #[serde(default)]
    pub log_sql: bool,
}

/// Environment-specific configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentOverride {
    /// Database overrides.
    pub database: Option<DatabaseOverride>,

    /// Debug overrides.
    pub debug: Option<DebugOverride>,
}

/// Database configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseOverride {
    pub path: Option<String>,
    pub journal_mode: Option<String>,
}

/// Debug configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugOverride {
    pub log_sql: Option<bool>,
}

fn env_var_pattern() -> SchemaResult<&'static regex_lite::Regex> {
    static PATTERN: OnceLock<regex_lite::Regex> = OnceLock::new();
    if let Some(re) = PATTERN.get() {
        return Ok(re);
    }
    let re = regex_lite::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| {
        SchemaError::ConfigError {
            message: format!("invalid variable pattern: {}", e),
        }
    })?;
    Ok(PATTERN.get_or_init(|| re))
}

/// Expand environment variables in the format `${VAR_NAME}`.
///
/// Unset variables are left as written.
fn expand_env_vars(content: &str) -> SchemaResult<String> {
    Ok(env_var_pattern()?
        .replace_all(content, |caps: &regex_lite::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned())
}
