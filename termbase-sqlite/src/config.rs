//! Where a dataset is stored and how its connection is tuned.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use termbase_schema::config::{DatabaseConfig, MEMORY_PATH};

use crate::error::{StoreError, StoreResult};

/// Store location and connection pragmas.
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteConfig {
    pub path: DatabasePath,
    /// Milliseconds a locked database is retried before failing.
    pub busy_timeout_ms: u64,
    pub synchronous: SynchronousMode,
    pub journal_mode: JournalMode,
}

/// Where the database lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabasePath {
    #[default]
    Memory,
    File(PathBuf),
}

impl DatabasePath {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Memory => MEMORY_PATH,
            Self::File(path) => path.to_str().unwrap_or(MEMORY_PATH),
        }
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

/// `PRAGMA synchronous` setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SynchronousMode {
    Off,
    #[default]
    Normal,
    Full,
}

impl FromStr for SynchronousMode {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "normal" => Ok(Self::Normal),
            "full" => Ok(Self::Full),
            _ => Err(StoreError::config(format!("unknown synchronous mode `{}`", s))),
        }
    }
}

impl fmt::Display for SynchronousMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "OFF",
            Self::Normal => "NORMAL",
            Self::Full => "FULL",
        })
    }
}

/// `PRAGMA journal_mode` setting. Only applied to file databases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JournalMode {
    Delete,
    #[default]
    Wal,
    Memory,
    Off,
}

impl FromStr for JournalMode {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "delete" => Ok(Self::Delete),
            "wal" => Ok(Self::Wal),
            "memory" => Ok(Self::Memory),
            "off" => Ok(Self::Off),
            _ => Err(StoreError::config(format!("unknown journal mode `{}`", s))),
        }
    }
}

impl fmt::Display for JournalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Delete => "DELETE",
            Self::Wal => "WAL",
            Self::Memory => "MEMORY",
            Self::Off => "OFF",
        })
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: DatabasePath::Memory,
            busy_timeout_ms: 5000,
            synchronous: SynchronousMode::Normal,
            journal_mode: JournalMode::Wal,
        }
    }
}

impl SqliteConfig {
    /// A scratch dataset that disappears with its connection.
    pub fn memory() -> Self {
        Self::default()
    }

    /// A dataset stored at `path`. Missing parent directories are created
    /// when the store is opened.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: DatabasePath::File(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Parse a database location.
    ///
    /// Accepts `sqlite::memory:`, `:memory:`, `sqlite://path`, `sqlite:path`,
    /// `file:path` and bare paths, optionally followed by
    /// `?busy_timeout=..&synchronous=..&journal_mode=..`.
    pub fn from_url(url: impl AsRef<str>) -> StoreResult<Self> {
        let url = url.as_ref().trim();
        let (location, query) = url.split_once('?').unwrap_or((url, ""));

        let path = ["sqlite://", "sqlite:", "file:"]
            .iter()
            .find_map(|scheme| location.strip_prefix(*scheme))
            .unwrap_or(location);

        let mut config = match path {
            MEMORY_PATH => Self::memory(),
            "" => {
                return Err(StoreError::config(format!(
                    "database path is required in `{}`",
                    url
                )));
            }
            path => Self::file(path),
        };

        for (key, value) in query.split('&').filter_map(|pair| pair.split_once('=')) {
            match key {
                "mode" if value == "memory" => config.path = DatabasePath::Memory,
                "busy_timeout" => {
                    config.busy_timeout_ms = value.parse().map_err(|_| {
                        StoreError::config(format!("invalid busy_timeout `{}`", value))
                    })?;
                }
                "synchronous" => config.synchronous = value.parse()?,
                "journal_mode" => config.journal_mode = value.parse()?,
                _ => {}
            }
        }

        Ok(config)
    }

    /// Build a configuration from the `[database]` section of `termbase.toml`.
    pub fn from_database_config(database: &DatabaseConfig) -> StoreResult<Self> {
        Ok(Self {
            journal_mode: database.journal_mode.parse()?,
            synchronous: database.synchronous.parse()?,
            busy_timeout_ms: database.busy_timeout_ms,
            ..Self::from_url(&database.path)?
        })
    }

    pub fn path_str(&self) -> &str {
        self.path.as_str()
    }

    /// Pragmas run on the connection right after it opens.
    pub fn init_sql(&self) -> String {
        let mut pragmas = Vec::with_capacity(3);
        if !self.path.is_memory() {
            pragmas.push(format!("PRAGMA journal_mode = {};", self.journal_mode));
        }
        pragmas.push(format!("PRAGMA synchronous = {};", self.synchronous));
        pragmas.push(format!("PRAGMA busy_timeout = {};", self.busy_timeout_ms));
        pragmas.join("\n")
    }

    pub fn busy_timeout(mut self, ms: u64) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    pub fn synchronous(mut self, mode: SynchronousMode) -> Self {
        self.synchronous = mode;
        self
    }

    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }
}
