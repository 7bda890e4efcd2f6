//! Where table source text comes from.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use termbase_schema::CompiledTable;

/// Supplies the TSV text of each data table.
pub trait SourceReader {
    /// Read the whole source of `table`.
    fn read(&self, table: &CompiledTable) -> io::Result<String>;

    /// Human-readable location of `table`'s source, for errors.
    fn location(&self, table: &CompiledTable) -> String;
}

/// Reads `table.path` from disk, relative to a base directory.
#[derive(Debug, Clone)]
pub struct TsvSource {
    base_dir: PathBuf,
}

impl TsvSource {
    /// Resolve relative table paths against `base_dir` (usually the
    /// directory of the table sheet).
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn path_of(&self, table: &CompiledTable) -> PathBuf {
        let path = Path::new(&table.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

impl SourceReader for TsvSource {
    fn read(&self, table: &CompiledTable) -> io::Result<String> {
        std::fs::read_to_string(self.path_of(table))
    }

    fn location(&self, table: &CompiledTable) -> String {
        self.path_of(table).display().to_string()
    }
}

/// In-memory sources keyed by table name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the text of one table.
    pub fn table(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.tables.insert(name.into(), text.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.tables.insert(name.into(), text.into());
    }
}

impl SourceReader for MemorySource {
    fn read(&self, table: &CompiledTable) -> io::Result<String> {
        self.tables.get(table.name.as_str()).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no source for table `{}`", table.name),
            )
        })
    }

    fn location(&self, table: &CompiledTable) -> String {
        format!("memory:{}", table.name)
    }
}
