//! CLI configuration handling.

use std::path::{Path, PathBuf};

use termbase_schema::{CompiledSchema, TermbaseConfig, compile, load_declarations};
use termbase_sqlite::{Dataset, SqliteConfig};
use tracing::debug;

use crate::cli::DatasetArgs;
use crate::error::{CliError, CliResult};

/// Default config file name (lives in project root)
pub const CONFIG_FILE_NAME: &str = "termbase.toml";

/// Load the configuration.
///
/// An explicit path must exist. Without one, `./termbase.toml` is used when
/// present and the defaults otherwise.
pub fn load_config(path: Option<&Path>, env: Option<&str>) -> CliResult<TermbaseConfig> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            TermbaseConfig::from_file(path)?
        }
        None => {
            let default = std::env::current_dir()?.join(CONFIG_FILE_NAME);
            if default.exists() {
                TermbaseConfig::from_file(&default)?
            } else {
                debug!("No {} found, using defaults", CONFIG_FILE_NAME);
                TermbaseConfig::default()
            }
        }
    };

    Ok(match env {
        Some(env) => config.with_environment(env),
        None => config,
    })
}

/// The table sheet to read: the command line wins over the config. The
/// sheet must exist.
pub fn table_sheet(config: &TermbaseConfig, overridden: Option<&Path>) -> CliResult<PathBuf> {
    let path = overridden
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.dataset.table.clone());
    if !path.exists() {
        return Err(CliError::Config(format!(
            "Table sheet not found: {}",
            path.display()
        )));
    }
    Ok(path)
}

/// Read and compile the declarations.
pub fn load_schema(config: &TermbaseConfig, overridden: Option<&Path>) -> CliResult<CompiledSchema> {
    let path = table_sheet(config, overridden)?;
    Ok(compile(&load_declarations(&path)?)?)
}

/// Compile the declarations and open the store.
pub fn open_dataset(config: &TermbaseConfig, args: &DatasetArgs) -> CliResult<Dataset> {
    let schema = load_schema(config, args.table_sheet.as_deref())?;
    let dataset = match &args.database {
        Some(url) => Dataset::open(schema, &SqliteConfig::from_url(url)?)?
            .with_options((&config.query).into())
            .with_sql_logging(config.debug.log_sql),
        None => Dataset::from_config(schema, config)?,
    };
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("missing.toml")), None).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_load_config_with_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"
[dataset]
table = "schema/table.tsv"

[database]
path = "build/dev.db"

[environments.test.database]
path = ":memory:"
"#,
        )
        .unwrap();

        let config = load_config(Some(&path), None).unwrap();
        assert_eq!(config.dataset.table, dir.path().join("schema/table.tsv"));

        let config = load_config(Some(&path), Some("test")).unwrap();
        assert_eq!(config.database.path, ":memory:");
    }

    #[test]
    fn test_table_sheet_override() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = dir.path().join("table.tsv");
        fs::write(&sheet, "table\tpath\ttype\n").unwrap();

        let config = TermbaseConfig::default();
        assert_eq!(table_sheet(&config, Some(&sheet)).unwrap(), sheet);
    }

    #[test]
    fn test_missing_table_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let config = TermbaseConfig::default();
        let err = load_schema(&config, Some(&dir.path().join("table.tsv"))).unwrap_err();
        assert!(err.to_string().contains("Table sheet not found"));
    }
}
