//! `termbase export` command - Write violations or table rows as TSV.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use termbase_schema::TermbaseConfig;
use termbase_sqlite::{write_table_tsv, write_violations_tsv};

use crate::cli::{ExportArgs, ExportSubcommand, ExportTableArgs, ExportViolationsArgs};
use crate::config;
use crate::error::{CliError, CliResult};
use crate::output;

/// Run the export command
pub fn run(config: &TermbaseConfig, args: ExportArgs) -> CliResult<()> {
    match args.command {
        ExportSubcommand::Violations(args) => violations(config, args),
        ExportSubcommand::Table(args) => table(config, args),
    }
}

fn violations(config: &TermbaseConfig, args: ExportViolationsArgs) -> CliResult<()> {
    let dataset = config::open_dataset(config, &args.dataset)?;
    if let Some(table) = &args.table {
        if dataset.schema().table(table).is_none() {
            return Err(CliError::Command(format!("Unknown table `{}`", table)));
        }
    }

    let found = dataset.violations(args.table.as_deref())?;
    let mut out = open_output(args.output.as_deref())?;
    write_violations_tsv(&mut out, &found)?;
    out.flush()?;

    if let Some(path) = &args.output {
        output::success(&format!(
            "Wrote {} violation(s) to {}",
            found.len(),
            path.display()
        ));
    }
    Ok(())
}

fn table(config: &TermbaseConfig, args: ExportTableArgs) -> CliResult<()> {
    let dataset = config::open_dataset(config, &args.dataset)?;
    let mut out = open_output(args.output.as_deref())?;
    let rows = write_table_tsv(&dataset, &args.table, &mut out)?;
    out.flush()?;

    if let Some(path) = &args.output {
        output::success(&format!("Wrote {} row(s) to {}", rows, path.display()));
    }
    Ok(())
}

/// A buffered writer for `path`, or stdout.
fn open_output(path: Option<&Path>) -> CliResult<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Box::new(BufWriter::new(File::create(path)?))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}
