//! `termbase load` command - Load and validate source tables.

use termbase_schema::TermbaseConfig;
use termbase_sqlite::{LoadReport, Selection, TableStatus, TsvSource};

use crate::cli::LoadArgs;
use crate::config;
use crate::error::{CliError, CliResult};
use crate::output::{self, kv, success, warn};

/// Run the load command
pub fn run(config: &TermbaseConfig, args: LoadArgs) -> CliResult<()> {
    output::header("Load Dataset");

    let dataset = config::open_dataset(config, &args.dataset)?;
    let source = TsvSource::new(dataset.schema().base_dir.clone());
    kv("Sources", &dataset.schema().base_dir.display().to_string());
    kv(
        "Database",
        args.dataset.database.as_deref().unwrap_or(&config.database.path),
    );
    output::newline();

    let report = dataset.load(&source, &Selection::tables(args.tables))?;
    print_report(&report);

    if args.strict && !report.is_clean() {
        return Err(CliError::Validation(format!(
            "{} table(s) failed, {}",
            report.failed().count(),
            report.counts()
        )));
    }

    output::newline();
    success("Load complete");
    Ok(())
}

fn print_report(report: &LoadReport) {
    output::section("Tables");
    for table in &report.tables {
        match &table.status {
            TableStatus::Loaded => output::list_item(&format!(
                "{}: {} row(s), {} conflict row(s), {}",
                table.table, table.rows, table.conflict_rows, table.counts
            )),
            TableStatus::Failed(e) => output::list_item(&format!(
                "{}: {}",
                table.table,
                output::style_error(&e.to_string())
            )),
        }
    }

    output::newline();
    output::section("Violations");
    let counts = report.counts();
    kv("Errors", &counts.error.to_string());
    kv("Warnings", &counts.warning.to_string());
    kv("Info", &counts.info.to_string());

    let failed = report.failed().count();
    if failed > 0 {
        output::newline();
        warn(&format!("{} table(s) failed to load", failed));
    }
}
