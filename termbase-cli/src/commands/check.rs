//! `termbase check` command - Compile the declarations.

use termbase_schema::{TermbaseConfig, compile, load_declarations};

use crate::cli::CheckArgs;
use crate::config;
use crate::error::{CliError, CliResult};
use crate::output::{self, kv, success};

/// Run the check command
pub fn run(config: &TermbaseConfig, args: CheckArgs) -> CliResult<()> {
    output::header("Check Declarations");

    let path = config::table_sheet(config, args.table_sheet.as_deref())?;
    kv("Table sheet", &path.display().to_string());
    output::newline();

    output::step(1, 2, "Reading declarations...");
    let decls = load_declarations(&path)?;

    output::step(2, 2, "Compiling schema...");
    let schema = match compile(&decls) {
        Ok(schema) => schema,
        Err(e) => {
            let errors = e.into_errors();
            output::newline();
            output::error("Schema compilation failed!");
            output::newline();
            output::section("Errors");
            for error in &errors {
                output::list_item(&error.to_string());
            }
            return Err(CliError::Validation(format!(
                "Found {} schema error(s)",
                errors.len()
            )));
        }
    };

    output::newline();
    success("Declarations are valid!");
    output::newline();

    output::section("Schema Summary");
    kv("Tables", &schema.tables.len().to_string());
    let columns: usize = schema.tables.values().map(|t| t.columns.len()).sum();
    kv("Columns", &columns.to_string());
    kv("Datatypes", &schema.registry.len().to_string());
    let foreign_keys: usize = schema.tables.values().map(|t| t.foreign_keys.len()).sum();
    kv("Foreign keys", &foreign_keys.to_string());
    let trees: usize = schema.tables.values().map(|t| t.trees.len()).sum();
    kv("Trees", &trees.to_string());
    let rules: usize = schema.tables.values().map(|t| t.rules.len()).sum();
    kv("Rules", &rules.to_string());
    kv("Prefixes", &schema.prefixes.len().to_string());

    Ok(())
}
