//! `termbase query` command - Query a loaded table.

use termbase_query::{QueryRequest, ResultSet};
use termbase_schema::TermbaseConfig;

use crate::cli::{OutputFormat, QueryArgs};
use crate::config;
use crate::error::{CliError, CliResult};
use crate::output;

/// Run the query command
pub fn run(config: &TermbaseConfig, args: QueryArgs) -> CliResult<()> {
    let params = parse_params(&args.params)?;
    let request = QueryRequest::from_params(args.table.as_str(), params)?;

    let dataset = config::open_dataset(config, &args.dataset)?;
    let result = dataset.query(&request)?;

    match args.format {
        OutputFormat::Table => {
            output::result_table(&result);
            output::newline();
            output::dim(&summary(&result));
        }
        OutputFormat::Tsv => output::result_tsv(&result),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)
                .map_err(|e| CliError::Command(format!("Failed to serialize result: {}", e)))?;
            println!("{}", json);
        }
    }

    Ok(())
}

/// Split `KEY=VALUE` arguments. Only the first `=` separates.
pub fn parse_params(raw: &[String]) -> CliResult<Vec<(&str, &str)>> {
    raw.iter()
        .map(|param| {
            param.split_once('=').ok_or_else(|| {
                CliError::Command(format!(
                    "Invalid parameter `{}`: expected KEY=VALUE",
                    param
                ))
            })
        })
        .collect()
}

fn summary(result: &ResultSet) -> String {
    if result.is_empty() {
        return format!("No rows returned ({} matching)", result.total);
    }
    let first = result.offset + 1;
    let last = result.offset + result.len();
    let mut text = format!("Rows {}-{} of {}", first, last, result.total);
    if result.has_more() {
        text.push_str(&format!(" (next: offset={})", last));
    }
    text
}
