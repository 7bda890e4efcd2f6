//! `termbase values` command - List the values a column accepts.

use serde_json::{Value, json};
use termbase_schema::TermbaseConfig;

use crate::cli::{OutputFormat, ValuesArgs};
use crate::config;
use crate::error::{CliError, CliResult};

/// Run the values command
pub fn run(config: &TermbaseConfig, args: ValuesArgs) -> CliResult<()> {
    let dataset = config::open_dataset(config, &args.dataset)?;
    let values = dataset.matching_values(
        &args.table,
        &args.column,
        args.matching.as_deref().unwrap_or(""),
    )?;

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&typeahead(&values))
                .map_err(|e| CliError::Command(format!("Failed to serialize values: {}", e)))?;
            println!("{}", json);
        }
        OutputFormat::Table | OutputFormat::Tsv => {
            for value in &values {
                println!("{}", value);
            }
        }
    }
    Ok(())
}

/// Typeahead entries, numbered from 1.
fn typeahead(values: &[String]) -> Value {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| json!({ "id": value, "label": value, "order": i + 1 }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typeahead() {
        let values = vec!["female".to_string(), "male".to_string()];
        assert_eq!(
            typeahead(&values),
            json!([
                { "id": "female", "label": "female", "order": 1 },
                { "id": "male", "label": "male", "order": 2 }
            ])
        );
        assert_eq!(typeahead(&[]), json!([]));
    }
}
