//! termbase CLI - Command-line interface for termbase datasets.

use clap::Parser;

use termbase_cli::cli::{Cli, Command};
use termbase_cli::commands;
use termbase_cli::config::load_config;
use termbase_cli::error::{CliError, CliResult};
use termbase_cli::output;

fn main() {
    // Run the CLI and handle errors
    if let Err(e) = run() {
        output::newline();
        output::error(&e.to_string());
        if let CliError::Schema(termbase_schema::SchemaError::ValidationFailed { errors, .. }) = &e {
            for error in errors {
                output::list_item(&error.to_string());
            }
        }
        std::process::exit(1);
    }
}

fn run() -> CliResult<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    if cli.verbose {
        termbase_query::logging::init_with_level("debug");
    } else {
        termbase_query::logging::init();
    }

    if let Command::Version = cli.command {
        return commands::version::run();
    }

    let config = load_config(cli.config.as_deref(), cli.env.as_deref())?;

    // Run the appropriate command
    match cli.command {
        Command::Check(args) => commands::check::run(&config, args),
        Command::Load(args) => commands::load::run(&config, args),
        Command::Query(args) => commands::query::run(&config, args),
        Command::Export(args) => commands::export::run(&config, args),
        Command::Values(args) => commands::values::run(&config, args),
        Command::Version => commands::version::run(),
    }
}
