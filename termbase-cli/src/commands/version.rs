//! `termbase version` command - Display version information.

use crate::error::CliResult;
use crate::output::{self, kv};

/// Package version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
const NAME: &str = env!("CARGO_PKG_NAME");

/// Run the version command
pub fn run() -> CliResult<()> {
    output::header("termbase");

    kv("Version", VERSION);
    kv("Binary", NAME);

    #[cfg(debug_assertions)]
    let build_mode = "debug";
    #[cfg(not(debug_assertions))]
    let build_mode = "release";

    kv("Build", build_mode);

    output::newline();

    output::section("Components");
    kv("termbase-schema", env!("CARGO_PKG_VERSION"));
    kv("termbase-query", env!("CARGO_PKG_VERSION"));
    kv("termbase-sqlite", env!("CARGO_PKG_VERSION"));

    output::newline();
    output::dim(env!("CARGO_PKG_REPOSITORY"));

    Ok(())
}
