//! Logging bootstrap for termbase.
//!
//! Output is controlled by environment variables:
//!
//! - `TERMBASE_DEBUG=true|1|yes` - enable debug logging
//! - `TERMBASE_LOG_LEVEL=trace|debug|info|warn|error` - set a specific level
//! - `TERMBASE_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! ```rust,no_run
//! use termbase_query::logging;
//!
//! logging::init();
//! ```
//!
//! Library code uses the `tracing` macros directly:
//!
//! ```rust,ignore
//! debug!(sql = %sql, "Executing query");
//! info!(table = %table, rows = n, "Loaded table");
//! warn!(table = %table, error = %e, "Table failed to load");
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

const DEBUG_VAR: &str = "TERMBASE_DEBUG";
const LEVEL_VAR: &str = "TERMBASE_LOG_LEVEL";
const FORMAT_VAR: &str = "TERMBASE_LOG_FORMAT";

/// Crates whose events pass the filter.
const TARGETS: [&str; 5] = [
    "termbase",
    "termbase_query",
    "termbase_schema",
    "termbase_sqlite",
    "termbase_cli",
];

/// Check if `TERMBASE_DEBUG` is set to "true", "1" or "yes" (case-insensitive).
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var(DEBUG_VAR)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn parse_level(level: &str) -> Option<&'static str> {
    match level.to_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

/// The configured log level.
///
/// Defaults to "debug" if `TERMBASE_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    env::var(LEVEL_VAR)
        .ok()
        .and_then(|l| parse_level(&l))
        .unwrap_or(if is_debug_enabled() { "debug" } else { "warn" })
}

/// The configured log format, "json" unless overridden.
pub fn get_log_format() -> &'static str {
    env::var(FORMAT_VAR)
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Filter directive covering every termbase crate at `level`.
pub fn filter_directive(level: &str) -> String {
    TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize logging from the environment.
///
/// Subsequent calls are no-ops. Nothing is installed unless
/// `TERMBASE_DEBUG` or `TERMBASE_LOG_LEVEL` is set.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var(LEVEL_VAR).is_err() {
            return;
        }
        install(get_log_level());
    });
}

/// Initialize logging at `level`, ignoring the environment's level.
///
/// Used by the CLI's `--verbose` flag. Subsequent calls are no-ops.
pub fn init_with_level(level: &str) {
    INIT.call_once(|| {
        install(parse_level(level).unwrap_or("warn"));
    });
}

#[cfg(feature = "tracing-subscriber")]
fn install(level: &'static str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_new(filter_directive(level)).unwrap_or_else(|_| EnvFilter::new("warn"));

    // try_init: a host application may already own the global subscriber.
    let installed = match get_log_format() {
        "json" => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        "compact" => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    };

    if installed.is_ok() {
        tracing::info!(level = level, format = get_log_format(), "Logging initialized");
    }
}

#[cfg(not(feature = "tracing-subscriber"))]
fn install(_level: &'static str) {
    // Without the subscriber feature events go to whatever the host installs.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Some("debug"));
        assert_eq!(parse_level("warning"), Some("warn"));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn test_filter_directive() {
        let directive = filter_directive("info");
        assert!(directive.starts_with("termbase=info,"));
        assert!(directive.contains("termbase_sqlite=info"));
        assert_eq!(directive.split(',').count(), TARGETS.len());
    }
}
