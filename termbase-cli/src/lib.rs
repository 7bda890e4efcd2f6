//! termbase CLI - Command-line interface for termbase datasets.
//!
//! This crate provides the `termbase` tool: checking declarations, loading
//! and validating source tables, querying the store and exporting results.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
