//! Pest grammar for condition and structure expressions.

use pest_derive::Parser;

/// The expression parser.
#[derive(Parser)]
#[grammar = "parser/condition.pest"]
pub struct ExpressionParser;
