//! Declaration records for a termbase dataset.
//!
//! These are the typed forms of the declaration sheets: tables, columns,
//! datatypes, prefixes and conditional rules, plus the parsed expressions
//! used in condition and structure cells.

mod column;
mod datatype;
mod declarations;
mod expression;
mod rule;
mod structure;
mod table;
mod types;

pub use column::*;
pub use datatype::*;
pub use declarations::*;
pub use expression::*;
pub use rule::*;
pub use structure::*;
pub use table::*;
pub use types::*;
