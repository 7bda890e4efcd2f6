//! CLI command implementations.

pub mod check;
pub mod export;
pub mod load;
pub mod query;
pub mod values;
pub mod version;
