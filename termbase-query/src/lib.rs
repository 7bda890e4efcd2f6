//! # termbase-query
//!
//! Request parsing and SQL planning for termbase datasets.
//!
//! A request is a table name plus a flat parameter map, the shape a CLI or
//! an HTTP query string produces. Every table and column it names is checked
//! against the [`CompiledSchema`](termbase_schema::CompiledSchema) before any
//! SQL is built; values only ever reach the store as bound parameters.
//!
//! ## Requests
//!
//! ```rust
//! use termbase_query::{Operator, QueryRequest};
//!
//! let request = QueryRequest::from_params(
//!     "subject",
//!     [("age", "gte.18"), ("order", "age.desc"), ("limit", "2")],
//! )
//! .unwrap();
//!
//! assert_eq!(request.filters[0].operator, Operator::Gte);
//! assert_eq!(request.limit, Some(2));
//! ```
//!
//! Reserved keys are `select`, `order`, `limit`, `offset` and `violations`.
//! Every other key is a column clause written `operator.operand`:
//!
//! | operator | meaning |
//! |---|---|
//! | `eq`, `neq` | equality |
//! | `gt`, `gte`, `lt`, `lte` | numeric comparison (numeric columns only) |
//! | `like` | substring, or `*` wildcard pattern (text columns only) |
//! | `in` | membership in `(a,b,c)` |
//! | `is` | `is.null` or `is.not_null` |
//!
//! ## Filters
//!
//! ```rust
//! use termbase_query::{Filter, FilterValue};
//!
//! let filter = Filter::and([
//!     Filter::Gte("age".into(), FilterValue::Int(18)),
//!     Filter::IsNotNull("name".into()),
//! ]);
//! let (sql, params) = filter.to_sql("t");
//! assert_eq!(sql, r#"(t."age" >= ? AND t."name" IS NOT NULL)"#);
//! assert_eq!(params, vec![FilterValue::Int(18)]);
//! ```
//!
//! ## Planning
//!
//! [`QueryPlanner`] turns a request into a [`PreparedQuery`] holding the
//! data and count statements. Execution lives in the store crate.

pub mod error;
pub mod filter;
pub mod logging;
pub mod planner;
pub mod request;
pub mod result;
pub mod sql;

pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult};
pub use filter::{Filter, FilterValue};
pub use planner::{PreparedQuery, QueryOptions, QueryPlanner};
pub use request::{
    Operator, OrderBy, QueryRequest, RESERVED_PARAMS, SortOrder, ViolationFilter, WhereClause,
};
pub use result::{CellViolation, ResultRow, ResultSet};
pub use sql::{SqlBuilder, escape_identifier};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::planner::{QueryOptions, QueryPlanner};
    pub use crate::request::{Operator, OrderBy, QueryRequest, ViolationFilter};
    pub use crate::result::{ResultRow, ResultSet};
}
