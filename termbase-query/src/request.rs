//! Query requests and their parsing from flat parameter maps.
//!
//! ```rust
//! use termbase_query::{Operator, QueryRequest, SortOrder};
//!
//! let request = QueryRequest::from_params(
//!     "subject",
//!     [("age", "gte.18"), ("order", "age.desc"), ("limit", "2")],
//! )
//! .unwrap();
//!
//! assert_eq!(request.filters[0].operator, Operator::Gte);
//! assert_eq!(request.order[0].order, SortOrder::Desc);
//! assert_eq!(request.limit, Some(2));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use termbase_schema::Level;

use crate::error::{ErrorCode, QueryError, QueryResult};

/// Reserved parameter names; every other key names a column.
pub const RESERVED_PARAMS: [&str; 5] = ["select", "order", "limit", "offset", "violations"];

/// A `where` operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Neq,
    Like,
    In,
    Gt,
    Lt,
    Gte,
    Lte,
    Is,
}

impl Operator {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(Self::Eq),
            "neq" => Some(Self::Neq),
            "like" => Some(Self::Like),
            "in" => Some(Self::In),
            "gt" => Some(Self::Gt),
            "lt" => Some(Self::Lt),
            "gte" => Some(Self::Gte),
            "lte" => Some(Self::Lte),
            "is" => Some(Self::Is),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Like => "like",
            Self::In => "in",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Is => "is",
        }
    }

    /// Operators that only make sense on ordered (numeric) columns.
    pub fn is_ordinal(&self) -> bool {
        matches!(self, Self::Gt | Self::Lt | Self::Gte | Self::Lte)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `column=operator.operand` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhereClause {
    pub column: String,
    pub operator: Operator,
    pub operand: String,
}

impl WhereClause {
    /// The clause as it was written.
    pub fn as_param(&self) -> String {
        format!("{}.{}", self.operator, self.operand)
    }

    /// Split an `in` operand, accepting `(a,b)` or `a,b`.
    pub fn list_operand(&self) -> Vec<&str> {
        let inner = self
            .operand
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .unwrap_or(&self.operand);
        if inner.trim().is_empty() {
            return vec![];
        }
        inner.split(',').map(str::trim).collect()
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortOrder {
    /// Get the SQL keyword for this sort order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// One ordering term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub order: SortOrder,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Restrict results to rows with matching persisted violations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViolationFilter {
    /// `None` matches any level.
    pub level: Option<Level>,
    /// `None` matches any column.
    pub column: Option<String>,
}

/// A read request against one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    pub table: String,
    /// Returned columns; empty means all, in declaration order.
    pub select: Vec<String>,
    pub filters: Vec<WhereClause>,
    pub order: Vec<OrderBy>,
    pub violations: Option<ViolationFilter>,
    /// `None` means the configured default.
    pub limit: Option<usize>,
    pub offset: usize,
}

impl QueryRequest {
    /// Create a request for every row of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Set the returned columns.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add a where clause.
    pub fn filter(mut self, column: impl Into<String>, operator: Operator, operand: impl Into<String>) -> Self {
        self.filters.push(WhereClause {
            column: column.into(),
            operator,
            operand: operand.into(),
        });
        self
    }

    /// Add an ordering column.
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    /// Only return rows with violations.
    pub fn with_violations(mut self, filter: ViolationFilter) -> Self {
        self.violations = Some(filter);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Parse a request from a flat parameter map.
    ///
    /// Absent parameters impose no constraint. Names are not checked here;
    /// that happens when the request is planned against a schema.
    pub fn from_params<I, K, V>(table: impl Into<String>, params: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut request = Self::new(table);

        for (key, value) in params {
            let (key, value) = (key.as_ref().trim(), value.as_ref());
            match key {
                "select" => request.select = parse_select(value)?,
                "order" => request.order = parse_order(value)?,
                "limit" => request.limit = Some(parse_count("limit", value)?),
                "offset" => request.offset = parse_count("offset", value)?,
                "violations" => request.violations = Some(parse_violations(value)?),
                "" => {
                    return Err(QueryError::invalid_filter("", value, "missing column name"));
                }
                column => request.filters.push(parse_clause(column, value)?),
            }
        }

        Ok(request)
    }
}

fn parse_select(value: &str) -> QueryResult<Vec<String>> {
    value
        .split(',')
        .map(|item| {
            let item = item.trim();
            if item.is_empty() {
                Err(QueryError::invalid_parameter(
                    ErrorCode::InvalidSelect,
                    "select",
                    format!("empty column name in `{}`", value),
                ))
            } else {
                Ok(item.to_string())
            }
        })
        .collect()
}

fn parse_order(value: &str) -> QueryResult<Vec<OrderBy>> {
    value
        .split(',')
        .map(|item| {
            let item = item.trim();
            let (column, order) = match item.rsplit_once('.') {
                Some((column, "asc")) => (column, SortOrder::Asc),
                Some((column, "desc")) => (column, SortOrder::Desc),
                Some((_, direction)) => {
                    return Err(QueryError::invalid_parameter(
                        ErrorCode::InvalidOrder,
                        "order",
                        format!("unknown direction `{}` (expected asc or desc)", direction),
                    ));
                }
                None => (item, SortOrder::Asc),
            };
            if column.is_empty() {
                return Err(QueryError::invalid_parameter(
                    ErrorCode::InvalidOrder,
                    "order",
                    format!("empty column name in `{}`", value),
                ));
            }
            Ok(OrderBy {
                column: column.to_string(),
                order,
            })
        })
        .collect()
}

fn parse_count(key: &str, value: &str) -> QueryResult<usize> {
    value.trim().parse().map_err(|_| {
        QueryError::invalid_parameter(
            ErrorCode::InvalidPagination,
            key,
            format!("`{}` is not a non-negative integer", value),
        )
    })
}

fn parse_violations(value: &str) -> QueryResult<ViolationFilter> {
    let (level, column) = match value.split_once('.') {
        Some((level, column)) => (level, Some(column)),
        None => (value, None),
    };

    let level = match level.trim() {
        "any" => None,
        other => Some(Level::from_str(other).ok_or_else(|| {
            QueryError::invalid_parameter(
                ErrorCode::InvalidViolationFilter,
                "violations",
                format!("unknown level `{}` (expected any, error, warning or info)", other),
            )
        })?),
    };

    let column = match column.map(str::trim) {
        Some("") => {
            return Err(QueryError::invalid_parameter(
                ErrorCode::InvalidViolationFilter,
                "violations",
                "empty column name",
            ));
        }
        other => other.map(str::to_string),
    };

    Ok(ViolationFilter { level, column })
}

fn parse_clause(column: &str, value: &str) -> QueryResult<WhereClause> {
    let Some((op, operand)) = value.split_once('.') else {
        return Err(QueryError::invalid_filter(
            column,
            value,
            "expected `operator.operand`",
        ));
    };
    let operator = Operator::from_str(op).ok_or_else(|| {
        QueryError::invalid_filter(column, value, format!("unknown operator `{}`", op))
    })?;

    if operator == Operator::Is && !matches!(operand, "null" | "not_null") {
        return Err(QueryError::invalid_filter(
            column,
            value,
            "`is` accepts only `null` or `not_null`",
        ));
    }
    if operator.is_ordinal() && operand.is_empty() {
        return Err(QueryError::invalid_filter(column, value, "missing operand"));
    }

    Ok(WhereClause {
        column: column.to_string(),
        operator,
        operand: operand.to_string(),
    })
}
