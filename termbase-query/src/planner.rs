//! Query planning: check a [`QueryRequest`] against the compiled schema and
//! turn it into parameterized SQL.
//!
//! Every table and column name in the generated SQL comes from the compiled
//! schema, never from the request text.

use smol_str::SmolStr;
use tracing::debug;

use termbase_schema::compiler::ROW_NUMBER;
use termbase_schema::config::QueryConfig;
use termbase_schema::{CompiledColumn, CompiledSchema, CompiledTable, SqlType};

use crate::error::{ErrorCode, QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::request::{Operator, QueryRequest, WhereClause};
use crate::sql::SqlBuilder;

/// Alias of the queried view in generated SQL.
const ALIAS: &str = "t";

/// Limits applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Limit used when the request names none.
    pub default_limit: usize,
    /// Largest accepted limit.
    pub max_limit: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 10_000,
        }
    }
}

impl From<&QueryConfig> for QueryOptions {
    fn from(config: &QueryConfig) -> Self {
        Self {
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }
}

/// A planned query, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    pub table: SmolStr,
    /// Returned columns, in order.
    pub columns: Vec<SmolStr>,
    /// Per returned column, the data SQL position of its source text column.
    /// Set for numeric columns only.
    pub sources: Vec<Option<usize>>,
    /// `None` when the limit is zero: only the count runs.
    pub data_sql: Option<String>,
    pub data_params: Vec<FilterValue>,
    pub count_sql: String,
    pub count_params: Vec<FilterValue>,
    pub limit: usize,
    pub offset: usize,
}

/// Plans requests against one compiled schema.
#[derive(Debug, Clone, Copy)]
pub struct QueryPlanner<'a> {
    schema: &'a CompiledSchema,
    options: QueryOptions,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(schema: &'a CompiledSchema, options: QueryOptions) -> Self {
        Self { schema, options }
    }

    /// Plan a request in one step.
    pub fn plan(
        schema: &CompiledSchema,
        request: &QueryRequest,
        options: &QueryOptions,
    ) -> QueryResult<PreparedQuery> {
        QueryPlanner::new(schema, *options).prepare(request)
    }

    /// Check every name in `request` and build its SQL.
    pub fn prepare(&self, request: &QueryRequest) -> QueryResult<PreparedQuery> {
        let table = self
            .schema
            .table(&request.table)
            .ok_or_else(|| QueryError::unknown_table(&request.table))?;

        let limit = request.limit.unwrap_or(self.options.default_limit);
        if limit > self.options.max_limit {
            return Err(QueryError::invalid_parameter(
                ErrorCode::InvalidPagination,
                "limit",
                format!("{} exceeds the maximum of {}", limit, self.options.max_limit),
            ));
        }

        let columns = if request.select.is_empty() {
            table.columns.keys().cloned().collect()
        } else {
            request
                .select
                .iter()
                .map(|name| lookup(table, name).map(|c| c.name.clone()))
                .collect::<QueryResult<Vec<_>>>()?
        };

        let mut filters = request
            .filters
            .iter()
            .map(|clause| clause_filter(table, clause))
            .collect::<QueryResult<Vec<_>>>()?;

        if let Some(violations) = &request.violations {
            let column = match &violations.column {
                Some(name) => Some(lookup(table, name)?.name.to_string()),
                None => None,
            };
            filters.push(Filter::HasViolation {
                table: table.name.to_string(),
                level: violations.level.map(|l| l.as_str().to_string()),
                column,
            });
        }
        let filter = Filter::and(filters);

        let mut order = Vec::with_capacity(request.order.len());
        for item in &request.order {
            order.push((lookup(table, &item.column)?.name.clone(), item.order));
        }

        let view = table.view_name();

        let mut count = SqlBuilder::new();
        count.push("SELECT COUNT(*) FROM ").push_identifier(&view).push(" ").push(ALIAS);
        push_where(&mut count, &filter);
        let (count_sql, count_params) = count.build();

        // Source text columns follow the row number and the returned columns.
        let mut next = columns.len();
        let source_names: Vec<Option<String>> = columns
            .iter()
            .map(|name| table.column(name).and_then(CompiledColumn::source_column))
            .collect();
        let sources = source_names
            .iter()
            .map(|name| {
                name.as_ref().map(|_| {
                    next += 1;
                    next
                })
            })
            .collect();

        let (data_sql, data_params) = if limit == 0 {
            (None, vec![])
        } else {
            let mut data = SqlBuilder::new();
            data.push("SELECT ").push_column(ALIAS, ROW_NUMBER);
            for column in &columns {
                data.push(", ").push_column(ALIAS, column);
            }
            for source in source_names.iter().flatten() {
                data.push(", ").push_column(ALIAS, source);
            }
            data.push(" FROM ").push_identifier(&view).push(" ").push(ALIAS);
            push_where(&mut data, &filter);
            data.push(" ORDER BY ");
            for (column, direction) in &order {
                data.push_column(ALIAS, column)
                    .push(" ")
                    .push(direction.as_sql())
                    .push(", ");
            }
            data.push_column(ALIAS, ROW_NUMBER)
                .push(" ASC LIMIT ")
                .push_param(limit)
                .push(" OFFSET ")
                .push_param(request.offset);
            let (sql, params) = data.build();
            (Some(sql), params)
        };

        debug!(table = %table.name, count_sql = %count_sql, data_sql = ?data_sql, "Planned query");

        Ok(PreparedQuery {
            table: table.name.clone(),
            columns,
            sources,
            data_sql,
            data_params,
            count_sql,
            count_params,
            limit,
            offset: request.offset,
        })
    }
}

fn lookup<'t>(table: &'t CompiledTable, name: &str) -> QueryResult<&'t CompiledColumn> {
    table
        .column(name)
        .ok_or_else(|| QueryError::unknown_column(table.name.as_str(), name))
}

fn push_where(builder: &mut SqlBuilder, filter: &Filter) {
    if !filter.is_none() {
        builder.push(" WHERE ");
        filter.write_sql(builder, ALIAS);
    }
}

fn kind_name(sql_type: SqlType) -> &'static str {
    match sql_type {
        SqlType::Integer => "integer",
        SqlType::Real => "real",
        SqlType::Text => "text",
        SqlType::Blob => "blob",
    }
}

/// Parse a number for a numeric column.
fn number(sql_type: SqlType, operand: &str) -> Option<FilterValue> {
    let operand = operand.trim();
    if sql_type == SqlType::Integer {
        if let Ok(i) = operand.parse::<i64>() {
            return Some(FilterValue::Int(i));
        }
    }
    operand
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(FilterValue::Float)
}

/// Bind an equality operand: numbers for numeric columns when they parse,
/// raw text otherwise so invalid stored values can still be found.
fn equality_value(sql_type: SqlType, operand: &str) -> FilterValue {
    if sql_type.is_numeric() {
        if let Some(value) = number(sql_type, operand) {
            return value;
        }
    }
    FilterValue::String(operand.to_string())
}

fn clause_filter(table: &CompiledTable, clause: &WhereClause) -> QueryResult<Filter> {
    let column = lookup(table, &clause.column)?;
    let name = column.name.to_string();
    let sql_type = column.sql_type;

    if clause.operator.is_ordinal() && !sql_type.is_numeric() {
        return Err(QueryError::incompatible_operator(
            &clause.column,
            clause.operator.as_str(),
            kind_name(sql_type),
        ));
    }
    if clause.operator == Operator::Like && sql_type.is_numeric() {
        return Err(QueryError::incompatible_operator(
            &clause.column,
            clause.operator.as_str(),
            kind_name(sql_type),
        ));
    }

    let ordinal = || {
        number(sql_type, &clause.operand).ok_or_else(|| {
            QueryError::invalid_filter(
                &clause.column,
                clause.as_param(),
                format!("`{}` is not a number", clause.operand),
            )
        })
    };

    Ok(match clause.operator {
        Operator::Eq => Filter::Equals(name, equality_value(sql_type, &clause.operand)),
        Operator::Neq => Filter::NotEquals(name, equality_value(sql_type, &clause.operand)),
        Operator::Gt => Filter::Gt(name, ordinal()?),
        Operator::Gte => Filter::Gte(name, ordinal()?),
        Operator::Lt => Filter::Lt(name, ordinal()?),
        Operator::Lte => Filter::Lte(name, ordinal()?),
        Operator::Like => Filter::Like(name, Filter::like_pattern(&clause.operand)),
        Operator::In => Filter::In(
            name,
            clause
                .list_operand()
                .into_iter()
                .map(|item| equality_value(sql_type, item))
                .collect(),
        ),
        Operator::Is if clause.operand == "null" => Filter::IsNull(name),
        Operator::Is => Filter::IsNotNull(name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{OrderBy, ViolationFilter};
    use pretty_assertions::assert_eq;
    use termbase_schema::{ColumnDecl, DatatypeDecl, Declarations, Level, TableDecl, compile};

    fn schema() -> CompiledSchema {
        let decls = Declarations::new()
            .table(TableDecl::new("subject", "subject.tsv"))
            .datatype(DatatypeDecl::new("text").sql_type(SqlType::Text))
            .datatype(DatatypeDecl::new("empty").parent("text").condition("equals('')"))
            .datatype(
                DatatypeDecl::new("integer")
                    .parent("text")
                    .condition("match(/-?[0-9]+/)")
                    .sql_type(SqlType::Integer),
            )
            .column(ColumnDecl::new("subject", "id", "integer").structure("primary"))
            .column(ColumnDecl::new("subject", "age", "integer"))
            .column(ColumnDecl::new("subject", "name", "text").nulltype("empty"));
        compile(&decls).unwrap()
    }

    fn plan(request: QueryRequest) -> QueryResult<PreparedQuery> {
        QueryPlanner::plan(&schema(), &request, &QueryOptions::default())
    }

    #[test]
    fn test_plan_filter_order_limit() {
        let request = QueryRequest::from_params(
            "subject",
            [("age", "gte.18"), ("order", "age.desc"), ("limit", "2")],
        )
        .unwrap();
        let query = plan(request).unwrap();

        assert_eq!(query.columns, vec!["id", "age", "name"]);
        assert_eq!(query.sources, vec![Some(4), Some(5), None]);
        assert_eq!(
            query.data_sql.as_deref(),
            Some(
                r#"SELECT t."row_number", t."id", t."age", t."name", t."id__source", t."age__source" FROM "subject_view" t WHERE t."age" >= ? ORDER BY t."age" DESC, t."row_number" ASC LIMIT ? OFFSET ?"#
            )
        );
        assert_eq!(
            query.data_params,
            vec![FilterValue::Int(18), FilterValue::Int(2), FilterValue::Int(0)]
        );
        assert_eq!(
            query.count_sql,
            r#"SELECT COUNT(*) FROM "subject_view" t WHERE t."age" >= ?"#
        );
        assert_eq!(query.count_params, vec![FilterValue::Int(18)]);
    }

    #[test]
    fn test_default_order_is_row_number() {
        let query = plan(QueryRequest::new("subject").select(["name"])).unwrap();
        let sql = query.data_sql.unwrap();
        assert!(sql.starts_with(r#"SELECT t."row_number", t."name" FROM"#));
        assert_eq!(query.sources, vec![None]);
        assert!(sql.contains(r#"ORDER BY t."row_number" ASC LIMIT ?"#));
        assert_eq!(query.limit, 100);
    }

    #[test]
    fn test_zero_limit_skips_data_query() {
        let query = plan(QueryRequest::new("subject").limit(0)).unwrap();
        assert!(query.data_sql.is_none());
        assert_eq!(query.count_sql, r#"SELECT COUNT(*) FROM "subject_view" t"#);
    }

    #[test]
    fn test_unknown_names() {
        let err = plan(QueryRequest::new("nope")).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownTable);

        let err = plan(QueryRequest::new("subject").filter("weight", Operator::Eq, "1")).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownColumn);

        let err = plan(QueryRequest::new("subject").select(["id", "weight"])).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownColumn);

        let err = plan(QueryRequest::new("subject").order_by(OrderBy::asc("weight"))).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownColumn);
    }

    #[test]
    fn test_operator_kinds() {
        let err = plan(QueryRequest::new("subject").filter("name", Operator::Gt, "a")).unwrap_err();
        assert_eq!(err.code, ErrorCode::IncompatibleOperator);

        let err = plan(QueryRequest::new("subject").filter("age", Operator::Like, "1")).unwrap_err();
        assert_eq!(err.code, ErrorCode::IncompatibleOperator);

        let err = plan(QueryRequest::new("subject").filter("age", Operator::Lt, "old")).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFilter);
    }

    #[test]
    fn test_equality_binds_raw_text_when_not_numeric() {
        let query = plan(QueryRequest::new("subject").filter("age", Operator::Eq, "-5x")).unwrap();
        assert_eq!(query.count_params, vec![FilterValue::String("-5x".into())]);
    }

    #[test]
    fn test_like_in_and_is() {
        let request = QueryRequest::new("subject")
            .filter("name", Operator::Like, "ann*")
            .filter("id", Operator::In, "(1,2)")
            .filter("name", Operator::Is, "not_null");
        let query = plan(request).unwrap();
        assert_eq!(
            query.count_sql,
            r#"SELECT COUNT(*) FROM "subject_view" t WHERE (t."name" LIKE ? ESCAPE '\' AND t."id" IN (?, ?) AND t."name" IS NOT NULL)"#
        );
        assert_eq!(
            query.count_params,
            vec![
                FilterValue::String("ann%".into()),
                FilterValue::Int(1),
                FilterValue::Int(2)
            ]
        );
    }

    #[test]
    fn test_violation_filter() {
        let request = QueryRequest::new("subject").with_violations(ViolationFilter {
            level: Some(Level::Error),
            column: Some("age".into()),
        });
        let query = plan(request).unwrap();
        assert!(query.count_sql.contains(r#"EXISTS (SELECT 1 FROM "violation" v"#));
        assert_eq!(
            query.count_params,
            vec![
                FilterValue::from("subject"),
                FilterValue::from("error"),
                FilterValue::from("age")
            ]
        );

        let err = plan(QueryRequest::new("subject").with_violations(ViolationFilter {
            level: None,
            column: Some("weight".into()),
        }))
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownColumn);
    }

    #[test]
    fn test_max_limit() {
        let options = QueryOptions {
            default_limit: 10,
            max_limit: 50,
        };
        let schema = schema();
        let err = QueryPlanner::plan(&schema, &QueryRequest::new("subject").limit(51), &options)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPagination);

        let query = QueryPlanner::new(&schema, options)
            .prepare(&QueryRequest::new("subject"))
            .unwrap();
        assert_eq!(query.limit, 10);
    }
}
