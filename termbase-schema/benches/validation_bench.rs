//! Benchmarks for row validation and schema compilation.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use termbase_schema::{
    ColumnDecl, CompiledSchema, DatatypeDecl, Declarations, RuleDecl, SqlType, TableDecl,
    TableValidator, compile, parse_condition,
};

// ============================================================================
// Helper Functions
// ============================================================================

fn declarations() -> Declarations {
    Declarations::new()
        .table(TableDecl::new("subject", "subject.tsv"))
        .datatype(DatatypeDecl::new("text").sql_type(SqlType::Text))
        .datatype(DatatypeDecl::new("empty").parent("text").condition("equals('')"))
        .datatype(DatatypeDecl::new("word").parent("text").condition(r"exclude(/\s/)"))
        .datatype(
            DatatypeDecl::new("integer")
                .parent("word")
                .condition("match(/-?[0-9]+/)")
                .sql_type(SqlType::Integer),
        )
        .datatype(
            DatatypeDecl::new("positive_integer")
                .parent("integer")
                .condition("match(/[1-9][0-9]*/)")
                .description("a positive integer"),
        )
        .datatype(DatatypeDecl::new("sex").parent("word").condition("in('F', 'M')"))
        .column(ColumnDecl::new("subject", "id", "positive_integer").structure("primary"))
        .column(ColumnDecl::new("subject", "age", "positive_integer"))
        .column(ColumnDecl::new("subject", "sex", "sex"))
        .column(ColumnDecl::new("subject", "note", "text").nulltype("empty"))
        .rule(RuleDecl::new("subject", "sex", "equals('F')", "note", "not null").level("warning"))
}

fn schema() -> CompiledSchema {
    compile(&declarations()).expect("benchmark schema compiles")
}

fn rows(count: usize) -> Vec<Vec<String>> {
    (1..=count)
        .map(|i| {
            let age = if i % 10 == 0 { "-5".to_string() } else { (i % 90).to_string() };
            vec![
                i.to_string(),
                age,
                if i % 2 == 0 { "F" } else { "M" }.to_string(),
                if i % 3 == 0 { String::new() } else { format!("note {}", i) },
            ]
        })
        .collect()
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_parse_condition(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_condition");

    for (name, text) in [
        ("equals", "equals('x')"),
        ("in", "in('a', 'b', 'c', 'd')"),
        ("match", "match(/[A-Z]+:[0-9]{7}/)"),
    ] {
        group.bench_function(name, |b| b.iter(|| parse_condition(black_box(text))));
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let decls = declarations();
    c.bench_function("compile_schema", |b| b.iter(|| compile(black_box(&decls))));
}

fn bench_validate_rows(c: &mut Criterion) {
    let schema = schema();
    let Some(table) = schema.table("subject") else {
        return;
    };
    let mut group = c.benchmark_group("validate_rows");

    for count in [100, 1_000, 10_000] {
        let data = rows(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &data, |b, data| {
            b.iter(|| {
                let mut validator = TableValidator::new(&schema, table);
                let mut total = 0;
                for (i, row) in data.iter().enumerate() {
                    total += validator.validate(i + 1, row).len();
                }
                black_box(total)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse_condition, bench_compile, bench_validate_rows);
criterion_main!(benches);
