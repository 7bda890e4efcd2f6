//! Integration tests for reading and compiling declarations.
//!
//! These tests compile the demo declarations from disk and check how
//! schema errors are collected and reported.

use std::path::PathBuf;

use termbase::schema::{
    DeclarationSheets, Level, SchemaError, SqlType, compile, load_declarations,
    parse_declarations,
};

fn demo_sheet() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/src/table.tsv")
}

const TABLE: &str = "table\tpath\ttype\n\
    table\ttable.tsv\ttable\n\
    column\tcolumn.tsv\tcolumn\n\
    datatype\tdatatype.tsv\tdatatype\n\
    subject\tsubject.tsv\t\n";

const DATATYPE: &str = "datatype\tparent\tcondition\tSQL type\n\
    text\t\t\ttext\n\
    integer\ttext\tmatch(/-?[0-9]+/)\tinteger\n";

fn sheets(column: &str) -> DeclarationSheets {
    DeclarationSheets {
        table: TABLE.into(),
        column: column.into(),
        datatype: DATATYPE.into(),
        prefix: None,
        rule: None,
    }
}

/// Test compiling the demo declarations
#[test]
fn test_compile_demo_declarations() {
    let decls = load_declarations(demo_sheet()).unwrap();
    let schema = compile(&decls).unwrap();

    let tables: Vec<&str> = schema.table_names().collect();
    assert_eq!(tables, vec!["subject", "term", "specimen"]);
    assert!(schema.base_dir.ends_with("demos/src"));

    let subject = schema.table("subject").unwrap();
    let columns: Vec<&str> = subject.column_names().collect();
    assert_eq!(columns, vec!["id", "age", "name", "sex"]);
    assert!(subject.column("id").unwrap().primary);
    assert_eq!(subject.column("age").unwrap().sql_type, SqlType::Integer);
    assert!(!subject.column("age").unwrap().nullable);
    assert!(subject.column("name").unwrap().nullable);
    assert_eq!(subject.rules.len(), 1);
    assert_eq!(subject.rules[0].level, Level::Warning);
}

/// Test structures compiled from the demo column sheet
#[test]
fn test_demo_structures() {
    let schema = compile(&load_declarations(demo_sheet()).unwrap()).unwrap();

    let term = schema.table("term").unwrap();
    assert_eq!(term.trees.len(), 1);
    assert_eq!(term.trees[0].parent, "parent");
    assert_eq!(term.trees[0].child, "label");
    assert!(term.column("curie").unwrap().unique);

    let specimen = schema.table("specimen").unwrap();
    assert_eq!(specimen.foreign_keys.len(), 1);
    assert_eq!(specimen.foreign_keys[0].target_table, "subject");
    assert_eq!(specimen.foreign_keys[0].target_column, "id");
    assert_eq!(specimen.unders.len(), 1);
    assert_eq!(specimen.unders[0].tree_table, "term");
    assert_eq!(specimen.unders[0].value, "tissue");
}

/// Test CURIE expansion through the prefix sheet
#[test]
fn test_demo_prefixes() {
    let schema = compile(&load_declarations(demo_sheet()).unwrap()).unwrap();
    assert_eq!(schema.prefixes.len(), 2);
    assert_eq!(
        schema.expand_curie("UBERON:0000178").as_deref(),
        Some("http://purl.obolibrary.org/obo/UBERON_0000178")
    );
    assert_eq!(schema.expand_curie("NOPE:1"), None);
}

/// Test that the generated DDL names every relation of a table
#[test]
fn test_demo_ddl() {
    let schema = compile(&load_declarations(demo_sheet()).unwrap()).unwrap();
    let ddl = schema.table("subject").unwrap().ddl().join(";\n");

    assert!(ddl.contains("CREATE TABLE \"subject\""));
    assert!(ddl.contains("CREATE TABLE \"subject_conflict\""));
    assert!(ddl.contains("CREATE VIEW \"subject_view\""));
}

/// Test a missing declaration sheet
#[test]
fn test_missing_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.tsv");
    std::fs::write(&path, TABLE).unwrap();

    let err = load_declarations(&path).unwrap_err();
    assert!(matches!(err, SchemaError::IoError { .. }));
}

/// Test that every schema error is reported, not just the first
#[test]
fn test_errors_are_collected() {
    let decls = parse_declarations(&sheets(
        "table\tcolumn\tdatatype\tstructure\n\
         subject\tid\tnumber\tprimary\n\
         subject\tage\tinteger\tfrom(person.id)\n\
         person\tid\tinteger\t\n",
    ))
    .unwrap();

    let errors = compile(&decls).unwrap_err().into_errors();
    assert_eq!(errors.len(), 3, "{:#?}", errors);
    assert!(errors.iter().any(|e| matches!(e, SchemaError::UnknownDatatype { .. })));
    assert!(errors.iter().any(|e| matches!(e, SchemaError::UnknownTable { .. })));
    assert!(errors.iter().any(|e| matches!(e, SchemaError::InvalidForeignKey { .. })));
}

/// Test a single error is returned unwrapped
#[test]
fn test_single_error() {
    let decls = parse_declarations(&sheets(
        "table\tcolumn\tdatatype\n\
         subject\tid\tnumber\n",
    ))
    .unwrap();

    let err = compile(&decls).unwrap_err();
    assert_eq!(err.to_string(), "unknown datatype `number` in `subject.id`");
}

/// Test malformed declaration sheets
#[test]
fn test_invalid_declaration() {
    let err = parse_declarations(&sheets("table\tcolumn\nsubject\tid\n")).unwrap_err();
    assert!(matches!(err, SchemaError::InvalidDeclaration { .. }));
    assert!(err.to_string().contains("datatype"));
}
