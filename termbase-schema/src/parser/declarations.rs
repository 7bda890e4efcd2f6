//! Reading declaration sheets into [`Declarations`].

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use super::tsv::TsvSheet;
use crate::ast::*;
use crate::error::{SchemaError, SchemaResult};

/// Raw text of each declaration sheet, keyed by role.
///
/// `table` is the table sheet itself; the other sheets are located through it
/// by [`load_declarations`], or supplied directly when the sheets do not come
/// from files.
#[derive(Debug, Clone, Default)]
pub struct DeclarationSheets {
    pub table: String,
    pub column: String,
    pub datatype: String,
    pub prefix: Option<String>,
    pub rule: Option<String>,
}

/// Read the table sheet at `path` and every declaration sheet it lists.
///
/// Sheet paths in the table sheet are resolved against the table sheet's
/// directory, which also becomes [`Declarations::base_dir`].
pub fn load_declarations(path: impl AsRef<Path>) -> SchemaResult<Declarations> {
    let path = path.as_ref();
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let table_text = read_file(path)?;
    let tables = parse_table_sheet(&path.display().to_string(), &table_text)?;

    let sheet_path = |table_type: TableType| -> Option<PathBuf> {
        tables
            .iter()
            .find(|t| t.table_type == table_type)
            .map(|t| base_dir.join(&t.path))
    };

    let required = |table_type: TableType| -> SchemaResult<String> {
        let p = sheet_path(table_type).ok_or_else(|| {
            SchemaError::declaration(
                path.display().to_string(),
                1,
                format!("missing required `{}` table", table_type.as_str()),
            )
        })?;
        read_file(&p)
    };

    let sheets = DeclarationSheets {
        table: table_text,
        column: required(TableType::Column)?,
        datatype: required(TableType::Datatype)?,
        prefix: sheet_path(TableType::Prefix).map(|p| read_file(&p)).transpose()?,
        rule: sheet_path(TableType::Rule).map(|p| read_file(&p)).transpose()?,
    };

    let mut declarations = parse_declarations(&sheets)?;
    declarations.base_dir = base_dir;
    Ok(declarations)
}

/// Parse declaration sheets that are already in memory.
pub fn parse_declarations(sheets: &DeclarationSheets) -> SchemaResult<Declarations> {
    let tables = parse_table_sheet("table", &sheets.table)?;
    let datatypes = parse_datatype_sheet(&sheets.datatype)?;
    let columns = parse_column_sheet(&sheets.column)?;
    let prefixes = match &sheets.prefix {
        Some(text) => parse_prefix_sheet(text)?,
        None => vec![],
    };
    let rules = match &sheets.rule {
        Some(text) => parse_rule_sheet(text)?,
        None => vec![],
    };

    debug!(
        tables = tables.len(),
        columns = columns.len(),
        datatypes = datatypes.len(),
        rules = rules.len(),
        "Read declarations"
    );

    Ok(Declarations {
        tables,
        columns,
        datatypes,
        prefixes,
        rules,
        base_dir: PathBuf::new(),
    })
}

fn read_file(path: &Path) -> SchemaResult<String> {
    std::fs::read_to_string(path).map_err(|e| SchemaError::IoError {
        path: path.display().to_string(),
        source: e,
    })
}

/// A sheet with the name used in error messages.
struct Sheet<'a> {
    name: &'a str,
    sheet: TsvSheet,
}

impl<'a> Sheet<'a> {
    fn parse(name: &'a str, text: &str, required: &[&str]) -> SchemaResult<Self> {
        let sheet = TsvSheet::parse(text);
        for header in required {
            if sheet.column_index(header).is_none() {
                return Err(SchemaError::declaration(
                    name,
                    1,
                    format!("missing required column `{}`", header),
                ));
            }
        }
        Ok(Self { name, sheet })
    }

    fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        self.sheet.rows().map(move |(line, values)| Row {
            sheet: self.name,
            line,
            values,
        })
    }
}

struct Row<'a> {
    sheet: &'a str,
    line: usize,
    values: IndexMap<&'a str, &'a str>,
}

impl Row<'_> {
    /// A non-empty value.
    fn required(&self, column: &str) -> SchemaResult<&str> {
        match self.optional(column) {
            Some(value) => Ok(value),
            None => Err(SchemaError::declaration(
                self.sheet,
                self.line,
                format!("missing value for `{}`", column),
            )),
        }
    }

    /// A trimmed value, `None` when absent or empty.
    fn optional(&self, column: &str) -> Option<&str> {
        self.values
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn text(&self, column: &str) -> String {
        self.optional(column).unwrap_or_default().to_string()
    }

    fn flag(&self, column: &str) -> SchemaResult<bool> {
        let raw = self.optional(column).unwrap_or_default();
        parse_flag(raw).ok_or_else(|| {
            SchemaError::declaration(
                self.sheet,
                self.line,
                format!("invalid value `{}` for `{}`", raw, column),
            )
        })
    }
}

fn parse_table_sheet(name: &str, text: &str) -> SchemaResult<Vec<TableDecl>> {
    let sheet = Sheet::parse(name, text, &["table", "path"])?;
    let mut tables: Vec<TableDecl> = Vec::new();

    for row in sheet.rows() {
        let table_name = row.required("table")?;
        let path = row.optional("path").unwrap_or_default();
        let raw_type = row.optional("type").unwrap_or_default();
        let table_type = TableType::from_str(raw_type).ok_or_else(|| {
            SchemaError::declaration(
                name,
                row.line,
                format!("unrecognized table type `{}`", raw_type),
            )
        })?;

        if table_type.is_declaration() {
            if path.is_empty() {
                return Err(SchemaError::declaration(name, row.line, "missing value for `path`"));
            }
            if tables.iter().any(|t| t.table_type == table_type) {
                return Err(SchemaError::declaration(
                    name,
                    row.line,
                    format!("multiple tables with type `{}`", table_type.as_str()),
                ));
            }
        }

        tables.push(TableDecl {
            name: table_name.into(),
            path: path.to_string(),
            table_type,
            description: row.text("description"),
        });
    }

    Ok(tables)
}

fn parse_datatype_sheet(text: &str) -> SchemaResult<Vec<DatatypeDecl>> {
    let sheet = Sheet::parse("datatype", text, &["datatype"])?;
    let mut datatypes = Vec::new();

    for row in sheet.rows() {
        let sql_type = match row.optional("SQL type").or_else(|| row.optional("sql_type")) {
            Some(raw) => Some(SqlType::from_str(raw).ok_or_else(|| {
                SchemaError::declaration(
                    "datatype",
                    row.line,
                    format!("unrecognized SQL type `{}`", raw),
                )
            })?),
            None => None,
        };

        datatypes.push(DatatypeDecl {
            name: row.required("datatype")?.into(),
            parent: row.optional("parent").map(Into::into),
            condition: row.optional("condition").map(str::to_string),
            sql_type,
            description: row.text("description"),
            override_parent: row.flag("override")?,
        });
    }

    Ok(datatypes)
}

fn parse_column_sheet(text: &str) -> SchemaResult<Vec<ColumnDecl>> {
    let sheet = Sheet::parse("column", text, &["table", "column", "datatype"])?;
    let mut columns = Vec::new();

    for row in sheet.rows() {
        columns.push(ColumnDecl {
            table: row.required("table")?.into(),
            name: row.required("column")?.into(),
            datatype: row.required("datatype")?.into(),
            nulltype: row.optional("nulltype").map(Into::into),
            nullable: row.flag("nullable")?,
            structure: row.text("structure"),
            description: row.text("description"),
        });
    }

    Ok(columns)
}

fn parse_prefix_sheet(text: &str) -> SchemaResult<Vec<Prefix>> {
    let sheet = Sheet::parse("prefix", text, &["prefix", "base"])?;
    sheet
        .rows()
        .map(|row| Ok(Prefix::new(row.required("prefix")?, row.required("base")?)))
        .collect()
}

fn parse_rule_sheet(text: &str) -> SchemaResult<Vec<RuleDecl>> {
    const COLUMNS: [&str; 7] = [
        "table",
        "when column",
        "when condition",
        "then column",
        "then condition",
        "level",
        "description",
    ];
    let sheet = Sheet::parse("rule", text, &COLUMNS)?;
    let mut rules = Vec::new();

    for row in sheet.rows() {
        rules.push(RuleDecl {
            table: row.required("table")?.into(),
            when_column: row.required("when column")?.into(),
            when_condition: row.required("when condition")?.to_string(),
            then_column: row.required("then column")?.into(),
            then_condition: row.required("then condition")?.to_string(),
            level: row.required("level")?.to_string(),
            description: row.text("description"),
        });
    }

    Ok(rules)
}
