//! Schema compilation.
//!
//! Turns [`Declarations`] into a [`CompiledSchema`]: per table, the DDL that
//! creates the main table, its conflict sibling and the union view, plus the
//! per-column constraints the validator enforces. Every problem is collected
//! and reported before any statement runs.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::{debug, info};

use crate::ast::*;
use crate::condition::Condition;
use crate::error::{SchemaError, SchemaResult};
use crate::parser::parse_structure;
use crate::registry::{CompiledDatatype, DatatypeRegistry};

/// Column holding the 1-based source row of every stored row.
pub const ROW_NUMBER: &str = "row_number";
/// Relation holding persisted violations.
pub const VIOLATION_TABLE: &str = "violation";
/// Relation holding CURIE prefixes.
pub const PREFIX_TABLE: &str = "prefix";
/// Suffix of the table receiving rows whose key cells carry violations.
pub const CONFLICT_SUFFIX: &str = "_conflict";
/// Suffix of the view combining a table and its conflict sibling.
pub const VIEW_SUFFIX: &str = "_view";
/// Suffix of the TEXT column keeping a numeric cell's source text, since
/// column affinity rewrites values such as `05` or `1.50`.
pub const SOURCE_SUFFIX: &str = "__source";

/// Quote an SQL identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A compiled column.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledColumn {
    pub name: SmolStr,
    pub datatype: SmolStr,
    pub nulltype: Option<SmolStr>,
    /// Empty values are accepted.
    pub nullable: bool,
    pub sql_type: SqlType,
    pub primary: bool,
    /// Declared `unique` (primary columns are unique too, see [`is_key`](Self::is_key)).
    pub unique: bool,
    /// Child column of some `tree(...)` in the same table.
    pub tree_child: bool,
    pub structures: Vec<Structure>,
    pub description: String,
}

impl CompiledColumn {
    /// Primary, unique and tree child columns must hold distinct values.
    pub fn is_key(&self) -> bool {
        self.primary || self.unique || self.tree_child
    }

    /// The column keeping this column's source text. Only numeric columns
    /// have one.
    pub fn source_column(&self) -> Option<String> {
        self.sql_type
            .is_numeric()
            .then(|| format!("{}{}", self.name, SOURCE_SUFFIX))
    }

    fn definition(&self) -> String {
        let mut def = format!("{} {}", quote_ident(&self.name), self.sql_type.as_sql());
        if self.primary {
            def.push_str(" PRIMARY KEY");
        } else if self.unique {
            def.push_str(" UNIQUE");
        }
        def
    }
}

/// `column` values must exist in `target_table.target_column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: SmolStr,
    pub target_table: SmolStr,
    pub target_column: SmolStr,
}

/// `parent` holds the parent of the row's `child` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeConstraint {
    pub parent: SmolStr,
    pub child: SmolStr,
}

/// `column` values must sit at or below `value` in the tree keyed by
/// `tree_table.tree_child`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnderConstraint {
    pub column: SmolStr,
    pub tree_table: SmolStr,
    pub tree_child: SmolStr,
    pub value: String,
}

/// One side of a conditional rule.
#[derive(Debug, Clone)]
pub enum RuleCondition {
    /// The cell is null.
    Null,
    /// The cell is not null.
    NotNull,
    /// The cell satisfies every condition.
    Test(Vec<Condition>),
}

impl RuleCondition {
    fn compile(text: &str, registry: &DatatypeRegistry) -> Result<Self, String> {
        match text.trim() {
            "null" => Ok(Self::Null),
            "not null" => Ok(Self::NotNull),
            other => registry.compile_condition(other).map(Self::Test),
        }
    }

    /// Evaluate against a cell; `is_null` is the validator's null verdict.
    pub fn holds(&self, value: &str, is_null: bool) -> bool {
        match self {
            Self::Null => is_null,
            Self::NotNull => !is_null,
            Self::Test(conditions) => conditions.iter().all(|c| c.test(value)),
        }
    }
}

/// A compiled conditional rule.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// 1-based position among the rules sharing this when column.
    pub number: usize,
    pub when_column: SmolStr,
    pub when: RuleCondition,
    pub then_column: SmolStr,
    pub then: RuleCondition,
    pub level: Level,
    pub description: String,
}

/// A compiled data table.
#[derive(Debug, Clone)]
pub struct CompiledTable {
    pub name: SmolStr,
    /// Source path, relative to the declaration directory.
    pub path: String,
    pub description: String,
    pub columns: IndexMap<SmolStr, CompiledColumn>,
    pub primary: Option<SmolStr>,
    pub foreign_keys: Vec<ForeignKey>,
    pub trees: Vec<TreeConstraint>,
    pub unders: Vec<UnderConstraint>,
    pub rules: Vec<CompiledRule>,
}

impl CompiledTable {
    pub fn column(&self, name: &str) -> Option<&CompiledColumn> {
        self.columns.get(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(SmolStr::as_str)
    }

    /// Source text columns of the numeric columns, in declaration order.
    /// They follow the declared columns in both stored tables.
    pub fn source_columns(&self) -> impl Iterator<Item = String> + '_ {
        self.columns.values().filter_map(CompiledColumn::source_column)
    }

    pub fn conflict_name(&self) -> String {
        format!("{}{}", self.name, CONFLICT_SUFFIX)
    }

    pub fn view_name(&self) -> String {
        format!("{}{}", self.name, VIEW_SUFFIX)
    }

    /// Rules whose when column is `column`.
    pub fn rules_for<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a CompiledRule> + 'a {
        self.rules.iter().filter(move |r| r.when_column == column)
    }

    /// Statements that (re)create the table, its conflict sibling and its view.
    pub fn ddl(&self) -> Vec<String> {
        let name = quote_ident(&self.name);
        let conflict = quote_ident(&self.conflict_name());
        let view = quote_ident(&self.view_name());
        let row_number = quote_ident(ROW_NUMBER);

        let mut main_columns = vec![format!("{} INTEGER NOT NULL", row_number)];
        main_columns.extend(self.columns.values().map(CompiledColumn::definition));
        main_columns.extend(self.source_columns().map(|c| format!("{} TEXT", quote_ident(&c))));

        let mut conflict_columns = vec![format!("{} INTEGER NOT NULL", row_number)];
        conflict_columns.extend(
            self.columns
                .values()
                .map(|c| format!("{} {}", quote_ident(&c.name), c.sql_type.as_sql())),
        );
        conflict_columns.extend(self.source_columns().map(|c| format!("{} TEXT", quote_ident(&c))));

        let mut statements = vec![
            format!("DROP VIEW IF EXISTS {}", view),
            format!("DROP TABLE IF EXISTS {}", conflict),
            format!("DROP TABLE IF EXISTS {}", name),
            format!("CREATE TABLE {} ({})", name, main_columns.join(", ")),
            format!(
                "CREATE UNIQUE INDEX {} ON {} ({})",
                quote_ident(&format!("{}_{}_idx", self.name, ROW_NUMBER)),
                name,
                row_number
            ),
        ];

        for column in self.columns.values() {
            if column.tree_child && !column.primary && !column.unique {
                statements.push(format!(
                    "CREATE UNIQUE INDEX {} ON {} ({})",
                    quote_ident(&format!("{}_{}_tree_idx", self.name, column.name)),
                    name,
                    quote_ident(&column.name)
                ));
            }
        }

        statements.push(format!(
            "CREATE TABLE {} ({})",
            conflict,
            conflict_columns.join(", ")
        ));
        statements.push(format!(
            "CREATE VIEW {} AS SELECT * FROM {} UNION ALL SELECT * FROM {}",
            view, name, conflict
        ));

        statements
    }
}

/// The output of compilation.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub registry: Arc<DatatypeRegistry>,
    /// Data tables in declaration order.
    pub tables: IndexMap<SmolStr, CompiledTable>,
    pub prefixes: Vec<Prefix>,
    /// Directory table paths are relative to.
    pub base_dir: PathBuf,
}

impl CompiledSchema {
    pub fn table(&self, name: &str) -> Option<&CompiledTable> {
        self.tables.get(name)
    }

    /// Table names in declaration order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(SmolStr::as_str)
    }

    /// The compiled datatype of a column.
    pub fn datatype_of(&self, column: &CompiledColumn) -> Option<&CompiledDatatype> {
        self.registry.resolve(&column.datatype)
    }

    /// Expand a CURIE such as `OBI:0000070` using the declared prefixes.
    pub fn expand_curie(&self, curie: &str) -> Option<String> {
        let (prefix, local) = curie.split_once(':')?;
        self.prefixes
            .iter()
            .find(|p| p.prefix == prefix)
            .map(|p| format!("{}{}", p.base, local))
    }

    /// Statements creating the shared `violation` and `prefix` relations.
    pub fn store_ddl() -> Vec<String> {
        let violation = quote_ident(VIOLATION_TABLE);
        vec![
            format!(
                "CREATE TABLE IF NOT EXISTS {} (\"table\" TEXT NOT NULL, \"row\" INTEGER NOT NULL, \
                 \"column\" TEXT NOT NULL, \"level\" TEXT NOT NULL, \"rule\" TEXT NOT NULL, \
                 \"message\" TEXT NOT NULL, \"value\" TEXT)",
                violation
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} (\"table\", \"row\")",
                quote_ident("violation_table_row_idx"),
                violation
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {} (\"prefix\" TEXT PRIMARY KEY, \"base\" TEXT NOT NULL)",
                quote_ident(PREFIX_TABLE)
            ),
        ]
    }
}

/// Compile a full declaration set.
pub fn compile(decls: &Declarations) -> SchemaResult<CompiledSchema> {
    let mut schema = compile_parts(&decls.tables, &decls.columns, &decls.datatypes)?;
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for prefix in &decls.prefixes {
        if !seen.insert(prefix.prefix.as_str()) {
            errors.push(SchemaError::duplicate("prefix", prefix.prefix.as_str()));
        }
    }

    compile_rules(&mut schema, &decls.rules, &mut errors);

    if !errors.is_empty() {
        return Err(SchemaError::collect(errors));
    }

    schema.prefixes = decls.prefixes.clone();
    schema.base_dir = decls.base_dir.clone();
    info!(tables = schema.tables.len(), "Compiled schema");
    Ok(schema)
}

/// Compile tables, columns and datatypes only.
pub fn compile_parts(
    tables: &[TableDecl],
    columns: &[ColumnDecl],
    datatypes: &[DatatypeDecl],
) -> SchemaResult<CompiledSchema> {
    let mut errors = Vec::new();

    let registry = match DatatypeRegistry::build(datatypes) {
        Ok(registry) => Some(registry),
        Err(e) => {
            errors.extend(e.into_errors());
            None
        }
    };

    let mut compiled = collect_tables(tables, &mut errors);
    let declared: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();

    for decl in columns {
        let Some(table) = compiled.get_mut(&decl.table) else {
            errors.push(SchemaError::UnknownTable {
                table: decl.table.to_string(),
                column: decl.name.to_string(),
            });
            continue;
        };
        if let Some(column) = compile_column(decl, registry.as_ref(), &mut errors) {
            if table.columns.contains_key(&column.name) {
                errors.push(SchemaError::duplicate("column", decl.qualified_name()));
                continue;
            }
            if column.primary {
                if let Some(existing) = &table.primary {
                    errors.push(SchemaError::invalid_structure(
                        decl.table.as_str(),
                        decl.name.as_str(),
                        format!("table already has primary key `{}`", existing),
                    ));
                } else {
                    table.primary = Some(column.name.clone());
                }
            }
            table.columns.insert(column.name.clone(), column);
        }
    }

    // Cross-references need every table's columns.
    let snapshot: HashMap<SmolStr, HashMap<SmolStr, SqlType>> = compiled
        .iter()
        .map(|(name, t)| {
            let cols = t
                .columns
                .values()
                .map(|c| (c.name.clone(), c.sql_type))
                .collect();
            (name.clone(), cols)
        })
        .collect();

    for table in compiled.values_mut() {
        link_structures(table, &snapshot, &declared, &mut errors);
    }

    // Under constraints need every table's trees.
    let trees: HashMap<SmolStr, Vec<TreeConstraint>> = compiled
        .iter()
        .map(|(name, t)| (name.clone(), t.trees.clone()))
        .collect();
    for table in compiled.values() {
        for under in &table.unders {
            let has_tree = trees
                .get(&under.tree_table)
                .is_some_and(|ts| ts.iter().any(|t| t.child == under.tree_child));
            if !has_tree {
                errors.push(SchemaError::invalid_structure(
                    table.name.as_str(),
                    under.column.as_str(),
                    format!(
                        "under({}.{}, '{}') refers to a non-existent tree",
                        under.tree_table, under.tree_child, under.value
                    ),
                ));
            }
        }
    }

    match registry {
        Some(registry) if errors.is_empty() => {
            debug!(tables = compiled.len(), "Compiled tables");
            Ok(CompiledSchema {
                registry: Arc::new(registry),
                tables: compiled,
                prefixes: vec![],
                base_dir: PathBuf::new(),
            })
        }
        _ => Err(SchemaError::collect(errors)),
    }
}

fn collect_tables(
    tables: &[TableDecl],
    errors: &mut Vec<SchemaError>,
) -> IndexMap<SmolStr, CompiledTable> {
    let mut compiled = IndexMap::new();
    let mut all_names = HashSet::new();

    for decl in tables {
        if !all_names.insert(decl.name.as_str()) {
            errors.push(SchemaError::duplicate("table", decl.name.as_str()));
            continue;
        }
        if decl.table_type.is_declaration() {
            continue;
        }
        if decl.name == VIOLATION_TABLE || decl.name == PREFIX_TABLE {
            errors.push(SchemaError::reserved(
                decl.name.as_str(),
                "this table name is used by the store",
            ));
            continue;
        }
        compiled.insert(
            decl.name.clone(),
            CompiledTable {
                name: decl.name.clone(),
                path: decl.path.clone(),
                description: decl.description.clone(),
                columns: IndexMap::new(),
                primary: None,
                foreign_keys: vec![],
                trees: vec![],
                unders: vec![],
                rules: vec![],
            },
        );
    }

    for name in compiled.keys() {
        for suffix in [CONFLICT_SUFFIX, VIEW_SUFFIX] {
            if let Some(base) = name.strip_suffix(suffix) {
                if compiled.contains_key(base) {
                    errors.push(SchemaError::reserved(
                        name.as_str(),
                        format!("collides with the `{}` relation of table `{}`", suffix, base),
                    ));
                }
            }
        }
    }

    compiled
}

fn compile_column(
    decl: &ColumnDecl,
    registry: Option<&DatatypeRegistry>,
    errors: &mut Vec<SchemaError>,
) -> Option<CompiledColumn> {
    let before = errors.len();

    if decl.name == ROW_NUMBER || decl.name.ends_with(SOURCE_SUFFIX) {
        errors.push(SchemaError::reserved(
            decl.qualified_name(),
            "this column name is used by the store",
        ));
    }

    let mut sql_type = SqlType::Text;
    if let Some(registry) = registry {
        match registry.resolve(&decl.datatype) {
            Some(dt) => sql_type = dt.sql_type.unwrap_or(SqlType::Text),
            None => errors.push(SchemaError::unknown_datatype(
                decl.table.as_str(),
                decl.name.as_str(),
                decl.datatype.as_str(),
            )),
        }
        if let Some(nulltype) = &decl.nulltype {
            if !registry.contains(nulltype) {
                errors.push(SchemaError::unknown_datatype(
                    decl.table.as_str(),
                    decl.name.as_str(),
                    nulltype.as_str(),
                ));
            }
        }
    }

    let structures = match parse_structure(&decl.structure) {
        Ok(structures) => structures,
        Err(e) => {
            errors.push(SchemaError::invalid_structure(
                decl.table.as_str(),
                decl.name.as_str(),
                e.to_string(),
            ));
            vec![]
        }
    };

    let primary = structures.contains(&Structure::Primary);
    let unique = structures.contains(&Structure::Unique);
    if primary && decl.is_nullable() {
        errors.push(SchemaError::invalid_structure(
            decl.table.as_str(),
            decl.name.as_str(),
            "a primary key cannot have a nulltype or be nullable",
        ));
    }

    if errors.len() > before {
        return None;
    }

    Some(CompiledColumn {
        name: decl.name.clone(),
        datatype: decl.datatype.clone(),
        nulltype: decl.nulltype.clone(),
        nullable: decl.is_nullable(),
        sql_type,
        primary,
        unique,
        tree_child: false,
        structures,
        description: decl.description.clone(),
    })
}

fn link_structures(
    table: &mut CompiledTable,
    snapshot: &HashMap<SmolStr, HashMap<SmolStr, SqlType>>,
    declared: &HashSet<&str>,
    errors: &mut Vec<SchemaError>,
) {
    let own = snapshot.get(&table.name).cloned().unwrap_or_default();
    let mut tree_children = Vec::new();

    for column in table.columns.values() {
        for structure in &column.structures {
            match structure {
                Structure::Primary | Structure::Unique => {}
                Structure::From {
                    table: target,
                    column: target_column,
                } => {
                    let target_name = format!("{}.{}", target, target_column);
                    match snapshot.get(target) {
                        None => {
                            let message = if declared.contains(target.as_str()) {
                                "target is not a data table"
                            } else {
                                "target table is not declared"
                            };
                            errors.push(SchemaError::invalid_foreign_key(
                                table.name.as_str(),
                                column.name.as_str(),
                                target_name,
                                message,
                            ));
                        }
                        Some(cols) if !cols.contains_key(target_column) => {
                            errors.push(SchemaError::invalid_foreign_key(
                                table.name.as_str(),
                                column.name.as_str(),
                                target_name,
                                "target column is not declared",
                            ));
                        }
                        Some(_) => table.foreign_keys.push(ForeignKey {
                            column: column.name.clone(),
                            target_table: target.clone(),
                            target_column: target_column.clone(),
                        }),
                    }
                }
                Structure::Tree { child } => match own.get(child) {
                    None => errors.push(SchemaError::invalid_structure(
                        table.name.as_str(),
                        column.name.as_str(),
                        format!("tree child column `{}` is not declared", child),
                    )),
                    Some(child_type) if *child_type != column.sql_type => {
                        errors.push(SchemaError::invalid_structure(
                            table.name.as_str(),
                            column.name.as_str(),
                            format!(
                                "SQL type {} of tree child `{}` does not match {}",
                                child_type, child, column.sql_type
                            ),
                        ))
                    }
                    Some(_) => {
                        tree_children.push(child.clone());
                        table.trees.push(TreeConstraint {
                            parent: column.name.clone(),
                            child: child.clone(),
                        });
                    }
                },
                Structure::Under {
                    table: tree_table,
                    column: tree_child,
                    value,
                } => table.unders.push(UnderConstraint {
                    column: column.name.clone(),
                    tree_table: tree_table.clone(),
                    tree_child: tree_child.clone(),
                    value: value.clone(),
                }),
            }
        }
    }

    for child in tree_children {
        if let Some(column) = table.columns.get_mut(&child) {
            column.tree_child = true;
        }
    }
}

fn compile_rules(schema: &mut CompiledSchema, rules: &[RuleDecl], errors: &mut Vec<SchemaError>) {
    let registry = Arc::clone(&schema.registry);

    for decl in rules {
        let Some(table) = schema.tables.get_mut(&decl.table) else {
            errors.push(SchemaError::InvalidRule {
                table: decl.table.to_string(),
                message: "table is not declared".to_string(),
            });
            continue;
        };

        let mut problems = Vec::new();
        for column in [&decl.when_column, &decl.then_column] {
            if !table.has_column(column) {
                problems.push(format!("column `{}` is not declared", column));
            }
        }
        let level = Level::from_str(&decl.level);
        if level.is_none() {
            problems.push(format!("invalid level `{}`", decl.level));
        }
        let when = RuleCondition::compile(&decl.when_condition, &registry)
            .map_err(|e| problems.push(format!("when condition: {}", e)))
            .ok();
        let then = RuleCondition::compile(&decl.then_condition, &registry)
            .map_err(|e| problems.push(format!("then condition: {}", e)))
            .ok();

        match (level, when, then) {
            (Some(level), Some(when), Some(then)) if problems.is_empty() => {
                let number = table.rules_for(&decl.when_column).count() + 1;
                table.rules.push(CompiledRule {
                    number,
                    when_column: decl.when_column.clone(),
                    when,
                    then_column: decl.then_column.clone(),
                    then,
                    level,
                    description: decl.description.clone(),
                });
            }
            _ => errors.extend(problems.into_iter().map(|message| SchemaError::InvalidRule {
                table: decl.table.to_string(),
                message,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn datatypes() -> Vec<DatatypeDecl> {
        vec![
            DatatypeDecl::new("text").sql_type(SqlType::Text),
            DatatypeDecl::new("empty").parent("text").condition("equals('')"),
            DatatypeDecl::new("word").parent("text").condition(r"exclude(/\s/)"),
            DatatypeDecl::new("integer")
                .parent("word")
                .condition("match(/-?[0-9]+/)")
                .sql_type(SqlType::Integer),
            DatatypeDecl::new("positive_integer")
                .parent("integer")
                .condition("match(/[1-9][0-9]*/)")
                .description("a positive integer"),
        ]
    }

    fn declarations() -> Declarations {
        Declarations::new()
            .table(TableDecl::new("subject", "subject.tsv"))
            .table(TableDecl::new("specimen", "specimen.tsv"))
            .column(ColumnDecl::new("subject", "id", "positive_integer").structure("primary"))
            .column(ColumnDecl::new("subject", "age", "positive_integer"))
            .column(ColumnDecl::new("subject", "name", "text").nulltype("empty"))
            .column(ColumnDecl::new("specimen", "id", "word").structure("primary"))
            .column(
                ColumnDecl::new("specimen", "subject_id", "positive_integer")
                    .structure("from(subject.id)"),
            )
            .prefix(Prefix::new("OBI", "http://purl.obolibrary.org/obo/OBI_"))
    }

    fn with_datatypes(decls: Declarations) -> Declarations {
        datatypes().into_iter().fold(decls, |d, dt| d.datatype(dt))
    }

    #[test]
    fn test_compile_basic() {
        let schema = compile(&with_datatypes(declarations())).unwrap();

        let names: Vec<_> = schema.table_names().collect();
        assert_eq!(names, vec!["subject", "specimen"]);

        let subject = schema.table("subject").unwrap();
        assert_eq!(subject.primary.as_deref(), Some("id"));
        let id = subject.column("id").unwrap();
        assert_eq!(id.sql_type, SqlType::Integer);
        assert!(id.is_key());
        assert!(subject.column("name").unwrap().nullable);
        assert_eq!(subject.column("name").unwrap().sql_type, SqlType::Text);

        let specimen = schema.table("specimen").unwrap();
        assert_eq!(
            specimen.foreign_keys,
            vec![ForeignKey {
                column: "subject_id".into(),
                target_table: "subject".into(),
                target_column: "id".into(),
            }]
        );
    }

    #[test]
    fn test_ddl() {
        let schema = compile(&with_datatypes(declarations())).unwrap();
        let ddl = schema.table("subject").unwrap().ddl();

        assert_eq!(ddl[0], r#"DROP VIEW IF EXISTS "subject_view""#);
        assert_eq!(
            ddl[3],
            r#"CREATE TABLE "subject" ("row_number" INTEGER NOT NULL, "id" INTEGER PRIMARY KEY, "age" INTEGER, "name" TEXT, "id__source" TEXT, "age__source" TEXT)"#
        );
        assert_eq!(
            ddl[5],
            r#"CREATE TABLE "subject_conflict" ("row_number" INTEGER NOT NULL, "id" INTEGER, "age" INTEGER, "name" TEXT, "id__source" TEXT, "age__source" TEXT)"#
        );
        assert_eq!(
            ddl[6],
            r#"CREATE VIEW "subject_view" AS SELECT * FROM "subject" UNION ALL SELECT * FROM "subject_conflict""#
        );
    }

    #[test]
    fn test_source_columns() {
        let schema = compile(&with_datatypes(declarations())).unwrap();
        let subject = schema.table("subject").unwrap();
        assert_eq!(
            subject.source_columns().collect::<Vec<_>>(),
            vec!["id__source", "age__source"]
        );
        assert_eq!(subject.column("name").unwrap().source_column(), None);
    }

    #[test]
    fn test_expand_curie() {
        let schema = compile(&with_datatypes(declarations())).unwrap();
        assert_eq!(
            schema.expand_curie("OBI:0000070").as_deref(),
            Some("http://purl.obolibrary.org/obo/OBI_0000070")
        );
        assert_eq!(schema.expand_curie("GO:1"), None);
        assert_eq!(schema.expand_curie("nocolon"), None);
    }

    #[test]
    fn test_errors_are_collected() {
        let decls = with_datatypes(
            Declarations::new()
                .table(TableDecl::new("subject", "subject.tsv"))
                .column(ColumnDecl::new("subject", "id", "nope"))
                .column(ColumnDecl::new("subject", "id", "text"))
                .column(ColumnDecl::new("subject", "fk", "text").structure("from(other.id)"))
                .column(ColumnDecl::new("ghost", "x", "text")),
        );

        let errors = compile(&decls).unwrap_err().into_errors();
        assert_eq!(errors.len(), 3, "{:?}", errors);
        assert!(errors.iter().any(|e| matches!(e, SchemaError::UnknownDatatype { .. })));
        assert!(errors.iter().any(|e| matches!(e, SchemaError::InvalidForeignKey { .. })));
        assert!(errors.iter().any(|e| matches!(e, SchemaError::UnknownTable { .. })));
    }

    #[test]
    fn test_duplicate_column() {
        let decls = with_datatypes(
            Declarations::new()
                .table(TableDecl::new("t", "t.tsv"))
                .column(ColumnDecl::new("t", "a", "text"))
                .column(ColumnDecl::new("t", "a", "word")),
        );
        let err = compile(&decls).unwrap_err();
        assert!(matches!(err, SchemaError::Duplicate { .. }));
    }

    #[test]
    fn test_two_primaries() {
        let decls = with_datatypes(
            Declarations::new()
                .table(TableDecl::new("t", "t.tsv"))
                .column(ColumnDecl::new("t", "a", "text").structure("primary"))
                .column(ColumnDecl::new("t", "b", "text").structure("primary")),
        );
        let err = compile(&decls).unwrap_err();
        assert!(err.to_string().contains("t.b"));
    }

    #[test]
    fn test_primary_with_nulltype() {
        let decls = with_datatypes(
            Declarations::new()
                .table(TableDecl::new("t", "t.tsv"))
                .column(ColumnDecl::new("t", "a", "text").structure("primary").nulltype("empty")),
        );
        assert!(matches!(
            compile(&decls).unwrap_err(),
            SchemaError::InvalidStructure { .. }
        ));
    }

    #[test]
    fn test_reserved_names() {
        let decls = with_datatypes(
            Declarations::new()
                .table(TableDecl::new("t", "t.tsv"))
                .table(TableDecl::new("t_view", "v.tsv"))
                .table(TableDecl::new("violation", "x.tsv"))
                .column(ColumnDecl::new("t", "row_number", "text"))
                .column(ColumnDecl::new("t", "age__source", "text")),
        );
        let errors = compile(&decls).unwrap_err().into_errors();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().all(|e| matches!(e, SchemaError::ReservedName { .. })));
    }

    #[test]
    fn test_tree_and_under() {
        let decls = with_datatypes(
            Declarations::new()
                .table(TableDecl::new("term", "term.tsv"))
                .table(TableDecl::new("sample", "sample.tsv"))
                .column(ColumnDecl::new("term", "id", "word"))
                .column(ColumnDecl::new("term", "parent", "word").nulltype("empty").structure("tree(id)"))
                .column(ColumnDecl::new("sample", "kind", "word").structure("under(term.id, 'animal')")),
        );
        let schema = compile(&decls).unwrap();
        let term = schema.table("term").unwrap();
        assert!(term.column("id").unwrap().tree_child);
        assert_eq!(
            term.trees,
            vec![TreeConstraint {
                parent: "parent".into(),
                child: "id".into()
            }]
        );
        assert!(term.ddl().iter().any(|s| s.contains("term_id_tree_idx")));

        let sample = schema.table("sample").unwrap();
        assert_eq!(sample.unders[0].value, "animal");
    }

    #[test]
    fn test_tree_type_mismatch_and_bad_under() {
        let decls = with_datatypes(
            Declarations::new()
                .table(TableDecl::new("term", "term.tsv"))
                .column(ColumnDecl::new("term", "id", "integer"))
                .column(ColumnDecl::new("term", "parent", "word").structure("tree(id)"))
                .column(ColumnDecl::new("term", "kind", "word").structure("under(term.kind, 'x')")),
        );
        let errors = compile(&decls).unwrap_err().into_errors();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, SchemaError::InvalidStructure { .. })));
    }

    #[test]
    fn test_rules() {
        let decls = with_datatypes(declarations())
            .rule(
                RuleDecl::new("subject", "name", "not null", "age", "not null")
                    .level("warning")
                    .description("named subjects need an age"),
            )
            .rule(RuleDecl::new("subject", "name", "equals('x')", "age", "positive_integer"));
        let schema = compile(&decls).unwrap();
        let rules: Vec<_> = schema.table("subject").unwrap().rules_for("name").collect();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].level, Level::Warning);
        assert_eq!(rules[1].number, 2);
        assert!(rules[1].then.holds("5", false));
        assert!(!rules[1].then.holds("-5", false));
    }

    #[test]
    fn test_invalid_rules() {
        let decls = with_datatypes(declarations())
            .rule(RuleDecl::new("subject", "nope", "null", "age", "null"))
            .rule(RuleDecl::new("subject", "name", "null", "age", "null").level("fatal"))
            .rule(RuleDecl::new("subject", "name", "bogus(", "age", "null"))
            .rule(RuleDecl::new("ghost", "a", "null", "b", "null"));
        let errors = compile(&decls).unwrap_err().into_errors();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().all(|e| matches!(e, SchemaError::InvalidRule { .. })));
    }

    #[test]
    fn test_declaration_sheets_are_not_data_tables() {
        let decls = with_datatypes(
            declarations().table(TableDecl::new("column", "column.tsv").with_type(TableType::Column)),
        );
        let schema = compile(&decls).unwrap();
        assert!(schema.table("column").is_none());
    }

    #[test]
    fn test_store_ddl() {
        let ddl = CompiledSchema::store_ddl();
        assert!(ddl[0].starts_with(r#"CREATE TABLE IF NOT EXISTS "violation""#));
        assert!(ddl[2].contains(r#""prefix""#));
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("a\"b"), r#""a""b""#);
    }
}
