//! Column structure annotations.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::Expression;

/// A relational role declared in a column's `structure` cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Structure {
    /// `primary`: the table's primary key.
    Primary,
    /// `unique`: values must not repeat.
    Unique,
    /// `from(table.column)`: values must exist in the target column.
    From { table: SmolStr, column: SmolStr },
    /// `tree(child)`: this column holds the parent of the row's `child` value.
    Tree { child: SmolStr },
    /// `under(table.column, value)`: values must sit at or below `value` in a tree.
    Under {
        table: SmolStr,
        column: SmolStr,
        value: String,
    },
}

impl Structure {
    /// Interpret one parsed structure expression.
    pub fn from_expression(expr: &Expression) -> Result<Self, String> {
        match expr {
            Expression::Label(name) => match name.as_str() {
                "primary" => Ok(Self::Primary),
                "unique" => Ok(Self::Unique),
                other => Err(format!("unknown structure `{}`", other)),
            },
            Expression::Function { name, args } => match (name.as_str(), args.as_slice()) {
                ("from", [Expression::Field { table, column }]) => Ok(Self::From {
                    table: table.clone(),
                    column: column.clone(),
                }),
                ("tree", [Expression::Label(child)]) => Ok(Self::Tree {
                    child: child.clone(),
                }),
                ("under", [Expression::Field { table, column }, value]) => {
                    let value = value
                        .as_text()
                        .ok_or_else(|| format!("invalid under value `{}`", value))?;
                    Ok(Self::Under {
                        table: table.clone(),
                        column: column.clone(),
                        value,
                    })
                }
                ("from" | "tree" | "under", _) => Err(format!("invalid arguments in `{}`", expr)),
                (other, _) => Err(format!("unknown structure `{}`", other)),
            },
            other => Err(format!("unexpected `{}` in structure", other)),
        }
    }

    /// Check if this structure makes the column a key.
    pub fn is_key(&self) -> bool {
        matches!(self, Self::Primary | Self::Unique)
    }
}

impl std::fmt::Display for Structure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Unique => write!(f, "unique"),
            Self::From { table, column } => write!(f, "from({}.{})", table, column),
            Self::Tree { child } => write!(f, "tree({})", child),
            Self::Under {
                table,
                column,
                value,
            } => write!(f, "under({}.{}, '{}')", table, column, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Expression>) -> Expression {
        Expression::Function {
            name: name.into(),
            args,
        }
    }

    fn field(table: &str, column: &str) -> Expression {
        Expression::Field {
            table: table.into(),
            column: column.into(),
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(
            Structure::from_expression(&Expression::Label("primary".into())),
            Ok(Structure::Primary)
        );
        assert_eq!(
            Structure::from_expression(&Expression::Label("unique".into())),
            Ok(Structure::Unique)
        );
        assert!(Structure::from_expression(&Expression::Label("index".into())).is_err());
    }

    #[test]
    fn test_from() {
        let s = Structure::from_expression(&call("from", vec![field("subject", "id")])).unwrap();
        assert_eq!(
            s,
            Structure::From {
                table: "subject".into(),
                column: "id".into()
            }
        );
        assert_eq!(s.to_string(), "from(subject.id)");
    }

    #[test]
    fn test_tree_requires_label() {
        assert!(Structure::from_expression(&call("tree", vec![field("a", "b")])).is_err());
        let s = Structure::from_expression(&call("tree", vec![Expression::Label("id".into())]));
        assert_eq!(s, Ok(Structure::Tree { child: "id".into() }));
    }

    #[test]
    fn test_under() {
        let s = Structure::from_expression(&call(
            "under",
            vec![field("term", "id"), Expression::Str("animal".into())],
        ))
        .unwrap();
        assert_eq!(
            s,
            Structure::Under {
                table: "term".into(),
                column: "id".into(),
                value: "animal".into()
            }
        );
        assert!(!s.is_key());
    }
}
