//! Parsed condition and structure expressions.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// An expression from a condition or structure cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// A bare name, such as `primary` or a datatype name.
    Label(SmolStr),
    /// A `table.column` reference.
    Field { table: SmolStr, column: SmolStr },
    /// A quoted string with escapes resolved.
    Str(String),
    /// A numeric literal.
    Number(f64),
    /// A `/pattern/flags` literal.
    Regex { pattern: String, flags: SmolStr },
    /// A call such as `in('a', 'b')`.
    Function { name: SmolStr, args: Vec<Expression> },
}

impl Expression {
    /// Get the label name, if this is a label.
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Self::Label(name) => Some(name),
            _ => None,
        }
    }

    /// Get a textual literal: a string, a label or a number as written.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s.clone()),
            Self::Label(name) => Some(name.to_string()),
            Self::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Get the function name and arguments, if this is a call.
    pub fn as_function(&self) -> Option<(&str, &[Expression])> {
        match self {
            Self::Function { name, args } => Some((name, args)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Label(name) => write!(f, "{}", name),
            Self::Field { table, column } => write!(f, "{}.{}", table, column),
            Self::Str(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Self::Number(n) => write!(f, "{}", n),
            Self::Regex { pattern, flags } => write!(f, "/{}/{}", pattern.replace('/', "\\/"), flags),
            Self::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_function() {
        let expr = Expression::Function {
            name: "in".into(),
            args: vec![Expression::Str("a".into()), Expression::Str("it's".into())],
        };
        assert_eq!(expr.to_string(), r"in('a', 'it\'s')");
    }

    #[test]
    fn test_display_regex() {
        let expr = Expression::Regex {
            pattern: "a/b".into(),
            flags: "i".into(),
        };
        assert_eq!(expr.to_string(), r"/a\/b/i");
    }

    #[test]
    fn test_as_text() {
        assert_eq!(Expression::Label("x".into()).as_text(), Some("x".into()));
        assert_eq!(Expression::Number(3.0).as_text(), Some("3".into()));
        assert_eq!(
            Expression::Field {
                table: "a".into(),
                column: "b".into()
            }
            .as_text(),
            None
        );
    }
}
