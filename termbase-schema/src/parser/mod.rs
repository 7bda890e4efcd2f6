//! Parsers for condition cells, structure cells and declaration sheets.

mod declarations;
mod grammar;
pub mod tsv;

use pest::Parser;
use pest::iterators::Pair;

use crate::ast::*;
use crate::error::{SchemaError, SchemaResult};

pub use declarations::{load_declarations, parse_declarations, DeclarationSheets};
pub use grammar::{ExpressionParser, Rule};

/// Parse a condition cell into a single expression.
pub fn parse_condition(input: &str) -> SchemaResult<Expression> {
    let input = input.trim();
    let mut pairs = ExpressionParser::parse(Rule::condition_root, input)
        .map_err(|e| syntax_error(input, e))?;

    pairs
        .next()
        .and_then(|root| root.into_inner().find(|p| p.as_rule() != Rule::EOI))
        .map(build_expression)
        .transpose()?
        .ok_or_else(|| SchemaError::syntax(input, 0, input.len(), "empty condition"))
}

/// Parse a structure cell into zero or more structures.
pub fn parse_structure(input: &str) -> SchemaResult<Vec<Structure>> {
    let input = input.trim();
    let mut pairs = ExpressionParser::parse(Rule::structure_root, input)
        .map_err(|e| syntax_error(input, e))?;

    let Some(root) = pairs.next() else {
        return Ok(vec![]);
    };

    let mut structures = Vec::new();
    for pair in root.into_inner() {
        if pair.as_rule() == Rule::EOI {
            continue;
        }
        let span = pair.as_span();
        let expr = build_expression(pair)?;
        let structure = Structure::from_expression(&expr)
            .map_err(|msg| SchemaError::syntax(input, span.start(), span.end() - span.start(), msg))?;
        structures.push(structure);
    }
    Ok(structures)
}

fn syntax_error(input: &str, err: pest::error::Error<Rule>) -> SchemaError {
    let (offset, len) = match err.location {
        pest::error::InputLocation::Pos(pos) => (pos, 0),
        pest::error::InputLocation::Span((start, end)) => (start, end - start),
    };
    let message = err.variant.message().to_string();
    SchemaError::syntax(input, offset, len, message)
}

fn build_expression(pair: Pair<'_, Rule>) -> SchemaResult<Expression> {
    let text = pair.as_str();
    match pair.as_rule() {
        Rule::label => Ok(Expression::Label(text.trim().into())),
        Rule::number => text
            .parse::<f64>()
            .map(Expression::Number)
            .map_err(|e| SchemaError::syntax(text, 0, text.len(), e.to_string())),
        Rule::field => {
            let mut names = pair.into_inner();
            let table = names.next().map(|p| p.as_str()).unwrap_or_default();
            let column = names.next().map(|p| p.as_str()).unwrap_or_default();
            Ok(Expression::Field {
                table: table.into(),
                column: column.into(),
            })
        }
        Rule::string => {
            let inner = pair.into_inner().next().map(|p| p.as_str()).unwrap_or_default();
            Ok(Expression::Str(unescape(inner)))
        }
        Rule::regex => {
            let mut parts = pair.into_inner();
            let pattern = parts.next().map(|p| p.as_str()).unwrap_or_default();
            let flags = parts.next().map(|p| p.as_str()).unwrap_or_default();
            Ok(Expression::Regex {
                pattern: pattern.replace("\\/", "/"),
                flags: flags.into(),
            })
        }
        Rule::function => {
            let mut inner = pair.into_inner();
            let name = inner.next().map(|p| p.as_str()).unwrap_or_default();
            let args = inner.map(build_expression).collect::<SchemaResult<Vec<_>>>()?;
            Ok(Expression::Function {
                name: name.into(),
                args,
            })
        }
        other => Err(SchemaError::syntax(
            text,
            0,
            text.len(),
            format!("unexpected {:?}", other),
        )),
    }
}

/// Resolve backslash escapes inside a quoted string.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_condition_label() {
        assert_eq!(
            parse_condition("word").unwrap(),
            Expression::Label("word".into())
        );
    }

    #[test]
    fn test_parse_condition_equals() {
        assert_eq!(
            parse_condition("equals('it\\'s')").unwrap(),
            Expression::Function {
                name: "equals".into(),
                args: vec![Expression::Str("it's".into())],
            }
        );
    }

    #[test]
    fn test_parse_condition_in() {
        let expr = parse_condition(r#"in('a', "b", c)"#).unwrap();
        let (name, args) = expr.as_function().unwrap();
        assert_eq!(name, "in");
        assert_eq!(
            args,
            &[
                Expression::Str("a".into()),
                Expression::Str("b".into()),
                Expression::Label("c".into()),
            ]
        );
    }

    #[test]
    fn test_parse_condition_regex() {
        let expr = parse_condition(r"match(/^[1-9]\d*$/)").unwrap();
        assert_eq!(
            expr,
            Expression::Function {
                name: "match".into(),
                args: vec![Expression::Regex {
                    pattern: r"^[1-9]\d*$".into(),
                    flags: "".into(),
                }],
            }
        );

        let expr = parse_condition(r"search(/a\/b/i)").unwrap();
        let (_, args) = expr.as_function().unwrap();
        assert_eq!(
            args[0],
            Expression::Regex {
                pattern: "a/b".into(),
                flags: "i".into(),
            }
        );
    }

    #[test]
    fn test_parse_condition_range() {
        let expr = parse_condition("range(-1.5, 120)").unwrap();
        let (_, args) = expr.as_function().unwrap();
        assert_eq!(args, &[Expression::Number(-1.5), Expression::Number(120.0)]);
    }

    #[test]
    fn test_parse_condition_errors() {
        assert!(matches!(
            parse_condition("match(/open"),
            Err(SchemaError::SyntaxError { .. })
        ));
        assert!(parse_condition("").is_err());
        assert!(parse_condition("word other").is_err());
    }

    #[test]
    fn test_parse_structure() {
        let structures = parse_structure("primary").unwrap();
        assert_eq!(structures, vec![Structure::Primary]);

        let structures = parse_structure("unique from(subject.id)").unwrap();
        assert_eq!(
            structures,
            vec![
                Structure::Unique,
                Structure::From {
                    table: "subject".into(),
                    column: "id".into()
                }
            ]
        );

        assert_eq!(parse_structure("").unwrap(), vec![]);
        assert_eq!(parse_structure("  ").unwrap(), vec![]);
    }

    #[test]
    fn test_parse_structure_under() {
        let structures = parse_structure("under(term.id, 'NCBITaxon:1')").unwrap();
        assert_eq!(
            structures,
            vec![Structure::Under {
                table: "term".into(),
                column: "id".into(),
                value: "NCBITaxon:1".into(),
            }]
        );
    }

    #[test]
    fn test_parse_structure_unknown() {
        let err = parse_structure("primary indexed").unwrap_err();
        match err {
            SchemaError::SyntaxError { span, message, .. } => {
                assert_eq!(span.offset(), 8);
                assert!(message.contains("indexed"));
            }
            other => panic!("Expected SyntaxError, got {:?}", other),
        }
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\tb"), "a\tb");
        assert_eq!(unescape(r"\\"), "\\");
        assert_eq!(unescape("plain"), "plain");
    }
}
