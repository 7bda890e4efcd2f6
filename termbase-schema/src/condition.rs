//! Compiled value predicates.

use regex_lite::Regex;

use crate::ast::Expression;

/// A compiled condition, ready to test raw cell values.
#[derive(Debug, Clone)]
pub enum Condition {
    /// `equals('x')`
    Equals(String),
    /// `in('a', 'b')`
    In(Vec<String>),
    /// `match(/re/)`: the whole value must match.
    Match(Regex),
    /// `search(/re/)`: some part of the value must match.
    Search(Regex),
    /// `exclude(/re/)`: no part of the value may match.
    Exclude(Regex),
    /// `range(min, max)`: inclusive numeric bounds.
    Range { min: f64, max: f64 },
}

impl Condition {
    /// Compile a parsed expression.
    ///
    /// A bare label is looked up through `resolve`, which returns the condition
    /// of the datatype with that name.
    pub fn compile(
        expr: &Expression,
        resolve: &mut dyn FnMut(&str) -> Result<Condition, String>,
    ) -> Result<Self, String> {
        match expr {
            Expression::Label(name) => resolve(name),
            Expression::Function { name, args } => match name.as_str() {
                "equals" => match args.as_slice() {
                    [arg] => literal(arg).map(Self::Equals),
                    _ => Err("equals() takes exactly one argument".to_string()),
                },
                "in" => {
                    if args.is_empty() {
                        return Err("in() needs at least one argument".to_string());
                    }
                    args.iter()
                        .map(literal)
                        .collect::<Result<Vec<_>, _>>()
                        .map(Self::In)
                }
                "match" => regex_arg(name, args, true).map(Self::Match),
                "search" => regex_arg(name, args, false).map(Self::Search),
                "exclude" => regex_arg(name, args, false).map(Self::Exclude),
                "range" => match args.as_slice() {
                    [Expression::Number(min), Expression::Number(max)] if min <= max => {
                        Ok(Self::Range {
                            min: *min,
                            max: *max,
                        })
                    }
                    [Expression::Number(_), Expression::Number(_)] => {
                        Err("range() minimum is greater than maximum".to_string())
                    }
                    _ => Err("range() takes two numbers".to_string()),
                },
                other => Err(format!("unknown condition function `{}`", other)),
            },
            other => Err(format!("`{}` is not a condition", other)),
        }
    }

    /// Test a raw value.
    pub fn test(&self, value: &str) -> bool {
        match self {
            Self::Equals(expected) => value == expected,
            Self::In(options) => options.iter().any(|o| o == value),
            Self::Match(re) | Self::Search(re) => re.is_match(value),
            Self::Exclude(re) => !re.is_match(value),
            Self::Range { min, max } => value
                .trim()
                .parse::<f64>()
                .map(|n| n >= *min && n <= *max)
                .unwrap_or(false),
        }
    }
}

fn literal(expr: &Expression) -> Result<String, String> {
    expr.as_text()
        .ok_or_else(|| format!("expected a literal, found `{}`", expr))
}

fn regex_arg(name: &str, args: &[Expression], anchored: bool) -> Result<Regex, String> {
    let [Expression::Regex { pattern, flags }] = args else {
        return Err(format!("{}() takes one /regex/ argument", name));
    };

    let mut source = String::new();
    if !flags.is_empty() {
        if let Some(bad) = flags.chars().find(|c| !"imsxU".contains(*c)) {
            return Err(format!("unsupported regex flag `{}`", bad));
        }
        source.push_str(&format!("(?{})", flags));
    }
    if anchored {
        source.push_str(&format!("^(?:{})$", pattern));
    } else {
        source.push_str(pattern);
    }

    Regex::new(&source).map_err(|e| e.to_string())
}
