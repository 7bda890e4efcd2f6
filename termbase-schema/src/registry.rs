//! The datatype registry.
//!
//! Built once from the datatype declarations. Every datatype is resolved into
//! its predicate chain: its own condition followed by each ancestor's, leaf
//! first, stopping after a datatype that overrides its parent. A value is
//! valid for a datatype iff it satisfies every predicate in the chain.

use std::collections::HashMap;

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::debug;

use crate::ast::{DatatypeDecl, Expression, SqlType};
use crate::condition::Condition;
use crate::error::{SchemaError, SchemaResult};
use crate::parser::parse_condition;

/// One link of a datatype chain.
#[derive(Debug, Clone)]
pub struct Predicate {
    /// Datatype that declared the condition.
    pub datatype: SmolStr,
    /// That datatype's description.
    pub description: String,
    pub condition: Condition,
}

impl Predicate {
    /// Message used when a value fails this predicate.
    pub fn failure_message(&self, column: &str) -> String {
        if self.description.is_empty() {
            format!("{} should be of datatype {}", column, self.datatype)
        } else {
            format!("{} should be {}", column, self.description)
        }
    }
}

/// A datatype with its chain resolved.
#[derive(Debug, Clone)]
pub struct CompiledDatatype {
    pub name: SmolStr,
    pub description: String,
    /// First SQL type declared on the way up the parent chain.
    pub sql_type: Option<SqlType>,
    /// Predicates, leaf first.
    pub chain: Vec<Predicate>,
    /// Names from this datatype to its root.
    pub ancestry: Vec<SmolStr>,
}

impl CompiledDatatype {
    /// The first predicate `value` fails, leaf first.
    pub fn first_failure(&self, value: &str) -> Option<&Predicate> {
        self.chain.iter().find(|p| !p.condition.test(value))
    }

    /// Check if `value` satisfies the whole chain.
    pub fn accepts(&self, value: &str) -> bool {
        self.first_failure(value).is_none()
    }

    /// Check if this datatype is `name` or descends from it.
    pub fn is_a(&self, name: &str) -> bool {
        self.ancestry.iter().any(|a| a == name)
    }
}

/// Immutable lookup of compiled datatypes.
#[derive(Debug, Clone, Default)]
pub struct DatatypeRegistry {
    datatypes: IndexMap<SmolStr, CompiledDatatype>,
}

impl DatatypeRegistry {
    /// Build the registry, reporting every problem found.
    pub fn build(decls: &[DatatypeDecl]) -> SchemaResult<Self> {
        let mut errors = Vec::new();

        let mut by_name: IndexMap<SmolStr, &DatatypeDecl> = IndexMap::new();
        for decl in decls {
            if by_name.insert(decl.name.clone(), decl).is_some() {
                errors.push(SchemaError::duplicate("datatype", decl.name.as_str()));
            }
        }

        for decl in by_name.values() {
            if let Some(parent) = &decl.parent {
                if !by_name.contains_key(parent) {
                    errors.push(SchemaError::UnknownParent {
                        datatype: decl.name.to_string(),
                        parent: parent.to_string(),
                    });
                }
            }
        }

        errors.extend(find_cycles(&by_name));

        if !errors.is_empty() {
            return Err(SchemaError::collect(errors));
        }

        let parsed = parse_all(&by_name, &mut errors);
        let mut conditions: HashMap<SmolStr, Condition> = HashMap::new();
        for name in by_name.keys() {
            if let Some(expr) = parsed.get(name) {
                let mut visiting = vec![name.clone()];
                match compile_with_references(expr, &parsed, &mut visiting) {
                    Ok(condition) => {
                        conditions.insert(name.clone(), condition);
                    }
                    Err(message) => errors.push(SchemaError::InvalidCondition {
                        datatype: name.to_string(),
                        condition: by_name[name].condition.clone().unwrap_or_default(),
                        message,
                    }),
                }
            }
        }

        if !errors.is_empty() {
            return Err(SchemaError::collect(errors));
        }

        let datatypes = by_name
            .keys()
            .map(|name| (name.clone(), resolve_chain(name, &by_name, &conditions)))
            .collect();

        debug!(count = by_name.len(), "Built datatype registry");
        Ok(Self { datatypes })
    }

    /// Look up a compiled datatype.
    pub fn resolve(&self, name: &str) -> Option<&CompiledDatatype> {
        self.datatypes.get(name)
    }

    /// Check if a datatype is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.datatypes.contains_key(name)
    }

    /// Compile an ad-hoc condition (as used by rules) against this registry.
    ///
    /// A bare datatype name stands for that datatype's whole chain.
    pub fn compile_condition(&self, text: &str) -> Result<Vec<Condition>, String> {
        let expr = parse_condition(text).map_err(|e| e.to_string())?;
        if let Expression::Label(name) = &expr {
            return self
                .resolve(name)
                .map(|dt| dt.chain.iter().map(|p| p.condition.clone()).collect())
                .ok_or_else(|| format!("unknown datatype `{}`", name));
        }
        Condition::compile(&expr, &mut |name| {
            Err(format!("unknown datatype `{}`", name))
        })
        .map(|c| vec![c])
    }

    /// Iterate datatypes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &CompiledDatatype> {
        self.datatypes.values()
    }

    pub fn len(&self) -> usize {
        self.datatypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datatypes.is_empty()
    }
}

/// Walk every parent chain once, reporting each cycle a single time.
fn find_cycles(by_name: &IndexMap<SmolStr, &DatatypeDecl>) -> Vec<SchemaError> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Visiting,
        Done,
    }

    let mut state: HashMap<&str, State> = HashMap::new();
    let mut errors = Vec::new();

    for start in by_name.keys() {
        let mut path: Vec<&str> = Vec::new();
        let mut current = Some(start.as_str());

        while let Some(name) = current {
            match state.get(name) {
                Some(State::Done) => break,
                Some(State::Visiting) => {
                    let from = path.iter().position(|n| *n == name).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[from..].iter().map(|n| n.to_string()).collect();
                    cycle.push(name.to_string());
                    errors.push(SchemaError::CyclicDatatype { cycle });
                    break;
                }
                None => {
                    state.insert(name, State::Visiting);
                    path.push(name);
                    current = by_name
                        .get(name)
                        .and_then(|d| d.parent.as_deref());
                }
            }
        }

        for name in path {
            state.insert(name, State::Done);
        }
    }

    errors
}

fn parse_all(
    by_name: &IndexMap<SmolStr, &DatatypeDecl>,
    errors: &mut Vec<SchemaError>,
) -> HashMap<SmolStr, Expression> {
    let mut parsed = HashMap::new();
    for (name, decl) in by_name {
        let Some(text) = decl.condition.as_deref() else {
            continue;
        };
        match parse_condition(text) {
            Ok(expr) => {
                parsed.insert(name.clone(), expr);
            }
            Err(e) => errors.push(SchemaError::InvalidCondition {
                datatype: name.to_string(),
                condition: text.to_string(),
                message: e.to_string(),
            }),
        }
    }
    parsed
}

/// Compile a condition, following bare datatype names to their own conditions.
fn compile_with_references(
    expr: &Expression,
    parsed: &HashMap<SmolStr, Expression>,
    visiting: &mut Vec<SmolStr>,
) -> Result<Condition, String> {
    Condition::compile(expr, &mut |name| {
        if visiting.iter().any(|v| v == name) {
            return Err(format!("condition refers back to `{}`", name));
        }
        let target = parsed
            .get(name)
            .ok_or_else(|| format!("`{}` is not a datatype with a condition", name))?;
        visiting.push(name.into());
        let result = compile_with_references(target, parsed, visiting);
        visiting.pop();
        result
    })
}

fn resolve_chain(
    name: &SmolStr,
    by_name: &IndexMap<SmolStr, &DatatypeDecl>,
    conditions: &HashMap<SmolStr, Condition>,
) -> CompiledDatatype {
    let mut chain = Vec::new();
    let mut ancestry = Vec::new();
    let mut sql_type = None;
    let mut collecting = true;
    let mut current = by_name.get(name).copied();

    while let Some(decl) = current {
        ancestry.push(decl.name.clone());
        if sql_type.is_none() {
            sql_type = decl.sql_type;
        }
        if collecting {
            if let Some(condition) = conditions.get(&decl.name) {
                chain.push(Predicate {
                    datatype: decl.name.clone(),
                    description: decl.description.clone(),
                    condition: condition.clone(),
                });
            }
            if decl.override_parent {
                collecting = false;
            }
        }
        current = decl.parent.as_ref().and_then(|p| by_name.get(p).copied());
    }

    let description = by_name
        .get(name)
        .map(|d| d.description.clone())
        .unwrap_or_default();

    CompiledDatatype {
        name: name.clone(),
        description,
        sql_type,
        chain,
        ancestry,
    }
}
