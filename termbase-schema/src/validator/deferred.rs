//! Checks that run once whole tables are available.
//!
//! These are pure functions over collected column values so the loader can
//! feed them from the current load or from the store alike.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexMap;

use super::{Violation, ViolationRule};
use crate::compiler::{ForeignKey, TreeConstraint, UnderConstraint};

/// Non-null values of one column, keyed by 1-based row, in row order.
pub type ColumnValues = IndexMap<usize, String>;

/// Report every value of `fk.column` absent from the target column.
///
/// `targets` is `None` when the target table has neither been loaded nor
/// stored, in which case every value is unresolved.
pub fn check_foreign_keys(
    table: &str,
    fk: &ForeignKey,
    values: &ColumnValues,
    targets: Option<&HashSet<String>>,
) -> Vec<Violation> {
    values
        .iter()
        .filter(|(_, value)| !targets.is_some_and(|t| t.contains(value.as_str())))
        .map(|(row, value)| {
            Violation::error(
                table,
                *row,
                fk.column.as_str(),
                ViolationRule::ForeignKey,
                format!(
                    "Value {} of column {} is not in {}.{}",
                    value, fk.column, fk.target_table, fk.target_column
                ),
                value.as_str(),
            )
        })
        .collect()
}

/// Check a tree after its table is fully read: every parent must appear in
/// the child column, and following parents must never lead back to a child.
pub fn check_tree(
    table: &str,
    tree: &TreeConstraint,
    children: &ColumnValues,
    parents: &ColumnValues,
) -> Vec<Violation> {
    let known: HashSet<&str> = children.values().map(String::as_str).collect();
    let mut violations = Vec::new();

    for (row, parent) in parents {
        if !known.contains(parent.as_str()) {
            violations.push(Violation::error(
                table,
                *row,
                tree.parent.as_str(),
                ViolationRule::ForeignKey,
                format!(
                    "Value {} of column {} is not in column {}",
                    parent, tree.parent, tree.child
                ),
                parent.as_str(),
            ));
        }
    }

    // child value -> parent value; the first row wins for repeated children.
    let mut edges: IndexMap<&str, &str> = IndexMap::new();
    for (row, parent) in parents {
        if let Some(child) = children.get(row) {
            edges.entry(child.as_str()).or_insert(parent.as_str());
        }
    }

    let cycles = find_cycles(&edges);
    for (row, parent) in parents {
        let Some(child) = children.get(row) else {
            continue;
        };
        if edges.get(child.as_str()) != Some(&parent.as_str()) {
            continue;
        }
        if let Some(cycle) = cycles.get(child.as_str()) {
            violations.push(Violation::error(
                table,
                *row,
                tree.parent.as_str(),
                ViolationRule::Tree,
                format!(
                    "Cyclic dependency: {} for tree({}) of {}",
                    cycle_path(cycle, child),
                    tree.child,
                    tree.parent
                ),
                parent.as_str(),
            ));
        }
    }

    violations.sort_by_key(|v| v.row);
    violations
}

/// Check an `under` constraint against the tree of another (or the same) table.
///
/// A value must be a node of the tree (present in its child column) and sit at
/// or below the anchor value.
pub fn check_under(
    table: &str,
    under: &UnderConstraint,
    values: &ColumnValues,
    tree_children: &ColumnValues,
    tree_parents: &ColumnValues,
) -> Vec<Violation> {
    let nodes: HashSet<&str> = tree_children.values().map(String::as_str).collect();
    let allowed = subtree(tree_children, tree_parents, &under.value);

    values
        .iter()
        .filter_map(|(row, value)| {
            let message = if !nodes.contains(value.as_str()) {
                format!(
                    "Value {} of column {} is not in {}.{}",
                    value, under.column, under.tree_table, under.tree_child
                )
            } else if !allowed.contains(value.as_str()) {
                format!(
                    "Value '{}' of column {} is not under '{}'",
                    value, under.column, under.value
                )
            } else {
                return None;
            };
            Some(Violation::error(
                table,
                *row,
                under.column.as_str(),
                ViolationRule::Under,
                message,
                value.as_str(),
            ))
        })
        .collect()
}

/// Nodes of a tree at or below `root`, given its child and parent columns.
pub fn subtree<'a>(
    tree_children: &'a ColumnValues,
    tree_parents: &'a ColumnValues,
    root: &'a str,
) -> HashSet<&'a str> {
    let mut below: HashMap<&str, Vec<&str>> = HashMap::new();
    for (row, child) in tree_children {
        if let Some(parent) = tree_parents.get(row) {
            below.entry(parent.as_str()).or_default().push(child.as_str());
        }
    }

    let mut nodes = HashSet::new();
    let mut queue = VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        if nodes.insert(node) {
            if let Some(kids) = below.get(node) {
                queue.extend(kids.iter().copied());
            }
        }
    }
    nodes
}

/// Map every node on a cycle to the cycle it belongs to.
fn find_cycles<'a>(edges: &IndexMap<&'a str, &'a str>) -> HashMap<&'a str, Vec<&'a str>> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Visiting,
        Done,
    }

    let mut state: HashMap<&str, State> = HashMap::new();
    let mut cycles: HashMap<&str, Vec<&str>> = HashMap::new();

    for &start in edges.keys() {
        let mut path: Vec<&str> = Vec::new();
        let mut current = Some(start);

        while let Some(node) = current {
            match state.get(node) {
                Some(State::Done) => break,
                Some(State::Visiting) => {
                    let from = path.iter().position(|n| *n == node).unwrap_or(0);
                    let cycle: Vec<&str> = path[from..].to_vec();
                    for member in &cycle {
                        cycles.insert(member, cycle.clone());
                    }
                    break;
                }
                None => {
                    state.insert(node, State::Visiting);
                    path.push(node);
                    current = edges.get(node).copied();
                }
            }
        }

        for node in path {
            state.insert(node, State::Done);
        }
    }

    cycles
}

/// Render a cycle starting from `start`: `a -> b -> a`.
fn cycle_path(cycle: &[&str], start: &str) -> String {
    let offset = cycle.iter().position(|n| *n == start).unwrap_or(0);
    let mut nodes: Vec<&str> = cycle[offset..]
        .iter()
        .chain(cycle[..offset].iter())
        .copied()
        .collect();
    nodes.push(start);
    nodes.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn values(pairs: &[(usize, &str)]) -> ColumnValues {
        pairs.iter().map(|(r, v)| (*r, v.to_string())).collect()
    }

    fn fk() -> ForeignKey {
        ForeignKey {
            column: "subject_id".into(),
            target_table: "subject".into(),
            target_column: "id".into(),
        }
    }

    fn tree() -> TreeConstraint {
        TreeConstraint {
            parent: "parent".into(),
            child: "id".into(),
        }
    }

    #[test]
    fn test_foreign_keys_resolved() {
        let targets: HashSet<String> = ["1", "2"].iter().map(|s| s.to_string()).collect();
        let vals = values(&[(1, "1"), (2, "3"), (3, "2")]);

        let violations = check_foreign_keys("specimen", &fk(), &vals, Some(&targets));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].row, 2);
        assert_eq!(violations[0].rule, ViolationRule::ForeignKey);
        assert_eq!(violations[0].message, "Value 3 of column subject_id is not in subject.id");
    }

    #[test]
    fn test_foreign_keys_absent_table() {
        let vals = values(&[(1, "1"), (2, "2")]);
        let violations = check_foreign_keys("specimen", &fk(), &vals, None);
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn test_tree_missing_parent() {
        let children = values(&[(1, "animal"), (2, "dog"), (3, "cat")]);
        let parents = values(&[(2, "animal"), (3, "mammal")]);

        let violations = check_tree("term", &tree(), &children, &parents);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].row, 3);
        assert_eq!(violations[0].column, "parent");
        assert_eq!(violations[0].rule, ViolationRule::ForeignKey);
    }

    #[test]
    fn test_tree_forward_reference_is_fine() {
        let children = values(&[(1, "dog"), (2, "animal")]);
        let parents = values(&[(1, "animal")]);
        assert!(check_tree("term", &tree(), &children, &parents).is_empty());
    }

    #[test]
    fn test_tree_cycle() {
        let children = values(&[(1, "a"), (2, "b"), (3, "c"), (4, "d")]);
        let parents = values(&[(1, "b"), (2, "c"), (3, "a"), (4, "a")]);

        let violations = check_tree("term", &tree(), &children, &parents);
        let rows: Vec<_> = violations.iter().map(|v| v.row).collect();
        assert_eq!(rows, vec![1, 2, 3]);
        assert!(violations.iter().all(|v| v.rule == ViolationRule::Tree));
        assert_eq!(
            violations[0].message,
            "Cyclic dependency: a -> b -> c -> a for tree(id) of parent"
        );
    }

    #[test]
    fn test_tree_self_loop() {
        let children = values(&[(1, "a")]);
        let parents = values(&[(1, "a")]);
        let violations = check_tree("term", &tree(), &children, &parents);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, ViolationRule::Tree);
    }

    #[test]
    fn test_under() {
        let under = UnderConstraint {
            column: "kind".into(),
            tree_table: "term".into(),
            tree_child: "id".into(),
            value: "animal".into(),
        };
        let children = values(&[(1, "thing"), (2, "animal"), (3, "dog"), (4, "rock")]);
        let parents = values(&[(2, "thing"), (3, "animal"), (4, "thing")]);
        let vals = values(&[(1, "dog"), (2, "animal"), (3, "rock"), (4, "unicorn")]);

        let violations = check_under("sample", &under, &vals, &children, &parents);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].row, 3);
        assert_eq!(violations[0].message, "Value 'rock' of column kind is not under 'animal'");
        assert_eq!(violations[1].row, 4);
        assert_eq!(violations[1].message, "Value unicorn of column kind is not in term.id");
    }

    #[test]
    fn test_subtree() {
        let children = values(&[(1, "thing"), (2, "animal"), (3, "dog"), (4, "rock"), (5, "pug")]);
        let parents = values(&[(2, "thing"), (3, "animal"), (4, "thing"), (5, "dog")]);

        let mut nodes: Vec<&str> = subtree(&children, &parents, "animal").into_iter().collect();
        nodes.sort();
        assert_eq!(nodes, vec!["animal", "dog", "pug"]);
        assert_eq!(subtree(&children, &parents, "pug").len(), 1);
    }
}
