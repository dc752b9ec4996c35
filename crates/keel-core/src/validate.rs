//! Structural checks over table descriptors.
//!
//! Per-table checks run on their own (the derive macro uses them at expansion
//! time); cross-table checks need every table of one database. Each check
//! reports independently, nothing short-circuits.

use std::collections::{BTreeMap, HashMap};

use crate::descriptor::TableDescriptor;
use crate::error::ValidationError;

/// Runs every per-table check.
///
/// Diagnostics come out in declaration order: duplicate column names (one
/// per offending column), then an empty table, then primary-key cardinality.
#[must_use]
pub fn validate_table(table: &TableDescriptor) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    duplicate_columns(table, &mut errors);

    if table.columns.is_empty() {
        errors.push(ValidationError::NoColumnDefined {
            table: table.name.clone(),
        });
    }

    let keys: Vec<String> = table
        .columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.clone())
        .collect();
    if keys.len() > 1 {
        errors.push(ValidationError::MultiplePrimaryKeys {
            table: table.name.clone(),
            columns: keys,
        });
    }
    errors
}

fn duplicate_columns(table: &TableDescriptor, errors: &mut Vec<ValidationError>) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for column in &table.columns {
        *counts.entry(column.name.to_lowercase()).or_default() += 1;
    }
    for column in &table.columns {
        let lower = column.name.to_lowercase();
        if counts.get(&lower).is_some_and(|&n| n > 1) {
            errors.push(ValidationError::DuplicateColumnName {
                table: table.name.clone(),
                name: lower,
                column: column.name.clone(),
                field: column.field.clone(),
            });
        }
    }
}

/// Runs the checks that need the whole set of tables.
///
/// Covers duplicate table names, association targets outside the set or
/// without a primary key column, colliding index names and association
/// cycles (a table referencing itself is a cycle too). Names are compared
/// ignoring case, like the engine does.
#[must_use]
pub fn validate_tables<T: AsRef<TableDescriptor>>(tables: &[T]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut by_name: BTreeMap<String, Vec<&TableDescriptor>> = BTreeMap::new();
    for table in tables.iter().map(AsRef::as_ref) {
        by_name.entry(table.name.to_lowercase()).or_default().push(table);
    }
    for (name, group) in by_name.iter().filter(|(_, g)| g.len() > 1) {
        for table in group {
            errors.push(ValidationError::DuplicateTableName {
                name: name.clone(),
                model: table.model.clone(),
            });
        }
    }

    for table in tables.iter().map(AsRef::as_ref) {
        for association in &table.associations {
            match by_name.get(&association.target_table.to_lowercase()) {
                None => errors.push(ValidationError::UnknownAssociationTarget {
                    table: table.name.clone(),
                    column: association.column.clone(),
                    target: association.target_table.clone(),
                }),
                Some(group) if group.iter().any(|t| t.primary_key_column().is_none()) => {
                    errors.push(ValidationError::AssociationTargetWithoutKey {
                        table: table.name.clone(),
                        column: association.column.clone(),
                        target: association.target_table.clone(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    index_collisions(&by_name, &mut errors);
    association_cycles(&by_name, &mut errors);
    errors
}

/// Index names share one namespace with tables in the engine; a clash would
/// make `CREATE INDEX IF NOT EXISTS` silently skip the second index.
fn index_collisions(
    by_name: &BTreeMap<String, Vec<&TableDescriptor>>,
    errors: &mut Vec<ValidationError>,
) {
    // Tables with a duplicated name are already reported.
    let tables: Vec<&TableDescriptor> = by_name
        .values()
        .filter(|group| group.len() == 1)
        .flatten()
        .copied()
        .collect();

    let mut owners: BTreeMap<String, Vec<(&str, &str)>> = BTreeMap::new();
    for table in &tables {
        for column in table.columns.iter().filter(|c| c.needs_index()) {
            owners
                .entry(column.index_name(&table.name).to_lowercase())
                .or_default()
                .push((table.name.as_str(), column.name.as_str()));
        }
    }

    for table in &tables {
        for column in table.columns.iter().filter(|c| c.needs_index()) {
            let index = column.index_name(&table.name);
            let key = index.to_lowercase();
            let other = match by_name.get(&key).and_then(|g| g.first()) {
                Some(clashing_table) => Some(format!("table {}", clashing_table.name)),
                None => owners.get(&key).and_then(|all| {
                    all.iter()
                        .find(|(t, c)| (*t, *c) != (table.name.as_str(), column.name.as_str()))
                        .map(|(t, c)| format!("the index of {t}.{c}"))
                }),
            };
            if let Some(other) = other {
                errors.push(ValidationError::DuplicateIndexName {
                    index,
                    table: table.name.clone(),
                    column: column.name.clone(),
                    other,
                });
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

fn association_cycles(
    by_name: &BTreeMap<String, Vec<&TableDescriptor>>,
    errors: &mut Vec<ValidationError>,
) {
    // Edges keyed by lower-cased name; targets sorted so the walk is stable.
    let graph: BTreeMap<&str, Vec<String>> = by_name
        .iter()
        .map(|(name, group)| {
            let mut targets: Vec<String> = group
                .iter()
                .flat_map(|t| t.associations.iter())
                .map(|a| a.target_table.to_lowercase())
                .filter(|target| by_name.contains_key(target))
                .collect();
            targets.sort();
            targets.dedup();
            (name.as_str(), targets)
        })
        .collect();

    let display = |key: &str| -> String {
        by_name
            .get(key)
            .and_then(|g| g.first())
            .map_or_else(|| key.to_string(), |t| t.name.clone())
    };

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    for &start in graph.keys() {
        if marks.contains_key(start) {
            continue;
        }
        let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
        marks.insert(start, Mark::Visiting);
        while let Some(&mut (node, ref mut next)) = stack.last_mut() {
            let targets = graph.get(node).map_or(&[][..], Vec::as_slice);
            let Some(target) = targets.get(*next) else {
                marks.insert(node, Mark::Done);
                stack.pop();
                continue;
            };
            *next += 1;
            let Some((&target, _)) = graph.get_key_value(target.as_str()) else {
                continue;
            };
            match marks.get(target) {
                Some(Mark::Visiting) => {
                    let from = stack.iter().position(|(n, _)| *n == target).unwrap_or(0);
                    let mut path: Vec<String> =
                        stack[from..].iter().map(|(n, _)| display(n)).collect();
                    path.push(display(target));
                    errors.push(ValidationError::AssociationCycle { path });
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(target, Mark::Visiting);
                    stack.push((target, 0));
                }
            }
        }
    }
}
