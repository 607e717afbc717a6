//! Entry neighbourhoods.
//!
//! Two entries are related when a property of one holds the id of the
//! other. Relations are undirected.

use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};

use super::value::{as_list, as_text, id_of, number_value};
use super::Outputs;
use crate::interpreter::Session;

/// Entries at exactly `distance` hops from the `entries` frontier.
///
/// The search runs over `pool` (all entries when unwired). Distance 0 gives
/// back the frontier itself. Results keep pool order.
pub fn adjacency(session: &mut Session<'_>, node: usize) -> Outputs {
    let frontier = as_list(session.input(node, "entries"));
    let pool = if session.has_input(node, "pool") {
        as_list(session.input(node, "pool"))
    } else {
        session.entries().to_vec()
    };
    let distance = session.number(node, "distance", 1.0).max(0.0) as usize;

    let found = entries_at_distance(&pool, &frontier, distance);
    let count = found.len();
    Outputs::single("entries", Value::Array(found)).with("count", number_value(count as f64))
}

/// Breadth-first search from the frontier; only the ring at `distance`
/// is returned, never the entries inside it.
pub fn entries_at_distance(pool: &[Value], frontier: &[Value], distance: usize) -> Vec<Value> {
    let ids: Vec<Option<String>> = pool.iter().map(id_of).collect();
    let position: HashMap<&str, usize> = ids
        .iter()
        .enumerate()
        .filter_map(|(i, id)| id.as_deref().map(|id| (id, i)))
        .collect();
    let neighbours = relations(pool, &position);

    let mut depth: Vec<Option<usize>> = vec![None; pool.len()];
    let mut queue = VecDeque::new();
    let starts: HashSet<usize> = frontier
        .iter()
        .filter_map(|entry| reference(entry).or_else(|| id_of(entry)))
        .filter_map(|id| position.get(id.as_str()).copied())
        .collect();
    for start in starts {
        depth[start] = Some(0);
        queue.push_back(start);
    }

    while let Some(current) = queue.pop_front() {
        let Some(level) = depth[current] else {
            continue;
        };
        if level >= distance {
            continue;
        }
        for &next in &neighbours[current] {
            if depth[next].is_none() {
                depth[next] = Some(level + 1);
                queue.push_back(next);
            }
        }
    }

    pool.iter()
        .zip(depth)
        .filter(|(_, d)| *d == Some(distance))
        .map(|(entry, _)| entry.clone())
        .collect()
}

fn relations(pool: &[Value], position: &HashMap<&str, usize>) -> Vec<Vec<usize>> {
    let mut neighbours: Vec<Vec<usize>> = vec![Vec::new(); pool.len()];
    for (from, entry) in pool.iter().enumerate() {
        let Value::Object(record) = entry else {
            continue;
        };
        let mut targets = Vec::new();
        for (key, value) in record {
            if key != "id" {
                collect_references(value, position, &mut targets);
            }
        }
        for to in targets {
            if to == from {
                continue;
            }
            if !neighbours[from].contains(&to) {
                neighbours[from].push(to);
            }
            if !neighbours[to].contains(&from) {
                neighbours[to].push(from);
            }
        }
    }
    neighbours
}

/// A bare value that may name an entry. Numeric-looking ids compile to
/// numbers, so numbers are read back as their text form.
fn reference(value: &Value) -> Option<String> {
    match value {
        Value::String(_) | Value::Number(_) => Some(as_text(value)),
        _ => None,
    }
}

fn collect_references(value: &Value, position: &HashMap<&str, usize>, out: &mut Vec<usize>) {
    match value {
        Value::String(_) | Value::Number(_) => {
            let target = reference(value).and_then(|id| position.get(id.as_str()).copied());
            if let Some(target) = target {
                out.push(target);
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_references(v, position, out)),
        Value::Object(record) => record.values().for_each(|v| collect_references(v, position, out)),
        _ => {}
    }
}
