//! List and record utilities.

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;

use super::value::{as_list, as_text, attribute, compare_values, id_of, identity_key, number_value};
use super::Outputs;
use crate::interpreter::Session;

/// How `join_list` recognises duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dedupe {
    None,
    Identity,
    Id,
}

/// Concatenate every list wired into `lists`, in edge order.
///
/// With `dedupe` set to `identity` or `id`, repeated items collapse to the
/// first-seen one, or the last-seen one when `keep` is `last`. The survivor
/// keeps its own position.
pub fn join_list(session: &mut Session<'_>, node: usize) -> Outputs {
    let items: Vec<Value> = session
        .inputs(node, "lists")
        .into_iter()
        .flat_map(as_list)
        .collect();
    let dedupe = match session.setting(node, "dedupe").as_deref() {
        Some("identity") | Some("value") => Dedupe::Identity,
        Some("id") => Dedupe::Id,
        _ => Dedupe::None,
    };
    let keep_last = session.setting(node, "keep").as_deref() == Some("last");

    Outputs::single("list", Value::Array(deduplicate(items, dedupe, keep_last)))
}

fn deduplicate(items: Vec<Value>, dedupe: Dedupe, keep_last: bool) -> Vec<Value> {
    if dedupe == Dedupe::None {
        return items;
    }
    let key = |item: &Value| match dedupe {
        Dedupe::Id => id_of(item).unwrap_or_else(|| identity_key(item)),
        _ => identity_key(item),
    };

    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(items.len());
    if keep_last {
        for item in items.into_iter().rev() {
            if seen.insert(key(&item)) {
                kept.push(item);
            }
        }
        kept.reverse();
    } else {
        for item in items {
            if seen.insert(key(&item)) {
                kept.push(item);
            }
        }
    }
    kept
}

/// Translate values through a `mapping` table.
///
/// The table is a list of `{name, value}` records, or a plain object. A
/// value without a row becomes `fallback`, or stays as it is when there is
/// no fallback.
pub fn remap(session: &mut Session<'_>, node: usize) -> Outputs {
    let input = session.input(node, "value");
    let table = mapping_rows(session.input(node, "mapping"));
    let fallback = session.input(node, "fallback");

    let translate = |value: &Value| {
        let key = as_text(value);
        match table.iter().find(|(name, _)| *name == key) {
            Some((_, mapped)) => mapped.clone(),
            None if fallback.is_null() => value.clone(),
            None => fallback.clone(),
        }
    };
    let result = match &input {
        Value::Array(items) => Value::Array(items.iter().map(translate).collect()),
        Value::Null => Value::Null,
        other => translate(other),
    };
    Outputs::single("result", result)
}

fn mapping_rows(mapping: Value) -> Vec<(String, Value)> {
    match mapping {
        Value::Object(record) if record.contains_key("name") => {
            let value = record.get("value").cloned().unwrap_or(Value::Null);
            vec![(as_text(&record["name"]), value)]
        }
        Value::Object(record) => record.into_iter().collect(),
        Value::Array(rows) => rows.into_iter().flat_map(mapping_rows).collect(),
        _ => Vec::new(),
    }
}

/// Stable sort by a named attribute. Records missing it go last.
pub fn sort(session: &mut Session<'_>, node: usize) -> Outputs {
    let mut entries = as_list(session.input(node, "entries"));
    let name = session.text(node, "attribute");

    entries.sort_by(|a, b| {
        let (a, b) = match &name {
            Some(name) => (attribute(a, name), attribute(b, name)),
            None => (Some(a), Some(b)),
        };
        match (a, b) {
            (Some(a), Some(b)) => compare_values(a, b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
    let reversed: Vec<Value> = entries.iter().rev().cloned().collect();
    Outputs::single("sorted", Value::Array(entries)).with("reversed", Value::Array(reversed))
}

/// Window a list: skip `start` items, then take every `step`-th item up to
/// `count` items (0 means no limit). A negative start counts from the end.
pub fn slice(session: &mut Session<'_>, node: usize) -> Outputs {
    let list = as_list(session.input(node, "list"));
    let start = session.number(node, "start", 0.0).trunc();
    let count = session.number(node, "count", 0.0).max(0.0) as usize;
    let step = session.number(node, "step", 1.0).max(1.0) as usize;

    let start = if start < 0.0 {
        list.len().saturating_sub(start.abs() as usize)
    } else {
        start as usize
    };
    let limit = if count == 0 { usize::MAX } else { count };
    let window: Vec<Value> = list.into_iter().skip(start).step_by(step).take(limit).collect();
    Outputs::single("list", Value::Array(window))
}

/// Pull one attribute out of every record. Missing attributes are skipped.
pub fn get_attribute(session: &mut Session<'_>, node: usize) -> Outputs {
    let entries = as_list(session.input(node, "entries"));
    let Some(name) = session.text(node, "attribute_name") else {
        return Outputs::single("values", Value::Array(Vec::new()));
    };
    let values = entries
        .iter()
        .filter_map(|entry| attribute(entry, &name).cloned())
        .collect();
    Outputs::single("values", Value::Array(values))
}

/// Length of a list; a scalar counts as one item.
pub fn count(session: &mut Session<'_>, node: usize) -> Outputs {
    let len = as_list(session.input(node, "list")).len();
    Outputs::single("count", number_value(len as f64))
}
