//! Mapping activated ids back to stable entry ids.

use serde_json::Value;

use lore_format::DataDocument;

/// Map raw activation output to stable entry ids.
///
/// The evaluated script may report an entry either by its position in the
/// data document or by its already-resolved string id. Both forms are
/// accepted; the result holds stable ids only, first occurrence wins.
/// Positions out of range and values of any other shape are ignored.
pub fn adapt_activated_ids(data: &DataDocument, raw: &[Value]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::with_capacity(raw.len());
    for value in raw {
        let resolved = match value {
            Value::Number(n) => n
                .as_u64()
                .and_then(|index| data.entries.get(index as usize))
                .map(|entry| entry.id.clone()),
            Value::String(s) => {
                if data.entry_index(s).is_some() {
                    Some(s.clone())
                } else {
                    match s.parse::<usize>() {
                        Ok(index) => data
                            .entries
                            .get(index)
                            .map(|entry| entry.id.clone())
                            .or_else(|| Some(s.clone())),
                        Err(_) => Some(s.clone()),
                    }
                }
            }
            _ => None,
        };
        if let Some(id) = resolved {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use lore_format::LoreEntry;
    use serde_json::json;

    fn data() -> DataDocument {
        Compiler::with_builtin_types().compile_entries(&[
            LoreEntry::new("A").with_id("alpha"),
            LoreEntry::new("B").with_id("beta"),
            LoreEntry::new("C").with_id("gamma"),
        ])
    }

    #[test]
    fn test_indices_become_ids() {
        let ids = adapt_activated_ids(&data(), &[json!(2), json!(0)]);
        assert_eq!(ids, vec!["gamma", "alpha"]);
    }

    #[test]
    fn test_string_ids_pass_through() {
        let ids = adapt_activated_ids(&data(), &[json!("beta"), json!(1), json!("1")]);
        assert_eq!(ids, vec!["beta"]);
    }

    #[test]
    fn test_out_of_range_and_odd_shapes_are_ignored() {
        let ids = adapt_activated_ids(&data(), &[json!(9), json!(null), json!(1.5), json!({"id": 1})]);
        assert!(ids.is_empty());
    }
}
