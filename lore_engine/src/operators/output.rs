//! Root operators. Whatever they produce goes straight into the context.

use serde_json::Value;

use lore_format::TextField;

use super::value::{as_list, as_text, id_of};
use super::Outputs;
use crate::interpreter::Session;

/// Collect final entries: their ids, and the text they contribute to each
/// character field, one entry per line.
pub fn output_entries(session: &mut Session<'_>, node: usize) -> Outputs {
    let entries = as_list(session.input(node, "entries"));
    let ids: Vec<Value> = entries.iter().filter_map(id_of).map(Value::String).collect();

    let mut outputs = Outputs::single("ids", Value::Array(ids));
    for field in TextField::ALL {
        let text = entries
            .iter()
            .filter_map(|entry| entry.get(field.key()))
            .map(as_text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        outputs = outputs.with(field.key(), Value::String(text));
    }
    outputs.with("entries", Value::Array(entries))
}

/// Emit raw text for the character fields; activates nothing.
pub fn output_context(session: &mut Session<'_>, node: usize) -> Outputs {
    let mut outputs = Outputs::single("ids", Value::Array(Vec::new()));
    for field in TextField::ALL {
        let text = as_text(&session.input(node, field.key()));
        outputs = outputs.with(field.key(), Value::String(text));
    }
    outputs.with("entries", Value::Array(Vec::new()))
}
