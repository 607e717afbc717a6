//! Source operators - where values enter the graph.

use serde_json::Value;

use super::value::number_value;
use super::Outputs;
use crate::interpreter::Session;

/// Every lore entry.
pub fn entries(session: &mut Session<'_>, _node: usize) -> Outputs {
    Outputs::single("entries", Value::Array(session.entries().to_vec()))
}

/// Every chat message, oldest first.
pub fn messages(session: &mut Session<'_>, _node: usize) -> Outputs {
    Outputs::single("messages", Value::Array(session.messages()))
}

/// Ad-hoc values from the numbered properties `value_1`, `value_2`, ….
///
/// Numbers in the names need not be contiguous; values come out in numeric
/// order.
pub fn literal(session: &mut Session<'_>, node: usize) -> Outputs {
    let mut numbered: Vec<(u32, String)> = session
        .props(node)
        .keys()
        .filter_map(|key| {
            key.strip_prefix("value_")
                .and_then(|n| n.parse::<u32>().ok())
                .map(|n| (n, key.to_string()))
        })
        .collect();
    numbered.sort_by_key(|(n, _)| *n);

    let values: Vec<Value> = numbered
        .into_iter()
        .map(|(_, key)| session.input(node, &key))
        .collect();
    let first = values.first().cloned().unwrap_or(Value::Null);
    Outputs::single("values", Value::Array(values)).with("value", first)
}

/// A field copied straight from the context.
pub fn context_field(session: &mut Session<'_>, node: usize) -> Outputs {
    let field = session.setting(node, "field").unwrap_or_default();
    let context = session.context();
    let messages = context.messages();

    let value = match field.as_str() {
        "personality" => Value::String(context.character.personality.clone()),
        "scenario" => Value::String(context.character.scenario.clone()),
        "example_dialogs" => Value::String(context.character.example_dialogs.clone()),
        "last_message" => messages
            .last()
            .map(|m| Value::String(m.message.clone()))
            .unwrap_or_default(),
        "last_user_message" => messages
            .iter()
            .rev()
            .find(|m| !m.is_bot)
            .map(|m| Value::String(m.message.clone()))
            .unwrap_or_default(),
        "last_bot_message" => messages
            .iter()
            .rev()
            .find(|m| m.is_bot)
            .map(|m| Value::String(m.message.clone()))
            .unwrap_or_default(),
        "message_count" => number_value(messages.len() as f64),
        "chat_text" => Value::String(
            messages
                .iter()
                .map(|m| m.message.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        "activated_ids" => Value::Array(
            context
                .activated_ids
                .iter()
                .map(|id| Value::String(id.clone()))
                .collect(),
        ),
        other => {
            session.warn(format!(
                "unknown context field {:?} at node {}",
                other,
                session.node_id(node)
            ));
            Value::Null
        }
    };
    Outputs::single("value", value)
}
