//! Resolved node properties.

use serde_json::Value;
use std::collections::HashMap;

use lore_format::{CompactNode, CompactValue, StringTable};

/// Keys whose values are decoded to text up front. Everything else stays in
/// its compact form until an operator asks for it.
pub const CATEGORICAL_KEYS: &[&str] = &[
    "label",
    "type",
    "operator",
    "attribute_name",
    "attribute",
    "mode",
    "field",
    "sender",
    "keep",
    "dedupe",
    "keyword_attribute",
];

/// Properties of one node with categorical values decoded.
#[derive(Debug, Clone, Default)]
pub struct NodeProps {
    categorical: HashMap<String, String>,
    raw: Vec<(String, CompactValue)>,
}

impl NodeProps {
    /// Resolve a node's property list against the behavior string table.
    /// Pairs with a dangling key are dropped; the first pair for a key wins.
    pub fn resolve(node: &CompactNode, strings: &StringTable) -> Self {
        let mut props = NodeProps::default();
        for (key, value) in node.props.iter() {
            let Some(name) = strings.get(key) else {
                continue;
            };
            if props.raw.iter().any(|(existing, _)| existing == name) {
                continue;
            }
            if CATEGORICAL_KEYS.contains(&name) {
                if let Some(text) = categorical_text(value, strings) {
                    props.categorical.insert(name.to_string(), text);
                }
            }
            props.raw.push((name.to_string(), value.clone()));
        }
        props
    }

    /// The node label; empty when missing.
    pub fn label(&self) -> &str {
        self.text("label").unwrap_or("")
    }

    /// A categorical value as text.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.categorical.get(key).map(String::as_str)
    }

    /// The compact value stored under a key.
    pub fn raw(&self, key: &str) -> Option<&CompactValue> {
        self.raw.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Decoded value stored under a key.
    pub fn value(&self, key: &str, strings: &StringTable) -> Option<Value> {
        self.raw(key).map(|v| v.decompress(strings))
    }

    /// Iterate over property names in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.raw.iter().map(|(k, _)| k.as_str())
    }
}

fn categorical_text(value: &CompactValue, strings: &StringTable) -> Option<String> {
    match value {
        CompactValue::Str(index) => strings.get(*index).map(str::to_string),
        CompactValue::Num(n) => Some(lore_format::number_value(*n).to_string()),
        CompactValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
