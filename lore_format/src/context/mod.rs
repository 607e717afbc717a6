//! Runtime context - the per-turn record the host hands to the interpreter.
//!
//! The host owns the context across the call boundary. The interpreter reads
//! the chat history and appends to the character text fields; it never
//! overwrites what was already there.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl Message {
    /// Create a message written by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            message: text.into(),
            is_bot: false,
            date: None,
        }
    }

    /// Create a message written by the bot.
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            message: text.into(),
            is_bot: true,
            date: None,
        }
    }
}

/// Chat history, oldest message first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    #[serde(default)]
    pub last_messages: Vec<Message>,
}

/// Free-text character fields. Append-only from the interpreter's side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterFields {
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub scenario: String,
    #[serde(default)]
    pub example_dialogs: String,
}

/// Which character text field a fragment goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    Personality,
    Scenario,
    ExampleDialogs,
}

impl TextField {
    /// All fields, in output order.
    pub const ALL: [TextField; 3] = [
        TextField::Personality,
        TextField::Scenario,
        TextField::ExampleDialogs,
    ];

    /// The field's key in entries and in the context record.
    pub fn key(&self) -> &'static str {
        match self {
            TextField::Personality => "personality",
            TextField::Scenario => "scenario",
            TextField::ExampleDialogs => "example_dialogs",
        }
    }
}

impl CharacterFields {
    /// Read a field.
    pub fn get(&self, field: TextField) -> &str {
        match field {
            TextField::Personality => &self.personality,
            TextField::Scenario => &self.scenario,
            TextField::ExampleDialogs => &self.example_dialogs,
        }
    }

    /// Append a fragment on its own line. Empty fragments are ignored.
    pub fn append(&mut self, field: TextField, text: &str) {
        if text.is_empty() {
            return;
        }
        let buffer = match field {
            TextField::Personality => &mut self.personality,
            TextField::Scenario => &mut self.scenario,
            TextField::ExampleDialogs => &mut self.example_dialogs,
        };
        if !buffer.is_empty() && !buffer.ends_with('\n') {
            buffer.push('\n');
        }
        buffer.push_str(text);
    }
}

/// Highlight ranges of one color within one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub color: String,
    /// Half-open `[start, end)` character ranges.
    pub ranges: Vec<(usize, usize)>,
}

/// The mutable per-turn context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default)]
    pub chat: Chat,

    #[serde(default)]
    pub character: CharacterFields,

    /// Stable ids of activated entries, deduplicated.
    #[serde(default)]
    pub activated_ids: Vec<String>,

    /// Highlights per message; index 0 is the most recent message.
    #[serde(default)]
    pub chat_highlights: Vec<Vec<Highlight>>,

    /// Stable ids of nodes that produced a non-empty value.
    #[serde(default)]
    pub debug_nodes: Vec<String>,

    /// Per-port debug snapshots: node id → port name → value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub debug_ports: BTreeMap<String, BTreeMap<String, Value>>,

    #[serde(default)]
    pub warnings: Vec<String>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context from a chat history, oldest first.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            chat: Chat {
                last_messages: messages,
            },
            ..Default::default()
        }
    }

    /// Messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.chat.last_messages
    }

    /// Record an activated entry id unless it is already present.
    pub fn activate(&mut self, id: &str) -> bool {
        if self.activated_ids.iter().any(|existing| existing == id) {
            return false;
        }
        self.activated_ids.push(id.to_string());
        true
    }

    /// Record a warning unless the same text is already present.
    pub fn warn(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_from_host_json() {
        let context: Context = serde_json::from_value(json!({
            "chat": {"last_messages": [
                {"message": "Hello", "is_bot": false, "date": "2024-01-01"},
                {"message": "Greetings, traveler", "is_bot": true}
            ]},
            "character": {"personality": "Stoic."}
        }))
        .unwrap();

        assert_eq!(context.messages().len(), 2);
        assert!(context.messages()[1].is_bot);
        assert_eq!(context.character.personality, "Stoic.");
        assert!(context.activated_ids.is_empty());
    }

    #[test]
    fn test_append_never_overwrites() {
        let mut fields = CharacterFields {
            scenario: "A tavern.".to_string(),
            ..Default::default()
        };
        fields.append(TextField::Scenario, "It is raining.");
        fields.append(TextField::Scenario, "");
        fields.append(TextField::Personality, "Grumpy.");

        assert_eq!(fields.scenario, "A tavern.\nIt is raining.");
        assert_eq!(fields.get(TextField::Personality), "Grumpy.");
    }

    #[test]
    fn test_activate_deduplicates() {
        let mut context = Context::new();
        assert!(context.activate("a"));
        assert!(!context.activate("a"));
        assert!(context.activate("b"));
        assert_eq!(context.activated_ids, vec!["a", "b"]);
    }

    #[test]
    fn test_warn_deduplicates() {
        let mut context = Context::new();
        context.warn("cycle detected at node x");
        context.warn("cycle detected at node x");
        assert_eq!(context.warnings.len(), 1);
    }

    #[test]
    fn test_highlight_serialization() {
        let highlight = Highlight {
            color: "#ffd54f".to_string(),
            ranges: vec![(10, 15)],
        };
        assert_eq!(
            serde_json::to_value(&highlight).unwrap(),
            json!({"color": "#ffd54f", "ranges": [[10, 15]]})
        );
    }
}
