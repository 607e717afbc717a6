//! Lore entries - the records a graph filters and activates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A lore/knowledge record injectable into a character description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoreEntry {
    /// Stable id reported back in `activated_ids`.
    pub id: String,

    /// Human-readable label.
    pub label: String,

    /// Free-text fields and typed attributes.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl LoreEntry {
    /// Create a new entry with a random stable id.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label: label.into(),
            properties: Map::new(),
        }
    }

    /// Set the stable id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set a property value.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set the keyword list used by keyword filters.
    pub fn with_keywords<I, S>(self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<Value> = keywords.into_iter().map(|k| Value::String(k.into())).collect();
        self.with_property("keywords", Value::Array(list))
    }

    /// Render the entry as the record shape operators work on:
    /// `{"id": …, "label": …, <properties>…}`.
    pub fn to_record(&self) -> Value {
        let mut record = Map::new();
        record.insert("id".to_string(), Value::String(self.id.clone()));
        record.insert("label".to_string(), Value::String(self.label.clone()));
        for (key, value) in &self.properties {
            if key != "id" && key != "label" {
                record.insert(key.clone(), value.clone());
            }
        }
        Value::Object(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_builder() {
        let entry = LoreEntry::new("Excalibur")
            .with_id("e1")
            .with_keywords(["sword", "blade"])
            .with_property("scenario", "A legendary sword rests in the lake.");

        assert_eq!(entry.id, "e1");
        assert_eq!(entry.properties["keywords"], json!(["sword", "blade"]));
    }

    #[test]
    fn test_entry_ids_are_unique() {
        let a = LoreEntry::new("A");
        let b = LoreEntry::new("A");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_to_record() {
        let entry = LoreEntry::new("Castle").with_id("c").with_property("region", "north");
        let record = entry.to_record();

        assert_eq!(record["id"], json!("c"));
        assert_eq!(record["label"], json!("Castle"));
        assert_eq!(record["region"], json!("north"));
    }
}
