//! Node type definitions - which node types the compiler recognizes.
//!
//! A node whose type is missing from the registry is dropped at compile time
//! rather than failing the whole build. Port type-tags are informational;
//! the compiler only uses them to decide how to store a property value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;

/// Direction of a port on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    #[default]
    Input,
    Output,
}

/// How a property attached to a port should be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageHint {
    /// Always intern, even if the text looks like a number.
    Text,
    /// Store natively when the value parses as a number.
    Number,
    /// Numbers stay native, everything else is interned.
    Auto,
}

impl StorageHint {
    /// Hint for a port or attribute type-tag.
    pub fn from_type_tag(tag: &str) -> Self {
        match tag {
            "string" | "text" => StorageHint::Text,
            "number" => StorageHint::Number,
            _ => StorageHint::Auto,
        }
    }
}

/// A named port on a node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDef {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default = "default_type_tag")]
    pub type_tag: String,
    #[serde(default)]
    pub direction: PortDirection,
}

fn default_type_tag() -> String {
    "any".to_string()
}

impl PortDef {
    /// Storage hint derived from the type-tag.
    pub fn storage_hint(&self) -> StorageHint {
        StorageHint::from_type_tag(&self.type_tag)
    }
}

/// Definition of a node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTypeDef {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub ports: Vec<PortDef>,
}

impl NodeTypeDef {
    /// Find a port by id.
    pub fn port(&self, id: &str) -> Option<&PortDef> {
        self.ports.iter().find(|p| p.id == id)
    }

    /// Storage hint for a property, [`StorageHint::Auto`] for undeclared ones.
    pub fn storage_hint(&self, property: &str) -> StorageHint {
        self.port(property)
            .map(PortDef::storage_hint)
            .unwrap_or(StorageHint::Auto)
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    node: Vec<NodeTypeDef>,
}

/// The set of recognized node types, keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: BTreeMap<String, NodeTypeDef>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a registry from TOML:
    ///
    /// ```toml
    /// [[node]]
    /// name = "keyword_filter"
    /// category = "filter"
    /// ports = [
    ///     { id = "entries", type = "entries" },
    ///     { id = "entries", type = "entries", direction = "output" },
    /// ]
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: RegistryFile = toml::from_str(source)?;
        let mut registry = Self::new();
        for def in file.node {
            registry.register(def);
        }
        Ok(registry)
    }

    /// Register (or replace) a node type.
    pub fn register(&mut self, def: NodeTypeDef) {
        self.types.insert(def.name.clone(), def);
    }

    /// Merge another registry into this one; its definitions win.
    pub fn extend(&mut self, other: TypeRegistry) {
        self.types.extend(other.types);
    }

    /// Look up a node type by name.
    pub fn get(&self, name: &str) -> Option<&NodeTypeDef> {
        self.types.get(name)
    }

    /// Check if a node type is recognized.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registry with every node type the engine ships operators for.
    pub fn builtin() -> Self {
        use PortDirection::{Input as I, Output as O};

        let defs: &[(&str, &str, &[(&str, &str, PortDirection)])] = &[
            ("source_entries", "source", &[("entries", "entries", O)]),
            ("source_messages", "source", &[("messages", "messages", O)]),
            (
                "source_literal",
                "source",
                &[("value_1", "any", I), ("values", "list", O), ("value", "any", O)],
            ),
            ("source_context", "source", &[("field", "string", I), ("value", "any", O)]),
            (
                "source",
                "source",
                &[
                    ("field", "string", I),
                    ("value_1", "any", I),
                    ("entries", "entries", O),
                    ("messages", "messages", O),
                    ("values", "list", O),
                    ("value", "any", O),
                ],
            ),
            (
                "keyword_filter",
                "filter",
                &[
                    ("entries", "entries", I),
                    ("messages", "messages", I),
                    ("keyword_attribute", "string", I),
                    ("case_sensitive", "boolean", I),
                    ("sender", "string", I),
                    ("scan_depth", "number", I),
                    ("match_cap", "number", I),
                    ("entries", "entries", O),
                    ("unmatched", "entries", O),
                ],
            ),
            (
                "message_filter",
                "filter",
                &[
                    ("messages", "messages", I),
                    ("conditions", "list", I),
                    ("use_regex", "boolean", I),
                    ("case_sensitive", "boolean", I),
                    ("sender", "string", I),
                    ("scan_depth", "number", I),
                    ("match_cap", "number", I),
                    ("matched_messages", "messages", O),
                    ("unmatched_messages", "messages", O),
                    ("matched_conditions", "list", O),
                    ("unmatched_conditions", "list", O),
                    ("matched", "boolean", O),
                ],
            ),
            (
                "entry_filter",
                "filter",
                &[
                    ("entries", "entries", I),
                    ("attribute_name", "string", I),
                    ("operator", "string", I),
                    ("values", "list", I),
                    ("mode", "string", I),
                    ("entries", "entries", O),
                    ("rejected", "entries", O),
                ],
            ),
            (
                "filter",
                "filter",
                &[
                    ("entries", "entries", I),
                    ("messages", "messages", I),
                    ("conditions", "list", I),
                    ("attribute_name", "string", I),
                    ("operator", "string", I),
                    ("values", "list", I),
                    ("mode", "string", I),
                    ("entries", "entries", O),
                    ("matched_messages", "messages", O),
                ],
            ),
            (
                "adjacency",
                "graph",
                &[
                    ("entries", "entries", I),
                    ("pool", "entries", I),
                    ("distance", "number", I),
                    ("entries", "entries", O),
                ],
            ),
            (
                "math",
                "math",
                &[("a", "any", I), ("b", "any", I), ("operator", "string", I), ("result", "any", O)],
            ),
            (
                "math_unary",
                "math",
                &[("value", "any", I), ("operator", "string", I), ("result", "any", O)],
            ),
            (
                "compare",
                "logic",
                &[("a", "any", I), ("b", "any", I), ("operator", "string", I), ("result", "boolean", O)],
            ),
            (
                "logic",
                "logic",
                &[
                    ("a", "boolean", I),
                    ("b", "boolean", I),
                    ("operator", "string", I),
                    ("result", "boolean", O),
                ],
            ),
            (
                "set_test",
                "logic",
                &[
                    ("subject", "list", I),
                    ("reference", "list", I),
                    ("operator", "string", I),
                    ("result", "boolean", O),
                ],
            ),
            (
                "switch",
                "logic",
                &[
                    ("condition", "boolean", I),
                    ("if_true", "any", I),
                    ("if_false", "any", I),
                    ("result", "any", O),
                ],
            ),
            (
                "probability",
                "logic",
                &[("value", "any", I), ("chance", "number", I), ("value", "any", O), ("passed", "boolean", O)],
            ),
            (
                "join_list",
                "list",
                &[("lists", "list", I), ("dedupe", "string", I), ("keep", "string", I), ("list", "list", O)],
            ),
            (
                "remap",
                "list",
                &[
                    ("value", "any", I),
                    ("mapping", "attributes", I),
                    ("fallback", "any", I),
                    ("result", "any", O),
                ],
            ),
            (
                "sort",
                "list",
                &[
                    ("entries", "entries", I),
                    ("attribute", "string", I),
                    ("sorted", "entries", O),
                    ("reversed", "entries", O),
                ],
            ),
            (
                "slice",
                "list",
                &[
                    ("list", "list", I),
                    ("start", "number", I),
                    ("count", "number", I),
                    ("step", "number", I),
                    ("list", "list", O),
                ],
            ),
            (
                "get_attribute",
                "list",
                &[("entries", "entries", I), ("attribute_name", "string", I), ("values", "list", O)],
            ),
            ("count", "list", &[("list", "list", I), ("count", "number", O)]),
            (
                "text_join",
                "text",
                &[("values", "list", I), ("separator", "text", I), ("text", "text", O)],
            ),
            (
                "regex_match",
                "text",
                &[
                    ("text", "any", I),
                    ("pattern", "text", I),
                    ("case_sensitive", "boolean", I),
                    ("matched", "boolean", O),
                    ("matches", "list", O),
                ],
            ),
            (
                "regex_replace",
                "text",
                &[
                    ("text", "any", I),
                    ("pattern", "text", I),
                    ("replacement", "text", I),
                    ("case_sensitive", "boolean", I),
                    ("text", "text", O),
                ],
            ),
            ("reroute", "structural", &[("input", "any", I), ("output", "any", O)]),
            (
                "output_entries",
                "output",
                &[("entries", "entries", I), ("order", "number", I)],
            ),
            (
                "output_context",
                "output",
                &[
                    ("personality", "text", I),
                    ("scenario", "text", I),
                    ("example_dialogs", "text", I),
                    ("order", "number", I),
                ],
            ),
            (
                "output",
                "output",
                &[
                    ("entries", "entries", I),
                    ("personality", "text", I),
                    ("scenario", "text", I),
                    ("example_dialogs", "text", I),
                    ("order", "number", I),
                ],
            ),
        ];

        let mut registry = Self::new();
        for (name, category, ports) in defs {
            registry.register(NodeTypeDef {
                name: name.to_string(),
                category: category.to_string(),
                ports: ports
                    .iter()
                    .map(|(id, type_tag, direction)| PortDef {
                        id: id.to_string(),
                        label: port_label(id),
                        type_tag: type_tag.to_string(),
                        direction: *direction,
                    })
                    .collect(),
            });
        }
        registry
    }
}

/// "scan_depth" -> "Scan Depth".
fn port_label(id: &str) -> String {
    id.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = TypeRegistry::builtin();

        assert!(registry.contains("keyword_filter"));
        assert!(registry.contains("output_entries"));
        assert!(!registry.contains("sticky_note"));

        let filter = registry.get("keyword_filter").unwrap();
        assert_eq!(filter.storage_hint("scan_depth"), StorageHint::Number);
        assert_eq!(filter.storage_hint("sender"), StorageHint::Text);
        assert_eq!(filter.storage_hint("undeclared"), StorageHint::Auto);
        assert_eq!(filter.port("match_cap").unwrap().label, "Match Cap");
    }

    #[test]
    fn test_storage_hint_from_type_tag() {
        assert_eq!(StorageHint::from_type_tag("text"), StorageHint::Text);
        assert_eq!(StorageHint::from_type_tag("string"), StorageHint::Text);
        assert_eq!(StorageHint::from_type_tag("number"), StorageHint::Number);
        assert_eq!(StorageHint::from_type_tag("entries"), StorageHint::Auto);
    }

    #[test]
    fn test_registry_from_toml() {
        let registry = TypeRegistry::from_toml_str(
            r#"
            [[node]]
            name = "custom_source"
            category = "source"
            ports = [
                { id = "entries", type = "entries", direction = "output" },
                { id = "tag" , type = "text" },
            ]
            "#,
        )
        .unwrap();

        let def = registry.get("custom_source").unwrap();
        assert_eq!(def.ports.len(), 2);
        assert_eq!(def.ports[0].direction, PortDirection::Output);
        assert_eq!(def.ports[1].direction, PortDirection::Input);
        assert_eq!(def.storage_hint("tag"), StorageHint::Text);
    }

    #[test]
    fn test_registry_extend_replaces() {
        let mut registry = TypeRegistry::builtin();
        let before = registry.len();

        let custom = TypeRegistry::from_toml_str(
            r#"
            [[node]]
            name = "count"
            ports = []
            "#,
        )
        .unwrap();
        registry.extend(custom);

        assert_eq!(registry.len(), before);
        assert!(registry.get("count").unwrap().ports.is_empty());
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(TypeRegistry::from_toml_str("[[node]]\nports = 3").is_err());
    }
}
