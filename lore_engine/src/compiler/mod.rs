//! Graph compactor - lowers an authoring graph into compact documents.
//!
//! The compactor runs once per build:
//! 1. **Index**: Give every recognized node a run index in encounter order
//! 2. **Intern**: Store keys and text values in the string table; pure
//!    numbers stay native
//! 3. **Label**: Put the `label` pair first in every property list
//! 4. **Nest**: Compact attribute records and lists recursively
//! 5. **Wire**: Translate edges to run indices and interned port names
//! 6. **Entries**: Compact the lore entries the same way
//!
//! Nothing here is fatal. A node that cannot be compacted is skipped, an edge
//! touching it is dropped, and both are listed in the [`CompileReport`].

mod activated;
mod template;

pub use activated::*;
pub use template::*;

use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use lore_format::{
    BehaviorDocument, CompactEdge, CompactEntry, CompactNode, CompactValue, DataDocument, Graph,
    LoreEntry, PropList, StorageHint, StringTable, TypeRegistry, number_value,
};

/// Key of the label pair the compactor injects first.
pub const LABEL_KEY: &str = "label";

/// A node that was left out of the behavior document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedNode {
    pub id: String,
    pub node_type: String,
    pub reason: String,
}

/// An edge that was left out of the behavior document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedEdge {
    pub source: String,
    pub target: String,
    pub reason: String,
}

/// Everything the compactor left out, and why.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    pub skipped_nodes: Vec<SkippedNode>,
    pub dropped_edges: Vec<DroppedEdge>,
}

impl CompileReport {
    /// Check if everything was compiled.
    pub fn is_clean(&self) -> bool {
        self.skipped_nodes.is_empty() && self.dropped_edges.is_empty()
    }
}

/// Output of a full build.
#[derive(Debug, Clone)]
pub struct CompiledDocuments {
    pub behavior: BehaviorDocument,
    pub data: DataDocument,
    pub report: CompileReport,
}

/// The graph compactor.
#[derive(Debug, Clone)]
pub struct Compiler {
    registry: TypeRegistry,
}

impl Compiler {
    /// Create a compiler that recognizes the given node types.
    pub fn new(registry: TypeRegistry) -> Self {
        Self { registry }
    }

    /// Create a compiler for the built-in operator set.
    pub fn with_builtin_types() -> Self {
        Self::new(TypeRegistry::builtin())
    }

    /// The node types this compiler recognizes.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Compile a graph and its entries.
    pub fn compile(&self, graph: &Graph, entries: &[LoreEntry]) -> CompiledDocuments {
        let (behavior, report) = self.compile_graph(graph);
        let data = self.compile_entries(entries);
        CompiledDocuments {
            behavior,
            data,
            report,
        }
    }

    /// Compile the behavior graph.
    pub fn compile_graph(&self, graph: &Graph) -> (BehaviorDocument, CompileReport) {
        let mut document = BehaviorDocument::new();
        let mut report = CompileReport::default();
        let mut run_index: HashMap<&str, u32> = HashMap::new();

        for node in &graph.nodes {
            let Some(def) = self.registry.get(&node.node_type) else {
                warn!(node = %node.id, node_type = %node.node_type, "skipping node with unknown type");
                report.skipped_nodes.push(SkippedNode {
                    id: node.id.clone(),
                    node_type: node.node_type.clone(),
                    reason: format!("no type definition for {:?}", node.node_type),
                });
                continue;
            };
            if run_index.contains_key(node.id.as_str()) {
                warn!(node = %node.id, "skipping node with duplicate id");
                report.skipped_nodes.push(SkippedNode {
                    id: node.id.clone(),
                    node_type: node.node_type.clone(),
                    reason: "duplicate node id".to_string(),
                });
                continue;
            }

            let strings = &mut document.strings;
            let type_index = strings.intern(&node.node_type);
            let mut props = PropList::new();
            let label_key = strings.intern(LABEL_KEY);
            let label = strings.intern(&node.label);
            props.push(label_key, CompactValue::Str(label));

            for (key, value) in &node.properties {
                if key == LABEL_KEY {
                    continue;
                }
                let key_index = strings.intern(key);
                props.push(key_index, compact_value(value, def.storage_hint(key), strings));
            }

            run_index.insert(node.id.as_str(), document.nodes.len() as u32);
            document.node_ids.push(node.id.clone());
            document.nodes.push(CompactNode { type_index, props });
        }

        for edge in &graph.edges {
            let source = run_index.get(edge.source.as_str());
            let target = run_index.get(edge.target.as_str());
            let (Some(&src_node), Some(&tgt_node)) = (source, target) else {
                let missing = if source.is_none() { &edge.source } else { &edge.target };
                warn!(source = %edge.source, target = %edge.target, missing = %missing, "dropping edge");
                report.dropped_edges.push(DroppedEdge {
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    reason: format!("endpoint {} was not compiled", missing),
                });
                continue;
            };
            let src_port = document.strings.intern(edge.source_port_name());
            let tgt_port = document.strings.intern(edge.target_port_name());
            document.edges.push(CompactEdge {
                src_node,
                src_port,
                tgt_node,
                tgt_port,
            });
        }

        debug!(
            nodes = document.nodes.len(),
            edges = document.edges.len(),
            strings = document.strings.len(),
            skipped = report.skipped_nodes.len(),
            dropped = report.dropped_edges.len(),
            "behavior graph compiled"
        );
        (document, report)
    }

    /// Compile the lore entries.
    pub fn compile_entries(&self, entries: &[LoreEntry]) -> DataDocument {
        let mut document = DataDocument::new();
        for entry in entries {
            let strings = &mut document.strings;
            let label_key = strings.intern(LABEL_KEY);
            let label = strings.intern(&entry.label);
            let mut props = PropList::new();
            props.push(label_key, CompactValue::Str(label));

            for (key, value) in &entry.properties {
                if key == LABEL_KEY || key == "id" {
                    continue;
                }
                let key_index = strings.intern(key);
                props.push(key_index, compact_value(value, StorageHint::Auto, strings));
            }

            document.entries.push(CompactEntry {
                id: entry.id.clone(),
                label,
                props,
            });
        }
        debug!(
            entries = document.entries.len(),
            strings = document.strings.len(),
            "entries compiled"
        );
        document
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::with_builtin_types()
    }
}

/// Parse text that is purely a finite number and reads back unchanged, so
/// "007" and "1.50" stay text.
fn pure_number(text: &str) -> Option<f64> {
    let starts_numeric = text
        .chars()
        .next()
        .map(|c| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
        .unwrap_or(false);
    if !starts_numeric {
        return None;
    }
    text.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && number_value(*n).to_string() == text)
}

/// Compact one authoring value, interning its strings.
pub fn compact_value(value: &Value, hint: StorageHint, strings: &mut StringTable) -> CompactValue {
    match value {
        Value::Null => CompactValue::Null,
        Value::Bool(b) => CompactValue::Bool(*b),
        Value::Number(n) => CompactValue::Num(n.as_f64().unwrap_or(0.0)),
        Value::String(text) => match hint {
            StorageHint::Text => CompactValue::Str(strings.intern(text)),
            StorageHint::Number | StorageHint::Auto => match pure_number(text) {
                Some(n) => CompactValue::Num(n),
                None => CompactValue::Str(strings.intern(text)),
            },
        },
        Value::Array(items) => CompactValue::List(
            items
                .iter()
                .map(|item| compact_value(item, hint, strings))
                .collect(),
        ),
        Value::Object(record) => match record.get("name") {
            Some(name) => {
                let kind = record.get("type").and_then(Value::as_str).unwrap_or("any");
                let name = match name {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let inner = record.get("value").unwrap_or(&Value::Null);
                let name = strings.intern(&name);
                let kind_index = strings.intern(kind);
                CompactValue::Attr {
                    name,
                    kind: kind_index,
                    value: Box::new(compact_value(inner, StorageHint::from_type_tag(kind), strings)),
                }
            }
            // A bare map becomes a list of attribute records, one per key.
            None => CompactValue::List(
                record
                    .iter()
                    .map(|(key, inner)| {
                        let name = strings.intern(key);
                        let kind = strings.intern("any");
                        CompactValue::Attr {
                            name,
                            kind,
                            value: Box::new(compact_value(inner, StorageHint::Auto, strings)),
                        }
                    })
                    .collect(),
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lore_format::GraphNode;
    use serde_json::json;

    fn sample_graph() -> Graph {
        let mut graph = Graph::new();
        graph.add_node(GraphNode::new("source_entries", "All entries").with_id("src"));
        graph.add_node(
            GraphNode::new("keyword_filter", "Keywords")
                .with_id("kw")
                .with_property("scan_depth", "3")
                .with_property("sender", "all")
                .with_property("case_sensitive", false),
        );
        graph.add_node(GraphNode::new("output_entries", "Output").with_id("out"));
        graph.connect("src", "entries", "kw", "entries");
        graph.connect("kw", "entries", "out", "entries");
        graph
    }

    #[test]
    fn test_compile_assigns_run_indices() {
        let compiler = Compiler::with_builtin_types();
        let (doc, report) = compiler.compile_graph(&sample_graph());

        assert!(report.is_clean());
        assert_eq!(doc.node_ids, vec!["src", "kw", "out"]);
        assert_eq!(doc.node_type(1), Some("keyword_filter"));
        assert_eq!(doc.edges.len(), 2);
        assert_eq!(doc.edges[1].src_node, 1);
        assert_eq!(doc.edges[1].tgt_node, 2);
        doc.validate().unwrap();
    }

    #[test]
    fn test_label_is_always_first() {
        let compiler = Compiler::with_builtin_types();
        let (doc, _) = compiler.compile_graph(&sample_graph());

        let label = doc.strings.index_of(LABEL_KEY).unwrap();
        for node in &doc.nodes {
            assert_eq!(node.props.first_key(), Some(label));
        }
        let kw = &doc.nodes[1];
        assert_eq!(kw.props.get(label).unwrap().as_str(&doc.strings), Some("Keywords"));
    }

    #[test]
    fn test_numbers_stay_native() {
        let compiler = Compiler::with_builtin_types();
        let (doc, _) = compiler.compile_graph(&sample_graph());

        let kw = &doc.nodes[1];
        let depth = kw.props.get_named(&doc.strings, "scan_depth").unwrap();
        assert_eq!(depth, &CompactValue::Num(3.0));
        assert_eq!(doc.strings.index_of("3"), None);

        let sender = kw.props.get_named(&doc.strings, "sender").unwrap();
        assert_eq!(sender.as_str(&doc.strings), Some("all"));
    }

    #[test]
    fn test_text_ports_keep_numeric_looking_strings() {
        let mut graph = Graph::new();
        graph.add_node(
            GraphNode::new("text_join", "Join")
                .with_id("j")
                .with_property("separator", "1"),
        );
        let (doc, _) = Compiler::with_builtin_types().compile_graph(&graph);
        let sep = doc.nodes[0].props.get_named(&doc.strings, "separator").unwrap();
        assert_eq!(sep.as_str(&doc.strings), Some("1"));
    }

    #[test]
    fn test_unknown_nodes_and_their_edges_are_dropped() {
        let mut graph = sample_graph();
        graph.add_node(GraphNode::new("sticky_note", "Remember to refactor").with_id("note"));
        graph.connect("note", "default", "out", "entries");

        let (doc, report) = Compiler::with_builtin_types().compile_graph(&graph);

        assert_eq!(doc.nodes.len(), 3);
        assert_eq!(report.skipped_nodes.len(), 1);
        assert_eq!(report.skipped_nodes[0].id, "note");
        assert_eq!(report.dropped_edges.len(), 1);
        assert_eq!(doc.edges.len(), 2);
    }

    #[test]
    fn test_duplicate_ids_are_skipped() {
        let mut graph = sample_graph();
        graph.add_node(GraphNode::new("source_entries", "Again").with_id("src"));

        let (doc, report) = Compiler::with_builtin_types().compile_graph(&graph);
        assert_eq!(doc.nodes.len(), 3);
        assert_eq!(report.skipped_nodes[0].reason, "duplicate node id");
    }

    #[test]
    fn test_unnamed_ports_default() {
        let mut graph = sample_graph();
        graph.edges.push(lore_format::GraphEdge::new("src", "out"));

        let (doc, _) = Compiler::with_builtin_types().compile_graph(&graph);
        let last = doc.edges.last().unwrap();
        assert_eq!(doc.strings.get(last.src_port), Some("default"));
        assert_eq!(doc.strings.get(last.tgt_port), Some("default"));
    }

    #[test]
    fn test_compile_is_idempotent() {
        let compiler = Compiler::with_builtin_types();
        let graph = sample_graph();
        let (first, _) = compiler.compile_graph(&graph);
        let (second, _) = compiler.compile_graph(&graph);

        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }

    #[test]
    fn test_nested_attribute_records() {
        let mut strings = StringTable::new();
        let value = json!([
            {"name": "north", "type": "string", "value": "cold"},
            {"name": "level", "type": "number", "value": "5"}
        ]);
        let compact = compact_value(&value, StorageHint::Auto, &mut strings);

        assert_eq!(
            compact.decompress(&strings),
            json!([
                {"name": "north", "type": "string", "value": "cold"},
                {"name": "level", "type": "number", "value": 5}
            ])
        );
    }

    #[test]
    fn test_pure_number_detection() {
        assert_eq!(pure_number("12"), Some(12.0));
        assert_eq!(pure_number("-0.5"), Some(-0.5));
        assert_eq!(pure_number("inf"), None);
        assert_eq!(pure_number("NaN"), None);
        assert_eq!(pure_number("12 swords"), None);
        assert_eq!(pure_number(""), None);
        assert_eq!(pure_number("007"), None);
        assert_eq!(pure_number("1.50"), None);
        assert_eq!(pure_number(" 7"), None);
        assert_eq!(pure_number("1e3"), None);
    }

    #[test]
    fn test_entry_round_trip() {
        let entry = LoreEntry::new("Excalibur")
            .with_id("e1")
            .with_keywords(["sword", "blade"])
            .with_property("weight", 12)
            .with_property("era", "1200")
            .with_property("scenario", "The sword glows.");

        let data = Compiler::with_builtin_types().compile_entries(std::slice::from_ref(&entry));
        let back = data.decompress_entry(&data.entries[0]);

        assert_eq!(back.id, "e1");
        assert_eq!(back.label, "Excalibur");
        assert_eq!(back.properties["keywords"], json!(["sword", "blade"]));
        assert_eq!(back.properties["weight"], json!(12));
        // Numeric text comes back as a number.
        assert_eq!(back.properties["era"], json!(1200));
        assert_eq!(back.properties["scenario"], json!("The sword glows."));
    }
}
