//! Authoring graph - the verbose, editable form of a lore activation graph.
//!
//! The authoring graph is what the editor saves:
//! - **Nodes**: stable string ids, a type name, a label and a property map
//! - **Edges**: node id + named port on both ends
//! - **Entries**: the lore records the graph filters and activates
//!
//! The compiler lowers this into the compact documents in [`crate::compact`].

mod entry;
mod types;

pub use entry::*;
pub use types::*;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Port name used when an edge does not name one.
pub const DEFAULT_PORT: &str = "default";

/// A node in the authoring graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Stable id, preserved into the compact document's id table.
    pub id: String,

    /// Type name, looked up in the [`TypeRegistry`].
    #[serde(rename = "type")]
    pub node_type: String,

    /// Human-readable label. Some overloaded types dispatch on it.
    #[serde(default)]
    pub label: String,

    /// Property values: scalars, lists, or nested `{name, type, value}` records.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl GraphNode {
    /// Create a new node with a random stable id.
    pub fn new(node_type: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            node_type: node_type.into(),
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
}

/// A directed edge between two node ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    #[serde(default)]
    pub source_port: Option<String>,
    pub target: String,
    #[serde(default)]
    pub target_port: Option<String>,
}

impl GraphEdge {
    /// Create an edge between the default ports of two nodes.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            source_port: None,
            target: target.into(),
            target_port: None,
        }
    }

    /// Set the output port on the source node.
    pub fn from_port(mut self, port: impl Into<String>) -> Self {
        self.source_port = Some(port.into());
        self
    }

    /// Set the input port on the target node.
    pub fn to_port(mut self, port: impl Into<String>) -> Self {
        self.target_port = Some(port.into());
        self
    }

    /// Source port name, falling back to [`DEFAULT_PORT`].
    pub fn source_port_name(&self) -> &str {
        self.source_port.as_deref().unwrap_or(DEFAULT_PORT)
    }

    /// Target port name, falling back to [`DEFAULT_PORT`].
    pub fn target_port_name(&self) -> &str {
        self.target_port.as_deref().unwrap_or(DEFAULT_PORT)
    }
}

/// The complete authoring graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its stable id.
    pub fn add_node(&mut self, node: GraphNode) -> String {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    /// Connect `source.source_port` to `target.target_port`.
    pub fn connect(&mut self, source: &str, source_port: &str, target: &str, target_port: &str) {
        self.edges
            .push(GraphEdge::new(source, target).from_port(source_port).to_port(target_port));
    }

    /// Get a node by stable id.
    pub fn get_node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_builder() {
        let node = GraphNode::new("keyword_filter", "Keywords")
            .with_id("n1")
            .with_property("case_sensitive", false)
            .with_property("scan_depth", 4);

        assert_eq!(node.id, "n1");
        assert_eq!(node.properties.len(), 2);
        assert_eq!(node.properties["scan_depth"], json!(4));
    }

    #[test]
    fn test_edge_default_ports() {
        let edge = GraphEdge::new("a", "b");
        assert_eq!(edge.source_port_name(), DEFAULT_PORT);
        assert_eq!(edge.target_port_name(), DEFAULT_PORT);

        let edge = edge.from_port("entries").to_port("input");
        assert_eq!(edge.source_port_name(), "entries");
        assert_eq!(edge.target_port_name(), "input");
    }

    #[test]
    fn test_graph_from_json() {
        let graph: Graph = serde_json::from_value(json!({
            "nodes": [
                {"id": "src", "type": "source_entries", "label": "All entries"},
                {"id": "out", "type": "output_entries", "properties": {"order": 1}}
            ],
            "edges": [
                {"source": "src", "source_port": "entries", "target": "out", "target_port": "entries"}
            ]
        }))
        .unwrap();

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.get_node("out").unwrap().label, "");
        assert_eq!(graph.edges[0].target_port_name(), "entries");
    }
}
