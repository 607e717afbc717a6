//! Behavior and Data documents - the compiler's output and the interpreter's input.
//!
//! Wire schema:
//! - Behavior: `{ v, s: string[], i: string[], n: [typeIndex, props][], e: [src, srcPort, tgt, tgtPort][] }`
//! - Data: `{ v, s: string[], d: {id, l, p}[] }`

use serde::{Deserialize, Serialize};

use super::PropList;
use crate::error::{FormatError, Result};
use crate::graph::LoreEntry;
use crate::strings::StringTable;

/// Format version written into both documents.
pub const FORMAT_VERSION: &str = "1";

fn default_version() -> String {
    FORMAT_VERSION.to_string()
}

/// A compact node: interned type name plus ordered properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(u32, PropList)", into = "(u32, PropList)")]
pub struct CompactNode {
    pub type_index: u32,
    pub props: PropList,
}

impl From<(u32, PropList)> for CompactNode {
    fn from((type_index, props): (u32, PropList)) -> Self {
        Self { type_index, props }
    }
}

impl From<CompactNode> for (u32, PropList) {
    fn from(node: CompactNode) -> Self {
        (node.type_index, node.props)
    }
}

/// A compact edge: run indices for nodes, string indices for ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct CompactEdge {
    pub src_node: u32,
    pub src_port: u32,
    pub tgt_node: u32,
    pub tgt_port: u32,
}

impl From<[u32; 4]> for CompactEdge {
    fn from([src_node, src_port, tgt_node, tgt_port]: [u32; 4]) -> Self {
        Self {
            src_node,
            src_port,
            tgt_node,
            tgt_port,
        }
    }
}

impl From<CompactEdge> for [u32; 4] {
    fn from(edge: CompactEdge) -> Self {
        [edge.src_node, edge.src_port, edge.tgt_node, edge.tgt_port]
    }
}

/// The compiled behavior graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorDocument {
    #[serde(rename = "v", default = "default_version")]
    pub version: String,

    #[serde(rename = "s")]
    pub strings: StringTable,

    /// Stable node ids, parallel to `nodes`.
    #[serde(rename = "i")]
    pub node_ids: Vec<String>,

    #[serde(rename = "n")]
    pub nodes: Vec<CompactNode>,

    #[serde(rename = "e")]
    pub edges: Vec<CompactEdge>,
}

impl BehaviorDocument {
    /// Create an empty document at the current format version.
    pub fn new() -> Self {
        Self {
            version: default_version(),
            ..Default::default()
        }
    }

    /// Parse and validate a document.
    pub fn from_json(source: &str) -> Result<Self> {
        let document: Self = serde_json::from_str(source)?;
        document.validate()?;
        Ok(document)
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Check the structural invariants: one id per node, every edge endpoint
    /// in range and every string reference resolvable.
    pub fn validate(&self) -> Result<()> {
        if self.node_ids.len() != self.nodes.len() {
            return Err(FormatError::IdTableMismatch {
                ids: self.node_ids.len(),
                nodes: self.nodes.len(),
            });
        }

        let count = self.nodes.len();
        for (index, edge) in self.edges.iter().enumerate() {
            for node in [edge.src_node, edge.tgt_node] {
                if node as usize >= count {
                    return Err(FormatError::EdgeOutOfRange {
                        edge: index,
                        node: node as usize,
                        count,
                    });
                }
            }
            self.strings.resolve(edge.src_port)?;
            self.strings.resolve(edge.tgt_port)?;
        }

        for node in &self.nodes {
            self.strings.resolve(node.type_index)?;
            validate_props(&node.props, &self.strings)?;
        }
        Ok(())
    }

    /// Type name of a node.
    pub fn node_type(&self, index: usize) -> Option<&str> {
        self.nodes
            .get(index)
            .and_then(|node| self.strings.get(node.type_index))
    }

    /// Run index of a node by stable id.
    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.node_ids.iter().position(|n| n == id)
    }
}

/// A compact lore entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactEntry {
    pub id: String,

    #[serde(rename = "l")]
    pub label: u32,

    #[serde(rename = "p")]
    pub props: PropList,
}

/// The compiled lore entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataDocument {
    #[serde(rename = "v", default = "default_version")]
    pub version: String,

    #[serde(rename = "s")]
    pub strings: StringTable,

    #[serde(rename = "d")]
    pub entries: Vec<CompactEntry>,
}

impl DataDocument {
    /// Create an empty document at the current format version.
    pub fn new() -> Self {
        Self {
            version: default_version(),
            ..Default::default()
        }
    }

    /// Parse and validate a document.
    pub fn from_json(source: &str) -> Result<Self> {
        let document: Self = serde_json::from_str(source)?;
        document.validate()?;
        Ok(document)
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Check that every string reference resolves.
    pub fn validate(&self) -> Result<()> {
        for entry in &self.entries {
            self.strings.resolve(entry.label)?;
            validate_props(&entry.props, &self.strings)?;
        }
        Ok(())
    }

    /// Rebuild the authoring form of an entry.
    pub fn decompress_entry(&self, entry: &CompactEntry) -> LoreEntry {
        let mut properties = entry.props.decompress(&self.strings);
        // The label pair is an encoding detail, not a user property.
        properties.remove("label");
        LoreEntry {
            id: entry.id.clone(),
            label: self.strings.get(entry.label).unwrap_or_default().to_string(),
            properties,
        }
    }

    /// Every entry in authoring form, in document order.
    pub fn decompress_all(&self) -> Vec<LoreEntry> {
        self.entries.iter().map(|e| self.decompress_entry(e)).collect()
    }

    /// Entry position by stable id.
    pub fn entry_index(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }
}

fn validate_props(props: &PropList, strings: &StringTable) -> Result<()> {
    let mut missing = None;
    for (key, value) in props.iter() {
        if strings.get(key).is_none() {
            missing.get_or_insert(key);
        }
        value.for_each_string(&mut |index| {
            if strings.get(index).is_none() {
                missing.get_or_insert(index);
            }
        });
    }
    match missing {
        Some(index) => Err(FormatError::StringOutOfRange {
            index,
            len: strings.len(),
        }),
        None => Ok(()),
    }
}
