//! Interpreter - evaluates a compiled behavior graph against a live context.
//!
//! A run works as follows:
//! 1. **Roots**: Find every root node, ordered by its numeric `order`
//! 2. **Pull**: Evaluate each root; operators pull their inputs upstream
//! 3. **Memoize**: Every node body runs at most once per run
//! 4. **Guard**: A node re-entered mid-evaluation yields null for that branch
//! 5. **Fold**: Append text fragments and activated ids into the context
//!
//! Memo cache, recursion guard and recorders live in a [`Session`] that is
//! created at the start of every run and dropped at its end.

mod props;
mod recorder;
mod session;

pub use props::*;
pub use recorder::*;
pub use session::*;

use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use lore_format::{BehaviorDocument, Context, DataDocument, TextField};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::operators::{self, value, OperatorKind};

/// Summary of one run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Entry ids activated by this run, in activation order.
    pub activated_ids: Vec<String>,

    /// Warnings raised by this run.
    pub warnings: Vec<String>,

    /// Operator body executions per stable node id.
    pub executions: HashMap<String, usize>,

    /// Number of root nodes evaluated.
    pub roots: usize,
}

impl RunReport {
    /// How many times a node's operator body ran.
    pub fn executions_of(&self, node_id: &str) -> usize {
        self.executions.get(node_id).copied().unwrap_or(0)
    }
}

/// A loaded pair of compact documents, ready to run any number of times.
#[derive(Debug, Clone)]
pub struct Interpreter {
    behavior: BehaviorDocument,
    data: DataDocument,
    config: EngineConfig,
    /// Operator per node; `None` for types without an operator.
    kinds: Vec<Option<OperatorKind>>,
    props: Vec<NodeProps>,
    /// Answer for node indices out of range.
    no_props: NodeProps,
    /// `(target node, target port)` → edge positions, in document order.
    incoming: HashMap<(usize, u32), Vec<usize>>,
    /// Entries as operator records, in document order.
    entries: Vec<Value>,
}

impl Interpreter {
    /// Load two compact documents.
    ///
    /// Edges with an endpoint out of range are ignored with a warning; they
    /// cannot be evaluated but must not stop the rest of the graph.
    pub fn new(behavior: BehaviorDocument, data: DataDocument, config: EngineConfig) -> Self {
        let props: Vec<NodeProps> = behavior
            .nodes
            .iter()
            .map(|node| NodeProps::resolve(node, &behavior.strings))
            .collect();

        let kinds = (0..behavior.nodes.len())
            .map(|index| {
                let node_type = behavior.node_type(index).unwrap_or_default();
                operators::resolve(node_type, props[index].label())
            })
            .collect();

        let mut incoming: HashMap<(usize, u32), Vec<usize>> = HashMap::new();
        for (position, edge) in behavior.edges.iter().enumerate() {
            let count = behavior.nodes.len();
            if edge.src_node as usize >= count || edge.tgt_node as usize >= count {
                warn!(edge = position, "ignoring edge with an endpoint out of range");
                continue;
            }
            incoming
                .entry((edge.tgt_node as usize, edge.tgt_port))
                .or_default()
                .push(position);
        }

        let entries = data
            .entries
            .iter()
            .map(|entry| data.decompress_entry(entry).to_record())
            .collect();

        Self {
            behavior,
            data,
            config,
            kinds,
            props,
            no_props: NodeProps::default(),
            incoming,
            entries,
        }
    }

    /// Parse both documents from JSON and load them.
    pub fn from_json(behavior: &str, data: &str, config: EngineConfig) -> Result<Self> {
        let behavior = BehaviorDocument::from_json(behavior)?;
        let data = DataDocument::from_json(data)?;
        Ok(Self::new(behavior, data, config))
    }

    /// The behavior document.
    pub fn behavior(&self) -> &BehaviorDocument {
        &self.behavior
    }

    /// The data document.
    pub fn data(&self) -> &DataDocument {
        &self.data
    }

    /// The run configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.behavior.nodes.len()
    }

    /// Operator for a node.
    pub fn kind(&self, node: usize) -> Option<OperatorKind> {
        self.kinds.get(node).copied().flatten()
    }

    /// Resolved properties of a node.
    pub fn props(&self, node: usize) -> Option<&NodeProps> {
        self.props.get(node)
    }

    /// Properties of a node, empty when the index is out of range.
    pub fn props_or_empty(&self, node: usize) -> &NodeProps {
        self.props.get(node).unwrap_or(&self.no_props)
    }

    /// Stable id of a node.
    pub fn node_id(&self, node: usize) -> &str {
        self.behavior
            .node_ids
            .get(node)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Entry records, in document order.
    pub fn entries(&self) -> &[Value] {
        &self.entries
    }

    pub(crate) fn incoming(&self, node: usize, port: u32) -> &[usize] {
        self.incoming
            .get(&(node, port))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Root nodes in evaluation order: ascending `order`, then run index.
    pub fn roots(&self) -> Vec<usize> {
        let mut roots: Vec<(f64, usize)> = (0..self.node_count())
            .filter(|node| self.kind(*node).is_some_and(|kind| kind.is_root()))
            .map(|node| {
                let order = self.props[node]
                    .value("order", &self.behavior.strings)
                    .map(|v| value::as_number(&v))
                    .unwrap_or(0.0);
                (order, node)
            })
            .collect();
        roots.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        roots.into_iter().map(|(_, node)| node).collect()
    }

    /// Evaluate the graph once against a context.
    ///
    /// Never fails: problems become warnings on the context and in the
    /// report, and whatever could be evaluated is still applied.
    pub fn run(&self, context: &mut Context) -> RunReport {
        let roots = self.roots();
        let outcome = {
            let mut session = Session::new(self, context);
            for root in &roots {
                session.collect_root(*root);
            }
            session.finish()
        };

        let mut report = RunReport {
            roots: roots.len(),
            ..Default::default()
        };

        for fragment in &outcome.fragments {
            for field in TextField::ALL {
                if let Some(text) = fragment.text.get(&field) {
                    context.character.append(field, text);
                }
            }
            for id in &fragment.ids {
                if context.activate(id) && !report.activated_ids.contains(id) {
                    report.activated_ids.push(id.clone());
                }
            }
        }

        context.chat_highlights = outcome.highlights;
        for id in &outcome.executed {
            if !context.debug_nodes.contains(id) {
                context.debug_nodes.push(id.clone());
            }
        }
        for (node_id, ports) in outcome.trace {
            context.debug_ports.entry(node_id).or_default().extend(ports);
        }
        for warning in &outcome.warnings {
            context.warn(warning.clone());
        }

        report.warnings = outcome.warnings;
        report.executions = outcome
            .executions
            .into_iter()
            .map(|(node, count)| (self.node_id(node).to_string(), count))
            .collect();

        if report.roots == 0 {
            debug!("no root nodes in behavior graph");
        }
        info!(
            roots = report.roots,
            activated = report.activated_ids.len(),
            warnings = report.warnings.len(),
            "lore run complete"
        );
        report
    }
}
