//! Per-run evaluation state.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::warn;

use lore_format::{Context, Highlight, TextField};

use super::{HighlightRecorder, Interpreter, NodeProps, TraceRecorder};
use crate::config::EngineConfig;
use crate::operators::{self, value, Outputs};

/// What one root contributed to the final output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootFragment {
    pub ids: Vec<String>,
    pub text: HashMap<TextField, String>,
}

/// Everything a finished session hands back to the interpreter.
#[derive(Debug, Default)]
pub(crate) struct SessionOutcome {
    pub fragments: Vec<RootFragment>,
    pub highlights: Vec<Vec<Highlight>>,
    pub executed: Vec<String>,
    pub trace: BTreeMap<String, BTreeMap<String, Value>>,
    pub warnings: Vec<String>,
    pub executions: HashMap<usize, usize>,
}

/// State of a single run: memo cache, recursion guard, recorders and RNG.
///
/// A session borrows the interpreter and the context for its whole life and
/// is never reused.
pub struct Session<'a> {
    interp: &'a Interpreter,
    context: &'a Context,
    messages: Vec<Value>,
    /// Node outputs, filled one whole node at a time.
    memo: HashMap<usize, Outputs>,
    /// Nodes currently being evaluated in this call chain.
    guard: HashSet<usize>,
    cycles: HashSet<usize>,
    warnings: Vec<String>,
    executions: HashMap<usize, usize>,
    highlights: HighlightRecorder,
    trace: TraceRecorder,
    rng: StdRng,
    fragments: Vec<RootFragment>,
}

impl<'a> Session<'a> {
    /// Start a run.
    pub fn new(interp: &'a Interpreter, context: &'a Context) -> Self {
        let config = interp.config();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let messages = context
            .messages()
            .iter()
            .enumerate()
            .map(|(index, message)| {
                let mut record = Map::new();
                record.insert("message".to_string(), Value::String(message.message.clone()));
                record.insert("is_bot".to_string(), Value::Bool(message.is_bot));
                record.insert("index".to_string(), Value::from(index));
                if let Some(date) = &message.date {
                    record.insert("date".to_string(), Value::String(date.clone()));
                }
                Value::Object(record)
            })
            .collect();

        Self {
            interp,
            context,
            messages,
            memo: HashMap::new(),
            guard: HashSet::new(),
            cycles: HashSet::new(),
            warnings: Vec::new(),
            executions: HashMap::new(),
            highlights: HighlightRecorder::new(),
            trace: TraceRecorder::new(config.record_trace),
            rng,
            fragments: Vec::new(),
        }
    }

    /// Evaluate a node and return the value of one of its output ports.
    pub fn evaluate(&mut self, node: usize, port: &str) -> Value {
        let interp = self.interp;
        if node >= interp.node_count() {
            return Value::Null;
        }
        if self.guard.contains(&node) {
            self.report_cycle(node);
            return Value::Null;
        }
        if let Some(outputs) = self.memo.get(&node) {
            return outputs.select(port);
        }

        let node_id = interp.node_id(node);
        let Some(kind) = interp.kind(node) else {
            let node_type = interp.behavior().node_type(node).unwrap_or("?");
            self.warn(format!("no operator for type {} at node {}", node_type, node_id));
            self.memo.insert(node, Outputs::default());
            return Value::Null;
        };

        self.guard.insert(node);
        *self.executions.entry(node).or_default() += 1;
        let outputs = operators::execute(kind, self, node);

        let selected = outputs.select(port);
        for (name, value) in outputs.iter() {
            self.trace.record(node_id, name, value);
        }
        if !kind.is_structural() && outputs.any_non_empty() {
            self.trace.mark_executed(node_id);
        }
        self.memo.insert(node, outputs);
        self.guard.remove(&node);
        selected
    }

    /// Evaluate a node port named by a string-table index.
    pub fn evaluate_port(&mut self, node: usize, port: u32) -> Value {
        match self.interp.behavior().strings.get(port) {
            Some(name) => self.evaluate(node, name),
            None => Value::Null,
        }
    }

    /// Resolve a node input.
    ///
    /// Ports and properties share a namespace: with no incoming edge the
    /// node's own property of the same name is used. With several incoming
    /// edges only the first counts.
    pub fn input(&mut self, node: usize, port: &str) -> Value {
        let interp = self.interp;
        let strings = &interp.behavior().strings;
        if let Some(port_index) = strings.index_of(port) {
            if let Some(&position) = interp.incoming(node, port_index).first() {
                let edge = interp.behavior().edges[position];
                return self.evaluate_port(edge.src_node as usize, edge.src_port);
            }
        }
        self.props(node)
            .value(port, strings)
            .unwrap_or(Value::Null)
    }

    /// Every value wired into a port, in edge order. Used by fan-in
    /// operators that accept more than one edge.
    pub fn inputs(&mut self, node: usize, port: &str) -> Vec<Value> {
        let interp = self.interp;
        let Some(port_index) = interp.behavior().strings.index_of(port) else {
            return self.props(node).value(port, &interp.behavior().strings).into_iter().collect();
        };
        let edges = interp.incoming(node, port_index);
        if edges.is_empty() {
            return self
                .props(node)
                .value(port, &interp.behavior().strings)
                .into_iter()
                .collect();
        }
        edges
            .iter()
            .map(|&position| {
                let edge = interp.behavior().edges[position];
                self.evaluate_port(edge.src_node as usize, edge.src_port)
            })
            .collect()
    }

    /// Check if a port is wired or has a property value.
    pub fn has_input(&self, node: usize, port: &str) -> bool {
        let strings = &self.interp.behavior().strings;
        let wired = strings
            .index_of(port)
            .is_some_and(|index| !self.interp.incoming(node, index).is_empty());
        wired || self.props(node).raw(port).is_some()
    }

    /// A categorical setting, lowercased. Wired inputs win over properties.
    pub fn setting(&mut self, node: usize, key: &str) -> Option<String> {
        let text = if self.is_wired(node, key) {
            Some(value::as_text(&self.input(node, key)))
        } else {
            self.props(node).text(key).map(str::to_string)
        };
        text.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty())
    }

    /// A text input with its case kept, such as an attribute name or a
    /// pattern. Empty text counts as absent.
    pub fn text(&mut self, node: usize, key: &str) -> Option<String> {
        let text = value::as_text(&self.input(node, key));
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// A numeric input, or `default` when absent.
    pub fn number(&mut self, node: usize, key: &str, default: f64) -> f64 {
        match self.input(node, key) {
            Value::Null => default,
            other => value::try_number(&other).unwrap_or(default),
        }
    }

    /// A boolean input, or `default` when absent.
    pub fn flag(&mut self, node: usize, key: &str, default: bool) -> bool {
        match self.input(node, key) {
            Value::Null => default,
            other => value::as_bool(&other),
        }
    }

    fn is_wired(&self, node: usize, port: &str) -> bool {
        self.interp
            .behavior()
            .strings
            .index_of(port)
            .is_some_and(|index| !self.interp.incoming(node, index).is_empty())
    }

    /// Resolved properties of a node.
    pub fn props(&self, node: usize) -> &'a NodeProps {
        self.interp.props_or_empty(node)
    }

    /// Stable id of a node.
    pub fn node_id(&self, node: usize) -> &'a str {
        self.interp.node_id(node)
    }

    /// The context being evaluated against.
    pub fn context(&self) -> &'a Context {
        self.context
    }

    /// Chat messages as operator records, oldest first.
    pub fn messages(&self) -> Vec<Value> {
        self.messages.clone()
    }

    /// Entry records, in data document order.
    pub fn entries(&self) -> &'a [Value] {
        self.interp.entries()
    }

    /// The run configuration.
    pub fn config(&self) -> &'a EngineConfig {
        self.interp.config()
    }

    /// Random source for the probability gate.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Record a highlight on a chat message.
    pub fn highlight(&mut self, message: usize, color: &str, start: usize, end: usize) {
        self.highlights.record(message, color, start, end);
    }

    /// Record a warning once.
    pub fn warn(&mut self, warning: String) {
        if !self.warnings.contains(&warning) {
            warn!(%warning, "lore run warning");
            self.warnings.push(warning);
        }
    }

    fn report_cycle(&mut self, node: usize) {
        if self.cycles.insert(node) {
            self.warn(format!("cycle detected at node {}", self.node_id(node)));
        }
    }

    /// Evaluate a root and keep its contribution.
    pub fn collect_root(&mut self, root: usize) {
        self.evaluate(root, "entries");
        let Some(outputs) = self.memo.get(&root) else {
            return;
        };

        let mut fragment = RootFragment::default();
        if let Some(ids) = outputs.get("ids") {
            fragment.ids = value::as_list(ids.clone())
                .iter()
                .map(value::as_text)
                .filter(|id| !id.is_empty())
                .collect();
        }
        for field in TextField::ALL {
            if let Some(text) = outputs.get(field.key()).map(value::as_text) {
                if !text.is_empty() {
                    fragment.text.insert(field, text);
                }
            }
        }
        self.fragments.push(fragment);
    }

    /// Operator body executions so far, by run index.
    pub fn executions(&self) -> &HashMap<usize, usize> {
        &self.executions
    }

    /// End the run.
    pub(crate) fn finish(self) -> SessionOutcome {
        let message_count = self.messages.len();
        let (trace, executed) = self.trace.into_parts();
        SessionOutcome {
            fragments: self.fragments,
            highlights: self.highlights.into_reverse_chronological(message_count),
            executed,
            trace,
            warnings: self.warnings,
            executions: self.executions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use lore_format::{Graph, GraphNode, LoreEntry};
    use serde_json::json;

    fn interpreter(graph: &Graph) -> Interpreter {
        let compiled = Compiler::with_builtin_types().compile(graph, &[LoreEntry::new("A").with_id("a")]);
        Interpreter::new(compiled.behavior, compiled.data, EngineConfig::default())
    }

    #[test]
    fn test_input_falls_back_to_property() {
        let mut graph = Graph::new();
        graph.add_node(
            GraphNode::new("math", "Add")
                .with_id("m")
                .with_property("a", 2)
                .with_property("b", 3),
        );
        let interp = interpreter(&graph);
        let context = Context::new();
        let mut session = Session::new(&interp, &context);

        assert_eq!(session.input(0, "a"), json!(2));
        assert_eq!(session.input(0, "missing"), Value::Null);
        assert!(session.has_input(0, "b"));
        assert!(!session.has_input(0, "c"));
    }

    #[test]
    fn test_first_edge_wins() {
        let mut graph = Graph::new();
        graph.add_node(GraphNode::new("source_literal", "One").with_id("one").with_property("value_1", 1));
        graph.add_node(GraphNode::new("source_literal", "Two").with_id("two").with_property("value_1", 2));
        graph.add_node(GraphNode::new("count", "Count").with_id("count"));
        graph.connect("one", "value", "count", "list");
        graph.connect("two", "value", "count", "list");

        let interp = interpreter(&graph);
        let context = Context::new();
        let mut session = Session::new(&interp, &context);

        assert_eq!(session.input(2, "list"), json!(1));
        assert_eq!(session.inputs(2, "list"), vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_memo_hit_skips_body() {
        let mut graph = Graph::new();
        graph.add_node(GraphNode::new("source_entries", "All").with_id("src"));
        let interp = interpreter(&graph);
        let context = Context::new();
        let mut session = Session::new(&interp, &context);

        let first = session.evaluate(0, "entries");
        let second = session.evaluate(0, "entries");

        assert_eq!(first, second);
        assert_eq!(session.executions()[&0], 1);
    }

    #[test]
    fn test_invalid_node_is_null() {
        let graph = Graph::new();
        let interp = interpreter(&graph);
        let context = Context::new();
        let mut session = Session::new(&interp, &context);

        assert_eq!(session.evaluate(42, "entries"), Value::Null);
        assert!(session.executions().is_empty());
    }

    #[test]
    fn test_setting_prefers_wired_input() {
        let mut graph = Graph::new();
        graph.add_node(
            GraphNode::new("source_literal", "Op")
                .with_id("op")
                .with_property("value_1", "Multiply"),
        );
        graph.add_node(GraphNode::new("math", "Math").with_id("m").with_property("operator", "add"));
        let interp = interpreter(&graph);
        let context = Context::new();
        let mut session = Session::new(&interp, &context);
        assert_eq!(session.setting(1, "operator").as_deref(), Some("add"));

        let mut graph = graph.clone();
        graph.connect("op", "value", "m", "operator");
        let interp = interpreter(&graph);
        let mut session = Session::new(&interp, &context);
        assert_eq!(session.setting(1, "operator").as_deref(), Some("multiply"));
    }
}
