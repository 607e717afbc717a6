//! Operator library - the node kinds the interpreter can evaluate.
//!
//! Dispatch is keyed by `(type, optional label substring)`. Overloaded types
//! such as `source` or `filter` pick a kind by a case-insensitive label match
//! first and fall back to their bare-type rule.
//!
//! Every operator is total: a missing or ill-typed input degrades to the
//! family's neutral value (empty list, 0, false) instead of failing.

mod adjacency;
mod filters;
mod lists;
mod matching;
mod math;
mod output;
mod sources;
mod text;
pub mod value;

pub use matching::{KeywordPattern, SenderFilter};

use serde_json::Value;

use crate::interpreter::Session;

/// Every operator the interpreter knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    SourceEntries,
    SourceMessages,
    SourceLiteral,
    SourceContext,
    KeywordFilter,
    MessageFilter,
    EntryFilter,
    Adjacency,
    Math,
    MathUnary,
    Compare,
    Logic,
    SetTest,
    Switch,
    Probability,
    JoinList,
    Remap,
    Sort,
    Slice,
    GetAttribute,
    Count,
    TextJoin,
    RegexMatch,
    RegexReplace,
    Reroute,
    OutputEntries,
    OutputContext,
}

impl OperatorKind {
    /// Root kinds are collected into the final output.
    pub fn is_root(&self) -> bool {
        matches!(self, OperatorKind::OutputEntries | OperatorKind::OutputContext)
    }

    /// Pure pass-through nodes are never reported as executed.
    pub fn is_structural(&self) -> bool {
        matches!(self, OperatorKind::Reroute)
    }
}

/// One dispatch rule. Rules with a label substring win over bare-type rules.
#[derive(Debug, Clone, Copy)]
struct DispatchRule {
    node_type: &'static str,
    label: Option<&'static str>,
    kind: OperatorKind,
}

const fn rule(node_type: &'static str, kind: OperatorKind) -> DispatchRule {
    DispatchRule {
        node_type,
        label: None,
        kind,
    }
}

const fn labeled(node_type: &'static str, label: &'static str, kind: OperatorKind) -> DispatchRule {
    DispatchRule {
        node_type,
        label: Some(label),
        kind,
    }
}

const DISPATCH: &[DispatchRule] = &[
    rule("source_entries", OperatorKind::SourceEntries),
    rule("source_messages", OperatorKind::SourceMessages),
    rule("source_literal", OperatorKind::SourceLiteral),
    rule("source_context", OperatorKind::SourceContext),
    labeled("source", "message", OperatorKind::SourceMessages),
    labeled("source", "literal", OperatorKind::SourceLiteral),
    labeled("source", "context", OperatorKind::SourceContext),
    rule("source", OperatorKind::SourceEntries),
    rule("keyword_filter", OperatorKind::KeywordFilter),
    rule("message_filter", OperatorKind::MessageFilter),
    rule("entry_filter", OperatorKind::EntryFilter),
    labeled("filter", "keyword", OperatorKind::KeywordFilter),
    labeled("filter", "message", OperatorKind::MessageFilter),
    rule("filter", OperatorKind::EntryFilter),
    rule("adjacency", OperatorKind::Adjacency),
    labeled("math", "floor", OperatorKind::MathUnary),
    labeled("math", "ceil", OperatorKind::MathUnary),
    labeled("math", "round", OperatorKind::MathUnary),
    labeled("math", "abs", OperatorKind::MathUnary),
    labeled("math", "sqrt", OperatorKind::MathUnary),
    labeled("math", "log", OperatorKind::MathUnary),
    rule("math", OperatorKind::Math),
    rule("math_unary", OperatorKind::MathUnary),
    rule("compare", OperatorKind::Compare),
    rule("logic", OperatorKind::Logic),
    rule("set_test", OperatorKind::SetTest),
    rule("switch", OperatorKind::Switch),
    rule("probability", OperatorKind::Probability),
    rule("join_list", OperatorKind::JoinList),
    rule("remap", OperatorKind::Remap),
    rule("sort", OperatorKind::Sort),
    rule("slice", OperatorKind::Slice),
    rule("get_attribute", OperatorKind::GetAttribute),
    rule("count", OperatorKind::Count),
    rule("text_join", OperatorKind::TextJoin),
    rule("regex_match", OperatorKind::RegexMatch),
    rule("regex_replace", OperatorKind::RegexReplace),
    rule("reroute", OperatorKind::Reroute),
    rule("output_entries", OperatorKind::OutputEntries),
    rule("output_context", OperatorKind::OutputContext),
    labeled("output", "context", OperatorKind::OutputContext),
    rule("output", OperatorKind::OutputEntries),
];

/// Resolve the operator for a node type and label.
pub fn resolve(node_type: &str, label: &str) -> Option<OperatorKind> {
    let label = label.to_lowercase();
    let candidates = || DISPATCH.iter().filter(|r| r.node_type == node_type);

    candidates()
        .find(|r| r.label.is_some_and(|needle| label.contains(needle)))
        .or_else(|| candidates().find(|r| r.label.is_none()))
        .map(|r| r.kind)
}

/// Named output values of one operator invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outputs {
    ports: Vec<(&'static str, Value)>,
}

impl Outputs {
    /// Outputs with a single port.
    pub fn single(port: &'static str, value: Value) -> Self {
        Self {
            ports: vec![(port, value)],
        }
    }

    /// Add another port.
    pub fn with(mut self, port: &'static str, value: Value) -> Self {
        self.ports.push((port, value));
        self
    }

    /// Value of a port by name.
    pub fn get(&self, port: &str) -> Option<&Value> {
        self.ports.iter().find(|(name, _)| *name == port).map(|(_, v)| v)
    }

    /// Value for a requested port. A node with one output answers every
    /// port name with it; an unknown port on a multi-output node is null.
    pub fn select(&self, port: &str) -> Value {
        match self.get(port) {
            Some(value) => value.clone(),
            None if self.ports.len() == 1 => self.ports[0].1.clone(),
            None => Value::Null,
        }
    }

    /// Iterate over the ports in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.ports.iter().map(|(name, value)| (*name, value))
    }

    /// Check if any port carries a non-empty value.
    pub fn any_non_empty(&self) -> bool {
        self.ports.iter().any(|(_, v)| !value::is_empty(v))
    }
}

/// Run an operator body.
pub(crate) fn execute(kind: OperatorKind, session: &mut Session<'_>, node: usize) -> Outputs {
    match kind {
        OperatorKind::SourceEntries => sources::entries(session, node),
        OperatorKind::SourceMessages => sources::messages(session, node),
        OperatorKind::SourceLiteral => sources::literal(session, node),
        OperatorKind::SourceContext => sources::context_field(session, node),
        OperatorKind::KeywordFilter => filters::keyword_filter(session, node),
        OperatorKind::MessageFilter => filters::message_filter(session, node),
        OperatorKind::EntryFilter => filters::entry_filter(session, node),
        OperatorKind::Adjacency => adjacency::adjacency(session, node),
        OperatorKind::Math => math::binary(session, node),
        OperatorKind::MathUnary => math::unary(session, node),
        OperatorKind::Compare => math::compare(session, node),
        OperatorKind::Logic => math::logic(session, node),
        OperatorKind::SetTest => math::set_test(session, node),
        OperatorKind::Switch => math::switch(session, node),
        OperatorKind::Probability => math::probability(session, node),
        OperatorKind::JoinList => lists::join_list(session, node),
        OperatorKind::Remap => lists::remap(session, node),
        OperatorKind::Sort => lists::sort(session, node),
        OperatorKind::Slice => lists::slice(session, node),
        OperatorKind::GetAttribute => lists::get_attribute(session, node),
        OperatorKind::Count => lists::count(session, node),
        OperatorKind::TextJoin => text::text_join(session, node),
        OperatorKind::RegexMatch => text::regex_match(session, node),
        OperatorKind::RegexReplace => text::regex_replace(session, node),
        OperatorKind::Reroute => Outputs::single("output", session.input(node, "input")),
        OperatorKind::OutputEntries => output::output_entries(session, node),
        OperatorKind::OutputContext => output::output_context(session, node),
    }
}
