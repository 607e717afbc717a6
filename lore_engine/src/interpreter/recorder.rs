//! Highlight and trace recording.
//!
//! Neither recorder influences which entries activate. They exist for the
//! authoring tool: highlights show why an entry fired, the trace shows what
//! every port produced.

use serde_json::Value;
use std::collections::BTreeMap;

use lore_format::Highlight;

/// Highlight ranges per message, per color.
#[derive(Debug, Clone, Default)]
pub struct HighlightRecorder {
    /// Chronological message index → color → ranges.
    messages: BTreeMap<usize, BTreeMap<String, Vec<(usize, usize)>>>,
}

impl HighlightRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a half-open `[start, end)` character range.
    pub fn record(&mut self, message: usize, color: &str, start: usize, end: usize) {
        if end <= start {
            return;
        }
        self.messages
            .entry(message)
            .or_default()
            .entry(color.to_string())
            .or_default()
            .push((start, end));
    }

    /// Number of recorded ranges across all messages.
    pub fn range_count(&self) -> usize {
        self.messages
            .values()
            .flat_map(|colors| colors.values())
            .map(Vec::len)
            .sum()
    }

    /// Per-message highlight lists, most recent message first.
    ///
    /// The result has one slot per message. Ranges are sorted and repeated
    /// ranges appear once.
    pub fn into_reverse_chronological(self, message_count: usize) -> Vec<Vec<Highlight>> {
        let mut slots: Vec<Vec<Highlight>> = vec![Vec::new(); message_count];
        for (message, colors) in self.messages {
            if message >= message_count {
                continue;
            }
            let slot = &mut slots[message_count - 1 - message];
            for (color, mut ranges) in colors {
                ranges.sort_unstable();
                ranges.dedup();
                slot.push(Highlight { color, ranges });
            }
        }
        slots
    }
}

/// Per-port debug snapshots and the list of nodes that produced something.
#[derive(Debug, Clone, Default)]
pub struct TraceRecorder {
    enabled: bool,
    ports: BTreeMap<String, BTreeMap<String, Value>>,
    executed: Vec<String>,
}

impl TraceRecorder {
    /// Create a recorder; snapshots are only kept when `enabled`.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }

    /// Keep a snapshot of a port value.
    pub fn record(&mut self, node_id: &str, port: &str, value: &Value) {
        if !self.enabled {
            return;
        }
        self.ports
            .entry(node_id.to_string())
            .or_default()
            .insert(port.to_string(), value.clone());
    }

    /// Mark a node as having produced a value.
    pub fn mark_executed(&mut self, node_id: &str) {
        if !self.executed.iter().any(|id| id == node_id) {
            self.executed.push(node_id.to_string());
        }
    }

    /// Nodes marked executed, in first-execution order.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// Split into snapshots and executed node ids.
    pub fn into_parts(self) -> (BTreeMap<String, BTreeMap<String, Value>>, Vec<String>) {
        (self.ports, self.executed)
    }
}
