//! Filters over entries and messages.

use serde_json::Value;
use std::cmp::Ordering;

use super::matching::{cap_spans, eligible, split_keywords, Candidate, KeywordPattern, SenderFilter};
use super::value::{as_list, as_text, attribute, try_number};
use super::Outputs;
use crate::interpreter::Session;

/// Settings shared by the message-scanning filters.
struct ScanSettings {
    case_sensitive: bool,
    sender: SenderFilter,
    scan_depth: usize,
    match_cap: usize,
}

impl ScanSettings {
    fn read(session: &mut Session<'_>, node: usize) -> Self {
        let sender = session.setting(node, "sender");
        Self {
            case_sensitive: session.flag(node, "case_sensitive", false),
            sender: SenderFilter::parse(sender.as_deref()),
            scan_depth: session.number(node, "scan_depth", 0.0).max(0.0) as usize,
            match_cap: session.number(node, "match_cap", 0.0).max(0.0) as usize,
        }
    }
}

/// Messages wired into the node, or the whole chat when nothing is wired.
fn message_input(session: &mut Session<'_>, node: usize) -> Vec<Value> {
    if session.has_input(node, "messages") {
        as_list(session.input(node, "messages"))
    } else {
        session.messages()
    }
}

/// Keep entries whose keywords occur in the eligible messages.
///
/// An entry passes when any of its keywords matches any eligible message.
/// Every match is highlighted.
pub fn keyword_filter(session: &mut Session<'_>, node: usize) -> Outputs {
    let entries = as_list(session.input(node, "entries"));
    let messages = message_input(session, node);
    let settings = ScanSettings::read(session, node);
    let keyword_attribute = session
        .text(node, "keyword_attribute")
        .unwrap_or_else(|| session.config().keyword_attribute.clone());
    let color = session.config().keyword_color.clone();

    let candidates = eligible(&messages, settings.sender, settings.scan_depth);
    let mut matched = Vec::new();
    let mut unmatched = Vec::new();

    for entry in entries {
        let keywords = attribute(&entry, &keyword_attribute)
            .map(split_keywords)
            .unwrap_or_default();
        let patterns: Vec<KeywordPattern> = keywords
            .iter()
            .filter_map(|k| KeywordPattern::keyword(k, settings.case_sensitive))
            .collect();

        let mut hit = false;
        for candidate in &candidates {
            let mut spans: Vec<(usize, usize)> = patterns
                .iter()
                .flat_map(|pattern| pattern.find_spans(&candidate.text))
                .collect();
            if spans.is_empty() {
                continue;
            }
            hit = true;
            spans.sort_unstable();
            record_spans(session, candidate, &color, cap_spans(spans, settings.match_cap));
        }

        if hit {
            matched.push(entry);
        } else {
            unmatched.push(entry);
        }
    }

    Outputs::single("entries", Value::Array(matched)).with("unmatched", Value::Array(unmatched))
}

/// Sort messages and conditions into matched and unmatched buckets.
///
/// Conditions are keywords by default, or full regular expressions with
/// `use_regex`. A condition that does not compile is reported and never
/// matches.
pub fn message_filter(session: &mut Session<'_>, node: usize) -> Outputs {
    let messages = message_input(session, node);
    let conditions: Vec<String> = as_list(session.input(node, "conditions"))
        .iter()
        .map(as_text)
        .filter(|c| !c.trim().is_empty())
        .collect();
    let use_regex = session.flag(node, "use_regex", false);
    let settings = ScanSettings::read(session, node);
    let color = session.config().message_color.clone();

    let mut patterns: Vec<Option<KeywordPattern>> = Vec::with_capacity(conditions.len());
    for condition in &conditions {
        let pattern = if use_regex {
            match KeywordPattern::regex(condition, settings.case_sensitive) {
                Ok(pattern) => Some(pattern),
                Err(_) => {
                    let warning = format!(
                        "invalid regex {:?} at node {}",
                        condition,
                        session.node_id(node)
                    );
                    session.warn(warning);
                    None
                }
            }
        } else {
            KeywordPattern::keyword(condition, settings.case_sensitive)
        };
        patterns.push(pattern);
    }

    let candidates = eligible(&messages, settings.sender, settings.scan_depth);
    let mut message_hit = vec![false; messages.len()];
    let mut condition_hit = vec![false; conditions.len()];

    for candidate in &candidates {
        let mut spans = Vec::new();
        for (position, pattern) in patterns.iter().enumerate() {
            let Some(pattern) = pattern else {
                continue;
            };
            let found = pattern.find_spans(&candidate.text);
            if !found.is_empty() {
                condition_hit[position] = true;
                spans.extend(found);
            }
        }
        if spans.is_empty() {
            continue;
        }
        message_hit[candidate.position] = true;
        spans.sort_unstable();
        record_spans(session, candidate, &color, cap_spans(spans, settings.match_cap));
    }

    let (matched_messages, unmatched_messages) = split_by(messages, &message_hit);
    let conditions: Vec<Value> = conditions.into_iter().map(Value::String).collect();
    let (matched_conditions, unmatched_conditions) = split_by(conditions, &condition_hit);
    let any = !matched_messages.is_empty();

    Outputs::single("matched_messages", Value::Array(matched_messages))
        .with("unmatched_messages", Value::Array(unmatched_messages))
        .with("matched_conditions", Value::Array(matched_conditions))
        .with("unmatched_conditions", Value::Array(unmatched_conditions))
        .with("matched", Value::Bool(any))
}

fn record_spans(
    session: &mut Session<'_>,
    candidate: &Candidate,
    color: &str,
    spans: Vec<(usize, usize)>,
) {
    let Some(index) = candidate.index else {
        return;
    };
    for (start, end) in spans {
        session.highlight(index, color, start, end);
    }
}

fn split_by(items: Vec<Value>, hits: &[bool]) -> (Vec<Value>, Vec<Value>) {
    let mut yes = Vec::new();
    let mut no = Vec::new();
    for (item, hit) in items.into_iter().zip(hits) {
        if *hit {
            yes.push(item);
        } else {
            no.push(item);
        }
    }
    (yes, no)
}

/// Comparison operators understood by the entry filter and `compare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    Contains,
    NotContains,
}

impl Comparison {
    /// Parse an operator setting; unknown operators are `None`.
    pub fn parse(operator: &str) -> Option<Self> {
        let comparison = match operator.trim() {
            "==" | "=" | "eq" | "equals" | "is" => Comparison::Equal,
            "!=" | "<>" | "ne" | "not equals" | "is not" => Comparison::NotEqual,
            ">" | "gt" => Comparison::Greater,
            "<" | "lt" => Comparison::Less,
            ">=" | "gte" => Comparison::GreaterOrEqual,
            "<=" | "lte" => Comparison::LessOrEqual,
            "contains" => Comparison::Contains,
            "not contains" | "!contains" | "does not contain" => Comparison::NotContains,
            _ => return None,
        };
        Some(comparison)
    }

    /// Compare a possibly missing attribute with a candidate.
    ///
    /// A missing attribute equals nothing and contains nothing, so only the
    /// negated operators hold for it. A list attribute is judged by its
    /// elements: `==` and `contains` hold when any element satisfies them,
    /// their negations when none does.
    pub fn holds(&self, attribute: Option<&Value>, candidate: &Value) -> bool {
        let Some(attribute) = attribute else {
            return matches!(self, Comparison::NotEqual | Comparison::NotContains);
        };
        match (self, attribute) {
            (Comparison::NotEqual, Value::Array(_)) => !Comparison::Equal.holds(Some(attribute), candidate),
            (Comparison::NotContains, Value::Array(_)) => {
                !Comparison::Contains.holds(Some(attribute), candidate)
            }
            (_, Value::Array(items)) => items.iter().any(|item| self.holds(Some(item), candidate)),
            (Comparison::Equal, _) => loosely_equal(attribute, candidate),
            (Comparison::NotEqual, _) => !loosely_equal(attribute, candidate),
            (Comparison::Contains, _) => contains(attribute, candidate),
            (Comparison::NotContains, _) => !contains(attribute, candidate),
            (ordering, _) => match order(attribute, candidate) {
                Some(o) => match ordering {
                    Comparison::Greater => o == Ordering::Greater,
                    Comparison::Less => o == Ordering::Less,
                    Comparison::GreaterOrEqual => o != Ordering::Less,
                    Comparison::LessOrEqual => o != Ordering::Greater,
                    _ => false,
                },
                None => false,
            },
        }
    }
}

/// Numbers compare numerically, everything else as case-insensitive text.
fn loosely_equal(a: &Value, b: &Value) -> bool {
    if b.is_null() {
        return false;
    }
    match (try_number(a), try_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => as_text(a).to_lowercase() == as_text(b).to_lowercase(),
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    let needle = as_text(needle).to_lowercase();
    !needle.is_empty() && as_text(haystack).to_lowercase().contains(&needle)
}

/// Order two scalars. Mixed number/text pairs have no order.
fn order(a: &Value, b: &Value) -> Option<Ordering> {
    match (try_number(a), try_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        (None, None) if !a.is_null() && !b.is_null() => {
            Some(as_text(a).to_lowercase().cmp(&as_text(b).to_lowercase()))
        }
        _ => None,
    }
}

/// Keep entries whose attribute compares true against the candidates.
///
/// Mode `or` keeps an entry when any candidate satisfies the comparison;
/// mode `all` requires every candidate, and holds trivially for none.
pub fn entry_filter(session: &mut Session<'_>, node: usize) -> Outputs {
    let entries = as_list(session.input(node, "entries"));
    let name = session.text(node, "attribute_name").unwrap_or_default();
    let operator = session.setting(node, "operator").unwrap_or_else(|| "==".to_string());
    let values = as_list(session.input(node, "values"));
    let require_all = matches!(session.setting(node, "mode").as_deref(), Some("all") | Some("and"));

    let Some(comparison) = Comparison::parse(&operator) else {
        let warning = format!("unknown operator {:?} at node {}", operator, session.node_id(node));
        session.warn(warning);
        return Outputs::single("entries", Value::Array(Vec::new()))
            .with("rejected", Value::Array(entries));
    };

    let mut kept = Vec::new();
    let mut rejected = Vec::new();
    for entry in entries {
        let found = attribute(&entry, &name);
        let pass = if require_all {
            values.iter().all(|candidate| comparison.holds(found, candidate))
        } else {
            values.iter().any(|candidate| comparison.holds(found, candidate))
        };
        if pass {
            kept.push(entry);
        } else {
            rejected.push(entry);
        }
    }

    Outputs::single("entries", Value::Array(kept)).with("rejected", Value::Array(rejected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use crate::config::EngineConfig;
    use crate::interpreter::{Interpreter, SessionOutcome};
    use lore_format::{Context, Graph, GraphNode, LoreEntry, Message};
    use serde_json::json;

    fn lore() -> Vec<LoreEntry> {
        vec![
            LoreEntry::new("Excalibur")
                .with_id("sword")
                .with_keywords(["sword", "blade"])
                .with_property("region", "lake")
                .with_property("power", 9),
            LoreEntry::new("Aegis")
                .with_id("shield")
                .with_keywords(["shield"])
                .with_property("region", "north")
                .with_property("power", 4),
            LoreEntry::new("Tavern")
                .with_id("tavern")
                .with_keywords(["ale", "welcom*"])
                .with_property("tags", vec!["town", "rest"]),
        ]
    }

    /// Wire `source_entries` into `filter` and evaluate one of its ports.
    fn run_filter(filter: GraphNode, port: &str, context: &Context) -> (Value, SessionOutcome) {
        let mut graph = Graph::new();
        graph.add_node(GraphNode::new("source_entries", "All").with_id("src"));
        graph.add_node(filter.with_id("filter"));
        graph.connect("src", "entries", "filter", "entries");

        let compiled = Compiler::with_builtin_types().compile(&graph, &lore());
        let interp = Interpreter::new(compiled.behavior, compiled.data, EngineConfig::default());
        let mut session = Session::new(&interp, context);
        let value = session.evaluate(1, port);
        (value, session.finish())
    }

    fn ids(value: &Value) -> Vec<String> {
        as_list(value.clone())
            .iter()
            .filter_map(|e| e.get("id").map(as_text))
            .collect()
    }

    #[test]
    fn test_keyword_filter_matches_whole_words() {
        let context = Context::with_messages(vec![Message::user("I draw my sword")]);
        let (value, outcome) = run_filter(GraphNode::new("keyword_filter", "Keywords"), "entries", &context);
        assert_eq!(ids(&value), vec!["sword"]);

        assert_eq!(outcome.highlights[0].len(), 1);
        assert_eq!(outcome.highlights[0][0].ranges, vec![(10, 15)]);
        assert_eq!(outcome.highlights[0][0].color, EngineConfig::default().keyword_color);
    }

    #[test]
    fn test_keyword_filter_unmatched_output() {
        let context = Context::with_messages(vec![Message::user("You are welcomed in")]);
        let (value, _) = run_filter(GraphNode::new("keyword_filter", "Keywords"), "unmatched", &context);
        assert_eq!(ids(&value), vec!["sword", "shield"]);
    }

    #[test]
    fn test_keyword_filter_sender_and_depth() {
        let context = Context::with_messages(vec![
            Message::user("my shield is up"),
            Message::bot("a blade flashes"),
            Message::user("nothing here"),
        ]);

        let users = GraphNode::new("keyword_filter", "Keywords").with_property("sender", "user");
        assert_eq!(ids(&run_filter(users, "entries", &context).0), vec!["shield"]);

        let recent = GraphNode::new("keyword_filter", "Keywords").with_property("scan_depth", 2);
        assert_eq!(ids(&run_filter(recent, "entries", &context).0), vec!["sword"]);
    }

    #[test]
    fn test_keyword_filter_match_cap() {
        let context = Context::with_messages(vec![Message::user("sword, sword and a blade")]);
        let node = GraphNode::new("keyword_filter", "Keywords").with_property("match_cap", 2);
        let (_, outcome) = run_filter(node, "entries", &context);
        assert_eq!(outcome.highlights[0][0].ranges, vec![(0, 5), (7, 12)]);
    }

    #[test]
    fn test_keyword_filter_custom_attribute() {
        let context = Context::with_messages(vec![Message::user("we head north")]);
        let node = GraphNode::new("keyword_filter", "Keywords").with_property("keyword_attribute", "region");
        let (value, _) = run_filter(node, "entries", &context);
        assert_eq!(ids(&value), vec!["shield"]);
    }

    fn message_filter(conditions: Value, use_regex: bool, port: &str, messages: Vec<Message>) -> (Value, Vec<String>) {
        let mut graph = Graph::new();
        graph.add_node(
            GraphNode::new("message_filter", "Messages")
                .with_id("mf")
                .with_property("conditions", conditions)
                .with_property("use_regex", use_regex),
        );
        let compiled = Compiler::with_builtin_types().compile(&graph, &[]);
        let interp = Interpreter::new(compiled.behavior, compiled.data, EngineConfig::default());
        let context = Context::with_messages(messages);
        let mut session = Session::new(&interp, &context);
        let value = session.evaluate(0, port);
        (value, session.finish().warnings)
    }

    #[test]
    fn test_message_filter_buckets() {
        let messages = vec![Message::user("the dragon wakes"), Message::bot("run!")];
        let conditions = json!(["dragon", "griffin"]);

        let (matched, _) = message_filter(conditions.clone(), false, "matched_messages", messages.clone());
        assert_eq!(matched, json!([{"message": "the dragon wakes", "is_bot": false, "index": 0}]));

        let (unmatched, _) = message_filter(conditions.clone(), false, "unmatched_messages", messages.clone());
        assert_eq!(as_list(unmatched).len(), 1);

        let (hit, _) = message_filter(conditions.clone(), false, "matched_conditions", messages.clone());
        assert_eq!(hit, json!(["dragon"]));

        let (miss, _) = message_filter(conditions.clone(), false, "unmatched_conditions", messages.clone());
        assert_eq!(miss, json!(["griffin"]));

        let (any, _) = message_filter(conditions, false, "matched", messages);
        assert_eq!(any, json!(true));
    }

    #[test]
    fn test_message_filter_regex() {
        let messages = vec![Message::user("Roll 2d6 please")];
        let (any, warnings) = message_filter(json!([r"\d+d\d+"]), true, "matched", messages);
        assert_eq!(any, json!(true));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_message_filter_invalid_regex_never_matches() {
        let messages = vec![Message::user("(open")];
        let (any, warnings) = message_filter(json!(["(open"]), true, "matched", messages.clone());
        assert_eq!(any, json!(false));
        assert_eq!(warnings, vec!["invalid regex \"(open\" at node mf"]);

        let (miss, _) = message_filter(json!(["(open"]), true, "unmatched_conditions", messages);
        assert_eq!(miss, json!(["(open"]));
    }

    #[test]
    fn test_entry_filter_operators() {
        let context = Context::new();
        let filter = |op: &str, values: Value| {
            GraphNode::new("entry_filter", "By attribute")
                .with_property("attribute_name", "power")
                .with_property("operator", op)
                .with_property("values", values)
        };

        assert_eq!(ids(&run_filter(filter(">", json!([5])), "entries", &context).0), vec!["sword"]);
        assert_eq!(ids(&run_filter(filter("<=", json!([4])), "entries", &context).0), vec!["shield"]);
        assert_eq!(ids(&run_filter(filter("==", json!(["9"])), "entries", &context).0), vec!["sword"]);
        // Tavern has no power attribute, so only the negation holds for it.
        assert_eq!(
            ids(&run_filter(filter("!=", json!([9])), "entries", &context).0),
            vec!["shield", "tavern"]
        );
    }

    #[test]
    fn test_entry_filter_list_attribute() {
        let context = Context::new();
        let node = GraphNode::new("entry_filter", "Tags")
            .with_property("attribute_name", "tags")
            .with_property("operator", "==")
            .with_property("values", json!(["rest"]));
        assert_eq!(ids(&run_filter(node, "entries", &context).0), vec!["tavern"]);

        let node = GraphNode::new("entry_filter", "Tags")
            .with_property("attribute_name", "tags")
            .with_property("operator", "not contains")
            .with_property("values", json!(["tow"]));
        assert_eq!(ids(&run_filter(node, "entries", &context).0), vec!["sword", "shield"]);
    }

    #[test]
    fn test_entry_filter_modes() {
        let context = Context::new();
        let node = |mode: &str, values: Value| {
            GraphNode::new("entry_filter", "Region")
                .with_property("attribute_name", "region")
                .with_property("operator", "==")
                .with_property("mode", mode)
                .with_property("values", values)
        };

        assert_eq!(
            ids(&run_filter(node("or", json!(["lake", "north"])), "entries", &context).0),
            vec!["sword", "shield"]
        );
        assert!(ids(&run_filter(node("all", json!(["lake", "north"])), "entries", &context).0).is_empty());
        // Every entry satisfies "all" of no candidates.
        assert_eq!(ids(&run_filter(node("all", json!([])), "entries", &context).0).len(), 3);
        assert_eq!(
            ids(&run_filter(node("or", json!(["lake"])), "rejected", &context).0),
            vec!["shield", "tavern"]
        );
    }

    #[test]
    fn test_comparison_with_missing_attribute() {
        assert!(!Comparison::Equal.holds(None, &json!("x")));
        assert!(Comparison::NotEqual.holds(None, &json!("x")));
        assert!(Comparison::NotContains.holds(None, &json!("x")));
        assert!(!Comparison::Greater.holds(None, &json!(1)));
    }

    #[test]
    fn test_comparison_mixed_types() {
        assert!(!Comparison::Greater.holds(Some(&json!("abc")), &json!(1)));
        assert!(Comparison::Greater.holds(Some(&json!("b")), &json!("A")));
        assert!(Comparison::Contains.holds(Some(&json!("Dark Forest")), &json!("forest")));
    }
}
