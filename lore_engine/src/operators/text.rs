//! String operators.

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use super::value::{as_list, as_text};
use super::Outputs;
use crate::interpreter::Session;

const DEFAULT_SEPARATOR: &str = ", ";

/// Join values into one string. Empty items are skipped.
pub fn text_join(session: &mut Session<'_>, node: usize) -> Outputs {
    let values = as_list(session.input(node, "values"));
    // Not trimmed: whitespace separators are meaningful.
    let separator = match session.input(node, "separator") {
        Value::Null => DEFAULT_SEPARATOR.to_string(),
        other => as_text(&other),
    };
    let text = values
        .iter()
        .map(as_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(&separator);
    Outputs::single("text", Value::String(text))
}

/// Compile the node's `pattern`, reporting a bad one.
fn pattern(session: &mut Session<'_>, node: usize) -> Option<Regex> {
    let source = session.text(node, "pattern")?;
    let case_sensitive = session.flag(node, "case_sensitive", true);
    match RegexBuilder::new(&source).case_insensitive(!case_sensitive).build() {
        Ok(regex) => Some(regex),
        Err(_) => {
            let warning = format!("invalid regex {:?} at node {}", source, session.node_id(node));
            session.warn(warning);
            None
        }
    }
}

/// Test `text` against `pattern` and list every match.
pub fn regex_match(session: &mut Session<'_>, node: usize) -> Outputs {
    let text = as_text(&session.input(node, "text"));
    let matches: Vec<Value> = match pattern(session, node) {
        Some(regex) => regex
            .find_iter(&text)
            .map(|m| Value::String(m.as_str().to_string()))
            .collect(),
        None => Vec::new(),
    };
    Outputs::single("matched", Value::Bool(!matches.is_empty())).with("matches", Value::Array(matches))
}

/// Replace every match of `pattern` in `text`. `$1`-style group references
/// work in `replacement`. Without a usable pattern the text passes through.
pub fn regex_replace(session: &mut Session<'_>, node: usize) -> Outputs {
    let text = as_text(&session.input(node, "text"));
    let replacement = as_text(&session.input(node, "replacement"));
    let result = match pattern(session, node) {
        Some(regex) => regex.replace_all(&text, replacement.as_str()).into_owned(),
        None => text,
    };
    Outputs::single("text", Value::String(result))
}

#[cfg(test)]
mod tests {
    use crate::compiler::Compiler;
    use crate::config::EngineConfig;
    use crate::interpreter::{Interpreter, Session};
    use lore_format::{Context, Graph, GraphNode};
    use serde_json::{json, Value};

    fn single(node: GraphNode, port: &str) -> (Value, Vec<String>) {
        let mut graph = Graph::new();
        graph.add_node(node.with_id("t"));
        let compiled = Compiler::with_builtin_types().compile(&graph, &[]);
        let interp = Interpreter::new(compiled.behavior, compiled.data, EngineConfig::default());
        let context = Context::new();
        let mut session = Session::new(&interp, &context);
        let value = session.evaluate(0, port);
        (value, session.finish().warnings)
    }

    #[test]
    fn test_text_join() {
        let node = GraphNode::new("text_join", "Join").with_property("values", json!(["a", "", "b", 3]));
        assert_eq!(single(node, "text").0, json!("a, b, 3"));

        let node = GraphNode::new("text_join", "Join")
            .with_property("values", json!(["a", "b"]))
            .with_property("separator", " / ");
        assert_eq!(single(node, "text").0, json!("a / b"));
    }

    #[test]
    fn test_regex_match() {
        let node = GraphNode::new("regex_match", "Dice")
            .with_property("text", "roll 2d6 and 1d20")
            .with_property("pattern", r"\d+d\d+");
        assert_eq!(single(node.clone(), "matched").0, json!(true));
        assert_eq!(single(node, "matches").0, json!(["2d6", "1d20"]));
    }

    #[test]
    fn test_regex_match_case() {
        let node = GraphNode::new("regex_match", "Case")
            .with_property("text", "Dragon")
            .with_property("pattern", "dragon");
        assert_eq!(single(node.clone(), "matched").0, json!(false));
        let node = node.with_property("case_sensitive", false);
        assert_eq!(single(node, "matched").0, json!(true));
    }

    #[test]
    fn test_regex_replace() {
        let node = GraphNode::new("regex_replace", "Swap")
            .with_property("text", "Sir Kay and Sir Bors")
            .with_property("pattern", r"Sir (\w+)")
            .with_property("replacement", "Lord $1");
        assert_eq!(single(node, "text").0, json!("Lord Kay and Lord Bors"));
    }

    #[test]
    fn test_invalid_pattern_degrades() {
        let node = GraphNode::new("regex_replace", "Broken")
            .with_property("text", "unchanged")
            .with_property("pattern", "[oops");
        let (value, warnings) = single(node, "text");
        assert_eq!(value, json!("unchanged"));
        assert_eq!(warnings, vec!["invalid regex \"[oops\" at node t"]);

        let node = GraphNode::new("regex_match", "Broken")
            .with_property("text", "anything")
            .with_property("pattern", "[oops");
        assert_eq!(single(node, "matches").0, json!([]));
    }
}
