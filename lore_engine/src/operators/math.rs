//! Arithmetic, comparison and logic.

use rand::Rng;
use serde_json::Value;
use std::collections::HashSet;

use super::filters::Comparison;
use super::value::{as_bool, as_list, as_number, member_key, neutral_like, number_value};
use super::Outputs;
use crate::interpreter::Session;

const BINARY: &[&str] = &["add", "subtract", "multiply", "divide", "modulo", "power", "min", "max"];
const UNARY: &[&str] = &["floor", "ceil", "round", "abs", "sqrt", "log"];

/// The operator setting, or the first known operator named in the label.
fn operator(session: &mut Session<'_>, node: usize, known: &[&str], default: &str) -> String {
    if let Some(op) = session.setting(node, "operator") {
        return op;
    }
    let label = session.props(node).label().to_lowercase();
    known
        .iter()
        .find(|op| label.contains(*op))
        .map(|op| op.to_string())
        .unwrap_or_else(|| default.to_string())
}

fn apply_binary(op: &str, a: f64, b: f64) -> Option<f64> {
    let result = match op {
        "add" | "+" => a + b,
        "subtract" | "-" => a - b,
        "multiply" | "*" => a * b,
        "divide" | "/" if b == 0.0 => 0.0,
        "divide" | "/" => a / b,
        "modulo" | "%" if b == 0.0 => 0.0,
        "modulo" | "%" => a % b,
        "power" | "^" => a.powf(b),
        "min" => a.min(b),
        "max" => a.max(b),
        _ => return None,
    };
    Some(if result.is_finite() { result } else { 0.0 })
}

fn apply_unary(op: &str, x: f64) -> Option<f64> {
    let result = match op {
        "floor" => x.floor(),
        "ceil" => x.ceil(),
        "round" => x.round(),
        "abs" => x.abs(),
        "sqrt" if x < 0.0 => 0.0,
        "sqrt" => x.sqrt(),
        "log" if x <= 0.0 => 0.0,
        "log" => x.ln(),
        _ => return None,
    };
    Some(if result.is_finite() { result } else { 0.0 })
}

/// Element-wise binary arithmetic.
///
/// Two lists are paired up to the shorter length; a scalar is broadcast
/// against a list. Division and modulo by zero give 0.
pub fn binary(session: &mut Session<'_>, node: usize) -> Outputs {
    let op = operator(session, node, BINARY, "add");
    if apply_binary(&op, 0.0, 1.0).is_none() {
        let warning = format!("unknown math operator {:?} at node {}", op, session.node_id(node));
        session.warn(warning);
        return Outputs::single("result", number_value(0.0));
    }
    let a = session.input(node, "a");
    let b = session.input(node, "b");
    let calc = |x: &Value, y: &Value| number_value(apply_binary(&op, as_number(x), as_number(y)).unwrap_or(0.0));

    let result = match (&a, &b) {
        (Value::Array(xs), Value::Array(ys)) => Value::Array(xs.iter().zip(ys).map(|(x, y)| calc(x, y)).collect()),
        (Value::Array(xs), y) => Value::Array(xs.iter().map(|x| calc(x, y)).collect()),
        (x, Value::Array(ys)) => Value::Array(ys.iter().map(|y| calc(x, y)).collect()),
        (x, y) => calc(x, y),
    };
    Outputs::single("result", result)
}

/// Single-input arithmetic, element-wise over lists.
///
/// `sqrt` of a negative number and `log` of a non-positive one give 0.
pub fn unary(session: &mut Session<'_>, node: usize) -> Outputs {
    let op = operator(session, node, UNARY, "round");
    if apply_unary(&op, 1.0).is_none() {
        let warning = format!("unknown math operator {:?} at node {}", op, session.node_id(node));
        session.warn(warning);
        return Outputs::single("result", number_value(0.0));
    }
    let calc = |x: &Value| number_value(apply_unary(&op, as_number(x)).unwrap_or(0.0));
    let result = match session.input(node, "value") {
        Value::Array(xs) => Value::Array(xs.iter().map(calc).collect()),
        x => calc(&x),
    };
    Outputs::single("result", result)
}

/// Compare `a` with `b`.
pub fn compare(session: &mut Session<'_>, node: usize) -> Outputs {
    let op = session.setting(node, "operator").unwrap_or_else(|| "==".to_string());
    let a = session.input(node, "a");
    let b = session.input(node, "b");
    let result = match Comparison::parse(&op) {
        Some(comparison) => comparison.holds((!a.is_null()).then_some(&a), &b),
        None => {
            let warning = format!("unknown operator {:?} at node {}", op, session.node_id(node));
            session.warn(warning);
            false
        }
    };
    Outputs::single("result", Value::Bool(result))
}

/// Boolean `and`, `or`, `not` and `xor`.
pub fn logic(session: &mut Session<'_>, node: usize) -> Outputs {
    let op = session.setting(node, "operator").unwrap_or_else(|| "and".to_string());
    let a = as_bool(&session.input(node, "a"));
    let result = match op.as_str() {
        "not" => !a,
        "and" => a && as_bool(&session.input(node, "b")),
        "or" => a || as_bool(&session.input(node, "b")),
        "xor" => a != as_bool(&session.input(node, "b")),
        _ => {
            let warning = format!("unknown logic operator {:?} at node {}", op, session.node_id(node));
            session.warn(warning);
            false
        }
    };
    Outputs::single("result", Value::Bool(result))
}

/// Set relations between `subject` and `reference`.
///
/// Records are compared by id. An empty subject is trivially `all`.
pub fn set_test(session: &mut Session<'_>, node: usize) -> Outputs {
    let op = session.setting(node, "operator").unwrap_or_else(|| "any".to_string());
    let subject: HashSet<String> = as_list(session.input(node, "subject")).iter().map(member_key).collect();
    let reference: HashSet<String> = as_list(session.input(node, "reference")).iter().map(member_key).collect();

    let result = match op.as_str() {
        "any" | "intersects" => !subject.is_disjoint(&reference),
        "all" | "subset" => subject.is_subset(&reference),
        "none" | "disjoint" => subject.is_disjoint(&reference),
        "equal" | "equals" => subject == reference,
        _ => {
            let warning = format!("unknown set operator {:?} at node {}", op, session.node_id(node));
            session.warn(warning);
            false
        }
    };
    Outputs::single("result", Value::Bool(result))
}

/// Pick `if_true` or `if_false`. Only the chosen branch is evaluated.
pub fn switch(session: &mut Session<'_>, node: usize) -> Outputs {
    let condition = as_bool(&session.input(node, "condition"));
    let branch = if condition { "if_true" } else { "if_false" };
    Outputs::single("result", session.input(node, branch))
}

/// Let `value` through with probability `chance` (0 to 1).
pub fn probability(session: &mut Session<'_>, node: usize) -> Outputs {
    let chance = session.number(node, "chance", 0.5).clamp(0.0, 1.0);
    let value = session.input(node, "value");
    let passed = session.rng().gen::<f64>() < chance;
    let value = if passed { value } else { neutral_like(&value) };
    Outputs::single("value", value).with("passed", Value::Bool(passed))
}
