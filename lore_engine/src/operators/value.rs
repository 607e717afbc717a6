//! Value coercions shared by the operators.
//!
//! Each coercion is total and lands on the neutral value of its family when
//! the input has the wrong shape.

use serde_json::Value;
use std::cmp::Ordering;

pub use lore_format::number_value;

/// A value as a list. Null is the empty list; a scalar is a one-item list.
pub fn as_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// A value as a number. Anything that does not read as one is 0.
pub fn as_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        Value::Array(items) if items.len() == 1 => as_number(&items[0]),
        _ => 0.0,
    }
}

/// A value as a number, if it really is one.
pub fn try_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Truthiness: false, 0, "", [], "false" and null are false.
pub fn as_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty() && !s.eq_ignore_ascii_case("false"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// A value as display text.
pub fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(_) => number_value(as_number(value)).to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items.iter().map(as_text).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// Null, empty text and empty lists count as "nothing produced".
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// The neutral value of the same family as `value`.
pub fn neutral_like(value: &Value) -> Value {
    match value {
        Value::Array(_) => Value::Array(Vec::new()),
        Value::Number(_) => number_value(0.0),
        Value::Bool(_) => Value::Bool(false),
        Value::String(_) => Value::String(String::new()),
        _ => Value::Null,
    }
}

/// Structural identity key. Object keys are ordered, so equal values give
/// equal keys.
pub fn identity_key(value: &Value) -> String {
    value.to_string()
}

/// The `id` field of a record as text.
pub fn id_of(value: &Value) -> Option<String> {
    match value.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => None,
        Some(other) => Some(as_text(other)),
    }
}

/// Key used for set membership: a record's id when it has one, otherwise
/// its text form.
pub fn member_key(value: &Value) -> String {
    match value {
        Value::Object(_) => id_of(value).unwrap_or_else(|| identity_key(value)),
        other => as_text(other),
    }
}

/// Named attribute of a record.
pub fn attribute<'a>(record: &'a Value, name: &str) -> Option<&'a Value> {
    match record.get(name) {
        Some(Value::Null) | None => None,
        Some(value) => Some(value),
    }
}

/// Ordering used by sort: numbers numerically, text case-insensitively,
/// numbers before text.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (try_number(a), try_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => as_text(a).to_lowercase().cmp(&as_text(b).to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_list() {
        assert_eq!(as_list(json!([1, 2])), vec![json!(1), json!(2)]);
        assert_eq!(as_list(Value::Null), Vec::<Value>::new());
        assert_eq!(as_list(json!("x")), vec![json!("x")]);
    }

    #[test]
    fn test_as_number() {
        assert_eq!(as_number(&json!(2.5)), 2.5);
        assert_eq!(as_number(&json!(" 7 ")), 7.0);
        assert_eq!(as_number(&json!("seven")), 0.0);
        assert_eq!(as_number(&json!(true)), 1.0);
        assert_eq!(as_number(&json!([4])), 4.0);
        assert_eq!(as_number(&json!({"a": 1})), 0.0);
    }

    #[test]
    fn test_truthiness() {
        assert!(!as_bool(&Value::Null));
        assert!(!as_bool(&json!(0)));
        assert!(!as_bool(&json!("")));
        assert!(!as_bool(&json!("False")));
        assert!(!as_bool(&json!([])));
        assert!(as_bool(&json!("yes")));
        assert!(as_bool(&json!([0])));
        assert!(as_bool(&json!({})));
    }

    #[test]
    fn test_as_text() {
        assert_eq!(as_text(&json!(3.0)), "3");
        assert_eq!(as_text(&json!(0.5)), "0.5");
        assert_eq!(as_text(&json!(["a", 1])), "a, 1");
        assert_eq!(as_text(&Value::Null), "");
    }

    #[test]
    fn test_member_key() {
        assert_eq!(member_key(&json!({"id": "x", "v": 1})), "x");
        assert_eq!(member_key(&json!({"id": 5})), "5");
        assert_eq!(member_key(&json!("x")), "x");
        assert_eq!(member_key(&json!(2)), "2");
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(&json!(2), &json!("10")), Ordering::Less);
        assert_eq!(compare_values(&json!("apple"), &json!("Banana")), Ordering::Less);
        assert_eq!(compare_values(&json!(1), &json!("zebra")), Ordering::Less);
    }
}
