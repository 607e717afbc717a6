//! Compact values and ordered property lists.
//!
//! Wire encoding of a [`CompactValue`]:
//! - string-table reference → JSON unsigned integer
//! - native number → JSON float, always written with a fractional part
//! - bool / null → JSON bool / null
//! - list → JSON array
//! - `{name, type, value}` attribute record → `{"n": i, "t": i, "v": …}`
//!
//! A [`PropList`] is written flat as `[key, value, key, value, …]` and keeps
//! its order on the way back in.

mod document;

pub use document::*;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::FormatError;
use crate::strings::StringTable;

/// A property value inside a compact document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Value", try_from = "Value")]
pub enum CompactValue {
    Null,
    Bool(bool),
    Num(f64),
    /// Index into the owning document's string table.
    Str(u32),
    List(Vec<CompactValue>),
    /// Nested `{name, type, value}` record; name and type are interned.
    Attr {
        name: u32,
        kind: u32,
        value: Box<CompactValue>,
    },
}

impl CompactValue {
    /// Decode into a plain JSON value, resolving string references.
    ///
    /// Integral numbers come back as JSON integers. A dangling string index
    /// decodes to null.
    pub fn decompress(&self, strings: &StringTable) -> Value {
        match self {
            CompactValue::Null => Value::Null,
            CompactValue::Bool(b) => Value::Bool(*b),
            CompactValue::Num(n) => number_value(*n),
            CompactValue::Str(index) => strings
                .get(*index)
                .map(|s| Value::String(s.to_string()))
                .unwrap_or(Value::Null),
            CompactValue::List(items) => {
                Value::Array(items.iter().map(|v| v.decompress(strings)).collect())
            }
            CompactValue::Attr { name, kind, value } => {
                let mut record = Map::new();
                record.insert(
                    "name".to_string(),
                    strings.get(*name).map(|s| Value::String(s.to_string())).unwrap_or(Value::Null),
                );
                record.insert(
                    "type".to_string(),
                    strings.get(*kind).map(|s| Value::String(s.to_string())).unwrap_or(Value::Null),
                );
                record.insert("value".to_string(), value.decompress(strings));
                Value::Object(record)
            }
        }
    }

    /// The referenced string, if this is a string reference.
    pub fn as_str<'a>(&self, strings: &'a StringTable) -> Option<&'a str> {
        match self {
            CompactValue::Str(index) => strings.get(*index),
            _ => None,
        }
    }

    /// Visit every string index referenced by this value.
    pub fn for_each_string(&self, f: &mut impl FnMut(u32)) {
        match self {
            CompactValue::Str(index) => f(*index),
            CompactValue::List(items) => items.iter().for_each(|v| v.for_each_string(f)),
            CompactValue::Attr { name, kind, value } => {
                f(*name);
                f(*kind);
                value.for_each_string(f);
            }
            _ => {}
        }
    }
}

/// JSON number for an `f64`; integral values become integers.
pub fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl From<CompactValue> for Value {
    fn from(value: CompactValue) -> Self {
        match value {
            CompactValue::Null => Value::Null,
            CompactValue::Bool(b) => Value::Bool(b),
            // Non-finite numbers have no JSON form.
            CompactValue::Num(n) => Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null),
            CompactValue::Str(index) => Value::from(index),
            CompactValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            CompactValue::Attr { name, kind, value } => {
                let mut record = Map::new();
                record.insert("n".to_string(), Value::from(name));
                record.insert("t".to_string(), Value::from(kind));
                record.insert("v".to_string(), Value::from(*value));
                Value::Object(record)
            }
        }
    }
}

impl TryFrom<Value> for CompactValue {
    type Error = FormatError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(CompactValue::Null),
            Value::Bool(b) => Ok(CompactValue::Bool(b)),
            Value::Number(n) => match n.as_u64() {
                Some(index) => string_index(index).map(CompactValue::Str),
                None => Ok(CompactValue::Num(n.as_f64().unwrap_or(0.0))),
            },
            Value::String(s) => Err(FormatError::MalformedProps(format!(
                "bare string {:?} where a string index was expected",
                s
            ))),
            Value::Array(items) => items
                .into_iter()
                .map(CompactValue::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(CompactValue::List),
            Value::Object(mut record) => {
                let name = take_index(&mut record, "n")?;
                let kind = take_index(&mut record, "t")?;
                let value = record.remove("v").unwrap_or(Value::Null);
                Ok(CompactValue::Attr {
                    name,
                    kind,
                    value: Box::new(CompactValue::try_from(value)?),
                })
            }
        }
    }
}

fn string_index(raw: u64) -> Result<u32, FormatError> {
    u32::try_from(raw)
        .map_err(|_| FormatError::MalformedProps(format!("string index {} is too large", raw)))
}

fn take_index(record: &mut Map<String, Value>, key: &str) -> Result<u32, FormatError> {
    match record.remove(key).as_ref().and_then(Value::as_u64) {
        Some(index) => string_index(index),
        None => Err(FormatError::MalformedProps(format!(
            "attribute record is missing index field {:?}",
            key
        ))),
    }
}

/// Ordered association of interned keys to compact values.
///
/// The compiler always places `label` first; some operators rely on that.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<Value>", try_from = "Vec<Value>")]
pub struct PropList {
    entries: Vec<(u32, CompactValue)>,
}

impl PropList {
    /// Create an empty property list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a key/value pair, keeping insertion order.
    pub fn push(&mut self, key: u32, value: CompactValue) {
        self.entries.push((key, value));
    }

    /// First value stored under a key.
    pub fn get(&self, key: u32) -> Option<&CompactValue> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// First value stored under a key name, looked up through the table.
    pub fn get_named(&self, strings: &StringTable, name: &str) -> Option<&CompactValue> {
        strings.index_of(name).and_then(|key| self.get(key))
    }

    /// Iterate over the pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &CompactValue)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Key of the first pair.
    pub fn first_key(&self) -> Option<u32> {
        self.entries.first().map(|(k, _)| *k)
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode every pair into a JSON object.
    pub fn decompress(&self, strings: &StringTable) -> Map<String, Value> {
        let mut map = Map::new();
        for (key, value) in &self.entries {
            if let Some(name) = strings.get(*key) {
                map.entry(name.to_string())
                    .or_insert_with(|| value.decompress(strings));
            }
        }
        map
    }
}

impl From<PropList> for Vec<Value> {
    fn from(props: PropList) -> Self {
        let mut flat = Vec::with_capacity(props.entries.len() * 2);
        for (key, value) in props.entries {
            flat.push(Value::from(key));
            flat.push(Value::from(value));
        }
        flat
    }
}

impl TryFrom<Vec<Value>> for PropList {
    type Error = FormatError;

    fn try_from(flat: Vec<Value>) -> Result<Self, Self::Error> {
        if flat.len() % 2 != 0 {
            return Err(FormatError::MalformedProps(format!(
                "odd number of items ({}) in a key/value list",
                flat.len()
            )));
        }
        let mut props = PropList::new();
        let mut items = flat.into_iter();
        while let (Some(key), Some(value)) = (items.next(), items.next()) {
            let key = key
                .as_u64()
                .ok_or_else(|| FormatError::MalformedProps(format!("key {} is not an index", key)))?;
            props.push(string_index(key)?, CompactValue::try_from(value)?);
        }
        Ok(props)
    }
}
