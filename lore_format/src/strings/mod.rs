//! String table - the compiler's only deduplication mechanism.
//!
//! Every string that lands in a compact document is stored once and referred
//! to by its position. The table is append-only: an index handed out stays
//! valid for the lifetime of the table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{FormatError, Result};

/// Append-only, deduplicating sequence of strings.
///
/// Serialized as a plain JSON array of strings; the lookup index is rebuilt
/// on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct StringTable {
    strings: Vec<String>,
    lookup: HashMap<String, u32>,
}

impl StringTable {
    /// Create a new empty string table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its index. Interning the same string twice
    /// returns the same index.
    pub fn intern(&mut self, value: &str) -> u32 {
        if let Some(index) = self.lookup.get(value) {
            return *index;
        }
        let index = self.strings.len() as u32;
        self.strings.push(value.to_string());
        self.lookup.insert(value.to_string(), index);
        index
    }

    /// Index of a string that is already in the table.
    pub fn index_of(&self, value: &str) -> Option<u32> {
        self.lookup.get(value).copied()
    }

    /// String at an index.
    pub fn get(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    /// String at an index, or an error naming the bad index.
    pub fn resolve(&self, index: u32) -> Result<&str> {
        self.get(index).ok_or(FormatError::StringOutOfRange {
            index,
            len: self.strings.len(),
        })
    }

    /// Number of strings in the table.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Iterate over the strings in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for StringTable {
    fn from(strings: Vec<String>) -> Self {
        let mut lookup = HashMap::with_capacity(strings.len());
        for (index, value) in strings.iter().enumerate() {
            lookup.entry(value.clone()).or_insert(index as u32);
        }
        Self { strings, lookup }
    }
}

impl From<StringTable> for Vec<String> {
    fn from(table: StringTable) -> Self {
        table.strings
    }
}
