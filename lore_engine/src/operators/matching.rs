//! Keyword and condition matching against chat messages.
//!
//! Spans are reported as character offsets so they line up with what the
//! transcript UI shows, not with UTF-8 byte positions.

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use super::value::as_text;

/// A compiled keyword or condition.
#[derive(Debug, Clone)]
pub struct KeywordPattern {
    source: String,
    regex: Regex,
}

impl KeywordPattern {
    /// Whole-word keyword. A trailing `*` matches any word suffix, so
    /// `welcom*` finds "welcome" and "welcoming". Returns `None` for blank
    /// keywords.
    pub fn keyword(keyword: &str, case_sensitive: bool) -> Option<Self> {
        let keyword = keyword.trim();
        let stem = keyword.trim_end_matches('*');
        if stem.is_empty() {
            return None;
        }
        let wildcard = stem.len() != keyword.len();

        let mut pattern = String::new();
        if stem.chars().next().is_some_and(is_word_char) {
            pattern.push_str(r"\b");
        }
        pattern.push_str(&regex::escape(stem));
        if wildcard {
            pattern.push_str(r"\w*");
        } else if stem.chars().last().is_some_and(is_word_char) {
            pattern.push_str(r"\b");
        }

        build(&pattern, case_sensitive)
            .ok()
            .map(|regex| Self {
                source: keyword.to_string(),
                regex,
            })
    }

    /// A full regular expression.
    pub fn regex(pattern: &str, case_sensitive: bool) -> Result<Self, regex::Error> {
        Ok(Self {
            source: pattern.to_string(),
            regex: build(pattern, case_sensitive)?,
        })
    }

    /// The keyword or pattern this was built from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Check if the pattern occurs anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Every non-empty match as a `[start, end)` character range.
    pub fn find_spans(&self, text: &str) -> Vec<(usize, usize)> {
        self.regex
            .find_iter(text)
            .filter(|m| !m.as_str().is_empty())
            .map(|m| {
                let start = text[..m.start()].chars().count();
                (start, start + m.as_str().chars().count())
            })
            .collect()
    }
}

fn build(pattern: &str, case_sensitive: bool) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Which side of the conversation a filter looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderFilter {
    #[default]
    All,
    User,
    Bot,
}

impl SenderFilter {
    /// Parse a `sender` setting. Unknown values mean everyone.
    pub fn parse(setting: Option<&str>) -> Self {
        match setting {
            Some("user") | Some("human") => SenderFilter::User,
            Some("bot") | Some("character") | Some("ai") => SenderFilter::Bot,
            _ => SenderFilter::All,
        }
    }

    /// Check if a message from this sender is considered.
    pub fn accepts(&self, is_bot: Option<bool>) -> bool {
        match self {
            SenderFilter::All => true,
            SenderFilter::User => is_bot == Some(false),
            SenderFilter::Bot => is_bot == Some(true),
        }
    }
}

/// A message eligible for matching.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Position in the input list.
    pub position: usize,
    /// Chronological chat index, when the record carries one.
    pub index: Option<usize>,
    pub text: String,
}

/// Messages a filter should scan, oldest first.
///
/// Sender filtering happens first; `scan_depth` then keeps only that many of
/// the most recent survivors. A depth of 0 scans everything.
pub fn eligible(messages: &[Value], sender: SenderFilter, scan_depth: usize) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = messages
        .iter()
        .enumerate()
        .filter(|(_, record)| sender.accepts(record.get("is_bot").and_then(Value::as_bool)))
        .map(|(position, record)| match record {
            Value::Object(_) => Candidate {
                position,
                index: record
                    .get("index")
                    .and_then(Value::as_u64)
                    .map(|i| i as usize),
                text: record.get("message").map(as_text).unwrap_or_default(),
            },
            other => Candidate {
                position,
                index: None,
                text: as_text(other),
            },
        })
        .collect();

    if scan_depth > 0 && candidates.len() > scan_depth {
        candidates.drain(..candidates.len() - scan_depth);
    }
    candidates
}

/// Keep at most `cap` spans; a cap of 0 keeps all of them.
pub fn cap_spans(mut spans: Vec<(usize, usize)>, cap: usize) -> Vec<(usize, usize)> {
    if cap > 0 {
        spans.truncate(cap);
    }
    spans
}

/// Keywords from an entry attribute: a list, or a comma-separated string.
pub fn split_keywords(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::Array(items) => items.iter().map(as_text).collect(),
        Value::Null => Vec::new(),
        other => as_text(other).split(',').map(str::to_string).collect(),
    };
    raw.into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}
