//! Format errors.

use thiserror::Error;

/// Format result type.
pub type Result<T> = std::result::Result<T, FormatError>;

/// Errors raised while decoding, encoding or validating lore documents.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("type registry error: {0}")]
    Registry(#[from] toml::de::Error),

    #[error("node id table has {ids} entries but there are {nodes} nodes")]
    IdTableMismatch { ids: usize, nodes: usize },

    #[error("edge {edge} references node {node} but only {count} nodes exist")]
    EdgeOutOfRange { edge: usize, node: usize, count: usize },

    #[error("string index {index} is out of range for a table of {len} strings")]
    StringOutOfRange { index: u32, len: usize },

    #[error("malformed property list: {0}")]
    MalformedProps(String),
}
