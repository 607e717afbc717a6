//! Engine errors.
//!
//! Only the build side can fail. A run of the interpreter always completes
//! and reports problems as warnings on the context.

use thiserror::Error;

use lore_format::FormatError;

/// Engine result type.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised while compiling or packaging lore documents.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("script template has no {0} placeholder")]
    MissingPlaceholder(&'static str),
}
