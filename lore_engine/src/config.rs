//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for an interpreter run.
///
/// Loadable from TOML; every field is optional there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for the probability gate. `None` draws from OS entropy each run.
    pub seed: Option<u64>,

    /// Record per-port debug snapshots into the context.
    pub record_trace: bool,

    /// Entry attribute that holds keywords when a filter does not name one.
    pub keyword_attribute: String,

    /// Highlight color for keyword filter matches.
    pub keyword_color: String,

    /// Highlight color for message filter matches.
    pub message_color: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            record_trace: true,
            keyword_attribute: "keywords".to_string(),
            keyword_color: "#ffd54f".to_string(),
            message_color: "#81d4fa".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.seed, None);
        assert!(config.record_trace);
        assert_eq!(config.keyword_attribute, "keywords");
    }

    #[test]
    fn test_partial_toml() {
        let config = EngineConfig::from_toml_str("seed = 7\nrecord_trace = false").unwrap();
        assert_eq!(config.seed, Some(7));
        assert!(!config.record_trace);
        assert_eq!(config.keyword_color, EngineConfig::default().keyword_color);
    }

    #[test]
    fn test_bad_toml() {
        assert!(EngineConfig::from_toml_str("seed = \"seven\"").is_err());
    }
}
