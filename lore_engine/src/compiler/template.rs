//! Embedding compiled documents into the script template.
//!
//! The template is an opaque script with two placeholders. Minification and
//! bundling of the result happen elsewhere.

use lore_format::{BehaviorDocument, DataDocument};

use crate::error::{EngineError, Result};

/// Placeholder replaced by the serialized behavior document.
pub const BEHAVIOR_PLACEHOLDER: &str = "__LORE_BEHAVIOR__";

/// Placeholder replaced by the serialized data document.
pub const DATA_PLACEHOLDER: &str = "__LORE_DATA__";

/// Substitute both documents into a script template.
///
/// Every occurrence of each placeholder is replaced. A template missing
/// either placeholder is rejected.
pub fn embed_documents(
    template: &str,
    behavior: &BehaviorDocument,
    data: &DataDocument,
) -> Result<String> {
    if !template.contains(BEHAVIOR_PLACEHOLDER) {
        return Err(EngineError::MissingPlaceholder(BEHAVIOR_PLACEHOLDER));
    }
    if !template.contains(DATA_PLACEHOLDER) {
        return Err(EngineError::MissingPlaceholder(DATA_PLACEHOLDER));
    }

    let behavior_json = behavior.to_json()?;
    let data_json = data.to_json()?;
    Ok(template
        .replace(BEHAVIOR_PLACEHOLDER, &behavior_json)
        .replace(DATA_PLACEHOLDER, &data_json))
}
