//! Configuration file model.
//!
//! The configuration is a JSON document whose `locked_items` section maps a
//! resource id to its display message and condition. Entries are kept as raw
//! JSON so one malformed entry never prevents the others from loading.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Default message shown for a locked item without a configured message.
pub const DEFAULT_LOCK_MESSAGE: &str = "You haven't unlocked this item yet.";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level progression configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionConfig {
    /// Root directory for per-player records
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Known entity and material names
    #[serde(default)]
    pub vocabulary: VocabularyConfig,

    /// Resource id -> `{ message, condition }`, in file order
    #[serde(default)]
    pub locked_items: Map<String, Value>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".progression")
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            vocabulary: VocabularyConfig::default(),
            locked_items: Map::new(),
        }
    }
}

impl ProgressionConfig {
    /// Load configuration from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        let config = Self::from_json(&text)?;
        tracing::debug!(
            path = %path.display(),
            items = config.locked_items.len(),
            "Loaded progression configuration"
        );
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Entity and material names accepted by condition constructors.
///
/// Empty lists mean any identifier-shaped name is accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VocabularyConfig {
    /// Known entity kinds
    #[serde(default)]
    pub entities: Vec<String>,

    /// Known material / block names
    #[serde(default)]
    pub materials: Vec<String>,
}

/// One entry of the `locked_items` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockedItemConfig {
    /// Display template shown when the item is locked
    #[serde(default)]
    pub message: Option<String>,

    /// Condition configuration record (`{ "type": ..., ... }`)
    #[serde(default)]
    pub condition: Option<Value>,
}

impl LockedItemConfig {
    /// Parse an entry from its raw JSON value.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        Ok(Self::deserialize(value)?)
    }
}
