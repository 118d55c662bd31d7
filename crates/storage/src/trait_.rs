//! Storage trait abstraction.

use async_trait::async_trait;
use progression_core::{PlayerId, PlayerProgress};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Durable storage for per-player progress records.
///
/// One record per player. A missing record means zero progress on every key.
#[async_trait]
pub trait ProgressStorage: Send + Sync {
    /// Load a player's record, `None` if nothing was ever saved.
    async fn load_progress(&self, player: PlayerId) -> Result<Option<PlayerProgress>>;

    /// Save (create or replace) a player's record.
    async fn save_progress(&self, player: PlayerId, progress: &PlayerProgress) -> Result<()>;

    /// Delete a player's record. Deleting a missing record is not an error.
    async fn delete_progress(&self, player: PlayerId) -> Result<()>;

    /// List every player with a saved record.
    async fn list_players(&self) -> Result<Vec<PlayerId>>;
}
