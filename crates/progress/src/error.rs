//! Progress service errors.

use progression_storage::StorageError;

/// Result type for progress operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Errors returned by administrative and lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// Durable storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The resource has no registered condition
    #[error("Item is not tracked: {0}")]
    UntrackedItem(String),

    /// The resource's condition has no counter that can be set directly
    #[error("Item has no trackable counter: {0}")]
    NoTrackableCounter(String),
}
