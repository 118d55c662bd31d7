//! Progression core data models.
//!
//! This crate defines the identities, activity kinds, notifications and
//! configuration model shared by every other progression crate.

#![warn(missing_docs)]

// Identities
mod id;

// Activity tracking
mod activity;
mod event;
mod progress;

// Configuration
mod config;

// Re-exports
pub use id::{InvalidPlayerId, PlayerId};
pub use activity::{ActivityKind, CounterKey};
pub use event::UnlockNotification;
pub use progress::PlayerProgress;
pub use config::{
    ConfigError, LockedItemConfig, ProgressionConfig, VocabularyConfig, DEFAULT_LOCK_MESSAGE,
};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
