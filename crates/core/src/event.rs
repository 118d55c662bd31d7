//! Unlock notifications emitted when a player crosses a threshold.

use crate::id::PlayerId;
use crate::Time;
use serde::{Deserialize, Serialize};

/// A resource became usable for a player as the direct result of one progress update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockNotification {
    /// Player who unlocked the resource
    pub player: PlayerId,

    /// Lower-cased resource id
    pub resource_id: String,

    /// Activity kind of the update that caused the unlock
    pub activity_kind: String,

    /// When it happened
    pub unlocked_at: Time,
}

impl UnlockNotification {
    /// Create a notification stamped with the current time.
    pub fn new(
        player: PlayerId,
        resource_id: impl Into<String>,
        activity_kind: impl Into<String>,
    ) -> Self {
        Self {
            player,
            resource_id: resource_id.into(),
            activity_kind: activity_kind.into(),
            unlocked_at: chrono::Utc::now(),
        }
    }
}
