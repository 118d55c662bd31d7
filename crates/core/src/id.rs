//! Unique identifiers for progression entities.

use serde::{Deserialize, Serialize};
use ulid::Ulid;
use uuid::Uuid;

/// Text that is neither a ULID nor a UUID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid player ID: {0}")]
pub struct InvalidPlayerId(String);

/// Stable identifier of a player. All progress and unlock state is keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(Ulid);

impl PlayerId {
    /// Generate a new PlayerId
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Build an id from its raw 128-bit value.
    pub fn from_u128(value: u128) -> Self {
        Self(Ulid(value))
    }

    /// Raw 128-bit value.
    pub fn as_u128(&self) -> u128 {
        self.0 .0
    }

    /// The same 128 bits as a UUID, for hosts that key players by UUID.
    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_u128(self.as_u128())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Accepts ULID text or any UUID form (hyphenated, simple, braced, urn).
impl std::str::FromStr for PlayerId {
    type Err = InvalidPlayerId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(ulid) = Ulid::from_string(s) {
            return Ok(Self(ulid));
        }
        Uuid::parse_str(s)
            .map(|uuid| Self::from_u128(uuid.as_u128()))
            .map_err(|_| InvalidPlayerId(s.to_string()))
    }
}
