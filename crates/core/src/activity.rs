//! Activity kinds and counter keys.

use serde::{Deserialize, Serialize};

/// Kind of tracked activity. Counters are grouped by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// Entities killed
    Kills,
    /// Items picked up
    Collect,
    /// Blocks broken
    Break,
    /// Values read from an external placeholder provider
    Placeholder,
}

impl ActivityKind {
    /// All kinds, in display order.
    pub const ALL: [ActivityKind; 4] = [
        ActivityKind::Kills,
        ActivityKind::Collect,
        ActivityKind::Break,
        ActivityKind::Placeholder,
    ];

    /// Storage name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Kills => "kills",
            ActivityKind::Collect => "collect",
            ActivityKind::Break => "break",
            ActivityKind::Placeholder => "placeholder",
        }
    }

    /// Parse a kind name, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "kills" => Some(ActivityKind::Kills),
            "collect" => Some(ActivityKind::Collect),
            "break" => Some(ActivityKind::Break),
            "placeholder" => Some(ActivityKind::Placeholder),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of a single progress counter inside a player's record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    /// Activity kind
    pub kind: ActivityKind,

    /// Normalized target (entity name, material name or namespaced id)
    pub target: String,
}

impl CounterKey {
    /// Create a counter key. The target is lower-cased.
    pub fn new(kind: ActivityKind, target: impl AsRef<str>) -> Self {
        Self {
            kind,
            target: target.as_ref().to_lowercase(),
        }
    }

    /// Whether an update for `(kind, key)` touches this counter.
    pub fn matches(&self, kind: &str, key: &str) -> bool {
        self.kind.as_str().eq_ignore_ascii_case(kind) && self.target.eq_ignore_ascii_case(key)
    }
}
