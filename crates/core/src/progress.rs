//! Per-player progress counters.

use crate::activity::CounterKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All counters of one player: activity kind -> target key -> count.
///
/// This is both the snapshot conditions are evaluated against and the
/// durable record format. Kinds and keys are stored lower-cased; an absent
/// entry counts as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerProgress {
    counters: BTreeMap<String, BTreeMap<String, u64>>,
}

impl PlayerProgress {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for `(kind, key)`.
    pub fn get(&self, kind: &str, key: &str) -> u64 {
        self.counters
            .get(&kind.to_lowercase())
            .and_then(|keys| keys.get(&key.to_lowercase()))
            .copied()
            .unwrap_or(0)
    }

    /// Current count for a counter key.
    pub fn get_key(&self, key: &CounterKey) -> u64 {
        self.get(key.kind.as_str(), &key.target)
    }

    /// Overwrite the count for `(kind, key)`.
    pub fn set(&mut self, kind: &str, key: &str, value: u64) {
        self.counters
            .entry(kind.to_lowercase())
            .or_default()
            .insert(key.to_lowercase(), value);
    }

    /// Add to the count for `(kind, key)` and return the new value.
    pub fn add(&mut self, kind: &str, key: &str, delta: u64) -> u64 {
        self.increment(kind, key, delta).1
    }

    /// Add to the count for `(kind, key)` and return `(old, new)`.
    ///
    /// `new` saturates at `u64::MAX`, so `new - old` may be less than `delta`.
    pub fn increment(&mut self, kind: &str, key: &str, delta: u64) -> (u64, u64) {
        let slot = self
            .counters
            .entry(kind.to_lowercase())
            .or_default()
            .entry(key.to_lowercase())
            .or_insert(0);
        let old = *slot;
        *slot = old.saturating_add(delta);
        (old, *slot)
    }

    /// Whether no counter has ever been written.
    pub fn is_empty(&self) -> bool {
        self.counters.values().all(|keys| keys.is_empty())
    }

    /// Iterate `(kind, key, count)` in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, u64)> {
        self.counters.iter().flat_map(|(kind, keys)| {
            keys.iter()
                .map(move |(key, count)| (kind.as_str(), key.as_str(), *count))
        })
    }
}
