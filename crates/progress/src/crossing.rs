//! Threshold crossing detection.

use crate::registry::ConditionRegistry;

/// Resources with a counter leaf on `(kind, key)` whose threshold lies in
/// `(old, new]`.
///
/// Pure: looks only at the registry and the two counter values. Each resource
/// is reported at most once, in registration order. Whether the resource's
/// whole condition is now met is for the caller to decide.
pub fn detect_crossings(
    registry: &ConditionRegistry,
    kind: &str,
    key: &str,
    old: u64,
    new: u64,
) -> Vec<String> {
    if new <= old {
        return Vec::new();
    }

    registry
        .iter()
        .filter(|(_, entry)| {
            entry.condition.counter_leaves().into_iter().any(|leaf| {
                let touches = leaf.counter_key().is_some_and(|k| k.matches(kind, key));
                let required = leaf.required_progress();
                touches && old < required && required <= new
            })
        })
        .map(|(id, _)| id.to_string())
        .collect()
}
