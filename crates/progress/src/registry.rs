//! Resource id to condition registry.

use progression_conditions::{Condition, ConditionConfig, ConditionError, ConditionFactory, ConditionLookup};
use progression_core::{LockedItemConfig, ProgressionConfig, DEFAULT_LOCK_MESSAGE};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One tracked resource.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// Condition guarding the resource
    pub condition: Arc<Condition>,

    /// Configured lock message template
    pub message: Option<String>,
}

impl RegistryEntry {
    /// Lock message template, or the default one.
    pub fn message_or_default(&self) -> &str {
        self.message.as_deref().unwrap_or(DEFAULT_LOCK_MESSAGE)
    }
}

/// Outcome of building a registry from configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReloadReport {
    /// Ids registered, in configuration order
    pub loaded: Vec<String>,

    /// Ids skipped, with the reason
    pub skipped: Vec<(String, String)>,

    /// Ids dropped because their prerequisites form a cycle
    pub cycles: Vec<String>,
}

/// Immutable snapshot of every tracked resource.
#[derive(Debug, Clone, Default)]
pub struct ConditionRegistry {
    entries: HashMap<String, RegistryEntry>,
    order: Vec<String>,
}

impl ConditionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the `locked_items` section.
    ///
    /// Entries that fail to parse or build are skipped with a warning. Items
    /// whose prerequisites lead back to themselves are dropped.
    pub fn build(config: &ProgressionConfig, factory: &ConditionFactory) -> (Self, ReloadReport) {
        let mut registry = Self::new();
        let mut report = ReloadReport::default();

        for (raw_id, raw) in &config.locked_items {
            let id = raw_id.to_lowercase();
            match build_entry(raw, factory) {
                Ok(entry) => {
                    tracing::debug!(item = %id, condition = %entry.condition.description(), "Registered locked item");
                    registry.insert(id, entry);
                }
                Err(reason) => {
                    tracing::warn!(item = %id, error = %reason, "Skipping locked item");
                    report.skipped.push((id, reason));
                }
            }
        }

        for id in registry.cyclic_items() {
            tracing::warn!(item = %id, "Dropping locked item with cyclic prerequisites");
            registry.remove(&id);
            report.cycles.push(id);
        }

        report.loaded = registry.order.clone();
        (registry, report)
    }

    /// Insert an entry. A duplicate id replaces the earlier entry.
    pub fn insert(&mut self, id: impl Into<String>, entry: RegistryEntry) {
        let id = id.into().to_lowercase();
        if self.entries.insert(id.clone(), entry).is_some() {
            tracing::warn!(item = %id, "Duplicate locked item, later definition wins");
            self.order.retain(|existing| existing != &id);
        }
        self.order.push(id);
    }

    fn remove(&mut self, id: &str) {
        self.entries.remove(id);
        self.order.retain(|existing| existing != id);
    }

    /// Entry of a resource.
    pub fn get(&self, resource: &str) -> Option<&RegistryEntry> {
        self.entries.get(&resource.to_lowercase())
    }

    /// Condition of a resource.
    pub fn condition(&self, resource: &str) -> Option<&Arc<Condition>> {
        self.get(resource).map(|entry| &entry.condition)
    }

    /// Whether a resource is tracked.
    pub fn contains(&self, resource: &str) -> bool {
        self.entries.contains_key(&resource.to_lowercase())
    }

    /// Tracked ids in registration order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegistryEntry)> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|entry| (id.as_str(), entry)))
    }

    /// Number of tracked resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids that can reach themselves through prerequisite references.
    fn cyclic_items(&self) -> Vec<String> {
        let edges: HashMap<&str, Vec<&str>> = self
            .iter()
            .map(|(id, entry)| {
                let targets: Vec<&str> = entry
                    .condition
                    .referenced_items()
                    .into_iter()
                    .filter(|target| self.entries.contains_key(*target))
                    .collect();
                (id, targets)
            })
            .collect();

        self.order
            .iter()
            .filter(|id| reaches(&edges, id.as_str(), id.as_str()))
            .cloned()
            .collect()
    }
}

impl ConditionLookup for ConditionRegistry {
    fn condition_for(&self, resource: &str) -> Option<&Condition> {
        self.condition(resource).map(|condition| condition.as_ref())
    }
}

fn build_entry(raw: &serde_json::Value, factory: &ConditionFactory) -> Result<RegistryEntry, String> {
    let item = LockedItemConfig::from_value(raw).map_err(|e| e.to_string())?;
    let condition = item
        .condition
        .as_ref()
        .ok_or(ConditionError::MissingField("condition"))
        .and_then(ConditionConfig::from_value)
        .and_then(|config| factory.create(&config))
        .map_err(|e| e.to_string())?;

    Ok(RegistryEntry {
        condition: Arc::new(condition),
        message: item.message,
    })
}

/// Whether `target` is reachable from `start` in one or more steps.
fn reaches(edges: &HashMap<&str, Vec<&str>>, start: &str, target: &str) -> bool {
    let mut seen = HashSet::new();
    let mut stack: Vec<&str> = edges.get(start).cloned().unwrap_or_default();
    while let Some(node) = stack.pop() {
        if node == target {
            return true;
        }
        if seen.insert(node) {
            if let Some(next) = edges.get(node) {
                stack.extend(next.iter().copied());
            }
        }
    }
    false
}
