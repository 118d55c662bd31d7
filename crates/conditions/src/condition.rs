//! The condition model and its evaluation.
//!
//! A [`Condition`] is immutable once built. Evaluation reads everything it
//! needs from an [`EvalContext`]: the player's counter snapshot, the
//! conditions of other resources (for prerequisites) and the external
//! placeholder provider.

use crate::resolver::PlaceholderResolver;
use progression_core::{ActivityKind, CounterKey, PlayerId, PlayerProgress};
use std::collections::HashMap;

/// Lookup of the condition registered for a resource.
pub trait ConditionLookup {
    /// Condition guarding `resource` (lower-cased id), if it is tracked.
    fn condition_for(&self, resource: &str) -> Option<&Condition>;
}

impl ConditionLookup for HashMap<String, Condition> {
    fn condition_for(&self, resource: &str) -> Option<&Condition> {
        self.get(resource)
    }
}

/// Everything a condition needs to evaluate for one player.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    /// Player being evaluated
    pub player: PlayerId,

    /// Counter snapshot of that player
    pub progress: &'a PlayerProgress,

    /// Conditions of other resources
    pub lookup: &'a dyn ConditionLookup,

    /// External metric provider
    pub resolver: &'a dyn PlaceholderResolver,
}

impl<'a> EvalContext<'a> {
    /// Bundle an evaluation context.
    pub fn new(
        player: PlayerId,
        progress: &'a PlayerProgress,
        lookup: &'a dyn ConditionLookup,
        resolver: &'a dyn PlaceholderResolver,
    ) -> Self {
        Self {
            player,
            progress,
            lookup,
            resolver,
        }
    }
}

/// A rule over accumulated progress.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Kill `required` entities of a kind.
    Kill {
        /// Normalized entity kind
        entity: String,
        /// Threshold
        required: u64,
    },

    /// Pick up `required` items of a material or namespaced id.
    Collect {
        /// Normalized material name or lower-cased `ns:key`
        target: String,
        /// Threshold
        required: u64,
        /// Whether `target` is a namespaced custom id
        custom: bool,
    },

    /// Break `required` blocks of a material.
    Break {
        /// Normalized material name
        target: String,
        /// Threshold
        required: u64,
    },

    /// Reach a value reported by the external placeholder provider.
    ExternalMetric {
        /// Placeholder token, always wrapped in `%`
        placeholder: String,
        /// Threshold
        required: f64,
    },

    /// Have another resource unlocked first, optionally plus one more condition.
    Prerequisite {
        /// Lower-cased resource id that must be unlocked
        item: String,
        /// Extra condition that must also be met
        additional: Option<Box<Condition>>,
    },

    /// All sub-conditions at once.
    Composite(CompositeCondition),
}

impl Condition {
    /// Configuration kind name of this condition.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Condition::Kill { .. } => "kills",
            Condition::Collect { .. } => "collect",
            Condition::Break { .. } => "break",
            Condition::ExternalMetric { .. } => "placeholder",
            Condition::Prerequisite { .. } => "prerequisite",
            Condition::Composite(_) => "composite",
        }
    }

    /// Local counter this condition reads, for the three counter kinds.
    pub fn counter_key(&self) -> Option<CounterKey> {
        match self {
            Condition::Kill { entity, .. } => Some(CounterKey::new(ActivityKind::Kills, entity)),
            Condition::Collect { target, .. } => Some(CounterKey::new(ActivityKind::Collect, target)),
            Condition::Break { target, .. } => Some(CounterKey::new(ActivityKind::Break, target)),
            _ => None,
        }
    }

    /// Main subject of the condition: entity, material, placeholder or item.
    pub fn target(&self) -> Option<&str> {
        match self {
            Condition::Kill { entity, .. } => Some(entity.as_str()),
            Condition::Collect { target, .. } | Condition::Break { target, .. } => Some(target.as_str()),
            Condition::ExternalMetric { placeholder, .. } => Some(placeholder.as_str()),
            Condition::Prerequisite { item, .. } => Some(item.as_str()),
            Condition::Composite(_) => None,
        }
    }

    /// Composite view, if this is a composite.
    pub fn as_composite(&self) -> Option<&CompositeCondition> {
        match self {
            Condition::Composite(composite) => Some(composite),
            _ => None,
        }
    }

    /// Whether this is a prerequisite.
    pub fn is_prerequisite(&self) -> bool {
        matches!(self, Condition::Prerequisite { .. })
    }

    /// Whether the condition is currently satisfied.
    pub fn is_met(&self, ctx: &EvalContext<'_>) -> bool {
        match self {
            Condition::Kill { required, .. }
            | Condition::Collect { required, .. }
            | Condition::Break { required, .. } => self.counter_value(ctx) >= *required,
            Condition::ExternalMetric { placeholder, required } => {
                metric_value(ctx, placeholder) >= *required
            }
            Condition::Prerequisite { item, additional } => {
                let unlocked = ctx
                    .lookup
                    .condition_for(item)
                    .map_or(true, |condition| condition.is_met(ctx));
                unlocked && additional.as_ref().map_or(true, |extra| extra.is_met(ctx))
            }
            Condition::Composite(composite) => composite.is_met(ctx),
        }
    }

    /// Progress towards the threshold, in the unit of [`Condition::required_progress`].
    pub fn current_progress(&self, ctx: &EvalContext<'_>) -> u64 {
        match self {
            Condition::Kill { .. } | Condition::Collect { .. } | Condition::Break { .. } => {
                self.counter_value(ctx)
            }
            Condition::ExternalMetric { placeholder, .. } => {
                let value = metric_value(ctx, placeholder);
                if value.is_finite() && value > 0.0 {
                    value.floor() as u64
                } else {
                    0
                }
            }
            Condition::Prerequisite { additional, .. } => {
                let met = self.is_met(ctx);
                match additional {
                    Some(extra) if !met => extra.current_progress(ctx),
                    _ => u64::from(met),
                }
            }
            Condition::Composite(composite) => composite.current_progress(ctx),
        }
    }

    /// Threshold value.
    pub fn required_progress(&self) -> u64 {
        match self {
            Condition::Kill { required, .. }
            | Condition::Collect { required, .. }
            | Condition::Break { required, .. } => *required,
            Condition::ExternalMetric { required, .. } => {
                if required.is_finite() && *required > 0.0 {
                    *required as u64
                } else {
                    0
                }
            }
            Condition::Prerequisite { additional, .. } => {
                additional.as_ref().map_or(1, |extra| extra.required_progress())
            }
            Condition::Composite(composite) => composite.required_progress(),
        }
    }

    /// Human readable description.
    pub fn description(&self) -> String {
        match self {
            Condition::Kill { entity, required } => format!("Kill {} {}s", required, entity),
            Condition::Collect { target, required, .. } => format!("Collect {} {}", required, target),
            Condition::Break { target, required } => format!("Break {} {} blocks", required, target),
            Condition::ExternalMetric { placeholder, required } => {
                format!("Reach {} {}", required, placeholder)
            }
            Condition::Prerequisite { item, additional } => match additional {
                Some(extra) => format!("Unlock {} first and {}", item, extra.description()),
                None => format!("Unlock {} first", item),
            },
            Condition::Composite(composite) => composite.description(),
        }
    }

    /// Counter leaves reachable from this condition.
    ///
    /// Walks composites and prerequisite extras, but never follows a
    /// prerequisite into the condition of another resource.
    pub fn counter_leaves(&self) -> Vec<&Condition> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'c>(&'c self, out: &mut Vec<&'c Condition>) {
        match self {
            Condition::Kill { .. } | Condition::Collect { .. } | Condition::Break { .. } => {
                out.push(self)
            }
            Condition::ExternalMetric { .. } => {}
            Condition::Prerequisite { additional, .. } => {
                if let Some(extra) = additional {
                    extra.collect_leaves(out);
                }
            }
            Condition::Composite(composite) => {
                for sub in composite.conditions() {
                    sub.collect_leaves(out);
                }
            }
        }
    }

    /// Resource ids referenced by prerequisites anywhere inside this condition.
    pub fn referenced_items(&self) -> Vec<&str> {
        let mut items = Vec::new();
        self.collect_items(&mut items);
        items
    }

    fn collect_items<'c>(&'c self, out: &mut Vec<&'c str>) {
        match self {
            Condition::Prerequisite { item, additional } => {
                out.push(item);
                if let Some(extra) = additional {
                    extra.collect_items(out);
                }
            }
            Condition::Composite(composite) => {
                for sub in composite.conditions() {
                    sub.collect_items(out);
                }
            }
            _ => {}
        }
    }

    fn counter_value(&self, ctx: &EvalContext<'_>) -> u64 {
        self.counter_key()
            .map_or(0, |key| ctx.progress.get_key(&key))
    }
}

/// Current value of an external metric, 0 when unavailable or non-numeric.
fn metric_value(ctx: &EvalContext<'_>, placeholder: &str) -> f64 {
    let raw = ctx.resolver.apply(ctx.player, placeholder);
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            tracing::debug!(player = %ctx.player, placeholder, value = %raw, "Non-numeric metric value");
            0.0
        }
    }
}

/// AND of sub-conditions, prerequisites evaluated first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeCondition {
    conditions: Vec<Condition>,
    prerequisites: Vec<usize>,
    others: Vec<usize>,
}

impl CompositeCondition {
    /// Build from sub-conditions, partitioning prerequisites from the rest.
    pub fn new(conditions: Vec<Condition>) -> Self {
        let (prerequisites, others): (Vec<usize>, Vec<usize>) = (0..conditions.len())
            .partition(|&i| conditions[i].is_prerequisite());
        Self {
            conditions,
            prerequisites,
            others,
        }
    }

    /// All sub-conditions in configuration order.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Prerequisite sub-conditions in order.
    pub fn prerequisites(&self) -> impl Iterator<Item = &Condition> + '_ {
        self.prerequisites.iter().map(move |&i| &self.conditions[i])
    }

    /// Non-prerequisite sub-conditions in order.
    pub fn others(&self) -> impl Iterator<Item = &Condition> + '_ {
        self.others.iter().map(move |&i| &self.conditions[i])
    }

    /// Whether there are no sub-conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether every prerequisite sub-condition is met.
    pub fn prerequisites_met(&self, ctx: &EvalContext<'_>) -> bool {
        self.prerequisites().all(|c| c.is_met(ctx))
    }

    fn is_met(&self, ctx: &EvalContext<'_>) -> bool {
        self.prerequisites_met(ctx) && self.others().all(|c| c.is_met(ctx))
    }

    fn current_progress(&self, ctx: &EvalContext<'_>) -> u64 {
        if let Some(unmet) = self.prerequisites().find(|c| !c.is_met(ctx)) {
            return unmet.current_progress(ctx);
        }
        if let Some(unmet) = self.others().find(|c| !c.is_met(ctx)) {
            return unmet.current_progress(ctx);
        }
        self.conditions
            .last()
            .map_or(1, |last| last.current_progress(ctx))
    }

    fn required_progress(&self) -> u64 {
        self.prerequisites()
            .next()
            .or_else(|| self.others().next())
            .map_or(1, |c| c.required_progress())
    }

    fn description(&self) -> String {
        let parts: Vec<_> = self.conditions.iter().map(|c| c.description()).collect();
        format!("Meet all conditions: {}", parts.join(" AND "))
    }
}
