//! `prog_` placeholder expansion.
//!
//! Supported identifiers (without the `prog_` prefix and `%` delimiters):
//!
//! - `<item>_<type>_<target>_progress` / `_amount` for composite members
//! - `progress_<kind>_<key>` raw counter value
//! - `unlocked_<item>` / `required_<item>`
//! - `<item>_<property>` with property one of [`ITEM_PROPERTIES`]

use crate::registry::ConditionRegistry;
use crate::service::ProgressService;
use progression_conditions::{Condition, EvalContext};
use progression_core::PlayerId;
use std::sync::Arc;

/// Placeholder namespace.
pub const NAMESPACE: &str = "prog";

/// Per-item properties.
pub const ITEM_PROPERTIES: [&str; 9] = [
    "type",
    "progress",
    "amount",
    "percentage",
    "unlocked",
    "locked",
    "entity",
    "material",
    "placeholder",
];

/// Resolves `prog_` placeholders for a player.
#[derive(Clone)]
pub struct PlaceholderExpansion {
    service: Arc<ProgressService>,
}

impl PlaceholderExpansion {
    /// Create an expansion over a service.
    pub fn new(service: Arc<ProgressService>) -> Self {
        Self { service }
    }

    /// Resolve one identifier. `None` when it is not ours.
    pub fn resolve(&self, player: PlayerId, identifier: &str) -> Option<String> {
        let identifier = identifier.trim_matches('%');
        let identifier = identifier
            .strip_prefix(NAMESPACE)
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(identifier);
        self.service
            .evaluate(player, |registry, ctx| resolve(registry, ctx, identifier))
    }

    /// Substitute every `%prog_<item>_...%` token of one item in `template`.
    pub fn render_item_template(&self, player: PlayerId, item: &str, template: &str) -> String {
        let item = item.to_lowercase();
        self.service
            .evaluate(player, |registry, ctx| render_template(registry, ctx, &item, template))
    }
}

pub(crate) fn resolve(registry: &ConditionRegistry, ctx: &EvalContext<'_>, identifier: &str) -> Option<String> {
    let identifier = identifier.to_lowercase();
    let parts: Vec<&str> = identifier.split('_').collect();

    if let [item, kind, target, property] = parts.as_slice() {
        let member = registry
            .condition(item)
            .and_then(|condition| condition.as_composite())
            .and_then(|composite| {
                composite
                    .conditions()
                    .iter()
                    .find(|sub| member_matches(sub, kind, target))
            });
        if let Some(sub) = member {
            match *property {
                "progress" => return Some(member_progress(sub, ctx).to_string()),
                "amount" => return Some(member_amount(sub).to_string()),
                _ => {}
            }
        }
    }

    if let Some(rest) = identifier.strip_prefix("progress_") {
        if let Some((kind, key)) = rest.split_once('_') {
            return Some(ctx.progress.get(kind, key).to_string());
        }
    }

    if let Some(item) = identifier.strip_prefix("unlocked_") {
        let unlocked = registry.condition(item).map_or(true, |c| c.is_met(ctx));
        return Some(yes_no(unlocked).to_string());
    }

    if let Some(item) = identifier.strip_prefix("required_") {
        let required = registry.condition(item).map_or(0, |c| c.required_progress());
        return Some(required.to_string());
    }

    let (item, property) = identifier.rsplit_once('_')?;
    let condition = registry.condition(item)?;
    Some(item_property(condition, ctx, property).unwrap_or_default())
}

pub(crate) fn render_template(
    registry: &ConditionRegistry,
    ctx: &EvalContext<'_>,
    item: &str,
    template: &str,
) -> String {
    let Some(condition) = registry.condition(item) else {
        return template.to_string();
    };
    if !template.contains('%') {
        return template.to_string();
    }

    let mut message = template.to_string();

    if let Some(composite) = condition.as_composite() {
        for sub in composite.conditions() {
            let addressable = sub.counter_key().is_some() || sub.is_prerequisite();
            let Some(target) = sub.target().filter(|_| addressable) else {
                continue;
            };
            let prefix = format!("%{}_{}_{}_{}", NAMESPACE, item, sub.kind_name(), target);
            message = message
                .replace(&format!("{}_progress%", prefix), &member_progress(sub, ctx).to_string())
                .replace(&format!("{}_amount%", prefix), &member_amount(sub).to_string());
        }
    }

    for property in ITEM_PROPERTIES {
        let token = format!("%{}_{}_{}%", NAMESPACE, item, property);
        if !message.contains(&token) {
            continue;
        }
        if let Some(value) = item_property(condition, ctx, property) {
            message = message.replace(&token, &value);
        }
    }

    message
}

/// Value of `<item>_<property>`. `None` when the property does not apply.
fn item_property(condition: &Condition, ctx: &EvalContext<'_>, property: &str) -> Option<String> {
    let value = match property {
        "type" => type_name(condition).to_string(),
        "progress" => display_progress(condition, ctx).to_string(),
        "amount" => condition.required_progress().to_string(),
        "percentage" => percentage(display_progress(condition, ctx), condition.required_progress()).to_string(),
        "unlocked" => yes_no(condition.is_met(ctx)).to_string(),
        "locked" => yes_no(!condition.is_met(ctx)).to_string(),
        "entity" => find_target(condition, |c| matches!(c, Condition::Kill { .. }))?,
        "material" => find_target(condition, |c| {
            matches!(c, Condition::Collect { .. } | Condition::Break { .. })
        })?,
        "placeholder" => find_target(condition, |c| matches!(c, Condition::ExternalMetric { .. }))?,
        _ => return None,
    };
    Some(value)
}

/// Target of the condition itself, or of its first composite member, that
/// satisfies `pick`.
fn find_target(condition: &Condition, pick: impl Fn(&Condition) -> bool) -> Option<String> {
    let found = match condition.as_composite() {
        Some(composite) => composite.conditions().iter().find(|sub| pick(sub)),
        None => Some(condition).filter(|c| pick(c)),
    };
    found.and_then(Condition::target).map(str::to_string)
}

/// Type shown for an item. A composite shows its first non-prerequisite member.
fn type_name(condition: &Condition) -> &'static str {
    match condition.as_composite() {
        Some(composite) => composite.others().next().map_or("composite", type_name),
        None => condition.kind_name(),
    }
}

/// Progress shown for an item. A composite shows its first non-prerequisite member.
fn display_progress(condition: &Condition, ctx: &EvalContext<'_>) -> u64 {
    match condition.as_composite() {
        Some(composite) => composite.others().next().map_or(0, |sub| leaf_progress(sub, ctx)),
        None => leaf_progress(condition, ctx),
    }
}

fn leaf_progress(condition: &Condition, ctx: &EvalContext<'_>) -> u64 {
    match condition {
        Condition::Kill { .. }
        | Condition::Collect { .. }
        | Condition::Break { .. }
        | Condition::ExternalMetric { .. } => condition.current_progress(ctx),
        _ => 0,
    }
}

fn member_progress(sub: &Condition, ctx: &EvalContext<'_>) -> u64 {
    if sub.is_prerequisite() {
        u64::from(sub.is_met(ctx))
    } else {
        leaf_progress(sub, ctx)
    }
}

fn member_amount(sub: &Condition) -> u64 {
    if sub.is_prerequisite() {
        1
    } else {
        sub.required_progress()
    }
}

fn member_matches(sub: &Condition, kind: &str, target: &str) -> bool {
    sub.kind_name() == kind
        && sub
            .target()
            .is_some_and(|t| t.trim_matches('%').eq_ignore_ascii_case(target))
}

fn percentage(progress: u64, required: u64) -> u64 {
    if required == 0 {
        100
    } else {
        (progress.saturating_mul(100) / required).min(100)
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progression_conditions::{NoResolver, PlaceholderResolver};
    use progression_core::ProgressionConfig;
    use progression_storage::MemoryStorage;
    use serde_json::json;

    struct Levels;

    impl PlaceholderResolver for Levels {
        fn apply(&self, _player: PlayerId, text: &str) -> String {
            text.replace("%level%", "7")
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn expansion_with(resolver: Arc<dyn PlaceholderResolver>) -> (PlaceholderExpansion, Arc<ProgressService>) {
        let config = ProgressionConfig::from_json(
            &json!({ "locked_items": {
                "diamond_sword": { "condition": { "type": "kills", "entity": "zombie", "amount": 10 } },
                "golden_apple": { "condition": { "type": "composite", "conditions": [
                    { "type": "prerequisite", "item": "diamond_sword" },
                    { "type": "collect", "material": "apple", "amount": 8 },
                    { "type": "break", "material": "stone", "amount": 20 }
                ] } },
                "shield": { "condition": { "type": "placeholder", "placeholder": "level", "amount": 10 } },
                "gate": { "condition": { "type": "composite", "conditions": [
                    { "type": "prerequisite", "item": "diamond_sword" }
                ] } }
            } })
            .to_string(),
        )
        .unwrap();
        let (service, _) = ProgressService::from_config(&config, Arc::new(MemoryStorage::new()), resolver);
        let service = Arc::new(service);
        (PlaceholderExpansion::new(service.clone()), service)
    }

    fn expansion() -> (PlaceholderExpansion, Arc<ProgressService>) {
        expansion_with(Arc::new(Levels))
    }

    #[test]
    fn test_item_properties() {
        let (expansion, service) = expansion();
        let player = PlayerId::new();
        service.record_progress(player, "kills", "zombie", 4);

        let get = |id: &str| expansion.resolve(player, id);
        assert_eq!(get("diamond_sword_type").as_deref(), Some("kills"));
        assert_eq!(get("diamond_sword_progress").as_deref(), Some("4"));
        assert_eq!(get("diamond_sword_amount").as_deref(), Some("10"));
        assert_eq!(get("diamond_sword_percentage").as_deref(), Some("40"));
        assert_eq!(get("diamond_sword_unlocked").as_deref(), Some("no"));
        assert_eq!(get("diamond_sword_locked").as_deref(), Some("yes"));
        assert_eq!(get("diamond_sword_entity").as_deref(), Some("zombie"));
        assert_eq!(get("diamond_sword_material").as_deref(), Some(""));
        assert_eq!(get("shield_placeholder").as_deref(), Some("%level%"));
        assert_eq!(get("shield_progress").as_deref(), Some("7"));
        assert_eq!(get("bread_progress"), None);
    }

    #[test]
    fn test_prefix_and_delimiters_are_accepted() {
        let (expansion, _) = expansion();
        let player = PlayerId::new();
        assert_eq!(expansion.resolve(player, "%prog_diamond_sword_amount%").as_deref(), Some("10"));
        assert_eq!(expansion.resolve(player, "prog_diamond_sword_amount").as_deref(), Some("10"));
    }

    #[test]
    fn test_composite_properties() {
        let (expansion, service) = expansion();
        let player = PlayerId::new();
        service.record_progress(player, "collect", "apple", 12);
        service.record_progress(player, "break", "stone", 5);

        let get = |id: &str| expansion.resolve(player, id);
        assert_eq!(get("golden_apple_type").as_deref(), Some("collect"));
        // First non-prerequisite member, capped at 100 percent
        assert_eq!(get("golden_apple_progress").as_deref(), Some("12"));
        assert_eq!(get("golden_apple_material").as_deref(), Some("apple"));
        assert_eq!(get("gate_type").as_deref(), Some("composite"));
        assert_eq!(get("gate_progress").as_deref(), Some("0"));
        assert_eq!(get("gate_percentage").as_deref(), Some("0"));
    }

    #[test]
    fn test_composite_member_tokens() {
        let (expansion, service) = expansion();
        let player = PlayerId::new();
        service.record_progress(player, "break", "stone", 5);

        // Only single-segment item ids are addressable this way
        assert_eq!(expansion.resolve(player, "gate_prerequisite_diamond_progress"), None);

        let config = ProgressionConfig::from_json(
            &json!({ "locked_items": {
                "bow": { "condition": { "type": "composite", "conditions": [
                    { "type": "collect", "material": "string", "amount": 3 },
                    { "type": "break", "material": "stone", "amount": 20 }
                ] } }
            } })
            .to_string(),
        )
        .unwrap();
        service.reload(&config);

        assert_eq!(expansion.resolve(player, "bow_break_stone_progress").as_deref(), Some("5"));
        assert_eq!(expansion.resolve(player, "bow_break_stone_amount").as_deref(), Some("20"));
        assert_eq!(expansion.resolve(player, "bow_collect_string_amount").as_deref(), Some("3"));
    }

    #[test]
    fn test_legacy_forms() {
        let (expansion, service) = expansion();
        let player = PlayerId::new();
        service.record_progress(player, "kills", "zombie_pigman", 3);

        let get = |id: &str| expansion.resolve(player, id);
        assert_eq!(get("progress_kills_zombie_pigman").as_deref(), Some("3"));
        assert_eq!(get("progress_break_stone").as_deref(), Some("0"));
        assert_eq!(get("unlocked_bread").as_deref(), Some("yes"));
        assert_eq!(get("unlocked_diamond_sword").as_deref(), Some("no"));
        assert_eq!(get("required_diamond_sword").as_deref(), Some("10"));
        assert_eq!(get("required_bread").as_deref(), Some("0"));
    }

    #[test]
    fn test_render_item_template() {
        let (expansion, service) = expansion_with(Arc::new(NoResolver));
        let player = PlayerId::new();
        service.record_progress(player, "collect", "apple", 2);
        service.record_progress(player, "break", "stone", 6);

        let rendered = expansion.render_item_template(
            player,
            "Golden_Apple",
            "%prog_golden_apple_collect_apple_progress%/%prog_golden_apple_collect_apple_amount% apples, \
             %prog_golden_apple_break_stone_progress% stone, \
             sword %prog_golden_apple_prerequisite_diamond_sword_progress%, \
             %prog_golden_apple_percentage%% (%prog_golden_apple_type%) %prog_golden_apple_entity%",
        );
        assert_eq!(
            rendered,
            "2/8 apples, 6 stone, sword 0, 100% (collect) %prog_golden_apple_entity%"
        );
    }
}
