//! Progress service.
//!
//! Ties counter updates to unlock notifications and answers enforcement
//! queries against the current registry snapshot.

use crate::crossing::detect_crossings;
use crate::error::{ProgressError, Result};
use crate::placeholders;
use crate::registry::{ConditionRegistry, ReloadReport};
use crate::store::ProgressStore;
use progression_conditions::{
    Condition, ConditionFactory, EvalContext, PlaceholderResolver, Vocabulary,
};
use progression_core::{CounterKey, PlayerId, ProgressionConfig, UnlockNotification};
use progression_storage::ProgressStorage;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Lock message for resources that are not tracked.
pub const UNTRACKED_LOCK_MESSAGE: &str = "This item is not available yet.";

const NOTIFICATION_CAPACITY: usize = 256;

/// Condition evaluation and progress tracking service.
pub struct ProgressService {
    store: ProgressStore,
    registry: RwLock<Arc<ConditionRegistry>>,
    factory: ConditionFactory,
    resolver: Arc<dyn PlaceholderResolver>,
    notifications: broadcast::Sender<UnlockNotification>,
}

impl ProgressService {
    /// Create a service with an empty registry.
    pub fn new(
        storage: Arc<dyn ProgressStorage>,
        factory: ConditionFactory,
        resolver: Arc<dyn PlaceholderResolver>,
    ) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            store: ProgressStore::new(storage),
            registry: RwLock::new(Arc::new(ConditionRegistry::new())),
            factory,
            resolver,
            notifications,
        }
    }

    /// Create a service with the built-in condition kinds and load the
    /// registry from configuration.
    pub fn from_config(
        config: &ProgressionConfig,
        storage: Arc<dyn ProgressStorage>,
        resolver: Arc<dyn PlaceholderResolver>,
    ) -> (Self, ReloadReport) {
        let vocabulary = Vocabulary::from_config(&config.vocabulary);
        let factory = ConditionFactory::with_builtins(vocabulary, resolver.clone());
        let service = Self::new(storage, factory, resolver);
        let report = service.reload(config);
        (service, report)
    }

    /// Underlying counter store.
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Current registry snapshot.
    pub fn registry(&self) -> Arc<ConditionRegistry> {
        self.registry
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Condition guarding a resource.
    pub fn condition(&self, resource: &str) -> Option<Arc<Condition>> {
        self.registry().condition(resource).cloned()
    }

    /// Tracked resource ids in registration order.
    pub fn tracked_items(&self) -> Vec<String> {
        self.registry().ids().to_vec()
    }

    /// Whether the player may not use the resource yet.
    pub fn is_item_locked(&self, player: PlayerId, resource: &str) -> bool {
        self.evaluate(player, |registry, ctx| {
            registry
                .condition(resource)
                .is_some_and(|condition| !condition.is_met(ctx))
        })
    }

    /// Lock message for a resource, with placeholders substituted.
    pub fn lock_message(&self, player: PlayerId, resource: &str) -> String {
        let id = resource.to_lowercase();
        let message = self.evaluate(player, |registry, ctx| {
            registry.get(&id).map(|entry| {
                placeholders::render_template(registry, ctx, &id, entry.message_or_default())
            })
        });

        match message {
            None => UNTRACKED_LOCK_MESSAGE.to_string(),
            Some(message) if self.resolver.is_available() => self.resolver.apply(player, &message),
            Some(message) => message,
        }
    }

    /// Whether the player meets a condition. `None` is never met.
    pub fn meets_condition(&self, player: PlayerId, condition: Option<&Condition>) -> bool {
        let Some(condition) = condition else {
            return false;
        };
        self.evaluate(player, |_, ctx| condition.is_met(ctx))
    }

    /// Record activity and return the resources it unlocked.
    ///
    /// A resource is reported when one of its counters crossed its threshold
    /// with this update and its whole condition is now met.
    pub fn record_progress(
        &self,
        player: PlayerId,
        kind: &str,
        key: &str,
        amount: u64,
    ) -> Vec<UnlockNotification> {
        let kind = kind.to_lowercase();
        let key = key.to_lowercase();

        let (old, new) = self.store.increment(player, &kind, &key, amount);
        tracing::debug!(%player, kind = %kind, key = %key, old, new, "Recorded progress");

        let registry = self.registry();
        let crossed = detect_crossings(&registry, &kind, &key, old, new);
        if crossed.is_empty() {
            return Vec::new();
        }

        let progress = self.store.snapshot(player);
        let ctx = EvalContext::new(player, &progress, &*registry, &*self.resolver);

        crossed
            .into_iter()
            .filter(|id| {
                registry
                    .condition(id)
                    .is_some_and(|condition| condition.is_met(&ctx))
            })
            .map(|id| {
                tracing::info!(%player, item = %id, kind = %kind, "Item unlocked");
                let notification = UnlockNotification::new(player, id, kind.clone());
                // No subscribers is fine
                let _ = self.notifications.send(notification.clone());
                notification
            })
            .collect()
    }

    /// Subscribe to unlock notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<UnlockNotification> {
        self.notifications.subscribe()
    }

    /// Rebuild the registry from configuration and swap it in.
    pub fn reload(&self, config: &ProgressionConfig) -> ReloadReport {
        let (registry, report) = ConditionRegistry::build(config, &self.factory);
        tracing::info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            cycles = report.cycles.len(),
            "Loaded locked items"
        );
        *self
            .registry
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(registry);
        report
    }

    /// Overwrite a counter.
    pub fn set_progress(&self, player: PlayerId, kind: &str, key: &str, value: u64) {
        self.store.set(player, kind, key, value);
    }

    /// Wipe a player's progress, in memory and on disk.
    pub async fn reset_progress(&self, player: PlayerId) -> Result<()> {
        self.store.clear(player).await?;
        self.store.load(player).await?;
        tracing::info!(%player, "Reset player progress");
        Ok(())
    }

    /// Raise the item's primary counter to its threshold.
    pub fn unlock_item(&self, player: PlayerId, resource: &str) -> Result<CounterKey> {
        let (key, required) = self.primary_counter(resource)?;
        self.store.set(player, key.kind.as_str(), &key.target, required);
        tracing::info!(%player, item = %resource, counter = %key.target, "Unlocked item");
        Ok(key)
    }

    /// Reset the item's primary counter to zero.
    pub fn lock_item(&self, player: PlayerId, resource: &str) -> Result<CounterKey> {
        let (key, _) = self.primary_counter(resource)?;
        self.store.set(player, key.kind.as_str(), &key.target, 0);
        tracing::info!(%player, item = %resource, counter = %key.target, "Locked item");
        Ok(key)
    }

    /// Raise the item's primary counter to its threshold for every loaded
    /// player. Returns the counter and the number of players touched.
    pub fn unlock_item_all(&self, resource: &str) -> Result<(CounterKey, usize)> {
        let (key, required) = self.primary_counter(resource)?;
        let players = self.store.loaded_players();
        for &player in &players {
            self.store.set(player, key.kind.as_str(), &key.target, required);
        }
        tracing::info!(item = %resource, players = players.len(), "Unlocked item for all players");
        Ok((key, players.len()))
    }

    /// Reset the item's primary counter to zero for every loaded player.
    pub fn lock_item_all(&self, resource: &str) -> Result<(CounterKey, usize)> {
        let (key, _) = self.primary_counter(resource)?;
        let players = self.store.loaded_players();
        for &player in &players {
            self.store.set(player, key.kind.as_str(), &key.target, 0);
        }
        tracing::info!(item = %resource, players = players.len(), "Locked item for all players");
        Ok((key, players.len()))
    }

    /// Wipe the progress of every loaded player and return how many were reset.
    pub async fn reset_all_progress(&self) -> Result<usize> {
        let players = self.store.loaded_players();
        for &player in &players {
            self.reset_progress(player).await?;
        }
        Ok(players.len())
    }

    /// Load every stored player record not already in memory.
    pub async fn load_stored_players(&self) -> Result<usize> {
        self.store.load_all().await
    }

    /// Load a joining player's record.
    pub async fn player_joined(&self, player: PlayerId) -> Result<()> {
        self.store.load(player).await
    }

    /// Flush and drop a leaving player's record.
    pub async fn player_left(&self, player: PlayerId) -> Result<()> {
        self.store.unload(player).await
    }

    /// Flush every loaded player.
    pub async fn shutdown(&self) -> Result<()> {
        let players = self.store.loaded_players().len();
        self.store.save_all().await?;
        tracing::info!(players, "Saved all player progress");
        Ok(())
    }

    /// Run `f` against the current registry and the player's snapshot.
    pub(crate) fn evaluate<T>(
        &self,
        player: PlayerId,
        f: impl FnOnce(&ConditionRegistry, &EvalContext<'_>) -> T,
    ) -> T {
        let registry = self.registry();
        let progress = self.store.snapshot(player);
        let ctx = EvalContext::new(player, &progress, &*registry, &*self.resolver);
        f(&registry, &ctx)
    }

    fn primary_counter(&self, resource: &str) -> Result<(CounterKey, u64)> {
        let condition = self
            .condition(resource)
            .ok_or_else(|| ProgressError::UntrackedItem(resource.to_string()))?;

        let primary = match condition.counter_key() {
            Some(key) => Some((key, condition.required_progress())),
            None => condition.as_composite().and_then(|composite| {
                composite
                    .others()
                    .find_map(|sub| sub.counter_key().map(|key| (key, sub.required_progress())))
            }),
        };
        primary.ok_or_else(|| ProgressError::NoTrackableCounter(resource.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progression_conditions::NoResolver;
    use progression_core::DEFAULT_LOCK_MESSAGE;
    use progression_storage::MemoryStorage;
    use serde_json::json;

    struct Levels;

    impl PlaceholderResolver for Levels {
        fn apply(&self, _player: PlayerId, text: &str) -> String {
            text.replace("%player_level%", "12")
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn service_with(
        items: serde_json::Value,
        resolver: Arc<dyn PlaceholderResolver>,
    ) -> ProgressService {
        let config = ProgressionConfig::from_json(&json!({ "locked_items": items }).to_string()).unwrap();
        ProgressService::from_config(&config, Arc::new(MemoryStorage::new()), resolver).0
    }

    fn service(items: serde_json::Value) -> ProgressService {
        service_with(items, Arc::new(NoResolver))
    }

    fn sword_service() -> ProgressService {
        service(json!({
            "diamond_sword": {
                "message": "Kill %prog_diamond_sword_amount% zombies (%prog_diamond_sword_progress%)",
                "condition": { "type": "kills", "entity": "zombie", "amount": 10 }
            }
        }))
    }

    #[test]
    fn test_kill_threshold_unlocks_once() {
        let service = sword_service();
        let player = PlayerId::new();

        assert!(service.is_item_locked(player, "diamond_sword"));
        for _ in 0..9 {
            assert!(service.record_progress(player, "kills", "zombie", 1).is_empty());
        }
        assert!(service.is_item_locked(player, "diamond_sword"));

        let unlocked = service.record_progress(player, "kills", "zombie", 1);
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].resource_id, "diamond_sword");
        assert_eq!(unlocked[0].activity_kind, "kills");
        assert_eq!(unlocked[0].player, player);
        assert!(!service.is_item_locked(player, "diamond_sword"));

        assert!(service.record_progress(player, "kills", "zombie", 1).is_empty());
    }

    #[test]
    fn test_overshoot_fires_once() {
        let service = sword_service();
        let player = PlayerId::new();
        service.record_progress(player, "kills", "zombie", 7);
        assert_eq!(service.record_progress(player, "KILLS", "Zombie", 50).len(), 1);
        assert!(service.record_progress(player, "kills", "zombie", 50).is_empty());
    }

    #[test]
    fn test_zero_amount_never_unlocks() {
        let service = service(json!({
            "stick": { "condition": { "type": "collect", "material": "oak_log", "amount": 0 } }
        }));
        assert!(service.record_progress(PlayerId::new(), "collect", "oak_log", 0).is_empty());
    }

    #[test]
    fn test_untracked_item_is_unlocked() {
        let service = sword_service();
        let player = PlayerId::new();
        assert!(!service.is_item_locked(player, "bread"));
        assert_eq!(service.lock_message(player, "bread"), UNTRACKED_LOCK_MESSAGE);
        assert!(!service.meets_condition(player, None));
    }

    #[test]
    fn test_composite_prerequisite_scenario() {
        let service = service(json!({
            "iron_sword": { "condition": { "type": "kills", "entity": "skeleton", "amount": 3 } },
            "golden_sword": { "condition": { "type": "composite", "conditions": [
                { "type": "prerequisite", "item": "iron_sword" },
                { "type": "collect", "material": "stick", "amount": 5 }
            ] } }
        }));
        let player = PlayerId::new();

        // Sticks done first, but the prerequisite is still locked
        assert!(service.record_progress(player, "collect", "stick", 5).is_empty());
        assert!(service.is_item_locked(player, "golden_sword"));

        // Unlocking the prerequisite does not cross a golden_sword counter
        let unlocked = service.record_progress(player, "kills", "skeleton", 3);
        let ids: Vec<_> = unlocked.iter().map(|n| n.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["iron_sword"]);
        assert!(!service.is_item_locked(player, "golden_sword"));
    }

    #[test]
    fn test_untracked_prerequisite_composite_unlocks_on_last_stick() {
        let service = service(json!({
            "golden_sword": { "condition": { "type": "composite", "conditions": [
                { "type": "prerequisite", "item": "iron_sword" },
                { "type": "collect", "material": "stick", "amount": 5 }
            ] } }
        }));
        let player = PlayerId::new();

        assert!(service.record_progress(player, "collect", "stick", 4).is_empty());
        let unlocked = service.record_progress(player, "collect", "stick", 1);
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].resource_id, "golden_sword");
        assert_eq!(unlocked[0].activity_kind, "collect");
        assert!(service.record_progress(player, "collect", "stick", 1).is_empty());
    }

    #[test]
    fn test_concurrent_updates_unlock_once() {
        for _ in 0..200 {
            let service = service(json!({
                "bow": { "condition": { "type": "kills", "entity": "zombie", "amount": 2 } }
            }));
            let player = PlayerId::new();
            service.set_progress(player, "kills", "zombie", 1);

            let total: usize = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..2)
                    .map(|_| {
                        let service = &service;
                        scope.spawn(move || service.record_progress(player, "kills", "zombie", 1).len())
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).sum()
            });

            assert_eq!(total, 1);
            assert_eq!(service.store().get(player, "kills", "zombie"), 3);
        }
    }

    #[test]
    fn test_composite_crossing_requires_full_condition() {
        let service = service(json!({
            "bow": { "condition": { "type": "composite", "conditions": [
                { "type": "collect", "material": "string", "amount": 3 },
                { "type": "kills", "entity": "spider", "amount": 2 }
            ] } }
        }));
        let player = PlayerId::new();

        assert!(service.record_progress(player, "collect", "string", 3).is_empty());
        assert_eq!(service.record_progress(player, "kills", "spider", 2).len(), 1);
    }

    #[tokio::test]
    async fn test_notifications_are_broadcast() {
        let service = sword_service();
        let mut rx = service.subscribe();
        let player = PlayerId::new();

        service.record_progress(player, "kills", "zombie", 10);
        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.resource_id, "diamond_sword");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_lock_message_substitutes_item_tokens() {
        let service = sword_service();
        let player = PlayerId::new();
        service.record_progress(player, "kills", "zombie", 4);
        assert_eq!(service.lock_message(player, "Diamond_Sword"), "Kill 10 zombies (4)");
    }

    #[test]
    fn test_lock_message_default_and_resolver_pass() {
        let service = service_with(
            json!({
                "bow": { "condition": { "type": "kills", "entity": "spider", "amount": 2 } },
                "shield": {
                    "message": "Reach level 20 (now %player_level%)",
                    "condition": { "type": "placeholder", "placeholder": "player_level", "amount": 20 }
                }
            }),
            Arc::new(Levels),
        );
        let player = PlayerId::new();
        assert_eq!(service.lock_message(player, "bow"), DEFAULT_LOCK_MESSAGE);
        assert_eq!(service.lock_message(player, "shield"), "Reach level 20 (now 12)");
        assert!(service.is_item_locked(player, "shield"));
    }

    #[test]
    fn test_reload_swaps_registry() {
        let service = sword_service();
        let player = PlayerId::new();
        let before = service.registry();

        let config = ProgressionConfig::from_json(
            &json!({ "locked_items": {
                "bow": { "condition": { "type": "kills", "entity": "spider", "amount": 1 } }
            } })
            .to_string(),
        )
        .unwrap();
        let report = service.reload(&config);

        assert_eq!(report.loaded, vec!["bow".to_string()]);
        assert_eq!(service.tracked_items(), vec!["bow".to_string()]);
        assert!(!service.is_item_locked(player, "diamond_sword"));
        // Snapshots taken before the swap are unaffected
        assert!(before.contains("diamond_sword"));
    }

    #[test]
    fn test_unlock_and_lock_item() {
        let service = service(json!({
            "diamond_sword": { "condition": { "type": "kills", "entity": "zombie", "amount": 10 } },
            "golden_sword": { "condition": { "type": "composite", "conditions": [
                { "type": "prerequisite", "item": "diamond_sword" },
                { "type": "collect", "material": "stick", "amount": 5 }
            ] } },
            "crossbow": { "condition": { "type": "prerequisite", "item": "bow" } }
        }));
        let player = PlayerId::new();

        let key = service.unlock_item(player, "diamond_sword").unwrap();
        assert_eq!(key.target, "zombie");
        assert!(!service.is_item_locked(player, "diamond_sword"));

        service.unlock_item(player, "golden_sword").unwrap();
        assert_eq!(service.store().get(player, "collect", "stick"), 5);
        assert!(!service.is_item_locked(player, "golden_sword"));

        service.lock_item(player, "diamond_sword").unwrap();
        assert!(service.is_item_locked(player, "diamond_sword"));
        assert!(service.is_item_locked(player, "golden_sword"));

        assert!(matches!(
            service.unlock_item(player, "bread"),
            Err(ProgressError::UntrackedItem(_))
        ));
        assert!(matches!(
            service.unlock_item(player, "crossbow"),
            Err(ProgressError::NoTrackableCounter(_))
        ));
    }

    #[tokio::test]
    async fn test_all_player_admin_operations() {
        let service = sword_service();
        let first = PlayerId::from_u128(1);
        let second = PlayerId::from_u128(2);
        service.player_joined(first).await.unwrap();
        service.player_joined(second).await.unwrap();

        let (key, count) = service.unlock_item_all("diamond_sword").unwrap();
        assert_eq!(key.target, "zombie");
        assert_eq!(count, 2);
        assert!(!service.is_item_locked(first, "diamond_sword"));
        assert!(!service.is_item_locked(second, "diamond_sword"));

        assert_eq!(service.lock_item_all("diamond_sword").unwrap().1, 2);
        assert!(service.is_item_locked(second, "diamond_sword"));
        assert!(matches!(
            service.unlock_item_all("bread"),
            Err(ProgressError::UntrackedItem(_))
        ));

        service.set_progress(first, "break", "stone", 3);
        service.set_progress(second, "break", "stone", 4);
        assert_eq!(service.reset_all_progress().await.unwrap(), 2);
        assert_eq!(service.store().get(first, "break", "stone"), 0);
        assert_eq!(service.store().get(second, "break", "stone"), 0);
        assert_eq!(service.store().loaded_players(), vec![first, second]);
    }

    #[tokio::test]
    async fn test_load_stored_players() {
        let storage = Arc::new(MemoryStorage::new());
        let config = ProgressionConfig::default();
        let (service, _) = ProgressService::from_config(&config, storage.clone(), Arc::new(NoResolver));
        let player = PlayerId::new();

        service.set_progress(player, "kills", "zombie", 5);
        service.player_left(player).await.unwrap();
        assert!(service.store().loaded_players().is_empty());

        assert_eq!(service.load_stored_players().await.unwrap(), 1);
        assert_eq!(service.store().get(player, "kills", "zombie"), 5);
    }

    #[tokio::test]
    async fn test_player_lifecycle() {
        let storage = Arc::new(MemoryStorage::new());
        let config = ProgressionConfig::default();
        let (service, _) = ProgressService::from_config(&config, storage.clone(), Arc::new(NoResolver));
        let player = PlayerId::new();

        service.player_joined(player).await.unwrap();
        service.set_progress(player, "break", "stone", 40);
        service.player_left(player).await.unwrap();
        assert!(!service.store().is_loaded(player));

        service.player_joined(player).await.unwrap();
        assert_eq!(service.store().get(player, "break", "stone"), 40);

        service.reset_progress(player).await.unwrap();
        assert_eq!(service.store().get(player, "break", "stone"), 0);
        assert!(service.store().is_loaded(player));

        service.set_progress(player, "kills", "zombie", 2);
        service.shutdown().await.unwrap();
        assert_eq!(storage.len(), 1);
    }
}
