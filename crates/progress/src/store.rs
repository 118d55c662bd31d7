//! In-memory progress counters backed by durable storage.

use crate::error::Result;
use dashmap::DashMap;
use progression_core::{PlayerId, PlayerProgress};
use progression_storage::ProgressStorage;
use std::sync::Arc;

/// Thread-safe map of player counters.
///
/// Mutations and reads are synchronous and never touch storage. Loading and
/// flushing are explicit async operations driven by the player lifecycle.
pub struct ProgressStore {
    players: DashMap<PlayerId, PlayerProgress>,
    storage: Arc<dyn ProgressStorage>,
}

impl ProgressStore {
    /// Create an empty store over a storage backend.
    pub fn new(storage: Arc<dyn ProgressStorage>) -> Self {
        Self {
            players: DashMap::new(),
            storage,
        }
    }

    /// Current count, 0 when absent.
    pub fn get(&self, player: PlayerId, kind: &str, key: &str) -> u64 {
        self.players
            .get(&player)
            .map_or(0, |progress| progress.get(kind, key))
    }

    /// Overwrite a count.
    pub fn set(&self, player: PlayerId, kind: &str, key: &str, value: u64) {
        self.players.entry(player).or_default().set(kind, key, value);
    }

    /// Add to a count and return the new value.
    pub fn add(&self, player: PlayerId, kind: &str, key: &str, amount: u64) -> u64 {
        self.increment(player, kind, key, amount).1
    }

    /// Add to a count and return `(old, new)`, both read under the same
    /// entry lock so concurrent updates never observe the same `old`.
    pub fn increment(&self, player: PlayerId, kind: &str, key: &str, amount: u64) -> (u64, u64) {
        self.players.entry(player).or_default().increment(kind, key, amount)
    }

    /// Copy of a player's counters, empty when nothing is held.
    pub fn snapshot(&self, player: PlayerId) -> PlayerProgress {
        self.players
            .get(&player)
            .map(|progress| progress.value().clone())
            .unwrap_or_default()
    }

    /// Whether counters are held in memory for the player.
    pub fn is_loaded(&self, player: PlayerId) -> bool {
        self.players.contains_key(&player)
    }

    /// Players currently held in memory.
    pub fn loaded_players(&self) -> Vec<PlayerId> {
        let mut players: Vec<_> = self.players.iter().map(|entry| *entry.key()).collect();
        players.sort();
        players
    }

    /// Load a player's record, replacing in-memory state.
    pub async fn load(&self, player: PlayerId) -> Result<()> {
        let progress = self.storage.load_progress(player).await?.unwrap_or_default();
        tracing::debug!(%player, empty = progress.is_empty(), "Loaded player progress");
        self.players.insert(player, progress);
        Ok(())
    }

    /// Load every stored player that is not already held in memory and
    /// return how many were loaded.
    pub async fn load_all(&self) -> Result<usize> {
        let mut loaded = 0;
        for player in self.storage.list_players().await? {
            if self.is_loaded(player) {
                continue;
            }
            self.load(player).await?;
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Flush a player's counters. No-op when the player is not loaded.
    pub async fn save(&self, player: PlayerId) -> Result<()> {
        // Clone out so no map guard is held across the await
        let Some(progress) = self.players.get(&player).map(|p| p.value().clone()) else {
            return Ok(());
        };
        self.storage.save_progress(player, &progress).await?;
        Ok(())
    }

    /// Flush every loaded player. Every player is attempted; the first
    /// failure is returned.
    pub async fn save_all(&self) -> Result<()> {
        let mut first_error = None;
        for player in self.loaded_players() {
            if let Err(e) = self.save(player).await {
                tracing::error!(%player, error = %e, "Failed to save player progress");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Flush and drop a player from memory.
    ///
    /// The in-memory state is kept when the flush fails.
    pub async fn unload(&self, player: PlayerId) -> Result<()> {
        self.save(player).await?;
        self.players.remove(&player);
        Ok(())
    }

    /// Forget a player entirely, in memory and on disk.
    pub async fn clear(&self, player: PlayerId) -> Result<()> {
        self.players.remove(&player);
        self.storage.delete_progress(player).await?;
        Ok(())
    }
}
