//! In-memory storage backend, used in tests and for ephemeral sessions.

use async_trait::async_trait;
use dashmap::DashMap;
use progression_core::{PlayerId, PlayerProgress};
use super::{ProgressStorage, Result};

/// Volatile storage. Records live as long as the value does.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: DashMap<PlayerId, PlayerProgress>,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saved records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record is saved.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ProgressStorage for MemoryStorage {
    async fn load_progress(&self, player: PlayerId) -> Result<Option<PlayerProgress>> {
        Ok(self.records.get(&player).map(|r| r.value().clone()))
    }

    async fn save_progress(&self, player: PlayerId, progress: &PlayerProgress) -> Result<()> {
        self.records.insert(player, progress.clone());
        Ok(())
    }

    async fn delete_progress(&self, player: PlayerId) -> Result<()> {
        self.records.remove(&player);
        Ok(())
    }

    async fn list_players(&self) -> Result<Vec<PlayerId>> {
        let mut players: Vec<_> = self.records.iter().map(|r| *r.key()).collect();
        players.sort();
        Ok(players)
    }
}
