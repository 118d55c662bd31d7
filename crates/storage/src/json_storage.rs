//! JSON file storage implementation.
//!
//! Stores one pretty-printed JSON file per player under `players/` and keeps
//! a small per-player meta marker (version + updated_at) under `meta/players/`.

use std::path::{Path, PathBuf};
use progression_core::{PlayerId, PlayerProgress};
use super::{ProgressStorage, Result};
use tokio::fs;

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Create storage. This will create the `players/` and `meta/players/`
    /// subdirectories under `root`.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("players")).await?;
        fs::create_dir_all(root.join("meta").join("players")).await?;

        Ok(Self { root })
    }

    /// Storage root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn player_path(&self, id: PlayerId) -> PathBuf {
        self.root.join("players").join(format!("{}.json", id))
    }

    fn meta_path(&self, id: PlayerId) -> PathBuf {
        self.root.join("meta").join("players").join(format!("{}.meta.json", id))
    }

    /// Read and increment the per-player version, return the new version.
    async fn bump_version(&self, id: PlayerId) -> Result<u64> {
        let path = self.meta_path(id);
        let mut version = 0u64;
        if let Ok(s) = fs::read_to_string(&path).await {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(&s) {
                if let Some(v) = json.get("version").and_then(|v| v.as_u64()) {
                    version = v;
                }
            }
        }
        version += 1;
        let meta = serde_json::json!({"version": version, "updated_at": chrono::Utc::now()});
        fs::write(&path, serde_json::to_string_pretty(&meta)?.as_bytes()).await?;
        Ok(version)
    }

    /// Version of the last save for a player, 0 if never saved.
    pub async fn version(&self, id: PlayerId) -> Result<u64> {
        let meta: Option<serde_json::Value> = read_json(&self.meta_path(id)).await?;
        Ok(meta
            .and_then(|m| m.get("version").and_then(|v| v.as_u64()))
            .unwrap_or(0))
    }
}

#[async_trait::async_trait]
impl ProgressStorage for JsonStorage {
    async fn load_progress(&self, player: PlayerId) -> Result<Option<PlayerProgress>> {
        read_json(&self.player_path(player)).await
    }

    async fn save_progress(&self, player: PlayerId, progress: &PlayerProgress) -> Result<()> {
        let path = self.player_path(player);
        let json = serde_json::to_string_pretty(progress)?;
        fs::write(&path, json.as_bytes()).await?;

        let version = self.bump_version(player).await?;
        tracing::debug!(%player, version, "Saved player progress");
        Ok(())
    }

    async fn delete_progress(&self, player: PlayerId) -> Result<()> {
        remove_if_exists(&self.player_path(player)).await?;
        remove_if_exists(&self.meta_path(player)).await?;
        Ok(())
    }

    async fn list_players(&self) -> Result<Vec<PlayerId>> {
        let mut players = Vec::new();
        let mut rd = fs::read_dir(self.root.join("players")).await?;
        while let Some(entry) = rd.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match stem.parse() {
                Ok(id) => players.push(id),
                Err(_) => tracing::warn!(file = %path.display(), "Skipping unrecognized player record"),
            }
        }
        players.sort();
        Ok(players)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    fs::remove_file(path).await.or_else(|e| {
        if e.kind() == std::io::ErrorKind::NotFound { Ok(()) } else { Err(e) }
    })?;
    Ok(())
}
