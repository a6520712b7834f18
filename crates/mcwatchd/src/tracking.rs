//! Tracking store - which servers are watched and where to notify.
//!
//! The mapping lives in memory behind a mutex and is mirrored to a single
//! JSON file. Every mutation rewrites the whole file (temp file + rename)
//! while the mutex is held, so concurrent commands cannot interleave writes
//! and the file is never in a partial state.

use crate::error::Result;
use mcwatch_shared::{ChannelId, ServerId};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub type TrackingMap = BTreeMap<ServerId, ChannelId>;

pub struct TrackingStore {
    path: PathBuf,
    entries: Mutex<TrackingMap>,
}

impl TrackingStore {
    /// Open the store, loading whatever is on disk
    pub async fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = Self::load(&path).await;
        info!(
            "Tracking store opened at {} ({} entries)",
            path.display(),
            entries.len()
        );
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Read the durable file. Missing or unparsable files yield an empty map.
    pub async fn load(path: &Path) -> TrackingMap {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No tracking file at {}, starting empty", path.display());
                return TrackingMap::new();
            }
            Err(e) => {
                warn!("Failed to read tracking file {}: {}", path.display(), e);
                return TrackingMap::new();
            }
        };

        let raw: BTreeMap<String, u64> = match serde_json::from_str(&content) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Tracking file {} is corrupt, ignoring it: {}", path.display(), e);
                return TrackingMap::new();
            }
        };

        let mut entries = TrackingMap::new();
        for (key, channel) in raw {
            match ServerId::new(&key) {
                Ok(id) => {
                    if entries.insert(id, ChannelId(channel)).is_some() {
                        warn!("Tracking file has duplicate entry for '{}', last one wins", key);
                    }
                }
                Err(_) => warn!("Skipping invalid tracking key '{}'", key),
            }
        }
        entries
    }

    /// Insert or overwrite the channel for a server
    pub async fn set(&self, id: &ServerId, channel: ChannelId) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let mut next = entries.clone();
        next.insert(id.clone(), channel);
        self.persist(&next).await?;
        *entries = next;
        Ok(())
    }

    /// Delete a server's entry. Returns whether it existed.
    pub async fn remove(&self, id: &ServerId) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(id) {
            return Ok(false);
        }
        let mut next = entries.clone();
        next.remove(id);
        self.persist(&next).await?;
        *entries = next;
        Ok(true)
    }

    pub async fn get(&self, id: &ServerId) -> Option<ChannelId> {
        self.entries.lock().await.get(id).copied()
    }

    pub async fn entries(&self) -> TrackingMap {
        self.entries.lock().await.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &TrackingMap) -> Result<()> {
        let data = serde_json::to_vec_pretty(entries)?;
        atomic_write(&self.path, &data).await?;
        Ok(())
    }
}

/// Write data to a file atomically using temp file + rename
async fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let temp_path = path.with_extension("tmp");

    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&temp_path, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(s: &str) -> ServerId {
        ServerId::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = TrackingStore::open(dir.path().join("tracking.json")).await;
        assert!(store.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracking.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = TrackingStore::open(&path).await;
        assert!(store.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_keys_are_normalized_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracking.json");
        std::fs::write(&path, r#"{"Survival": 42, "": 7}"#).unwrap();

        let entries = TrackingStore::load(&path).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries.get(&id("survival")), Some(&ChannelId(42)));
    }

    #[tokio::test]
    async fn test_file_is_flat_object_of_integers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("tracking.json");
        let store = TrackingStore::open(&path).await;

        store.set(&id("lobby"), ChannelId(1234567890123)).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"lobby": 1234567890123u64}));
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_remove_reports_existence() {
        let dir = TempDir::new().unwrap();
        let store = TrackingStore::open(dir.path().join("tracking.json")).await;

        store.set(&id("lobby"), ChannelId(1)).await.unwrap();
        assert!(store.remove(&id("lobby")).await.unwrap());
        assert!(!store.remove(&id("lobby")).await.unwrap());
        assert_eq!(store.get(&id("lobby")).await, None);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_unchanged() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes the rename fail
        let path = dir.path().join("tracking.json");
        std::fs::create_dir_all(path.join("blocker")).unwrap();

        let store = TrackingStore::open(&path).await;
        assert!(store.set(&id("lobby"), ChannelId(1)).await.is_err());
        assert!(store.entries().await.is_empty());
    }
}
