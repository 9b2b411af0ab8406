//! Key-Value Storage backed by a JSON document
//!
//! Desktop/test-harness stand-in for the platform preference stores the
//! mobile hosts provide. The whole map is rewritten on every mutation, which
//! is fine for the handful of session keys this core persists.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::KeyValueStore,
};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// JSON-file-backed key-value store
///
/// Entries live in a single JSON object on disk. A corrupt or missing file is
/// treated as an empty store (logged, never fatal) so one bad write cannot
/// brick the app at startup.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<Option<HashMap<String, String>>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(None),
        }
    }

    async fn load(&self, entries: &mut Option<HashMap<String, String>>) -> Result<()> {
        if entries.is_some() {
            return Ok(());
        }

        let map = match tokio::fs::read(&self.path).await {
            Ok(raw) => match serde_json::from_slice::<HashMap<String, String>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = ?self.path, error = %e, "Store file corrupt, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        debug!(path = ?self.path, keys = map.len(), "Loaded key-value store");
        *entries = Some(map);
        Ok(())
    }

    async fn flush(&self, map: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let json = serde_json::to_vec_pretty(map)
            .map_err(|e| BridgeError::StorageError(format!("Failed to encode store: {}", e)))?;

        tokio::fs::write(&self.path, json)
            .await
            .map_err(BridgeError::Io)
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let mut guard = self.entries.lock().await;
        self.load(&mut guard).await?;
        Ok(guard
            .as_ref()
            .and_then(|map| map.get(key).cloned()))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self.entries.lock().await;
        self.load(&mut guard).await?;
        let map = guard.get_or_insert_with(HashMap::new);
        map.insert(key.to_string(), value.to_string());
        self.flush(map).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let mut guard = self.entries.lock().await;
        self.load(&mut guard).await?;
        let map = guard.get_or_insert_with(HashMap::new);
        map.remove(key);
        self.flush(map).await
    }

    async fn multi_set(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut guard = self.entries.lock().await;
        self.load(&mut guard).await?;
        let map = guard.get_or_insert_with(HashMap::new);
        for (key, value) in entries {
            map.insert(key.to_string(), value.to_string());
        }
        // One write for the whole batch
        self.flush(map).await
    }

    async fn multi_remove(&self, keys: &[&str]) -> Result<()> {
        let mut guard = self.entries.lock().await;
        self.load(&mut guard).await?;
        let map = guard.get_or_insert_with(HashMap::new);
        for key in keys {
            map.remove(*key);
        }
        self.flush(map).await
    }

    async fn clear(&self) -> Result<()> {
        let mut guard = self.entries.lock().await;
        *guard = Some(HashMap::new());
        self.flush(&HashMap::new()).await
    }
}
