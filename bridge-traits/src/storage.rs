//! Key-Value Storage Abstraction
//!
//! Abstracts platform-specific durable key-value storage:
//! - iOS: UserDefaults / Keychain-backed stores
//! - Android: SharedPreferences / DataStore
//! - Desktop test harness: a JSON document on disk
//!
//! Values are opaque strings. Callers that need structured data serialize it
//! themselves (the session core stores the user record as JSON).

use async_trait::async_trait;

use crate::error::Result;

/// Durable string key-value storage trait
///
/// All operations are async because every backing store involves I/O. Reads
/// of absent keys return `Ok(None)` rather than an error; only storage-layer
/// failures (I/O, platform store unavailable) surface as `Err`.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::KeyValueStore;
///
/// async fn remember(store: &dyn KeyValueStore) -> Result<()> {
///     store.set_item("accessToken", "eyJ...").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieve a value. Returns `Ok(None)` if the key does not exist.
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, overwriting any previous one.
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Succeeds even if the key does not exist.
    async fn remove_item(&self, key: &str) -> Result<()>;

    /// Retrieve several values in one call, in input order.
    async fn multi_get(&self, keys: &[&str]) -> Result<Vec<Option<String>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get_item(key).await?);
        }
        Ok(values)
    }

    /// Store several entries in one call.
    ///
    /// Implementations backed by a single document should persist all entries
    /// in one write so callers observe the batch as a unit.
    async fn multi_set(&self, entries: &[(&str, &str)]) -> Result<()> {
        for (key, value) in entries {
            self.set_item(key, value).await?;
        }
        Ok(())
    }

    /// Remove several keys in one call.
    async fn multi_remove(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.remove_item(key).await?;
        }
        Ok(())
    }

    /// Remove every stored entry.
    async fn clear(&self) -> Result<()>;
}
