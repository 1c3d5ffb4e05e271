//! Key-value storage port.
//!
//! Preferences and the exchange data cache are both plain string entries
//! under fixed keys. Implementations can be in-memory, a JSON file, or a
//! host-provided bridge to platform preferences.

use async_trait::async_trait;

use crate::error::StoreResult;

/// String key-value storage
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Insert or replace the value under `key`
    async fn put(&self, key: &str, value: String) -> StoreResult<()>;

    /// Remove `key`; removing a missing key is not an error
    async fn remove(&self, key: &str) -> StoreResult<()>;

    /// Whether `key` holds a value
    async fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Write `value` when present, remove the key otherwise
    async fn put_or_remove(&self, key: &str, value: Option<String>) -> StoreResult<()> {
        match value {
            Some(value) => self.put(key, value).await,
            None => self.remove(key).await,
        }
    }
}
