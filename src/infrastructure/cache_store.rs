//! Typed JSON façade over a [`KvStore`].
//!
//! Owns the key prefix and the warmed-key membership set. Plain reads are
//! forgiving: store failures and undecodable values are logged and reported
//! as a miss. Writes and the `try_` reads surface errors to the caller.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::kv_store::{KvStore, StoreError};
use crate::domain::cache_keys;

#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn KvStore>,
    prefix: String,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn KvStore>, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Read and decode, treating any failure as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Cache read for {} failed, treating as miss: {}", key, e);
                None
            }
        }
    }

    /// Read and decode; undecodable values surface as `Serialization`.
    pub async fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.backend.get(&self.full_key(key)).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Batched read. One slot per key; undecodable slots become `None`.
    pub async fn get_many<T: DeserializeOwned>(&self, keys: &[String]) -> Result<Vec<Option<T>>, StoreError> {
        let full_keys: Vec<String> = keys.iter().map(|key| self.full_key(key)).collect();
        let raw = self.backend.mget(&full_keys).await?;
        Ok(raw
            .into_iter()
            .zip(keys)
            .map(|(slot, key)| {
                slot.and_then(|text| match serde_json::from_str(&text) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        debug!("Discarding undecodable cache value at {}: {}", key, e);
                        None
                    }
                })
            })
            .collect())
    }

    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(value)?;
        self.backend.set(&self.full_key(key), &encoded, Some(ttl)).await
    }

    /// Record that `key` was written by a warming path.
    pub async fn mark_warmed(&self, key: &str) -> Result<(), StoreError> {
        self.backend
            .sadd(&self.full_key(cache_keys::MEMBERSHIP_SET), key)
            .await
    }

    pub async fn is_warmed(&self, key: &str) -> bool {
        match self
            .backend
            .sismember(&self.full_key(cache_keys::MEMBERSHIP_SET), key)
            .await
        {
            Ok(member) => member,
            Err(e) => {
                warn!("Membership check for {} failed: {}", key, e);
                false
            }
        }
    }
}
