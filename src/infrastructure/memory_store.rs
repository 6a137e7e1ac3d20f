//! In-process KV store.
//!
//! Expiry is measured on the tokio clock, so paused-time tests can advance
//! past a TTL without sleeping.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::kv_store::{KvStore, StoreError};

/// Expired entries are dropped once every this many writes.
const SWEEP_INTERVAL: usize = 256;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| deadline > now)
    }
}

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    values: RwLock<HashMap<String, MemoryEntry>>,
    sets: RwLock<HashMap<String, HashSet<String>>>,
    writes: AtomicUsize,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining lifetime of a live key; `Some(None)` for keys without expiry.
    pub async fn ttl(&self, key: &str) -> Option<Option<Duration>> {
        let now = Instant::now();
        let values = self.values.read().await;
        let entry = values.get(key).filter(|entry| entry.is_live(now))?;
        Some(entry.expires_at.map(|deadline| deadline - now))
    }

    /// Live keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let values = self.values.read().await;
        let mut keys: Vec<String> = values
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub async fn set_members(&self, set: &str) -> HashSet<String> {
        self.sets.read().await.get(set).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let values = self.values.read().await;
        Ok(values
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let now = Instant::now();
        let entry = MemoryEntry {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| now + ttl),
        };

        let mut values = self.values.write().await;
        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_INTERVAL == 0 {
            values.retain(|_, entry| entry.is_live(now));
        }
        values.insert(key.to_string(), entry);
        Ok(())
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        let now = Instant::now();
        let values = self.values.read().await;
        Ok(keys
            .iter()
            .map(|key| {
                values
                    .get(key)
                    .filter(|entry| entry.is_live(now))
                    .map(|entry| entry.value.clone())
            })
            .collect())
    }

    async fn sadd(&self, set: &str, member: &str) -> Result<(), StoreError> {
        self.sets
            .write()
            .await
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn sismember(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        Ok(self
            .sets
            .read()
            .await
            .get(set)
            .is_some_and(|members| members.contains(member)))
    }
}
