//! Key-value store abstraction.
//!
//! Values are opaque strings (the cache layer stores JSON). Set members are
//! plain strings. Every operation is a single round-trip.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("store rejected command: {0}")]
    Backend(String),

    #[error("unexpected store reply: {0}")]
    UnexpectedReply(String),

    #[error("value serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value; `ttl` of `None` means no expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// One slot per key, in key order.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError>;

    async fn sadd(&self, set: &str, member: &str) -> Result<(), StoreError>;

    async fn sismember(&self, set: &str, member: &str) -> Result<bool, StoreError>;
}
