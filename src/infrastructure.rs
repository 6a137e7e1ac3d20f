//! Infrastructure layer for the KV store, the origin API, configuration and logging
//!
//! Everything that talks to the outside world lives here behind the
//! [`KvStore`] and [`OriginClient`] traits, so the application layer can be
//! exercised against in-process fakes.

pub mod cache_store; // Typed JSON façade with key prefix and membership set
pub mod config; // Layered configuration and defaults
pub mod kv_store; // Store trait and errors
pub mod logging; // Logging infrastructure
pub mod memory_store; // Process-local store
pub mod origin_client; // Rate-limited origin HTTP client
pub mod retry_calculator; // Bounded linear backoff
pub mod upstash_store; // Redis-compatible REST store

// Re-export commonly used items
pub use cache_store::CacheStore;
pub use config::{AppConfig, ConfigError, LoggingConfig, StoreBackend, TtlConfig, WarmingConfig};
pub use kv_store::{KvStore, StoreError};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use memory_store::MemoryKvStore;
pub use origin_client::{HttpOriginClient, OriginClient, OriginError};
pub use retry_calculator::RetryCalculator;
pub use upstash_store::UpstashKvStore;
