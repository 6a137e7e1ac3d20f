//! Catalog Warmer - read-through cache and warming pipeline for a movie catalog API
//!
//! The crate discovers catalog entries modified since the last run, fetches
//! and validates their detail records, derives per-episode stream records
//! and writes everything into a Redis-compatible key-value store. A lookup
//! service serves the same data cache-first.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{LookupService, ServiceContext, VerificationReport, WarmingReport};
pub use infrastructure::AppConfig;
