//! Application layer: the warming pipeline and the read paths
//!
//! These services compose the domain rules with the infrastructure traits.
//! [`ServiceContext`] wires them together from an [`AppConfig`](crate::infrastructure::AppConfig).

pub mod context;
pub mod detail_writer;
pub mod discovery;
pub mod list_cache;
pub mod lookup;
pub mod orchestrator;
pub mod verifier;

pub use context::ServiceContext;
pub use detail_writer::{DetailCacheWriter, DetailError};
pub use discovery::{DiscoveredPage, DiscoveryError, DiscoveryOutcome, DiscoveryWalker};
pub use list_cache::ListCache;
pub use lookup::LookupService;
pub use orchestrator::{BatchConfig, WarmingOrchestrator, WarmingReport};
pub use verifier::{CacheVerifier, VerificationReport};
