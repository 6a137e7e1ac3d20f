//! Service wiring.
//!
//! One [`ServiceContext`] per process. Every service shares the same
//! [`CacheStore`] and origin client; the writer and list cache are shared
//! between the warming path and the lookup path.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use super::detail_writer::DetailCacheWriter;
use super::discovery::DiscoveryWalker;
use super::list_cache::ListCache;
use super::lookup::LookupService;
use super::orchestrator::{BatchConfig, WarmingOrchestrator, WarmingReport};
use super::verifier::{CacheVerifier, VerificationReport};
use crate::infrastructure::{
    AppConfig, CacheStore, HttpOriginClient, KvStore, MemoryKvStore, OriginClient, RetryCalculator, StoreBackend,
    UpstashKvStore,
};

pub struct ServiceContext {
    pub store: CacheStore,
    pub lists: Arc<ListCache>,
    pub writer: Arc<DetailCacheWriter>,
    pub orchestrator: WarmingOrchestrator,
    pub verifier: CacheVerifier,
    pub lookup: LookupService,
}

impl ServiceContext {
    pub fn new(origin: Arc<dyn OriginClient>, backend: Arc<dyn KvStore>, config: &AppConfig) -> Self {
        let store = CacheStore::new(backend, config.store.key_prefix.clone());
        let retry = RetryCalculator::from_config(&config.warming);

        let lists = Arc::new(ListCache::new(
            origin.clone(),
            store.clone(),
            config.ttl.clone(),
            retry.clone(),
        ));
        let writer = Arc::new(DetailCacheWriter::new(
            origin.clone(),
            store.clone(),
            config.ttl.clone(),
            retry,
        ));
        let walker = DiscoveryWalker::new(origin, store.clone(), &config.warming, &config.ttl);
        let orchestrator = WarmingOrchestrator::new(
            walker,
            writer.clone(),
            BatchConfig::from_warming(&config.warming),
        );
        let verifier = CacheVerifier::new(store.clone());
        let lookup = LookupService::new(
            store.clone(),
            writer.clone(),
            lists.clone(),
            config.ttl.clone(),
            &config.warming,
        );

        Self {
            store,
            lists,
            writer,
            orchestrator,
            verifier,
            lookup,
        }
    }

    /// Build the configured store backend and the HTTP origin client.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let backend: Arc<dyn KvStore> = match config.store.backend {
            StoreBackend::Upstash => Arc::new(
                UpstashKvStore::new(&config.store).context("Failed to create store client")?,
            ),
            StoreBackend::Memory => Arc::new(MemoryKvStore::new()),
        };
        let origin = HttpOriginClient::new(&config.origin).context("Failed to create origin client")?;

        info!(
            "🔧 Services ready: origin={}, store={}, prefix={}",
            config.origin.base_url,
            backend.name(),
            config.store.key_prefix
        );
        Ok(Self::new(Arc::new(origin), backend, config))
    }

    /// One full warming run followed by verification of every attempted slug.
    pub async fn warm_and_verify(&self) -> (WarmingReport, VerificationReport) {
        let report = self.orchestrator.run().await;
        let verification = self.verifier.verify(&report.slugs).await;
        (report, verification)
    }
}
