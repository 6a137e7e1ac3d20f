//! Batch warming orchestrator
//!
//! Discovers modified slugs, then warms them in fixed-size batches. Within a
//! batch every slug is attempted concurrently, bounded by a semaphore shared
//! across the whole run; a fixed pause separates batches. Individual
//! failures are logged and counted, never fatal.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use super::detail_writer::DetailCacheWriter;
use super::discovery::{DiscoveryOutcome, DiscoveryWalker};
use crate::infrastructure::WarmingConfig;

/// Batch settings for one run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub max_concurrency: usize,
    pub batch_delay: Duration,
}

impl BatchConfig {
    pub fn from_warming(config: &WarmingConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            max_concurrency: config.max_concurrency.max(1),
            batch_delay: config.batch_delay(),
        }
    }
}

/// What a warming run did.
#[derive(Debug, Clone)]
pub struct WarmingReport {
    pub run_id: Uuid,
    /// Every slug attempted, in warming order
    pub slugs: Vec<String>,
    pub warmed: usize,
    pub failed: Vec<String>,
    pub discovery_completed: bool,
    pub elapsed: Duration,
}

impl WarmingReport {
    pub fn total(&self) -> usize {
        self.slugs.len()
    }
}

pub struct WarmingOrchestrator {
    walker: DiscoveryWalker,
    writer: Arc<DetailCacheWriter>,
    config: BatchConfig,
    semaphore: Arc<Semaphore>,
}

impl WarmingOrchestrator {
    pub fn new(walker: DiscoveryWalker, writer: Arc<DetailCacheWriter>, config: BatchConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency));
        Self {
            walker,
            writer,
            config,
            semaphore,
        }
    }

    /// Discover, then warm everything discovered.
    pub async fn run(&self) -> WarmingReport {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        info!("🚀 Warming run {} started", run_id);

        let DiscoveryOutcome {
            slugs, completed, ..
        } = self.walker.discover().await;
        let slugs: Vec<String> = slugs.into_iter().collect();

        let failed = self.warm_slugs(&slugs).await;
        let report = WarmingReport {
            run_id,
            warmed: slugs.len() - failed.len(),
            slugs,
            failed,
            discovery_completed: completed,
            elapsed: started.elapsed(),
        };

        info!(
            "🎯 Warming run {} finished: {}/{} warmed in {:.1}s",
            report.run_id,
            report.warmed,
            report.total(),
            report.elapsed.as_secs_f64()
        );
        report
    }

    /// Warm `slugs` batch by batch; returns the slugs that failed.
    pub async fn warm_slugs(&self, slugs: &[String]) -> Vec<String> {
        let batch_count = slugs.len().div_ceil(self.config.batch_size);
        let mut failed = Vec::new();

        for (batch_index, batch) in slugs.chunks(self.config.batch_size).enumerate() {
            info!(
                "📦 Warming batch {}/{} ({} slugs)",
                batch_index + 1,
                batch_count,
                batch.len()
            );

            let results = join_all(batch.iter().map(|slug| self.warm_one(slug))).await;
            failed.extend(
                batch
                    .iter()
                    .zip(results)
                    .filter(|(_, warmed)| !warmed)
                    .map(|(slug, _)| slug.clone()),
            );

            if batch_index + 1 < batch_count {
                tokio::time::sleep(self.config.batch_delay).await;
            }
        }

        if !failed.is_empty() {
            warn!("⚠️ {} slugs could not be warmed", failed.len());
        }
        failed
    }

    async fn warm_one(&self, slug: &str) -> bool {
        let Ok(_permit) = self.semaphore.acquire().await else {
            return false;
        };
        self.writer.cache_detail(slug).await.is_some()
    }
}
