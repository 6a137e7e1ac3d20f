//! Discovery walker
//!
//! Walks the recently-updated feed from page 1 and collects the slugs of
//! entries modified after the stored watermark. Each fetched page is cached
//! as a [`DiscoveredPage`] under a key that includes the watermark it was
//! filtered against, so a walk retried before the watermark moves makes no
//! repeated origin calls, and a walk after it moves always reads the feed.
//!
//! The watermark only advances after a walk that reached its natural end:
//! the reported last page, or a page shorter than the page size. It is set
//! to the instant the walk started, so entries modified while the walk was
//! running are picked up again next time. A walk cut short by an origin
//! failure leaves the watermark untouched but still returns what it
//! collected.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{ListQuery, RawListing, ResourceKind, TtlClass, cache_keys};
use crate::infrastructure::{CacheStore, OriginClient, OriginError, TtlConfig, WarmingConfig};

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error(transparent)]
    Origin(#[from] OriginError),

    #[error("discovery page {0} has no item array")]
    MalformedPage(u32),
}

/// Cached summary of one feed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredPage {
    pub page: u32,
    /// Slugs on this page modified after the watermark in force when fetched
    pub slugs: Vec<String>,
    pub item_count: usize,
    /// Page size the page was requested with
    pub page_size: u32,
    pub total_pages: Option<u32>,
}

impl DiscoveredPage {
    /// Whether the walk ends after this page.
    pub fn is_last(&self) -> bool {
        self.item_count == 0
            || self.item_count < self.page_size as usize
            || self.total_pages.is_some_and(|total| self.page >= total)
    }
}

/// Result of one walk.
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    pub slugs: BTreeSet<String>,
    pub pages_walked: u32,
    /// `false` when an origin failure cut the walk short
    pub completed: bool,
    pub watermark_before: DateTime<Utc>,
    /// Set only when the watermark was written
    pub watermark_after: Option<DateTime<Utc>>,
}

pub struct DiscoveryWalker {
    origin: Arc<dyn OriginClient>,
    store: CacheStore,
    page_size: u32,
    page_delay: Duration,
    page_ttl: Duration,
    watermark_ttl: Duration,
}

impl DiscoveryWalker {
    pub fn new(origin: Arc<dyn OriginClient>, store: CacheStore, warming: &WarmingConfig, ttl: &TtlConfig) -> Self {
        Self {
            origin,
            store,
            page_size: warming.discovery_page_size,
            page_delay: warming.discovery_page_delay(),
            page_ttl: ttl.duration(TtlClass::DiscoveryPage),
            watermark_ttl: ttl.duration(TtlClass::Watermark),
        }
    }

    /// Stored watermark, or the epoch when absent or unreadable.
    pub async fn watermark(&self) -> DateTime<Utc> {
        self.store
            .get::<DateTime<Utc>>(cache_keys::WATERMARK)
            .await
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub async fn discover(&self) -> DiscoveryOutcome {
        let started_at = Utc::now();
        let watermark = self.watermark().await;
        info!("🔍 Starting discovery walk (watermark: {})", watermark.to_rfc3339());

        let mut slugs = BTreeSet::new();
        let mut page = 1;
        let mut pages_walked = 0;
        let mut completed = true;

        loop {
            let key = cache_keys::discovery_page(&watermark, page);
            let (discovered, from_origin) = match self.store.get::<DiscoveredPage>(&key).await {
                Some(cached) => {
                    debug!("📦 Discovery page {} served from cache", page);
                    (cached, false)
                }
                None => match self.fetch_page(page, watermark).await {
                    Ok(fetched) => {
                        if let Err(e) = self.store.put(&key, &fetched, self.page_ttl).await {
                            warn!("⚠️ Failed to cache discovery page {}: {}", page, e);
                        }
                        (fetched, true)
                    }
                    Err(e) => {
                        warn!("⚠️ Discovery stopped at page {}: {}", page, e);
                        completed = false;
                        break;
                    }
                },
            };

            pages_walked += 1;
            info!(
                "📄 Discovery page {}: {} items, {} modified",
                page,
                discovered.item_count,
                discovered.slugs.len()
            );
            slugs.extend(discovered.slugs.iter().cloned());

            if discovered.is_last() {
                break;
            }
            page += 1;
            if from_origin {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        let watermark_after = if completed {
            match self
                .store
                .put(cache_keys::WATERMARK, &started_at, self.watermark_ttl)
                .await
            {
                Ok(()) => Some(started_at),
                Err(e) => {
                    warn!("⚠️ Failed to advance discovery watermark: {}", e);
                    None
                }
            }
        } else {
            None
        };

        info!(
            "✅ Discovery finished: {} slugs over {} pages (completed: {})",
            slugs.len(),
            pages_walked,
            completed
        );

        DiscoveryOutcome {
            slugs,
            pages_walked,
            completed,
            watermark_before: watermark,
            watermark_after,
        }
    }

    async fn fetch_page(&self, page: u32, watermark: DateTime<Utc>) -> Result<DiscoveredPage, DiscoveryError> {
        let body = self
            .origin
            .fetch_list(&ResourceKind::RecentlyUpdated, &ListQuery::page(page, self.page_size))
            .await?;
        let listing = RawListing::from_value(body);
        let total_pages = listing.reported_total_pages;
        let Some(items) = listing.items else {
            return Err(DiscoveryError::MalformedPage(page));
        };

        let slugs = items
            .iter()
            .filter(|entry| entry.modified_after(watermark))
            .filter_map(|entry| entry.usable_slug().map(str::to_string))
            .collect();

        Ok(DiscoveredPage {
            page,
            slugs,
            item_count: items.len(),
            page_size: self.page_size,
            total_pages,
        })
    }
}
