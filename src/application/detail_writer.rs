//! Detail cache writer
//!
//! Fetches, validates and persists one [`DetailRecord`] together with its
//! id-to-slug index entry and every derived stream record. A record that
//! fails the completeness predicate is never written.
//!
//! Write order per attempt: detail, id index, membership, streams. All
//! stream writes are awaited before the call returns, so a caller that sees
//! a record also sees its streams.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{
    DetailRecord, IdentifierError, StreamId, StreamRecord, TtlClass, ValidationError, cache_keys,
    derive_streams, validate_slug,
};
use crate::infrastructure::{CacheStore, OriginClient, OriginError, RetryCalculator, StoreError, TtlConfig};

#[derive(Error, Debug)]
pub enum DetailError {
    #[error(transparent)]
    InvalidSlug(#[from] IdentifierError),

    #[error(transparent)]
    Origin(#[from] OriginError),

    #[error("rejected detail payload: {0}")]
    Invalid(#[from] ValidationError),

    #[error("cache write failed: {0}")]
    Store(#[from] StoreError),

    #[error("{failed} of {total} stream writes failed")]
    Streams { failed: usize, total: usize },
}

fn checked_slug(slug: &str) -> Result<&str, DetailError> {
    Ok(validate_slug(slug)?)
}

pub struct DetailCacheWriter {
    origin: Arc<dyn OriginClient>,
    store: CacheStore,
    ttl: TtlConfig,
    retry: RetryCalculator,
}

impl DetailCacheWriter {
    pub fn new(origin: Arc<dyn OriginClient>, store: CacheStore, ttl: TtlConfig, retry: RetryCalculator) -> Self {
        Self {
            origin,
            store,
            ttl,
            retry,
        }
    }

    /// Ensure a complete record for `slug` is cached.
    ///
    /// A cached record that is not ongoing is returned as is. Otherwise the
    /// origin is consulted; `None` means the slug is invalid or every attempt
    /// failed.
    pub async fn cache_detail(&self, slug: &str) -> Option<DetailRecord> {
        let slug = match checked_slug(slug) {
            Ok(slug) => slug,
            Err(e) => {
                warn!("Skipping detail warm: {}", e);
                return None;
            }
        };

        if let Some(cached) = self.store.get::<DetailRecord>(&cache_keys::detail(slug)).await {
            if !cached.is_ongoing() {
                debug!("📦 Detail {} already cached", slug);
                return Some(cached);
            }
            debug!("🔁 Detail {} is ongoing, refreshing", slug);
        }

        self.warm(slug).await
    }

    /// Fetch and persist regardless of what is cached.
    pub async fn refresh_detail(&self, slug: &str) -> Option<DetailRecord> {
        match checked_slug(slug) {
            Ok(slug) => self.warm(slug).await,
            Err(e) => {
                warn!("Skipping detail refresh: {}", e);
                None
            }
        }
    }

    async fn warm(&self, slug: &str) -> Option<DetailRecord> {
        let label = format!("detail {slug}");
        match self.retry.execute(&label, |_| self.fetch_and_persist(slug)).await {
            Ok(record) => {
                info!("✅ Cached detail {} ({})", slug, record.movie.name);
                Some(record)
            }
            Err(_) => None,
        }
    }

    async fn fetch_and_persist(&self, slug: &str) -> Result<DetailRecord, DetailError> {
        let body = self.origin.fetch_detail(slug).await?;
        let mut record = DetailRecord::from_origin(body)?;
        record.validate()?;
        record.fetched_at = Some(Utc::now());

        self.persist(slug, &record).await?;
        Ok(record)
    }

    async fn persist(&self, slug: &str, record: &DetailRecord) -> Result<(), DetailError> {
        let ttl = self.ttl.duration(TtlClass::Detail(record.mutability()));
        let detail_key = cache_keys::detail(slug);

        self.store.put(&detail_key, record, ttl).await?;
        self.store
            .put(&cache_keys::id_to_slug(&record.movie.id), slug, ttl)
            .await?;
        self.store.mark_warmed(&detail_key).await?;

        let streams = derive_streams(record);
        let total = streams.len();
        let failed = join_all(
            streams
                .iter()
                .map(|(id, stream)| self.put_stream(id, stream, ttl)),
        )
        .await
        .into_iter()
        .filter(|written| !written)
        .count();

        if failed > 0 {
            return Err(DetailError::Streams { failed, total });
        }
        debug!("Cached {} streams for {}", total, slug);
        Ok(())
    }

    async fn put_stream(&self, id: &StreamId, stream: &StreamRecord, ttl: std::time::Duration) -> bool {
        let key = cache_keys::stream(id);
        let written = async {
            self.store.put(&key, stream, ttl).await?;
            self.store.mark_warmed(&key).await
        }
        .await;
        match written {
            Ok(()) => true,
            Err(e) => {
                warn!("⚠️ Failed to cache stream {}: {}", key, e);
                false
            }
        }
    }
}
