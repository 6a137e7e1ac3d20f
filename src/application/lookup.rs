//! Lookup service
//!
//! Read paths for the presentation layer: cache first, then origin through
//! the writer or the list cache. Every operation answers `None` (or an
//! empty collection) for malformed input without touching the origin.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use super::detail_writer::DetailCacheWriter;
use super::list_cache::ListCache;
use crate::domain::{
    CatalogEntry, CatalogId, DetailRecord, Mutability, StreamId, StreamRecord, TtlClass, cache_keys,
    locate_stream, validate_slug,
};
use crate::infrastructure::{CacheStore, TtlConfig, WarmingConfig};

pub struct LookupService {
    store: CacheStore,
    writer: Arc<DetailCacheWriter>,
    lists: Arc<ListCache>,
    ttl: TtlConfig,
    id_search_limit: u32,
    suggestion_limit: u32,
}

impl LookupService {
    pub fn new(
        store: CacheStore,
        writer: Arc<DetailCacheWriter>,
        lists: Arc<ListCache>,
        ttl: TtlConfig,
        warming: &WarmingConfig,
    ) -> Self {
        Self {
            store,
            writer,
            lists,
            ttl,
            id_search_limit: warming.id_search_limit.max(1),
            suggestion_limit: warming.suggestion_limit.max(1),
        }
    }

    /// Listing and search accessors.
    pub fn lists(&self) -> &ListCache {
        &self.lists
    }

    /// Cached record, or a freshly warmed one. `force_refresh` skips the cache.
    pub async fn get_detail(&self, slug: &str, force_refresh: bool) -> Option<DetailRecord> {
        let Ok(slug) = validate_slug(slug) else {
            debug!("Rejected detail lookup for '{}'", slug);
            return None;
        };

        if force_refresh {
            return self.writer.refresh_detail(slug).await;
        }

        // Keys written by the warming path are trusted; anything else is
        // re-checked before it is served.
        let key = cache_keys::detail(slug);
        let trusted = self.store.is_warmed(&key).await;
        if let Some(record) = self.store.get::<DetailRecord>(&key).await {
            if trusted || record.is_complete() {
                return Some(record);
            }
            debug!("Cached detail {} is incomplete, refetching", slug);
            return self.writer.refresh_detail(slug).await;
        }
        self.writer.cache_detail(slug).await
    }

    /// One slot per slug, in order. Misses are warmed concurrently.
    pub async fn get_multiple_details(&self, slugs: &[String]) -> Vec<Option<DetailRecord>> {
        let keys: Vec<String> = slugs.iter().map(|slug| cache_keys::detail(slug)).collect();
        let cached = match self.store.get_many::<DetailRecord>(&keys).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!("Batched detail read failed, warming individually: {}", e);
                vec![None; slugs.len()]
            }
        };

        join_all(slugs.iter().zip(cached).map(|(slug, hit)| async move {
            match hit {
                Some(record) => Some(record),
                None => self.writer.cache_detail(slug).await,
            }
        }))
        .await
    }

    /// Stream record for `stream_id` of the record at `slug`.
    ///
    /// `detail_id`, when given, must match the id embedded in `stream_id`.
    /// Misses re-derive the stream from a freshly fetched record.
    pub async fn get_stream(&self, slug: &str, stream_id: &str, detail_id: Option<&str>) -> Option<StreamRecord> {
        let Ok(id) = stream_id.parse::<StreamId>() else {
            debug!("Rejected malformed stream id '{}'", stream_id);
            return None;
        };
        if detail_id.is_some_and(|expected| expected != id.detail_id) {
            debug!("Stream id {} does not belong to {:?}", stream_id, detail_id);
            return None;
        }

        let key = cache_keys::stream(&id);
        if let Some(stream) = self.store.get::<StreamRecord>(&key).await {
            return Some(stream);
        }

        let record = self.get_detail(slug, true).await?;
        let Some(stream) = locate_stream(&record, &id) else {
            debug!("Stream {} not found in {}", stream_id, slug);
            return None;
        };

        let ttl = self.ttl.duration(TtlClass::Detail(record.mutability()));
        if let Err(e) = self.store.put(&key, &stream, ttl).await {
            warn!("⚠️ Failed to cache stream {}: {}", key, e);
        } else if let Err(e) = self.store.mark_warmed(&key).await {
            warn!("⚠️ Failed to record {} as warmed: {}", key, e);
        }
        Some(stream)
    }

    /// Map a 32-hex catalog id to its slug via the index, falling back to a
    /// bounded search for an exact id match.
    pub async fn resolve_slug_from_id(&self, id: &str) -> Option<String> {
        let Ok(id) = CatalogId::parse(id) else {
            debug!("Rejected malformed catalog id '{}'", id);
            return None;
        };

        let key = cache_keys::id_to_slug(id.as_str());
        if let Some(slug) = self.store.get::<String>(&key).await {
            return Some(slug);
        }

        let results = self.lists.search(id.as_str(), 1, self.id_search_limit).await;
        let slug = results
            .items
            .iter()
            .find(|entry| entry.id == id.as_str())
            .and_then(CatalogEntry::usable_slug)?
            .to_string();

        // The record's mutability is unknown here; the id-to-slug mapping
        // does not change while a title is ongoing, so the settled TTL applies.
        let ttl = self.ttl.duration(TtlClass::Detail(Mutability::Settled));
        if let Err(e) = self.store.put(&key, &slug, ttl).await {
            warn!("⚠️ Failed to cache id index for {}: {}", id, e);
        }
        Some(slug)
    }

    /// Display names of the top search results for `keyword`.
    pub async fn suggest(&self, keyword: &str) -> Vec<String> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Vec::new();
        }

        let key = cache_keys::suggestion(keyword);
        if let Some(names) = self.store.get::<Vec<String>>(&key).await {
            return names;
        }

        let names: Vec<String> = self
            .lists
            .search(keyword, 1, self.suggestion_limit)
            .await
            .items
            .iter()
            .take(self.suggestion_limit as usize)
            .map(|entry| entry.display_name().to_string())
            .collect();

        if !names.is_empty() {
            let ttl = self.ttl.duration(TtlClass::Suggestion);
            if let Err(e) = self.store.put(&key, &names, ttl).await {
                warn!("⚠️ Failed to cache suggestions for {}: {}", keyword, e);
            }
        }
        names
    }

    /// Prepend `entries` to the stored list `name`, dropping older entries
    /// with the same id, and keep at most `limit`.
    pub async fn merge_recent(&self, name: &str, entries: Vec<CatalogEntry>, limit: usize) -> Vec<CatalogEntry> {
        let key = cache_keys::recent_list(name);
        let existing = self.store.get::<Vec<CatalogEntry>>(&key).await.unwrap_or_default();

        let fresh_ids: HashSet<&str> = entries.iter().map(|entry| entry.id.as_str()).collect();
        let retained: Vec<CatalogEntry> = existing
            .into_iter()
            .filter(|entry| !fresh_ids.contains(entry.id.as_str()))
            .collect();

        let mut merged = entries;
        merged.extend(retained);
        merged.truncate(limit);

        let ttl = self.ttl.duration(TtlClass::RecentList);
        if let Err(e) = self.store.put(&key, &merged, ttl).await {
            warn!("⚠️ Failed to store recent list {}: {}", name, e);
        }
        merged
    }
}
