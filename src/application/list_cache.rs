//! Cache-aside access to listing resources.
//!
//! Every listing read goes through [`ListCache::fetch`]: a cache hit is
//! returned as stored; a miss is fetched from the origin with bounded
//! retries, normalized into a [`ListPage`], cached under the resource's
//! freshness class and recorded in the membership set. When every attempt
//! fails the caller gets an empty page and nothing is cached.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{
    CatalogEntry, ListPage, ListQuery, ListingType, PageCount, PaginationCalculator, RawListing,
    ResourceKind, TaxonomyRef, cache_keys,
};
use crate::infrastructure::{CacheStore, OriginClient, OriginError, RetryCalculator, TtlConfig};

pub struct ListCache {
    origin: Arc<dyn OriginClient>,
    store: CacheStore,
    ttl: TtlConfig,
    retry: RetryCalculator,
}

impl ListCache {
    pub fn new(origin: Arc<dyn OriginClient>, store: CacheStore, ttl: TtlConfig, retry: RetryCalculator) -> Self {
        Self {
            origin,
            store,
            ttl,
            retry,
        }
    }

    /// Cached page for `resource` and `query`, fetching on a miss.
    pub async fn fetch(&self, resource: &ResourceKind, query: &ListQuery) -> ListPage {
        let key = cache_keys::list_page(resource, query);
        if let Some(page) = self.store.get::<ListPage>(&key).await {
            debug!("📦 Cache hit: {}", key);
            return page;
        }

        let label = format!("fetch {key}");
        match self
            .retry
            .execute(&label, |_| self.fetch_from_origin(resource, query))
            .await
        {
            Ok(page) => {
                let ttl = self.ttl.duration(resource.ttl_class());
                if let Err(e) = self.store.put(&key, &page, ttl).await {
                    warn!("⚠️ Failed to cache {}: {}", key, e);
                } else if let Err(e) = self.store.mark_warmed(&key).await {
                    warn!("⚠️ Failed to record {} as warmed: {}", key, e);
                }
                page
            }
            Err(e) => {
                warn!("Returning empty page for {}: {}", key, e);
                ListPage::empty()
            }
        }
    }

    async fn fetch_from_origin(&self, resource: &ResourceKind, query: &ListQuery) -> Result<ListPage, OriginError> {
        let listing = RawListing::from_value(self.origin.fetch_list(resource, query).await?);
        let page = query.page_number();
        let assessed = PaginationCalculator::assess(
            listing.reported_total_pages,
            page,
            query.limit,
            listing.item_count(),
        );

        let total_pages = match assessed {
            PageCount::Reported(total) | PageCount::Known(total) => total,
            PageCount::NeedsProbe { next_page } => {
                debug!("Probing page {} of {} for a page count", next_page, resource);
                match self.origin.fetch_list(resource, &query.with_page(next_page)).await {
                    Ok(probe) => {
                        let probe_items = RawListing::from_value(probe).item_count();
                        let total = PaginationCalculator::total_after_probe(page, probe_items);
                        info!("📊 Inferred {} pages for {}", total, resource);
                        total
                    }
                    // The fetched page is still good; assume exactly one more.
                    Err(e) => {
                        warn!("Probe of {} page {} failed: {}", resource, next_page, e);
                        next_page
                    }
                }
            }
        };

        Ok(ListPage {
            items: listing.into_items(),
            total_pages,
        })
    }

    pub async fn categories(&self) -> Vec<TaxonomyRef> {
        self.taxonomy(&ResourceKind::Categories).await
    }

    pub async fn countries(&self) -> Vec<TaxonomyRef> {
        self.taxonomy(&ResourceKind::Countries).await
    }

    async fn taxonomy(&self, resource: &ResourceKind) -> Vec<TaxonomyRef> {
        self.fetch(resource, &ListQuery::default())
            .await
            .items
            .iter()
            .map(CatalogEntry::as_taxonomy)
            .collect()
    }

    pub async fn recently_updated(&self, page: u32, limit: u32) -> ListPage {
        self.fetch(&ResourceKind::RecentlyUpdated, &ListQuery::page(page, limit))
            .await
    }

    pub async fn by_type(&self, kind: ListingType, page: u32, limit: u32) -> ListPage {
        self.fetch(&ResourceKind::ByType(kind), &ListQuery::page(page, limit))
            .await
    }

    pub async fn by_category(&self, slug: &str, page: u32, limit: u32) -> ListPage {
        self.fetch(&ResourceKind::ByCategory(slug.to_string()), &ListQuery::page(page, limit))
            .await
    }

    pub async fn by_country(&self, slug: &str, page: u32, limit: u32) -> ListPage {
        self.fetch(&ResourceKind::ByCountry(slug.to_string()), &ListQuery::page(page, limit))
            .await
    }

    /// Search results; a blank keyword short-circuits to an empty page.
    pub async fn search(&self, keyword: &str, page: u32, limit: u32) -> ListPage {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return ListPage::empty();
        }
        self.fetch(&ResourceKind::Search, &ListQuery::search(keyword, page, limit))
            .await
    }
}
