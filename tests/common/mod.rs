//! Shared fixtures for integration tests: a scripted origin and payload builders.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use catalog_warmer_lib::application::ServiceContext;
use catalog_warmer_lib::domain::{ListQuery, ResourceKind};
use catalog_warmer_lib::infrastructure::{
    AppConfig, KvStore, MemoryKvStore, OriginClient, OriginError, StoreBackend, StoreError,
};

pub const FEED_PATH: &str = "/danh-sach/phim-moi-cap-nhat";
pub const SEARCH_PATH: &str = "/v1/api/tim-kiem";

/// `Err(status)` stands in for an HTTP failure.
type Reply = Result<Value, u16>;

/// Origin that answers from canned replies and counts every call.
///
/// Detail replies are consumed in order; the last one repeats. Unknown
/// routes answer 404.
#[derive(Default)]
pub struct ScriptedOrigin {
    lists: Mutex<HashMap<(String, u32), Reply>>,
    details: Mutex<HashMap<String, VecDeque<Reply>>>,
    list_calls: Mutex<HashMap<String, usize>>,
    detail_calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    detail_delay: Option<Duration>,
}

impl ScriptedOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list(self, path: &str, page: u32, body: Value) -> Self {
        self.set_list(path, page, body);
        self
    }

    /// Replace a list reply on an origin that is already in use.
    pub fn set_list(&self, path: &str, page: u32, body: Value) {
        self.lists
            .lock()
            .unwrap()
            .insert((path.to_string(), page), Ok(body));
    }

    pub fn with_failing_list(self, path: &str, page: u32, status: u16) -> Self {
        self.lists
            .lock()
            .unwrap()
            .insert((path.to_string(), page), Err(status));
        self
    }

    pub fn with_feed_page(self, page: u32, body: Value) -> Self {
        self.with_list(FEED_PATH, page, body)
    }

    pub fn with_detail(self, slug: &str, body: Value) -> Self {
        self.with_detail_sequence(slug, vec![Ok(body)])
    }

    pub fn with_failing_detail(self, slug: &str, status: u16) -> Self {
        self.with_detail_sequence(slug, vec![Err(status)])
    }

    pub fn with_detail_sequence(self, slug: &str, replies: Vec<Reply>) -> Self {
        self.details
            .lock()
            .unwrap()
            .insert(slug.to_string(), replies.into());
        self
    }

    pub fn with_detail_delay(mut self, delay: Duration) -> Self {
        self.detail_delay = Some(delay);
        self
    }

    pub fn list_calls(&self, path: &str) -> usize {
        self.list_calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn detail_calls(&self, slug: &str) -> usize {
        self.detail_calls.lock().unwrap().get(slug).copied().unwrap_or(0)
    }

    pub fn total_detail_calls(&self) -> usize {
        self.detail_calls.lock().unwrap().values().sum()
    }

    pub fn peak_concurrent_details(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_detail(&self, slug: &str) -> Reply {
        let mut details = self.details.lock().unwrap();
        match details.get_mut(slug) {
            Some(replies) if replies.len() > 1 => replies.pop_front().unwrap_or(Err(404)),
            Some(replies) => replies.front().cloned().unwrap_or(Err(404)),
            None => Err(404),
        }
    }
}

fn status_error(status: u16, url: String) -> OriginError {
    OriginError::Status { status, url }
}

#[async_trait]
impl OriginClient for ScriptedOrigin {
    async fn fetch_list(&self, resource: &ResourceKind, query: &ListQuery) -> Result<Value, OriginError> {
        let path = resource.path();
        *self.list_calls.lock().unwrap().entry(path.clone()).or_default() += 1;

        let reply = self
            .lists
            .lock()
            .unwrap()
            .get(&(path.clone(), query.page_number()))
            .cloned()
            .unwrap_or(Err(404));
        reply.map_err(|status| status_error(status, path))
    }

    async fn fetch_detail(&self, slug: &str) -> Result<Value, OriginError> {
        *self
            .detail_calls
            .lock()
            .unwrap()
            .entry(slug.to_string())
            .or_default() += 1;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.detail_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.next_detail(slug)
            .map_err(|status| status_error(status, format!("/phim/{slug}")))
    }
}

/// In-memory store whose reads can be switched to fail.
///
/// Writes always succeed, so a test can warm records and then cut reads.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryKvStore,
    fail_get: AtomicBool,
    fail_mget: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mget(&self, fail: bool) {
        self.fail_mget.store(fail, Ordering::SeqCst);
    }

    pub async fn keys(&self) -> Vec<String> {
        self.inner.keys().await
    }

    fn outage(&self, flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Http {
                status: 503,
                message: "store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for FlakyStore {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.outage(&self.fail_get)?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.inner.set(key, value, ttl).await
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        self.outage(&self.fail_mget)?;
        self.inner.mget(keys).await
    }

    async fn sadd(&self, set: &str, member: &str) -> Result<(), StoreError> {
        self.inner.sadd(set, member).await
    }

    async fn sismember(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        self.outage(&self.fail_get)?;
        self.inner.sismember(set, member).await
    }
}

/// Defaults with the in-memory backend and a short test prefix.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.store.backend = StoreBackend::Memory;
    config.store.key_prefix = "test:".to_string();
    config
}

pub fn context(origin: Arc<ScriptedOrigin>) -> (Arc<MemoryKvStore>, ServiceContext) {
    context_with(origin, &test_config())
}

pub fn context_on(origin: Arc<ScriptedOrigin>, backend: Arc<dyn KvStore>) -> ServiceContext {
    ServiceContext::new(origin, backend, &test_config())
}

pub fn context_with(origin: Arc<ScriptedOrigin>, config: &AppConfig) -> (Arc<MemoryKvStore>, ServiceContext) {
    let backend = Arc::new(MemoryKvStore::new());
    let context = ServiceContext::new(origin, backend.clone(), config);
    (backend, context)
}

/// Deterministic 32-hex catalog id.
pub fn hex_id(n: usize) -> String {
    format!("{n:032x}")
}

/// A complete detail body with `servers` servers of `episodes` episodes each.
pub fn detail_json(slug: &str, id: &str, status: &str, servers: usize, episodes: usize) -> Value {
    let kind = if episodes > 1 { "series" } else { "single" };
    let episodes: Vec<Value> = (0..servers)
        .map(|server| {
            json!({
                "server_name": format!("Server #{}", server + 1),
                "server_data": (0..episodes)
                    .map(|episode| json!({
                        "name": format!("Tập {}", episode + 1),
                        "slug": format!("tap-{}", episode + 1),
                        "link_embed": format!("https://player.example.com/{slug}/{server}/{episode}"),
                        "link_m3u8": format!("https://cdn.example.com/{slug}/{server}/{episode}/index.m3u8"),
                    }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    json!({
        "status": true,
        "movie": {
            "_id": id,
            "name": format!("Title of {slug}"),
            "slug": slug,
            "content": "A story worth caching.",
            "poster_url": format!("https://img.example.com/{slug}.jpg"),
            "thumb_url": format!("https://img.example.com/{slug}-thumb.jpg"),
            "year": 2024,
            "category": [{"id": "c1", "name": "Drama", "slug": "chinh-kich"}],
            "country": [{"id": "k1", "name": "Korea", "slug": "han-quoc"}],
            "status": status,
            "type": kind,
        },
        "episodes": episodes,
    })
}

/// A feed page in the `{items, pagination}` shape. Every entry carries `modified`.
pub fn feed_page_json(slugs: &[String], modified: &str, total_pages: Option<u32>) -> Value {
    let items: Vec<Value> = slugs
        .iter()
        .enumerate()
        .map(|(i, slug)| {
            json!({
                "_id": hex_id(i),
                "slug": slug,
                "name": format!("Title of {slug}"),
                "modified": {"time": modified},
            })
        })
        .collect();

    let mut body = json!({ "status": true, "items": items });
    if let Some(total) = total_pages {
        body["pagination"] = json!({ "totalPages": total });
    }
    body
}

/// A `{data: {items}}` listing with no page count.
pub fn listing_json(entries: &[(String, String)]) -> Value {
    let items: Vec<Value> = entries
        .iter()
        .map(|(id, slug)| json!({ "_id": id, "slug": slug, "name": format!("Title of {slug}") }))
        .collect();
    json!({ "status": "success", "data": { "items": items } })
}

pub fn slugs(prefix: &str, range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("{prefix}-{i}")).collect()
}
