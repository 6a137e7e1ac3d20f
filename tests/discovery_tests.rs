//! Discovery walker: paging, watermark filtering and page caching.

mod common;

use std::sync::Arc;
use std::time::Duration;

use catalog_warmer_lib::application::DiscoveryWalker;
use catalog_warmer_lib::domain::cache_keys;
use catalog_warmer_lib::infrastructure::CacheStore;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use common::{FEED_PATH, ScriptedOrigin, context, feed_page_json, slugs, test_config};
use serde_json::json;

const RECENT: &str = "2024-05-01T10:00:00.000Z";
const OLD: &str = "2020-01-01T00:00:00.000Z";

fn three_page_feed() -> ScriptedOrigin {
    ScriptedOrigin::new()
        .with_feed_page(1, feed_page_json(&slugs("a", 0..100), RECENT, Some(3)))
        .with_feed_page(2, feed_page_json(&slugs("b", 0..100), RECENT, Some(3)))
        .with_feed_page(3, feed_page_json(&slugs("c", 0..40), RECENT, Some(3)))
}

fn walker(origin: Arc<ScriptedOrigin>, store: &CacheStore) -> DiscoveryWalker {
    let config = test_config();
    DiscoveryWalker::new(origin, store.clone(), &config.warming, &config.ttl)
}

#[tokio::test(start_paused = true)]
async fn walks_every_page_and_advances_the_watermark() {
    let origin = Arc::new(three_page_feed());
    let (_backend, ctx) = context(origin.clone());
    let walker = walker(origin.clone(), &ctx.store);
    let before = Utc::now();

    let outcome = walker.discover().await;

    assert_eq!(outcome.slugs.len(), 240);
    assert_eq!(outcome.pages_walked, 3);
    assert!(outcome.completed);
    assert_eq!(origin.list_calls(FEED_PATH), 3);
    assert_eq!(outcome.watermark_before, DateTime::<Utc>::UNIX_EPOCH);

    let stored = ctx
        .store
        .get::<DateTime<Utc>>(cache_keys::WATERMARK)
        .await
        .expect("watermark written");
    assert!(stored >= before);
    assert!(stored >= outcome.watermark_before);
    assert_eq!(outcome.watermark_after, Some(stored));
}

#[tokio::test(start_paused = true)]
async fn entries_at_or_before_the_watermark_are_skipped() {
    let mut page = feed_page_json(&slugs("new", 0..3), RECENT, Some(1));
    let old = feed_page_json(&slugs("old", 0..2), OLD, Some(1));
    if let (Some(items), Some(old_items)) = (page["items"].as_array_mut(), old["items"].as_array()) {
        items.extend(old_items.iter().cloned());
    }
    let origin = Arc::new(ScriptedOrigin::new().with_feed_page(1, page));
    let (_backend, ctx) = context(origin.clone());

    let watermark = Utc
        .with_ymd_and_hms(2023, 1, 1, 0, 0, 0)
        .single()
        .expect("valid date");
    ctx.store
        .put(cache_keys::WATERMARK, &watermark, Duration::from_secs(60))
        .await
        .expect("seed watermark");

    let outcome = walker(origin, &ctx.store).discover().await;

    assert_eq!(outcome.watermark_before, watermark);
    let found: Vec<&str> = outcome.slugs.iter().map(String::as_str).collect();
    assert_eq!(found, vec!["new-0", "new-1", "new-2"]);
}

#[tokio::test(start_paused = true)]
async fn mid_walk_failure_keeps_collected_slugs_and_watermark() {
    let origin = Arc::new(
        ScriptedOrigin::new()
            .with_feed_page(1, feed_page_json(&slugs("a", 0..100), RECENT, Some(3)))
            .with_failing_list(FEED_PATH, 2, 503),
    );
    let (_backend, ctx) = context(origin.clone());

    let outcome = walker(origin, &ctx.store).discover().await;

    assert!(!outcome.completed);
    assert_eq!(outcome.slugs.len(), 100);
    assert_eq!(outcome.pages_walked, 1);
    assert!(outcome.watermark_after.is_none());
    assert!(
        ctx.store
            .get::<DateTime<Utc>>(cache_keys::WATERMARK)
            .await
            .is_none()
    );
}

#[tokio::test(start_paused = true)]
async fn malformed_page_stops_the_walk() {
    let origin = Arc::new(
        ScriptedOrigin::new()
            .with_feed_page(1, feed_page_json(&slugs("a", 0..100), RECENT, Some(2)))
            .with_feed_page(2, json!({"status": false})),
    );
    let (_backend, ctx) = context(origin.clone());

    let outcome = walker(origin, &ctx.store).discover().await;

    assert!(!outcome.completed);
    assert_eq!(outcome.slugs.len(), 100);
}

#[tokio::test(start_paused = true)]
async fn retried_walk_reuses_pages_cached_under_the_same_watermark() {
    let origin = Arc::new(
        ScriptedOrigin::new()
            .with_feed_page(1, feed_page_json(&slugs("a", 0..100), RECENT, Some(2)))
            .with_failing_list(FEED_PATH, 2, 503),
    );
    let (_backend, ctx) = context(origin.clone());
    let walker = walker(origin.clone(), &ctx.store);

    let first = walker.discover().await;
    assert!(!first.completed);
    assert_eq!(origin.list_calls(FEED_PATH), 2);

    origin.set_list(FEED_PATH, 2, feed_page_json(&slugs("b", 0..100), RECENT, Some(2)));
    let second = walker.discover().await;

    assert!(second.completed);
    assert_eq!(second.slugs.len(), 200);
    // page 1 came from the cache, only page 2 was fetched again
    assert_eq!(origin.list_calls(FEED_PATH), 3);
}

#[tokio::test(start_paused = true)]
async fn changes_after_a_completed_walk_are_found_by_the_next_one() {
    let origin = Arc::new(three_page_feed());
    let (_backend, ctx) = context(origin.clone());
    let walker = walker(origin.clone(), &ctx.store);

    let first = walker.discover().await;
    let watermark = first.watermark_after.expect("watermark advanced");
    assert_eq!(origin.list_calls(FEED_PATH), 3);

    let modified = (Utc::now() + chrono::Duration::hours(1)).to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut page = feed_page_json(&slugs("a", 0..100), RECENT, Some(3));
    page["items"][7]["modified"]["time"] = json!(modified);
    origin.set_list(FEED_PATH, 1, page);

    let second = walker.discover().await;

    assert_eq!(second.watermark_before, watermark);
    assert_eq!(origin.list_calls(FEED_PATH), 6);
    let found: Vec<&str> = second.slugs.iter().map(String::as_str).collect();
    assert_eq!(found, vec!["a-7"]);

    // pages cached by earlier walks never replay an outdated filter
    tokio::time::advance(Duration::from_secs(12 * 3600)).await;
    let third = walker.discover().await;
    assert_eq!(origin.list_calls(FEED_PATH), 9);
    let found: Vec<&str> = third.slugs.iter().map(String::as_str).collect();
    assert_eq!(found, vec!["a-7"]);
}

#[tokio::test(start_paused = true)]
async fn partial_page_ends_a_walk_without_reported_total() {
    let origin = Arc::new(
        ScriptedOrigin::new()
            .with_feed_page(1, feed_page_json(&slugs("a", 0..100), RECENT, None))
            .with_feed_page(2, feed_page_json(&slugs("b", 0..100), RECENT, None))
            .with_feed_page(3, feed_page_json(&slugs("c", 0..40), RECENT, None))
            .with_failing_list(FEED_PATH, 4, 503),
    );
    let (_backend, ctx) = context(origin.clone());

    let outcome = walker(origin.clone(), &ctx.store).discover().await;

    assert_eq!(origin.list_calls(FEED_PATH), 3);
    assert_eq!(outcome.slugs.len(), 240);
    assert!(outcome.completed);
    assert!(outcome.watermark_after.is_some());
}

#[tokio::test(start_paused = true)]
async fn empty_feed_ends_the_walk() {
    let origin = Arc::new(ScriptedOrigin::new().with_feed_page(1, feed_page_json(&[], RECENT, None)));
    let (_backend, ctx) = context(origin.clone());

    let outcome = walker(origin.clone(), &ctx.store).discover().await;

    assert!(outcome.slugs.is_empty());
    assert!(outcome.completed);
    assert_eq!(origin.list_calls(FEED_PATH), 1);
}
