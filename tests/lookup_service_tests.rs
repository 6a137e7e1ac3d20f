//! Lookup service read paths.

mod common;

use std::sync::Arc;
use std::time::Duration;

use catalog_warmer_lib::domain::{CatalogEntry, DetailRecord};
use common::{SEARCH_PATH, ScriptedOrigin, context, detail_json, hex_id, listing_json};

fn entry(id: &str, name: &str) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        slug: name.to_lowercase(),
        name: name.to_string(),
        ..CatalogEntry::default()
    }
}

#[tokio::test(start_paused = true)]
async fn out_of_range_stream_is_none() {
    let origin = Arc::new(ScriptedOrigin::new().with_detail("phim", detail_json("phim", "abc123", "completed", 2, 2)));
    let (_backend, ctx) = context(origin.clone());

    assert!(ctx.lookup.get_stream("phim", "abc123_1_5", None).await.is_none());
    assert!(ctx.lookup.get_stream("phim", "abc123_7_0", None).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn missing_stream_is_derived_then_served_from_cache() {
    let origin = Arc::new(ScriptedOrigin::new().with_detail("phim", detail_json("phim", "abc123", "completed", 2, 2)));
    let (backend, ctx) = context(origin.clone());

    let stream = ctx
        .lookup
        .get_stream("phim", "abc123_1_1", Some("abc123"))
        .await
        .expect("stream derived");
    assert_eq!(stream.stream_links[0].name, "Tập 2");
    assert_eq!(origin.detail_calls("phim"), 1);
    assert!(backend.keys().await.contains(&"test:stream:abc123_1_1".to_string()));

    let again = ctx.lookup.get_stream("phim", "abc123_1_1", None).await;
    assert_eq!(again, Some(stream));
    assert_eq!(origin.detail_calls("phim"), 1);
}

#[tokio::test(start_paused = true)]
async fn mismatched_or_malformed_stream_ids_are_rejected_without_fetching() {
    let origin = Arc::new(ScriptedOrigin::new().with_detail("phim", detail_json("phim", "abc123", "completed", 1, 1)));
    let (_backend, ctx) = context(origin.clone());

    assert!(ctx.lookup.get_stream("phim", "abc123_0_0", Some("other")).await.is_none());
    assert!(ctx.lookup.get_stream("phim", "not-a-stream", None).await.is_none());
    assert!(ctx.lookup.get_stream("phim", "abc123_x_0", None).await.is_none());
    assert_eq!(origin.total_detail_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn stream_of_a_different_record_is_none() {
    let origin = Arc::new(ScriptedOrigin::new().with_detail("phim", detail_json("phim", "abc123", "completed", 1, 1)));
    let (_backend, ctx) = context(origin.clone());

    assert!(ctx.lookup.get_stream("phim", "zzz999_0_0", None).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn get_detail_warms_once_then_serves_cache() {
    let origin = Arc::new(ScriptedOrigin::new().with_detail("phim", detail_json("phim", &hex_id(1), "completed", 1, 1)));
    let (_backend, ctx) = context(origin.clone());

    assert!(ctx.lookup.get_detail("phim", false).await.is_some());
    assert!(ctx.lookup.get_detail("phim", false).await.is_some());
    assert_eq!(origin.detail_calls("phim"), 1);

    assert!(ctx.lookup.get_detail("phim", true).await.is_some());
    assert_eq!(origin.detail_calls("phim"), 2);
}

#[tokio::test(start_paused = true)]
async fn untrusted_incomplete_record_is_refetched() {
    let origin = Arc::new(ScriptedOrigin::new().with_detail("phim", detail_json("phim", &hex_id(1), "completed", 1, 1)));
    let (_backend, ctx) = context(origin.clone());

    let mut stale = detail_json("phim", &hex_id(1), "completed", 1, 1);
    stale["movie"]["content"] = serde_json::json!("");
    let stale = DetailRecord::from_origin(stale).expect("decodes");
    assert!(!stale.is_complete());
    ctx.store
        .put("detail:phim", &stale, Duration::from_secs(60))
        .await
        .expect("seed");

    let record = ctx.lookup.get_detail("phim", false).await.expect("refetched");
    assert!(record.is_complete());
    assert_eq!(origin.detail_calls("phim"), 1);
}

#[tokio::test(start_paused = true)]
async fn invalid_slug_lookup_is_none() {
    let origin = Arc::new(ScriptedOrigin::new());
    let (_backend, ctx) = context(origin.clone());

    assert!(ctx.lookup.get_detail("", false).await.is_none());
    assert!(ctx.lookup.get_detail("a/b", true).await.is_none());
    assert_eq!(origin.total_detail_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn multiple_details_keep_input_order() {
    let origin = Arc::new(
        ScriptedOrigin::new()
            .with_detail("mot", detail_json("mot", &hex_id(1), "completed", 1, 1))
            .with_detail("hai", detail_json("hai", &hex_id(2), "completed", 1, 1)),
    );
    let (_backend, ctx) = context(origin.clone());
    ctx.writer.cache_detail("mot").await.expect("pre-warm");

    let slugs = vec!["hai".to_string(), "bad/slug".to_string(), "mot".to_string()];
    let results = ctx.lookup.get_multiple_details(&slugs).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().map(|r| r.movie.slug.as_str()), Some("hai"));
    assert!(results[1].is_none());
    assert_eq!(results[2].as_ref().map(|r| r.movie.slug.as_str()), Some("mot"));
    assert_eq!(origin.detail_calls("mot"), 1);
    assert_eq!(origin.detail_calls("hai"), 1);
}

#[tokio::test(start_paused = true)]
async fn resolve_slug_from_id_searches_then_indexes() {
    let id = hex_id(42);
    let origin = Arc::new(
        ScriptedOrigin::new()
            .with_list(SEARCH_PATH, 1, listing_json(&[(id.clone(), "tim-thay".to_string())]))
            .with_list(SEARCH_PATH, 2, listing_json(&[])),
    );
    let (backend, ctx) = context(origin.clone());

    assert_eq!(ctx.lookup.resolve_slug_from_id(&id).await.as_deref(), Some("tim-thay"));
    assert!(backend.keys().await.contains(&format!("test:id_to_slug:{id}")));

    let calls = origin.list_calls(SEARCH_PATH);
    assert_eq!(ctx.lookup.resolve_slug_from_id(&id).await.as_deref(), Some("tim-thay"));
    assert_eq!(origin.list_calls(SEARCH_PATH), calls);
}

#[tokio::test(start_paused = true)]
async fn resolve_slug_rejects_malformed_ids_and_inexact_hits() {
    let origin = Arc::new(
        ScriptedOrigin::new()
            .with_list(SEARCH_PATH, 1, listing_json(&[(hex_id(1), "gan-dung".to_string())]))
            .with_list(SEARCH_PATH, 2, listing_json(&[])),
    );
    let (_backend, ctx) = context(origin.clone());

    assert!(ctx.lookup.resolve_slug_from_id("xyz").await.is_none());
    assert!(ctx.lookup.resolve_slug_from_id(&"A".repeat(32)).await.is_none());
    assert_eq!(origin.list_calls(SEARCH_PATH), 0);

    assert!(ctx.lookup.resolve_slug_from_id(&hex_id(2)).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn suggestions_are_capped_and_cached() {
    let hits: Vec<(String, String)> = (0..7).map(|i| (hex_id(i), format!("naruto-{i}"))).collect();
    let origin = Arc::new(
        ScriptedOrigin::new()
            .with_list(SEARCH_PATH, 1, listing_json(&hits))
            .with_list(SEARCH_PATH, 2, listing_json(&[])),
    );
    let (backend, ctx) = context(origin.clone());

    let names = ctx.lookup.suggest("Naruto").await;
    assert_eq!(names.len(), 5);
    assert_eq!(names[0], "Title of naruto-0");
    assert!(backend.keys().await.contains(&"test:suggest:naruto".to_string()));

    let calls = origin.list_calls(SEARCH_PATH);
    assert_eq!(ctx.lookup.suggest("  naruto ").await, names);
    assert_eq!(origin.list_calls(SEARCH_PATH), calls);
}

#[tokio::test(start_paused = true)]
async fn empty_suggestions_are_not_cached() {
    let origin = Arc::new(ScriptedOrigin::new());
    let (backend, ctx) = context(origin.clone());

    assert!(ctx.lookup.suggest("khong-co").await.is_empty());
    assert!(ctx.lookup.suggest("").await.is_empty());
    assert!(backend.keys().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn merge_recent_puts_fresh_entries_first() {
    let origin = Arc::new(ScriptedOrigin::new());
    let (backend, ctx) = context(origin);

    let first = ctx
        .lookup
        .merge_recent("new", vec![entry("a", "A"), entry("b", "B")], 3)
        .await;
    assert_eq!(first.len(), 2);

    let merged = ctx
        .lookup
        .merge_recent("new", vec![entry("c", "C"), entry("a", "A2")], 3)
        .await;
    let names: Vec<&str> = merged.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["C", "A2", "B"]);

    let stored = ctx
        .store
        .get::<Vec<CatalogEntry>>("recent:new")
        .await
        .expect("stored");
    assert_eq!(stored, merged);
    assert_eq!(backend.ttl("test:recent:new").await, Some(Some(Duration::from_secs(3600))));

    let capped = ctx.lookup.merge_recent("new", vec![entry("d", "D")], 2).await;
    let names: Vec<&str> = capped.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["D", "C"]);
}
