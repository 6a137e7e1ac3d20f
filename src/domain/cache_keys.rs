//! Logical cache key layout.
//!
//! Keys here are unprefixed; the cache store adds the deployment prefix.

use chrono::{DateTime, SecondsFormat, Utc};

use super::resource::{ListQuery, ResourceKind};
use super::stream::StreamId;

pub const WATERMARK: &str = "watermark:last_discovery";
pub const MEMBERSHIP_SET: &str = "membership_set";

pub fn detail(slug: &str) -> String {
    format!("detail:{slug}")
}

pub fn stream(id: &StreamId) -> String {
    format!("stream:{id}")
}

pub fn id_to_slug(id: &str) -> String {
    format!("id_to_slug:{id}")
}

pub fn list_page(kind: &ResourceKind, query: &ListQuery) -> String {
    format!("list_page:{kind}:{}", query.cache_fragment())
}

/// Feed page filtered against `watermark`.
pub fn discovery_page(watermark: &DateTime<Utc>, page: u32) -> String {
    format!(
        "discovery_page:{}:{page}",
        watermark.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    )
}

pub fn suggestion(keyword: &str) -> String {
    format!("suggest:{}", keyword.trim().to_lowercase())
}

pub fn recent_list(name: &str) -> String {
    format!("recent:{name}")
}
