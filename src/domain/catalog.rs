//! Catalog listing entities.
//!
//! Listing endpoints return summaries of catalog entries together with some
//! form of pagination metadata. Everything here is tolerant of missing or
//! mistyped fields; entries that cannot be decoded at all are dropped.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::lenient;

/// Reference to a category or country.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyRef {
    #[serde(rename = "id", alias = "_id", default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub slug: String,
}

/// Summary of one catalog entry as it appears in listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "_id", alias = "id", default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub slug: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::optional_string", skip_serializing_if = "Option::is_none")]
    pub origin_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string", skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string", skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::year", skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(
        default,
        deserialize_with = "deserialize_modified",
        serialize_with = "serialize_modified",
        skip_serializing_if = "Option::is_none"
    )]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub category: Vec<TaxonomyRef>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub country: Vec<TaxonomyRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogEntry {
    /// Slug with surrounding whitespace removed, if any is left.
    pub fn usable_slug(&self) -> Option<&str> {
        let slug = self.slug.trim();
        (!slug.is_empty()).then_some(slug)
    }

    /// Whether the entry changed strictly after `watermark`.
    /// Entries without a modification time are treated as never modified.
    pub fn modified_after(&self, watermark: DateTime<Utc>) -> bool {
        self.modified.is_some_and(|modified| modified > watermark)
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "Unknown Title"
        } else {
            &self.name
        }
    }

    pub fn as_taxonomy(&self) -> TaxonomyRef {
        TaxonomyRef {
            id: self.id.clone(),
            name: self.name.clone(),
            slug: self.slug.clone(),
        }
    }
}

/// Parse the origin's timestamp formats.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_modified<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let raw = match &value {
        Value::Object(map) => map.get("time").and_then(Value::as_str),
        Value::String(text) => Some(text.as_str()),
        _ => None,
    };
    Ok(raw.and_then(parse_timestamp))
}

#[allow(clippy::ref_option)]
fn serialize_modified<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(time) => serde_json::json!({ "time": time.to_rfc3339() }).serialize(serializer),
        None => serializer.serialize_none(),
    }
}

/// A normalized listing page as stored in the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    #[serde(default)]
    pub items: Vec<CatalogEntry>,
    #[serde(rename = "totalPages", default)]
    pub total_pages: u32,
}

impl ListPage {
    /// The value returned when the origin could not be reached.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Listing body after unwrapping the origin's envelope variants.
#[derive(Debug, Clone, Default)]
pub struct RawListing {
    /// `None` when the body carried no item array at all.
    pub items: Option<Vec<CatalogEntry>>,
    pub reported_total_pages: Option<u32>,
}

impl RawListing {
    /// Accepts `{items, pagination}`, `{data: {items, params: {pagination}}}`
    /// and bare arrays.
    pub fn from_value(body: Value) -> Self {
        let body = unwrap_data_envelope(body);
        let reported_total_pages = reported_total_pages(&body);

        let raw_items = match body {
            Value::Array(items) => Some(items),
            Value::Object(mut map) => match map.remove("items") {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            },
            _ => None,
        };

        let items = raw_items.map(|items| {
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<CatalogEntry>(item).ok())
                .collect()
        });

        Self {
            items,
            reported_total_pages,
        }
    }

    pub fn item_count(&self) -> usize {
        self.items.as_ref().map_or(0, Vec::len)
    }

    pub fn into_items(self) -> Vec<CatalogEntry> {
        self.items.unwrap_or_default()
    }
}

fn unwrap_data_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data @ Value::Object(_)) => data,
            Some(other) => {
                map.insert("data".to_string(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

fn reported_total_pages(body: &Value) -> Option<u32> {
    [
        "/pagination/totalPages",
        "/params/pagination/totalPages",
        "/total_pages",
        "/totalPages",
    ]
    .iter()
    .filter_map(|pointer| body.pointer(pointer))
    .find_map(as_page_count)
    .filter(|total| *total > 0)
}

fn as_page_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
