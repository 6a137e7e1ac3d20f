//! Full detail records and the completeness predicate.
//!
//! A `DetailRecord` is only ever written to the cache after
//! [`DetailRecord::validate`] succeeds, so anything read back under a
//! detail key can be rendered without further checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::catalog::TaxonomyRef;
use super::lenient;

/// Why a detail payload was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("detail payload has no movie object")]
    MissingMovie,

    #[error("required field '{0}' is missing or empty")]
    MissingField(&'static str),

    #[error("detail payload is malformed: {0}")]
    Malformed(String),
}

/// Whether a record may still change upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutability {
    /// Status reads "ongoing"; episodes are still being added.
    Ongoing,
    Settled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    #[serde(rename = "_id", default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub slug: String,
    #[serde(default, deserialize_with = "lenient::optional_string", skip_serializing_if = "Option::is_none")]
    pub origin_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub content: String,
    #[serde(default, deserialize_with = "lenient::optional_string", skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_string", skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::year", skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub actor: Vec<String>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub category: Vec<TaxonomyRef>,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub country: Vec<TaxonomyRef>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub status: String,
    #[serde(rename = "type", default, deserialize_with = "lenient::string")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub episode_total: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub lang: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub slug: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub filename: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub link_embed: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub link_m3u8: String,
}

/// One playback server and its episode list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeServer {
    #[serde(default, deserialize_with = "lenient::string")]
    pub server_name: String,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub server_data: Vec<Episode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub movie: MovieDetail,
    #[serde(default, deserialize_with = "lenient::vec")]
    pub episodes: Vec<EpisodeServer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl DetailRecord {
    /// Decode an origin detail body. This does not check completeness.
    pub fn from_origin(body: Value) -> Result<Self, ValidationError> {
        match body.get("movie") {
            Some(Value::Object(_)) => {}
            _ => return Err(ValidationError::MissingMovie),
        }
        serde_json::from_value(body).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// The completeness predicate. Names the first missing field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let movie = &self.movie;
        if is_blank(&movie.id) {
            return Err(ValidationError::MissingField("_id"));
        }
        if is_blank(&movie.name) {
            return Err(ValidationError::MissingField("name"));
        }
        if is_blank(&movie.slug) {
            return Err(ValidationError::MissingField("slug"));
        }
        if movie.poster_url.is_none() && movie.thumb_url.is_none() {
            return Err(ValidationError::MissingField("poster_url"));
        }
        if is_blank(&movie.content) {
            return Err(ValidationError::MissingField("content"));
        }
        if movie.category.is_empty() {
            return Err(ValidationError::MissingField("category"));
        }
        if movie.country.is_empty() {
            return Err(ValidationError::MissingField("country"));
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn mutability(&self) -> Mutability {
        if self.movie.status.trim().eq_ignore_ascii_case("ongoing") {
            Mutability::Ongoing
        } else {
            Mutability::Settled
        }
    }

    pub fn is_ongoing(&self) -> bool {
        self.mutability() == Mutability::Ongoing
    }

    /// Multi-episode content, either by declared type or by episode count.
    pub fn is_series(&self) -> bool {
        if self.movie.kind.eq_ignore_ascii_case("series") {
            return true;
        }
        let tmdb_tv = self
            .movie
            .tmdb
            .as_ref()
            .and_then(|tmdb| tmdb.get("type"))
            .and_then(Value::as_str)
            .is_some_and(|kind| kind.eq_ignore_ascii_case("tv"));
        tmdb_tv
            || self
                .episodes
                .first()
                .is_some_and(|server| server.server_data.len() > 1)
    }

    pub fn episode(&self, server: usize, episode: usize) -> Option<&Episode> {
        self.episodes.get(server)?.server_data.get(episode)
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
