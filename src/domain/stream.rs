//! Per-episode stream records derived from a detail record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::detail::{DetailRecord, Episode};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamIdError {
    #[error("stream id '{0}' must look like '<detail id>_<server>_<episode>'")]
    Shape(String),

    #[error("stream id '{0}' has a non-numeric server or episode index")]
    Index(String),
}

/// `{detail_id}_{server}_{episode}`, with zero-based indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamId {
    pub detail_id: String,
    pub server: usize,
    pub episode: usize,
}

impl StreamId {
    pub fn new(detail_id: impl Into<String>, server: usize, episode: usize) -> Self {
        Self {
            detail_id: detail_id.into(),
            server,
            episode,
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.detail_id, self.server, self.episode)
    }
}

impl FromStr for StreamId {
    type Err = StreamIdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.rsplitn(3, '_');
        let (Some(episode), Some(server), Some(detail_id)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(StreamIdError::Shape(raw.to_string()));
        };
        if detail_id.is_empty() {
            return Err(StreamIdError::Shape(raw.to_string()));
        }
        let (Ok(server), Ok(episode)) = (server.parse(), episode.parse()) else {
            return Err(StreamIdError::Index(raw.to_string()));
        };
        Ok(Self::new(detail_id, server, episode))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamLink {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub default: bool,
    pub url: String,
}

/// What the player consumes for one episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub stream_links: Vec<StreamLink>,
}

impl StreamRecord {
    /// Single HLS link; the URL is empty when the episode has no manifest.
    pub fn for_episode(id: &StreamId, episode: &Episode) -> Self {
        let name = if episode.name.trim().is_empty() {
            format!("Episode {}", id.episode + 1)
        } else {
            episode.name.clone()
        };
        Self {
            stream_links: vec![StreamLink {
                id: format!("default_{id}"),
                name,
                kind: "hls".to_string(),
                default: false,
                url: episode.link_m3u8.clone(),
            }],
        }
    }
}

/// One stream record per `(server, episode)` pair of the record.
pub fn derive_streams(record: &DetailRecord) -> Vec<(StreamId, StreamRecord)> {
    record
        .episodes
        .iter()
        .enumerate()
        .flat_map(|(server_index, server)| {
            server
                .server_data
                .iter()
                .enumerate()
                .map(move |(episode_index, episode)| {
                    let id = StreamId::new(record.movie.id.clone(), server_index, episode_index);
                    let stream = StreamRecord::for_episode(&id, episode);
                    (id, stream)
                })
        })
        .collect()
}

/// Re-derive a single stream, `None` when the id names another record or
/// points outside the episode lists.
pub fn locate_stream(record: &DetailRecord, id: &StreamId) -> Option<StreamRecord> {
    if record.movie.id != id.detail_id {
        return None;
    }
    record
        .episode(id.server, id.episode)
        .map(|episode| StreamRecord::for_episode(id, episode))
}
