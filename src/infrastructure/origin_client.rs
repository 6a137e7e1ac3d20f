//! HTTP client for the origin catalog API
//!
//! Thin transport: builds URLs, merges default query parameters, applies a
//! client-side rate limit and maps failures into [`OriginError`]. Bodies are
//! returned as raw JSON; normalization happens in the application layer.

use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{Quota, RateLimiter, clock::DefaultClock, state::{InMemoryState, direct::NotKeyed}};
use reqwest::{Client, header::{HeaderMap, HeaderValue, USER_AGENT}};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::config::OriginConfig;
use crate::domain::{ListQuery, ResourceKind};

const DETAIL_PATH_PREFIX: &str = "/phim/";

#[derive(Error, Debug)]
pub enum OriginError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("origin returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("origin body from {url} is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("cannot build origin URL for '{0}'")]
    InvalidUrl(String),
}

#[async_trait]
pub trait OriginClient: Send + Sync {
    /// Raw body of a listing-shaped resource.
    async fn fetch_list(&self, resource: &ResourceKind, query: &ListQuery) -> Result<Value, OriginError>;

    /// Raw body of `/phim/{slug}`. The slug must already be validated.
    async fn fetch_detail(&self, slug: &str) -> Result<Value, OriginError>;
}

pub struct HttpOriginClient {
    client: Client,
    base_url: Url,
    default_params: BTreeMap<String, String>,
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl HttpOriginClient {
    pub fn new(config: &OriginConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid origin base URL: {}", config.base_url))?;

        let rate_limiter = NonZeroU32::new(config.max_requests_per_second)
            .map(|rate| RateLimiter::direct(Quota::per_second(rate)));

        Ok(Self {
            client,
            base_url,
            default_params: config.default_params.clone(),
            rate_limiter,
        })
    }

    fn resolve(&self, path: &str) -> Result<Url, OriginError> {
        self.base_url
            .join(path)
            .map_err(|_| OriginError::InvalidUrl(path.to_string()))
    }

    /// Default parameters overlaid with the call's own.
    fn merged_params(&self, query: &ListQuery) -> BTreeMap<String, String> {
        let mut params = self.default_params.clone();
        for (key, value) in query.params() {
            params.insert(key.to_string(), value);
        }
        params
    }

    async fn get_json(&self, url: Url, params: &BTreeMap<String, String>) -> Result<Value, OriginError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let display_url = url.to_string();
        debug!("Fetching origin URL: {} {:?}", display_url, params);

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|source| OriginError::Transport {
                url: display_url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OriginError::Status {
                status: status.as_u16(),
                url: display_url,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|source| OriginError::Decode {
                url: display_url,
                source,
            })
    }
}

#[async_trait]
impl OriginClient for HttpOriginClient {
    async fn fetch_list(&self, resource: &ResourceKind, query: &ListQuery) -> Result<Value, OriginError> {
        let url = self.resolve(&resource.path())?;
        let params = self.merged_params(query);
        self.get_json(url, &params).await
    }

    async fn fetch_detail(&self, slug: &str) -> Result<Value, OriginError> {
        let url = self.resolve(&format!("{DETAIL_PATH_PREFIX}{slug}"))?;
        self.get_json(url, &BTreeMap::new()).await
    }
}
