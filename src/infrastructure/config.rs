//! Configuration infrastructure
//!
//! Configuration is layered, later sources winning:
//! 1. Built-in defaults (see [`defaults`])
//! 2. `config/default.{toml,json,yaml}` (optional)
//! 3. `config/{CATALOG_WARMER_ENV}.{toml,json,yaml}` (optional)
//! 4. `CATALOG_WARMER__SECTION__KEY` environment variables
//!
//! The KV credentials additionally honour the deployment's
//! `KV_REST_API_URL` and `KV_REST_API_TOKEN` variables.

#![allow(clippy::derivable_impls)]

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{Mutability, TtlClass};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub origin: OriginConfig,
    pub store: StoreConfig,
    pub ttl: TtlConfig,
    pub warming: WarmingConfig,
    pub logging: LoggingConfig,
}

/// Origin catalog API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
    /// 0 disables client-side rate limiting
    pub max_requests_per_second: u32,
    /// Merged into every listing request; per-call parameters win
    pub default_params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Redis-compatible REST endpoint
    Upstash,
    /// Process-local map, for development and tests
    Memory,
}

/// KV store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub rest_url: Option<String>,
    pub rest_token: Option<String>,
    /// Prepended to every logical key
    pub key_prefix: String,
    pub timeout_seconds: u64,
}

/// Freshness windows, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtlConfig {
    pub taxonomy_secs: u64,
    pub listing_secs: u64,
    pub series_listing_secs: u64,
    pub search_secs: u64,
    pub suggestion_secs: u64,
    pub detail_secs: u64,
    pub ongoing_detail_secs: u64,
    pub discovery_page_secs: u64,
    pub watermark_secs: u64,
    pub recent_list_secs: u64,
}

impl TtlConfig {
    pub const fn duration(&self, class: TtlClass) -> Duration {
        let secs = match class {
            TtlClass::Taxonomy => self.taxonomy_secs,
            TtlClass::Listing => self.listing_secs,
            TtlClass::SeriesListing => self.series_listing_secs,
            TtlClass::Search => self.search_secs,
            TtlClass::Suggestion => self.suggestion_secs,
            TtlClass::DiscoveryPage => self.discovery_page_secs,
            TtlClass::Watermark => self.watermark_secs,
            TtlClass::RecentList => self.recent_list_secs,
            TtlClass::Detail(Mutability::Ongoing) => self.ongoing_detail_secs,
            TtlClass::Detail(Mutability::Settled) => self.detail_secs,
        };
        Duration::from_secs(secs)
    }
}

/// Warming run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarmingConfig {
    /// Items requested per discovery page
    pub discovery_page_size: u32,
    pub discovery_page_delay_ms: u64,
    pub batch_size: usize,
    /// Upper bound on in-flight detail fetches
    pub max_concurrency: usize,
    pub batch_delay_ms: u64,
    /// Total attempts per origin operation, including the first
    pub retry_attempts: u32,
    /// Delay before attempt `n + 1` is `n * retry_base_delay_ms`
    pub retry_base_delay_ms: u64,
    pub retry_jitter_ms: u64,
    /// Results requested when resolving an id through search
    pub id_search_limit: u32,
    pub suggestion_limit: u32,
}

impl WarmingConfig {
    pub const fn discovery_page_delay(&self) -> Duration {
        Duration::from_millis(self.discovery_page_delay_ms)
    }

    pub const fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatted console output
    pub json_format: bool,

    pub console_output: bool,

    /// Enable daily rolling file output
    pub file_output: bool,

    /// Directory for log files; defaults to `logs/` next to the executable
    pub log_dir: Option<PathBuf>,

    /// Per-target levels applied below the global level
    pub module_filters: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: OriginConfig::default(),
            store: StoreConfig::default(),
            ttl: TtlConfig::default(),
            warming: WarmingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::ORIGIN_BASE_URL.to_string(),
            timeout_seconds: defaults::ORIGIN_TIMEOUT_SECONDS,
            user_agent: defaults::USER_AGENT.to_string(),
            max_requests_per_second: defaults::ORIGIN_MAX_REQUESTS_PER_SECOND,
            default_params: defaults::ORIGIN_DEFAULT_PARAMS
                .iter()
                .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
                .collect(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Upstash,
            rest_url: None,
            rest_token: None,
            key_prefix: defaults::KEY_PREFIX.to_string(),
            timeout_seconds: defaults::STORE_TIMEOUT_SECONDS,
        }
    }
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            taxonomy_secs: defaults::TTL_TAXONOMY_SECS,
            listing_secs: defaults::TTL_LISTING_SECS,
            series_listing_secs: defaults::TTL_SERIES_LISTING_SECS,
            search_secs: defaults::TTL_SEARCH_SECS,
            suggestion_secs: defaults::TTL_SUGGESTION_SECS,
            detail_secs: defaults::TTL_DETAIL_SECS,
            ongoing_detail_secs: defaults::TTL_ONGOING_DETAIL_SECS,
            discovery_page_secs: defaults::TTL_DISCOVERY_PAGE_SECS,
            watermark_secs: defaults::TTL_WATERMARK_SECS,
            recent_list_secs: defaults::TTL_RECENT_LIST_SECS,
        }
    }
}

impl Default for WarmingConfig {
    fn default() -> Self {
        Self {
            discovery_page_size: defaults::DISCOVERY_PAGE_SIZE,
            discovery_page_delay_ms: defaults::DISCOVERY_PAGE_DELAY_MS,
            batch_size: defaults::BATCH_SIZE,
            max_concurrency: defaults::MAX_CONCURRENCY,
            batch_delay_ms: defaults::BATCH_DELAY_MS,
            retry_attempts: defaults::RETRY_ATTEMPTS,
            retry_base_delay_ms: defaults::RETRY_BASE_DELAY_MS,
            retry_jitter_ms: defaults::RETRY_JITTER_MS,
            id_search_limit: defaults::ID_SEARCH_LIMIT,
            suggestion_limit: defaults::SUGGESTION_LIMIT,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            module_filters: defaults::LOG_MODULE_FILTERS
                .iter()
                .map(|(target, level)| ((*target).to_string(), (*level).to_string()))
                .collect(),
        }
    }
}

impl AppConfig {
    /// Load the layered configuration for the environment named by
    /// `CATALOG_WARMER_ENV`, if any.
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var(defaults::ENVIRONMENT_VAR).ok();
        let mut files = vec![config::File::with_name("config/default").required(false)];
        if let Some(environment) = environment.as_deref().filter(|name| !name.is_empty()) {
            info!("📁 Loading configuration for environment: {}", environment);
            files.push(config::File::with_name(&format!("config/{environment}")).required(false));
        }

        let mut config = Self::build(files, true)?;
        config.apply_kv_credentials(
            std::env::var(defaults::KV_URL_VAR).ok(),
            std::env::var(defaults::KV_TOKEN_VAR).ok(),
        );
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with a single file; environment variables ignored.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::build(vec![config::File::from(path).required(true)], false)?;
        config.validate()?;
        Ok(config)
    }

    fn build(
        files: Vec<config::File<config::FileSourceFile, config::FileFormat>>,
        include_env: bool,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder().add_source(config::Config::try_from(&Self::default())?);
        for file in files {
            builder = builder.add_source(file);
        }
        if include_env {
            builder = builder.add_source(
                config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: Self = builder.build()?.try_deserialize()?;
        debug!("Configuration loaded: backend={:?}", config.store.backend);
        Ok(config)
    }

    /// Deployment credential variables win over layered values.
    pub fn apply_kv_credentials(&mut self, url: Option<String>, token: Option<String>) {
        if let Some(url) = url.filter(|value| !value.trim().is_empty()) {
            self.store.rest_url = Some(url);
        }
        if let Some(token) = token.filter(|value| !value.trim().is_empty()) {
            self.store.rest_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if url::Url::parse(&self.origin.base_url).is_err() {
            return Err(ConfigError::invalid(format!(
                "origin.base_url '{}' is not a valid URL",
                self.origin.base_url
            )));
        }
        if self.origin.timeout_seconds == 0 {
            return Err(ConfigError::invalid("origin.timeout_seconds must be greater than 0"));
        }

        let warming = &self.warming;
        if warming.batch_size == 0 {
            return Err(ConfigError::invalid("warming.batch_size must be greater than 0"));
        }
        if warming.max_concurrency == 0 {
            return Err(ConfigError::invalid("warming.max_concurrency must be greater than 0"));
        }
        if warming.retry_attempts == 0 {
            return Err(ConfigError::invalid("warming.retry_attempts must be greater than 0"));
        }
        if warming.discovery_page_size == 0 {
            return Err(ConfigError::invalid("warming.discovery_page_size must be greater than 0"));
        }

        if self.store.backend == StoreBackend::Upstash {
            let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
            if !present(&self.store.rest_url) || !present(&self.store.rest_token) {
                return Err(ConfigError::invalid(format!(
                    "the upstash backend needs {} and {}",
                    defaults::KV_URL_VAR,
                    defaults::KV_TOKEN_VAR
                )));
            }
        }
        Ok(())
    }
}

/// Default configuration values
pub mod defaults {
    /// Variable naming the configuration environment (e.g. `production`)
    pub const ENVIRONMENT_VAR: &str = "CATALOG_WARMER_ENV";

    /// Prefix for `CATALOG_WARMER__SECTION__KEY` overrides
    pub const ENV_PREFIX: &str = "CATALOG_WARMER";

    pub const KV_URL_VAR: &str = "KV_REST_API_URL";
    pub const KV_TOKEN_VAR: &str = "KV_REST_API_TOKEN";

    // Origin
    pub const ORIGIN_BASE_URL: &str = "https://phimapi.com";
    pub const ORIGIN_TIMEOUT_SECONDS: u64 = 10;
    pub const ORIGIN_MAX_REQUESTS_PER_SECOND: u32 = 20;
    pub const USER_AGENT: &str = "catalog-warmer/0.2";
    pub const ORIGIN_DEFAULT_PARAMS: &[(&str, &str)] = &[("sort_field", "_id"), ("sort_type", "asc")];

    // Store
    pub const KEY_PREFIX: &str = "movieapp:";
    pub const STORE_TIMEOUT_SECONDS: u64 = 10;

    // Freshness windows
    pub const TTL_TAXONOMY_SECS: u64 = 30 * 24 * 3600;
    pub const TTL_LISTING_SECS: u64 = 6 * 3600;
    pub const TTL_SERIES_LISTING_SECS: u64 = 3600;
    pub const TTL_SEARCH_SECS: u64 = 15 * 60;
    pub const TTL_SUGGESTION_SECS: u64 = 15 * 60;
    pub const TTL_DETAIL_SECS: u64 = 30 * 24 * 3600;
    pub const TTL_ONGOING_DETAIL_SECS: u64 = 3600;
    pub const TTL_DISCOVERY_PAGE_SECS: u64 = 24 * 3600;
    pub const TTL_WATERMARK_SECS: u64 = 24 * 3600;
    pub const TTL_RECENT_LIST_SECS: u64 = 3600;

    // Warming
    pub const DISCOVERY_PAGE_SIZE: u32 = 100;
    pub const DISCOVERY_PAGE_DELAY_MS: u64 = 300;
    pub const BATCH_SIZE: usize = 10;
    pub const MAX_CONCURRENCY: usize = 10;
    pub const BATCH_DELAY_MS: u64 = 300;
    pub const RETRY_ATTEMPTS: u32 = 3;
    pub const RETRY_BASE_DELAY_MS: u64 = 1000;
    pub const RETRY_JITTER_MS: u64 = 0;
    pub const ID_SEARCH_LIMIT: u32 = 1;
    pub const SUGGESTION_LIMIT: u32 = 5;

    // Logging
    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = false;
    pub const LOG_MODULE_FILTERS: &[(&str, &str)] = &[
        ("reqwest", "info"),
        ("hyper", "warn"),
        ("h2", "warn"),
        ("tokio", "info"),
    ];
}
