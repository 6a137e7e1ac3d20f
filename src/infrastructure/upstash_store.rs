//! Redis-compatible REST store (Upstash wire format).
//!
//! Each command is POSTed to the endpoint root as a JSON array such as
//! `["SET", "key", "value", "EX", 60]`; replies are `{"result": ...}` or
//! `{"error": "..."}`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::trace;

use super::config::StoreConfig;
use super::kv_store::{KvStore, StoreError};

#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

pub struct UpstashKvStore {
    client: Client,
    endpoint: String,
    token: String,
}

impl UpstashKvStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let endpoint = config
            .rest_url
            .clone()
            .context("store.rest_url is required for the upstash backend")?;
        let token = config
            .rest_token
            .clone()
            .context("store.rest_token is required for the upstash backend")?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create KV store HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    async fn command(&self, args: Vec<Value>) -> Result<Value, StoreError> {
        let name = args.first().and_then(serde_json::Value::as_str).unwrap_or("?");
        trace!("KV command: {}", name);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        decode_reply(status, &body)
    }
}

/// Turn an HTTP status and body into the command result.
pub(crate) fn decode_reply(status: u16, body: &str) -> Result<Value, StoreError> {
    let success = (200..300).contains(&status);
    match serde_json::from_str::<CommandReply>(body) {
        Ok(CommandReply {
            error: Some(error), ..
        }) => Err(StoreError::Backend(error)),
        Ok(reply) if success => Ok(reply.result),
        Err(e) if success => Err(StoreError::UnexpectedReply(e.to_string())),
        _ => Err(StoreError::Http {
            status,
            message: body.chars().take(200).collect(),
        }),
    }
}

fn into_optional_string(value: Value) -> Result<Option<String>, StoreError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text)),
        other => Err(StoreError::UnexpectedReply(format!(
            "expected string or null, got {other}"
        ))),
    }
}

#[async_trait]
impl KvStore for UpstashKvStore {
    fn name(&self) -> &'static str {
        "upstash"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        into_optional_string(self.command(vec![json!("GET"), json!(key)]).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut args = vec![json!("SET"), json!(key), json!(value)];
        if let Some(ttl) = ttl {
            args.push(json!("EX"));
            args.push(json!(ttl.as_secs().max(1)));
        }
        self.command(args).await.map(|_| ())
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut args = Vec::with_capacity(keys.len() + 1);
        args.push(json!("MGET"));
        args.extend(keys.iter().map(|key| json!(key)));

        match self.command(args).await? {
            Value::Array(values) if values.len() == keys.len() => {
                values.into_iter().map(into_optional_string).collect()
            }
            other => Err(StoreError::UnexpectedReply(format!(
                "MGET of {} keys returned {other}",
                keys.len()
            ))),
        }
    }

    async fn sadd(&self, set: &str, member: &str) -> Result<(), StoreError> {
        self.command(vec![json!("SADD"), json!(set), json!(member)])
            .await
            .map(|_| ())
    }

    async fn sismember(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        match self
            .command(vec![json!("SISMEMBER"), json!(set), json!(member)])
            .await?
        {
            Value::Number(flag) => Ok(flag.as_i64() == Some(1)),
            Value::Bool(flag) => Ok(flag),
            other => Err(StoreError::UnexpectedReply(format!(
                "SISMEMBER returned {other}"
            ))),
        }
    }
}
