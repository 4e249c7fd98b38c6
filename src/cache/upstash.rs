//! Upstash Redis over its REST API
//!
//! - `GET {url}/get/{key}` answers `{"result": "<value>"}` or `{"result": null}`
//! - `POST {url}/set/{key}?EX={ttl}` with the raw value as body answers `{"result": "OK"}`
//! - failures answer `{"error": "<message>"}`
//!
//! Both use `Authorization: Bearer {token}`.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{CacheError, CacheResult, CacheStore};

/// Environment variable holding the REST endpoint
pub const URL_ENV: &str = "UPSTASH_REDIS_REST_URL";

/// Environment variable holding the REST token
pub const TOKEN_ENV: &str = "UPSTASH_REDIS_REST_TOKEN";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct RestReply {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Upstash Redis store
#[derive(Clone)]
pub struct UpstashCacheStore {
    client: Client,
    base_url: Url,
    token: String,
}

impl std::fmt::Debug for UpstashCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstashCacheStore")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

impl UpstashCacheStore {
    /// Store for a REST endpoint and token
    ///
    /// # Errors
    /// An unparsable URL or an HTTP client that fails to build.
    pub fn new(url: &str, token: impl Into<String>) -> CacheResult<Self> {
        let base_url = Url::parse(url).map_err(|e| CacheError::NotConfigured(format!("invalid URL {url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(CacheError::NotConfigured(format!("invalid URL {url}")));
        }
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url,
            token: token.into(),
        })
    }

    /// Store from `UPSTASH_REDIS_REST_URL` and `UPSTASH_REDIS_REST_TOKEN`
    ///
    /// # Errors
    /// Either variable missing or empty, or [`UpstashCacheStore::new`] failing.
    pub fn from_env() -> CacheResult<Self> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| CacheError::NotConfigured(format!("{name} is not set")))
        };
        Self::new(&read(URL_ENV)?, read(TOKEN_ENV)?)
    }

    /// `{base}/{command}/{key}`, with the key percent-encoded as one segment
    fn command_url(&self, command: &str, key: &str) -> CacheResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CacheError::NotConfigured(format!("invalid URL {}", self.base_url)))?
            .pop_if_empty()
            .push(command)
            .push(key);
        Ok(url)
    }

    async fn read_reply(response: reqwest::Response) -> CacheResult<RestReply> {
        let status = response.status();
        let reply: RestReply = response.json().await?;
        if let Some(error) = reply.error {
            return Err(CacheError::Backend(format!("Upstash error ({status}): {error}")));
        }
        if !status.is_success() {
            return Err(CacheError::Backend(format!("Upstash returned {status}")));
        }
        Ok(reply)
    }
}

#[async_trait]
impl CacheStore for UpstashCacheStore {
    async fn get_data(&self, key: &str) -> CacheResult<Option<String>> {
        let url = self.command_url("get", key)?;
        debug!(url = %url, "Upstash GET");

        let response = self.client.get(url).bearer_auth(&self.token).send().await?;
        let reply = Self::read_reply(response).await?;

        match reply.result {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(value)) => Ok(Some(value)),
            Some(other) => Ok(Some(other.to_string())),
        }
    }

    async fn set_data(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()> {
        let mut url = self.command_url("set", key)?;
        url.query_pairs_mut().append_pair("EX", &ttl_seconds.to_string());
        debug!(url = %url, ttl_seconds, "Upstash SET");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .body(value.to_string())
            .send()
            .await?;
        Self::read_reply(response).await?;
        Ok(())
    }
}
