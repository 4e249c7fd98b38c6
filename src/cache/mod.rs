//! Cache-aside layer for API results
//!
//! Results are cached per request fingerprint. The fingerprint is the operation name plus
//! the request parameters as canonical JSON, base64-encoded into the key, so a key can be
//! decoded back to the request that produced it.
//!
//! The cache never fails a request: store errors are logged and treated as misses, and
//! failed writes are dropped.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::gateway::config::ClientConfig;
use crate::metrics::record_cache_lookup;

/// In-process store
pub mod memory;
/// Upstash Redis REST store
pub mod upstash;

pub use memory::MemoryCacheStore;
pub use upstash::UpstashCacheStore;

/// Cache store errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Store could not be reached or answered badly
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// Value or key could not be encoded or decoded
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key is not valid base64 or not UTF-8 underneath
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// Store is not configured
    #[error("Cache not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        CacheError::Backend(err.to_string())
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// String key-value store with expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Value under `key`, `None` when absent or expired
    async fn get_data(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store `value` under `key` for `ttl_seconds`
    async fn set_data(&self, key: &str, value: &str, ttl_seconds: u64) -> CacheResult<()>;
}

/// Reversible request fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: String,
    encoded: String,
}

impl CacheKey {
    /// Key for `operation` called with `params`
    ///
    /// # Errors
    /// `params` that do not serialize to JSON.
    pub fn new(operation: &str, params: &impl Serialize) -> CacheResult<Self> {
        let canonical = canonicalize(serde_json::to_value(params)?);
        let fingerprint = format!("{operation}-{canonical}");
        Ok(Self {
            operation: operation.to_string(),
            encoded: STANDARD.encode(fingerprint),
        })
    }

    /// Operation the key belongs to
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Encoded key as stored
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Fingerprint behind an encoded key
    ///
    /// # Errors
    /// Input that is not base64 of UTF-8 text.
    pub fn decode(encoded: &str) -> CacheResult<String> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| CacheError::InvalidKey(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| CacheError::InvalidKey(e.to_string()))
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encoded)
    }
}

/// Objects rebuilt with sorted keys, recursively
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Cache-aside wrapper around a store
#[derive(Clone)]
pub struct CacheLayer {
    store: Option<Arc<dyn CacheStore>>,
    ttl_seconds: u64,
}

impl std::fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLayer")
            .field("enabled", &self.is_enabled())
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl CacheLayer {
    /// Layer for a client configuration.
    ///
    /// Caching is off unless enabled in `config`, outside sandbox mode, with a store given.
    pub fn new(config: &ClientConfig, store: Option<Arc<dyn CacheStore>>) -> Self {
        let active = config.enable_caching() && !config.is_sandbox();
        Self {
            store: store.filter(|_| active),
            ttl_seconds: config.cache_ttl_seconds(),
        }
    }

    /// Layer that never caches
    pub fn disabled() -> Self {
        Self {
            store: None,
            ttl_seconds: 0,
        }
    }

    /// Whether lookups and writes reach a store
    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Entry lifetime in seconds
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Cached value under `key`; errors and undecodable entries count as misses
    pub async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let store = self.store.as_ref()?;

        let raw = match store.get_data(key.as_str()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                record_cache_lookup(key.operation(), "miss");
                debug!(operation = key.operation(), "Cache miss");
                return None;
            }
            Err(e) => {
                record_cache_lookup(key.operation(), "error");
                warn!(operation = key.operation(), error = %e, "Cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                record_cache_lookup(key.operation(), "hit");
                debug!(operation = key.operation(), "Cache hit");
                Some(value)
            }
            Err(e) => {
                record_cache_lookup(key.operation(), "error");
                warn!(operation = key.operation(), error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Write `value` under `key`; failures are logged and dropped
    pub async fn store<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let Some(store) = self.store.as_ref() else {
            return;
        };

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(operation = key.operation(), error = %e, "Cache value not serializable");
                return;
            }
        };

        match store.set_data(key.as_str(), &raw, self.ttl_seconds).await {
            Ok(()) => debug!(
                operation = key.operation(),
                ttl_seconds = self.ttl_seconds,
                "Cached result"
            ),
            Err(e) => warn!(operation = key.operation(), error = %e, "Cache write failed"),
        }
    }

    /// Serve `key` from the cache, or run `compute` and cache its value when
    /// `should_cache` accepts it.
    ///
    /// Errors from `compute` pass through untouched.
    pub async fn with_cache<T, E, F, Fut, P>(&self, key: &CacheKey, compute: F, should_cache: P) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: FnOnce(&T) -> bool,
    {
        if let Some(cached) = self.lookup(key).await {
            return Ok(cached);
        }

        let value = compute().await?;
        if self.is_enabled() && should_cache(&value) {
            self.store(key, &value).await;
        }
        Ok(value)
    }
}
