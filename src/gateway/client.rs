//! Client façade for the DataForSEO keyword endpoints
//!
//! Every public operation runs the same pipeline:
//!
//! 1. cache lookup, when a cache is active (a hit returns at once)
//! 2. rate limiter admission (refusal is a [`ApiError::RateLimit`] without a request)
//! 3. the HTTP call, retried on transient errors
//! 4. per-attempt metrics
//! 5. transformation into typed records
//! 6. cache write for fully successful tasks

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::config::ClientConfig;
use super::endpoints::Operation;
use super::error::{classify, ApiError, ApiResult, ErrorKind, Failure};
use super::http::DataForSeoHttp;
use super::rate_limit::{Admission, RateLimiter};
use super::retry::{with_retry, RetryPolicy};
use super::transport::{HttpTransport, ReqwestTransport};
use crate::cache::{CacheKey, CacheLayer, CacheStore};
use crate::metrics::{ApiMetrics, MetricsTracker};
use crate::transform::{
    extract_balance, transform_domain_keywords, transform_keyword_overview, transform_keyword_suggestions,
    DomainKeyword, KeywordOverview, KeywordSuggestion, TransformResult,
};

/// Language value meaning "all languages" for keyword suggestions
pub const ANY_LANGUAGE: &str = "any";

/// Results worth keeping in the cache
trait Cacheable {
    fn is_cacheable(&self) -> bool;
}

impl<T> Cacheable for TransformResult<T> {
    fn is_cacheable(&self) -> bool {
        self.is_ok()
    }
}

impl Cacheable for Option<f64> {
    fn is_cacheable(&self) -> bool {
        false
    }
}

/// Resilient DataForSEO client
#[derive(Debug)]
pub struct DataForSeoClient {
    config: ClientConfig,
    http: DataForSeoHttp,
    rate_limiter: Arc<RateLimiter>,
    metrics: Arc<MetricsTracker>,
    cache: CacheLayer,
    retry_policy: RetryPolicy,
}

/// Builder for [`DataForSeoClient`] with replaceable collaborators
pub struct DataForSeoClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    rate_limiter: Option<Arc<RateLimiter>>,
    metrics: Option<Arc<MetricsTracker>>,
    cache_store: Option<Arc<dyn CacheStore>>,
    base_url: Option<String>,
    retry_policy: Option<RetryPolicy>,
}

impl DataForSeoClientBuilder {
    /// Send requests through `transport` instead of reqwest
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Share a rate limiter, e.g. between clients using the same account
    pub fn rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    /// Share a metrics tracker
    pub fn metrics(mut self, metrics: Arc<MetricsTracker>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Cache results in `store` (only effective when caching is enabled outside sandbox)
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// Talk to another API root, e.g. a mock server
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Override the retry policy derived from the configuration
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Build the client
    ///
    /// # Errors
    /// Connection error when the default HTTP transport cannot be created.
    pub fn build(self) -> ApiResult<DataForSeoClient> {
        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.config.timeout()).map_err(classify)?),
        };

        let base_url = self
            .base_url
            .unwrap_or_else(|| self.config.base_url().to_string());
        let http = DataForSeoHttp::new(transport, base_url, self.config.username(), self.config.password());

        let rate_limiter = self
            .rate_limiter
            .unwrap_or_else(|| Arc::new(RateLimiter::new(self.config.rate_limit_per_minute())));
        let metrics = self.metrics.unwrap_or_default();
        let cache = CacheLayer::new(&self.config, self.cache_store);
        let retry_policy = self
            .retry_policy
            .unwrap_or_else(|| RetryPolicy::from_config(&self.config));

        info!(
            base_url = http.base_url(),
            sandbox = self.config.is_sandbox(),
            caching = cache.is_enabled(),
            rate_limit_per_minute = self.config.rate_limit_per_minute(),
            max_retries = retry_policy.max_retries,
            "DataForSEO client ready"
        );

        Ok(DataForSeoClient {
            config: self.config,
            http,
            rate_limiter,
            metrics,
            cache,
            retry_policy,
        })
    }
}

impl DataForSeoClient {
    /// Client with the production stack: reqwest transport, own limiter and metrics, no cache
    ///
    /// # Errors
    /// Connection error when the HTTP transport cannot be created.
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        Self::builder(config).build()
    }

    /// Builder for injecting collaborators
    pub fn builder(config: ClientConfig) -> DataForSeoClientBuilder {
        DataForSeoClientBuilder {
            config,
            transport: None,
            rate_limiter: None,
            metrics: None,
            cache_store: None,
            base_url: None,
            retry_policy: None,
        }
    }

    /// Validated configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The admission limiter
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Session metrics so far
    pub fn get_metrics(&self) -> ApiMetrics {
        self.metrics.metrics()
    }

    /// Zero the session metrics
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Remaining account balance in USD, `None` when the account reports none
    #[instrument(skip(self))]
    pub async fn get_account_balance(&self) -> ApiResult<Option<f64>> {
        let operation = Operation::AccountBalance;
        self.execute(operation, None, || self.http.get_json(operation.path()), extract_balance)
            .await
    }

    /// Keyword ideas around a seed keyword, ordered by search volume.
    ///
    /// `language_code` of `"any"` searches all languages. `filters` is an upstream filter
    /// array, see [`KeywordFilters`](super::filters::KeywordFilters).
    #[instrument(skip(self, filters))]
    pub async fn get_keyword_suggestions(
        &self,
        keyword: &str,
        location_code: u32,
        language_code: &str,
        filters: &[Value],
        limit: u32,
        offset: u32,
    ) -> ApiResult<TransformResult<Vec<KeywordSuggestion>>> {
        require_non_empty("keyword", keyword)?;
        let operation = Operation::KeywordSuggestions;

        let mut task = json!({
            "keyword": keyword,
            "location_code": location_code,
            "limit": limit,
            "offset": offset,
            "order_by": ["keyword_info.search_volume,desc"],
        });
        if language_code != ANY_LANGUAGE {
            task["language_code"] = json!(language_code);
        }
        if !filters.is_empty() {
            task["filters"] = json!(filters);
        }

        let key = self.cache_key(operation, &task);
        let payload = json!([task]);
        self.execute(
            operation,
            key,
            || self.http.post_json(operation.path(), payload.clone()),
            transform_keyword_suggestions,
        )
        .await
    }

    /// Metrics for a list of keywords
    #[instrument(skip(self, keywords), fields(keywords = keywords.len()))]
    pub async fn get_keywords_overview(
        &self,
        keywords: &[String],
        location_code: u32,
        language_code: &str,
        include_clickstream: bool,
    ) -> ApiResult<TransformResult<Vec<KeywordOverview>>> {
        if keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(ApiError::generic("keywords must contain at least one keyword", 0));
        }
        let operation = Operation::KeywordsOverview;

        let task = json!({
            "keywords": keywords,
            "location_code": location_code,
            "language_code": language_code,
            "include_clickstream_data": include_clickstream,
        });

        let key = self.cache_key(operation, &task);
        let payload = json!([task]);
        self.execute(
            operation,
            key,
            || self.http.post_json(operation.path(), payload.clone()),
            transform_keyword_overview,
        )
        .await
    }

    /// Keywords relevant to a domain, ordered by search volume.
    ///
    /// Bare hostnames become `https://{host}/`. The endpoint returns its whole list, so
    /// `limit` and `offset` page through it locally; `total_results` stays the upstream count.
    #[instrument(skip(self))]
    pub async fn get_keywords_for_domain(
        &self,
        target: &str,
        location_code: u32,
        language_code: &str,
        limit: u32,
        offset: u32,
    ) -> ApiResult<TransformResult<Vec<DomainKeyword>>> {
        require_non_empty("target", target)?;
        let operation = Operation::KeywordsForDomain;

        let task = json!({
            "target": normalize_target(target),
            "location_code": location_code,
            "language_code": language_code,
            "sort_by": "search_volume",
            "search_partners": false,
            "include_adult_keywords": false,
        });

        let key = self.cache_key(operation, &task);
        let payload = json!([task]);
        let mut result = self
            .execute(
                operation,
                key,
                || self.http.post_json(operation.path(), payload.clone()),
                transform_domain_keywords,
            )
            .await?;
        result.data = page(result.data, limit, offset);
        Ok(result)
    }

    fn cache_key(&self, operation: Operation, params: &Value) -> Option<CacheKey> {
        if !self.cache.is_enabled() {
            return None;
        }
        match CacheKey::new(operation.name(), params) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(operation = %operation, error = %e, "Could not build cache key, skipping cache");
                None
            }
        }
    }

    /// Refuse with a rate limit error when the limiter says no
    fn admit(&self, operation: Operation) -> ApiResult<()> {
        match self.rate_limiter.can_proceed() {
            Admission::Allowed => Ok(()),
            Admission::Blocked { retry_after_ms } => {
                self.metrics.record_rate_limit_hit();
                self.rate_limiter.record_violation();
                warn!(
                    operation = %operation,
                    retry_after_ms,
                    "Request refused by local rate limiter"
                );
                Err(ApiError::local_rate_limit(retry_after_ms))
            }
        }
    }

    async fn execute<R, S, Fut, X>(
        &self,
        operation: Operation,
        cache_key: Option<CacheKey>,
        send: S,
        transform: X,
    ) -> ApiResult<R>
    where
        R: Serialize + DeserializeOwned + Cacheable,
        S: Fn() -> Fut,
        Fut: Future<Output = Result<Value, Failure>>,
        X: FnOnce(&Value) -> ApiResult<R>,
    {
        let Some(key) = cache_key else {
            return self.fetch(operation, send, transform).await;
        };

        self.cache
            .with_cache(
                &key,
                || self.fetch(operation, send, transform),
                |result: &R| {
                    let cacheable = result.is_cacheable();
                    if !cacheable {
                        debug!(operation = %operation, "Result not cacheable");
                    }
                    cacheable
                },
            )
            .await
    }

    /// Admission, retried call, metrics and transformation, without the cache
    async fn fetch<R, S, Fut, X>(&self, operation: Operation, send: S, transform: X) -> ApiResult<R>
    where
        S: Fn() -> Fut,
        Fut: Future<Output = Result<Value, Failure>>,
        X: FnOnce(&Value) -> ApiResult<R>,
    {
        self.admit(operation)?;

        let (raw, elapsed) = with_retry(
            operation.name(),
            &self.retry_policy,
            ApiError::is_transient,
            |attempt| {
                let request = send();
                async move {
                    let started = Instant::now();
                    match request.await {
                        Ok(raw) => Ok((raw, started.elapsed())),
                        Err(failure) => {
                            let err = classify(failure);
                            self.record_failed_attempt(operation, attempt, &err, started);
                            Err(err)
                        }
                    }
                }
            },
        )
        .await?;

        self.rate_limiter.record_success();

        let cost = if self.config.is_sandbox() {
            0.0
        } else {
            raw.get("cost").and_then(Value::as_f64).unwrap_or_default()
        };

        let result = match transform(&raw) {
            Ok(result) => {
                self.metrics
                    .record_operation_request(operation.name(), elapsed, cost, true);
                result
            }
            Err(err) => {
                self.metrics
                    .record_operation_request(operation.name(), elapsed, cost, false);
                warn!(
                    operation = %operation,
                    status_code = err.status_code(),
                    error = %err,
                    "Response rejected"
                );
                return Err(err);
            }
        };

        info!(
            operation = %operation,
            duration_ms = elapsed.as_millis() as u64,
            cost,
            "Request completed"
        );

        Ok(result)
    }

    fn record_failed_attempt(&self, operation: Operation, attempt: u32, err: &ApiError, started: Instant) {
        self.metrics
            .record_operation_request(operation.name(), started.elapsed(), 0.0, false);

        if err.kind() == ErrorKind::RateLimit {
            self.metrics.record_rate_limit_hit();
            self.rate_limiter.record_violation();
        }

        debug!(
            operation = %operation,
            attempt,
            error_kind = err.kind().as_str(),
            status_code = err.status_code(),
            "Attempt failed"
        );
    }
}

fn require_non_empty(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::generic(format!("{field} is required"), 0));
    }
    Ok(())
}

/// `https://{target}/` unless the target already carries a scheme
pub fn normalize_target(target: &str) -> String {
    let target = target.trim();
    if target.starts_with("http") {
        target.to_string()
    } else {
        format!("https://{target}/")
    }
}

fn page<T>(items: Vec<T>, limit: u32, offset: u32) -> Vec<T> {
    items
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}
