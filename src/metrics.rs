//! Session metrics and Prometheus emission
//!
//! [`MetricsTracker`] keeps the per-client counters returned by
//! [`DataForSeoClient::get_metrics`](crate::gateway::DataForSeoClient::get_metrics).
//! Every recording is mirrored to the `metrics` facade, so a Prometheus scrape
//! endpoint installed with [`init_metrics`] sees the same traffic.
//!
//! ## Exported series
//!
//! - `dataforseo_requests_total{operation, outcome}`
//! - `dataforseo_request_duration_seconds{operation}`
//! - `dataforseo_credits_used_total`
//! - `dataforseo_rate_limit_hits_total`
//! - `dataforseo_retries_total{operation}` and `dataforseo_retry_backoff_seconds{operation}`
//! - `dataforseo_cache_lookups_total{operation, result}`

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Global exporter initialization flag
static METRICS_INITIALIZED: Lazy<RwLock<bool>> = Lazy::new(|| RwLock::new(false));

/// Sequence behind request correlation IDs
static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Initialize the Prometheus exporter.
///
/// Idempotent: later calls return immediately.
///
/// # Arguments
/// * `addr` - Socket address for the scrape endpoint (e.g., "0.0.0.0:9090")
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "dataforseo_requests_total",
        Unit::Count,
        "Request attempts sent to the DataForSEO API"
    );
    describe_histogram!(
        "dataforseo_request_duration_seconds",
        Unit::Seconds,
        "Duration of request attempts"
    );
    describe_counter!(
        "dataforseo_credits_used_total",
        Unit::Count,
        "API credits charged, in micro-dollars"
    );
    describe_counter!(
        "dataforseo_rate_limit_hits_total",
        Unit::Count,
        "Rate limit hits, upstream 429s and local refusals"
    );
    describe_counter!(
        "dataforseo_retries_total",
        Unit::Count,
        "Retry attempts scheduled"
    );
    describe_histogram!(
        "dataforseo_retry_backoff_seconds",
        Unit::Seconds,
        "Backoff waited before a retry"
    );
    describe_counter!(
        "dataforseo_cache_lookups_total",
        Unit::Count,
        "Cache lookups by result"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Check if the exporter is installed
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}

/// New correlation ID for request tracing, e.g. `req-0000002a`
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{:08x}", id)
}

/// Record a scheduled retry and its backoff
pub fn record_retry_backoff(operation: &str, duration: Duration, attempt: u32) {
    counter!("dataforseo_retries_total", "operation" => operation.to_string()).increment(1);
    histogram!("dataforseo_retry_backoff_seconds", "operation" => operation.to_string())
        .record(duration.as_secs_f64());

    debug!(
        operation = operation,
        attempt = attempt,
        backoff_ms = duration.as_millis() as u64,
        "Retry backoff recorded"
    );
}

/// Record a cache lookup outcome ("hit", "miss" or "error")
pub fn record_cache_lookup(operation: &str, result: &'static str) {
    counter!(
        "dataforseo_cache_lookups_total",
        "operation" => operation.to_string(),
        "result" => result,
    )
    .increment(1);
}

/// Snapshot of session counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiMetrics {
    /// Request attempts, successful or not
    pub requests_made: u64,
    /// Credits charged by the API (fractional)
    pub credits_used: f64,
    /// Attempts that produced usable data
    pub successful_requests: u64,
    /// Attempts that failed
    pub failed_requests: u64,
    /// Rate limit hits, local or upstream
    pub rate_limit_hits: u64,
    /// Mean attempt duration, rounded; 0 before the first request
    pub avg_response_time_ms: u64,
    /// When counting started (creation or last reset)
    pub tracking_since: DateTime<Utc>,
}

#[derive(Debug)]
struct Counters {
    requests_made: u64,
    credits_used: f64,
    successful_requests: u64,
    failed_requests: u64,
    rate_limit_hits: u64,
    total_response_time_ms: u128,
    tracking_since: DateTime<Utc>,
}

impl Counters {
    fn new() -> Self {
        Self {
            requests_made: 0,
            credits_used: 0.0,
            successful_requests: 0,
            failed_requests: 0,
            rate_limit_hits: 0,
            total_response_time_ms: 0,
            tracking_since: Utc::now(),
        }
    }
}

/// Per-client session counters
#[derive(Debug)]
pub struct MetricsTracker {
    label: String,
    counters: Mutex<Counters>,
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsTracker {
    /// Tracker with the default metrics label
    pub fn new() -> Self {
        Self::labeled("client")
    }

    /// Tracker whose Prometheus series carry `operation = label` when no operation applies
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            counters: Mutex::new(Counters::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record one completed request attempt
    pub fn record_request(&self, duration: Duration, cost: f64, success: bool) {
        self.record_operation_request(&self.label, duration, cost, success);
    }

    /// Record one completed request attempt for a named operation
    pub fn record_operation_request(&self, operation: &str, duration: Duration, cost: f64, success: bool) {
        {
            let mut counters = self.lock();
            counters.requests_made += 1;
            counters.credits_used += cost;
            counters.total_response_time_ms += duration.as_millis();
            if success {
                counters.successful_requests += 1;
            } else {
                counters.failed_requests += 1;
            }
        }

        let outcome = if success { "success" } else { "failure" };
        counter!(
            "dataforseo_requests_total",
            "operation" => operation.to_string(),
            "outcome" => outcome,
        )
        .increment(1);
        histogram!("dataforseo_request_duration_seconds", "operation" => operation.to_string())
            .record(duration.as_secs_f64());
        if cost > 0.0 {
            counter!("dataforseo_credits_used_total").increment((cost * 1_000_000.0).round() as u64);
        }

        debug!(
            operation = operation,
            duration_ms = duration.as_millis() as u64,
            cost = cost,
            success = success,
            "Request recorded"
        );
    }

    /// Record a rate limit hit
    pub fn record_rate_limit_hit(&self) {
        self.lock().rate_limit_hits += 1;
        counter!("dataforseo_rate_limit_hits_total").increment(1);
    }

    /// Current counters
    pub fn metrics(&self) -> ApiMetrics {
        let counters = self.lock();
        let avg_response_time_ms = if counters.requests_made == 0 {
            0
        } else {
            (counters.total_response_time_ms as f64 / counters.requests_made as f64).round() as u64
        };

        ApiMetrics {
            requests_made: counters.requests_made,
            credits_used: counters.credits_used,
            successful_requests: counters.successful_requests,
            failed_requests: counters.failed_requests,
            rate_limit_hits: counters.rate_limit_hits,
            avg_response_time_ms,
            tracking_since: counters.tracking_since,
        }
    }

    /// Zero every counter
    pub fn reset(&self) {
        *self.lock() = Counters::new();
    }
}
