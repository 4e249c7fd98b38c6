//! Retry orchestration with exponential backoff and jitter
//!
//! Retries a fallible async operation until it succeeds, the error is fatal, the caller's
//! predicate vetoes it, or the budget runs out.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use super::config::ClientConfig;
use super::error::{classify, ApiError, ApiResult, Failure};
use super::retry_formatter::RetryContext;
use crate::metrics::record_retry_backoff;

/// Default first backoff delay in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;

/// Default backoff ceiling in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 60_000;

/// Default growth factor between attempts.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Default symmetric jitter, as a fraction of the computed delay.
pub const DEFAULT_JITTER_FRACTION: f64 = 0.25;

/// Retry budget and backoff shape
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for computed delays
    pub max_delay: Duration,
    /// Growth factor per attempt
    pub backoff_multiplier: f64,
    /// Symmetric jitter, 0.25 means ±25%
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: super::config::DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter_fraction: DEFAULT_JITTER_FRACTION,
        }
    }
}

impl RetryPolicy {
    /// Default policy with the configured retry budget
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_retries: config.max_retries(),
            ..Self::default()
        }
    }

    /// Override the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Override base and max delay
    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Override jitter
    pub fn with_jitter(mut self, jitter_fraction: f64) -> Self {
        self.jitter_fraction = jitter_fraction;
        self
    }

    /// Total attempts including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Exponential delay for a zero-based attempt, before jitter
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay_ms = self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }

    /// Delay to wait after `err` on a zero-based `attempt`.
    ///
    /// Server-provided rate limit delays are used as given. Everything else gets
    /// exponential backoff with jitter.
    pub fn delay_for(&self, err: &ApiError, attempt: u32) -> Duration {
        if let Some(retry_after_ms) = err.retry_after_ms() {
            return Duration::from_millis(retry_after_ms);
        }
        let base = self.backoff_delay(attempt).as_millis() as f64;
        Duration::from_millis(apply_jitter(base, self.jitter_fraction))
    }
}

fn apply_jitter(delay_ms: f64, fraction: f64) -> u64 {
    if fraction <= 0.0 || delay_ms <= 0.0 {
        return delay_ms.max(0.0).round() as u64;
    }
    let factor: f64 = rand::thread_rng().gen_range(-1.0..=1.0);
    let jitter = delay_ms * fraction * factor;
    (delay_ms + jitter).max(0.0).round() as u64
}

/// Predicate that never vetoes a retry
pub fn always_retry(_: &ApiError) -> bool {
    true
}

/// Run `op` until it succeeds or retrying stops making sense.
///
/// `op` receives the zero-based attempt number. Its errors are classified on the spot.
/// Authentication and quota errors end the loop at once, as does a `false` from
/// `should_retry`. After `policy.max_retries` retries the last error is returned.
pub async fn with_retry<T, E, F, Fut, P>(
    operation: &str,
    policy: &RetryPolicy,
    should_retry: P,
    mut op: F,
) -> ApiResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Failure>,
    P: Fn(&ApiError) -> bool,
{
    let max_attempts = policy.max_attempts();
    let mut last_error: Option<ApiError> = None;
    let mut attempt = 0u32;

    loop {
        match op(attempt).await {
            Ok(value) => {
                if let Some(err) = &last_error {
                    let ctx = RetryContext::new(attempt + 1, max_attempts, err, Duration::ZERO, operation);
                    info!("{}", ctx.format_success());
                }
                return Ok(value);
            }
            Err(failure) => {
                let err = classify(failure);
                let exhausted = attempt >= policy.max_retries;

                if err.is_fatal() || exhausted || !should_retry(&err) {
                    let ctx = RetryContext::new(attempt + 1, max_attempts, &err, Duration::ZERO, operation);
                    warn!(
                        operation = operation,
                        error_kind = err.kind().as_str(),
                        status_code = err.status_code(),
                        "{}",
                        ctx.format_failure()
                    );
                    return Err(err);
                }

                let delay = policy.delay_for(&err, attempt);
                let ctx = RetryContext::new(attempt + 1, max_attempts, &err, delay, operation);
                warn!(
                    operation = operation,
                    error_kind = err.kind().as_str(),
                    backoff_ms = delay.as_millis() as u64,
                    "{}",
                    ctx.format_retry()
                );
                record_retry_backoff(operation, delay, attempt + 1);

                tokio::time::sleep(delay).await;
                last_error = Some(err);
                attempt += 1;
            }
        }
    }
}
