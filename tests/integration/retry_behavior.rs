//! Integration tests for retry orchestration

use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use keyword_data_gateway::gateway::error::Failure;
use keyword_data_gateway::gateway::retry::{always_retry, with_retry};
use keyword_data_gateway::gateway::{ApiError, ErrorKind, RetryPolicy};

fn policy(max_retries: u32, base: Duration) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_retries(max_retries)
        .with_delays(base, Duration::from_secs(60))
        .with_jitter(0.0)
}

fn status(code: u16) -> Failure {
    Failure::status(code, HashMap::new(), None)
}

#[tokio::test(start_paused = true)]
async fn test_exponential_backoff_timing() {
    let calls = Arc::new(AtomicU32::new(0));
    let started = tokio::time::Instant::now();

    let result = with_retry("keywords_overview", &policy(3, Duration::from_secs(1)), always_retry, |_| {
        let calls = calls.clone();
        async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 3 {
                Err(status(502))
            } else {
                Ok("done")
            }
        }
    })
    .await;

    assert_eq!(result.unwrap(), "done");
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    // 1s + 2s + 4s
    assert_eq!(started.elapsed(), Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn test_server_retry_after_overrides_backoff() {
    let calls = Arc::new(AtomicU32::new(0));
    let started = tokio::time::Instant::now();

    let result = with_retry("keyword_suggestions", &policy(2, Duration::from_secs(1)), always_retry, |_| {
        let calls = calls.clone();
        async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                let headers = HashMap::from([("retry-after".to_string(), "12".to_string())]);
                Err(Failure::status(429, headers, Some(json!({"status_code": 40202}))))
            } else {
                Ok(1)
            }
        }
    })
    .await;

    assert_eq!(result.unwrap(), 1);
    assert_eq!(started.elapsed(), Duration::from_secs(12));
}

#[tokio::test(start_paused = true)]
async fn test_huge_server_retry_after_is_capped() {
    let calls = Arc::new(AtomicU32::new(0));
    let started = tokio::time::Instant::now();

    let result = with_retry("keyword_suggestions", &policy(1, Duration::from_secs(1)), always_retry, |_| {
        let calls = calls.clone();
        async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                let headers = HashMap::from([("retry-after".to_string(), "1e300".to_string())]);
                Err(Failure::status(429, headers, None))
            } else {
                Ok(1)
            }
        }
    })
    .await;

    assert_eq!(result.unwrap(), 1);
    assert_eq!(started.elapsed(), Duration::from_secs(300));
}

#[tokio::test(start_paused = true)]
async fn test_budget_exhaustion_returns_last_error() {
    let calls = Arc::new(AtomicU32::new(0));

    let err = with_retry("account_balance", &policy(2, Duration::from_millis(10)), always_retry, |attempt| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(status(500 + attempt as u16))
        }
    })
    .await
    .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(err.status_code(), 502);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_errors_stop_immediately() {
    for code in [401u16, 403, 402] {
        let calls = Arc::new(AtomicU32::new(0));
        let err = with_retry("account_balance", &policy(5, Duration::from_millis(10)), always_retry, |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(status(code))
            }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1, "status {code}");
        assert!(err.is_fatal());
    }
}

#[tokio::test(start_paused = true)]
async fn test_predicate_vetoes_client_errors() {
    let calls = Arc::new(AtomicU32::new(0));
    let err = with_retry(
        "keyword_suggestions",
        &policy(5, Duration::from_millis(10)),
        ApiError::is_transient,
        |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(status(400))
            }
        },
    )
    .await
    .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(err.kind(), ErrorKind::Generic);
    assert_eq!(err.status_code(), 400);
}

#[tokio::test(start_paused = true)]
async fn test_network_failures_are_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let result = with_retry(
        "keywords_for_domain",
        &policy(2, Duration::from_millis(10)),
        ApiError::is_transient,
        |_| {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(Failure::network("ETIMEDOUT", "timed out"))
                } else {
                    Ok("ok")
                }
            }
        },
    )
    .await;

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
