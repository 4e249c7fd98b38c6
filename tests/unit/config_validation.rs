//! Tests for client configuration validation

use keyword_data_gateway::gateway::config::{
    DEFAULT_CACHING_DURATION_DAYS, DEFAULT_MAX_RETRIES, DEFAULT_RATE_LIMIT_PER_MINUTE, DEFAULT_TIMEOUT_MS,
};
use keyword_data_gateway::gateway::endpoints::{PRODUCTION_BASE_URL, SANDBOX_BASE_URL};
use keyword_data_gateway::gateway::{create_config, ConfigInput};
use std::time::Duration;

#[test]
fn test_defaults_applied() {
    let config = create_config(ConfigInput::with_credentials("me", "pw")).unwrap();

    assert!(!config.is_sandbox());
    assert!(!config.enable_caching());
    assert_eq!(config.caching_duration_days(), DEFAULT_CACHING_DURATION_DAYS);
    assert_eq!(config.timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
    assert_eq!(config.max_retries(), DEFAULT_MAX_RETRIES);
    assert_eq!(config.rate_limit_per_minute(), DEFAULT_RATE_LIMIT_PER_MINUTE);
    assert_eq!(config.base_url(), PRODUCTION_BASE_URL);
    assert_eq!(config.cache_ttl_seconds(), 30 * 86_400);
}

#[test]
fn test_sandbox_host() {
    let config = create_config(ConfigInput {
        is_sandbox: Some(true),
        ..ConfigInput::with_credentials("me", "pw")
    })
    .unwrap();
    assert_eq!(config.base_url(), SANDBOX_BASE_URL);
}

#[test]
fn test_every_violation_reported() {
    let err = create_config(ConfigInput {
        username: Some(String::new()),
        password: None,
        timeout: Some(0),
        max_retries: Some(-2),
        rate_limit_per_minute: Some(-1),
        caching_duration_days: Some(0),
        ..ConfigInput::default()
    })
    .unwrap_err();

    let fields: Vec<&str> = err.issues().iter().map(|issue| issue.field).collect();
    assert_eq!(
        fields,
        vec!["username", "password", "cachingDurationDays", "timeout", "maxRetries", "rateLimitPerMinute"]
    );
    assert!(err.to_string().starts_with("Invalid DataForSEO config:"));
}

#[test]
fn test_zero_retries_allowed() {
    let config = create_config(ConfigInput {
        max_retries: Some(0),
        ..ConfigInput::with_credentials("me", "pw")
    })
    .unwrap();
    assert_eq!(config.max_retries(), 0);
}

#[test]
fn test_camel_case_input() {
    let input: ConfigInput = serde_json::from_str(
        r#"{"username": "me", "password": "pw", "isSandbox": true, "rateLimitPerMinute": 120}"#,
    )
    .unwrap();
    let config = create_config(input).unwrap();
    assert!(config.is_sandbox());
    assert_eq!(config.rate_limit_per_minute(), 120);
}
