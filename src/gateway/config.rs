//! Client configuration and validation
//!
//! A [`ClientConfig`] can only be produced by [`create_config`], which applies defaults
//! and reports every invalid field at once.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use super::endpoints::{PRODUCTION_BASE_URL, SANDBOX_BASE_URL};

/// Default cache entry lifetime in days.
pub const DEFAULT_CACHING_DURATION_DAYS: u32 = 30;

/// Default request timeout in milliseconds.
/// 60 seconds covers the slower Labs endpoints, which can take tens of seconds on broad seeds.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default admissions per rolling minute.
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 30;

const SECONDS_PER_DAY: u64 = 86_400;

/// Partial client configuration as supplied by a caller, a config file or the CLI.
///
/// Numeric fields are signed so out-of-range input reaches validation instead of
/// failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInput {
    /// API login
    pub username: Option<String>,
    /// API password
    pub password: Option<String>,
    /// Route requests to the sandbox host
    pub is_sandbox: Option<bool>,
    /// Enable the cache-aside layer
    pub enable_caching: Option<bool>,
    /// Cache entry lifetime in days
    pub caching_duration_days: Option<i64>,
    /// Request timeout in milliseconds
    pub timeout: Option<i64>,
    /// Retries after the initial attempt
    pub max_retries: Option<i64>,
    /// Admissions per rolling minute
    pub rate_limit_per_minute: Option<i64>,
}

impl ConfigInput {
    /// Input carrying only credentials, everything else defaulted
    pub fn with_credentials(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }
}

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Field name as it appears in [`ConfigInput`] (camelCase)
    pub field: &'static str,
    /// What is wrong with it
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Aggregated validation failure listing every violated field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid DataForSEO config: {}", join_issues(.issues))]
pub struct ConfigError {
    issues: Vec<ConfigIssue>,
}

impl ConfigError {
    /// All rejected fields, in declaration order
    pub fn issues(&self) -> &[ConfigIssue] {
        &self.issues
    }

    /// Whether `field` is among the rejected fields
    pub fn has_issue(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validated, immutable client configuration
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    username: String,
    password: String,
    is_sandbox: bool,
    enable_caching: bool,
    caching_duration_days: u32,
    timeout_ms: u64,
    max_retries: u32,
    rate_limit_per_minute: u32,
}

impl ClientConfig {
    /// API login
    pub fn username(&self) -> &str {
        &self.username
    }

    /// API password
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Whether requests go to the sandbox host
    pub fn is_sandbox(&self) -> bool {
        self.is_sandbox
    }

    /// Whether the cache-aside layer is requested
    pub fn enable_caching(&self) -> bool {
        self.enable_caching
    }

    /// Cache entry lifetime in days
    pub fn caching_duration_days(&self) -> u32 {
        self.caching_duration_days
    }

    /// Cache entry lifetime in seconds, the unit cache stores expect
    pub fn cache_ttl_seconds(&self) -> u64 {
        u64::from(self.caching_duration_days) * SECONDS_PER_DAY
    }

    /// Per-request deadline enforced by the transport
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Retries after the initial attempt
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Admissions per rolling minute
    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    /// Base URL for the configured environment
    pub fn base_url(&self) -> &'static str {
        if self.is_sandbox {
            SANDBOX_BASE_URL
        } else {
            PRODUCTION_BASE_URL
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("is_sandbox", &self.is_sandbox)
            .field("enable_caching", &self.enable_caching)
            .field("caching_duration_days", &self.caching_duration_days)
            .field("timeout_ms", &self.timeout_ms)
            .field("max_retries", &self.max_retries)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .finish()
    }
}

/// Validate `input` and fill in defaults.
///
/// # Errors
/// Returns [`ConfigError`] listing every field that failed validation.
pub fn create_config(input: ConfigInput) -> Result<ClientConfig, ConfigError> {
    let mut issues = Vec::new();

    let username = required_string(&mut issues, "username", input.username);
    let password = required_string(&mut issues, "password", input.password);
    let caching_duration_days: u32 = positive(
        &mut issues,
        "cachingDurationDays",
        input.caching_duration_days,
        i64::from(DEFAULT_CACHING_DURATION_DAYS),
    );
    let timeout_ms: u64 = positive(
        &mut issues,
        "timeout",
        input.timeout,
        DEFAULT_TIMEOUT_MS as i64,
    );
    let max_retries: u32 = non_negative(
        &mut issues,
        "maxRetries",
        input.max_retries,
        i64::from(DEFAULT_MAX_RETRIES),
    );
    let rate_limit_per_minute: u32 = positive(
        &mut issues,
        "rateLimitPerMinute",
        input.rate_limit_per_minute,
        i64::from(DEFAULT_RATE_LIMIT_PER_MINUTE),
    );

    if !issues.is_empty() {
        return Err(ConfigError { issues });
    }

    Ok(ClientConfig {
        username,
        password,
        is_sandbox: input.is_sandbox.unwrap_or(false),
        enable_caching: input.enable_caching.unwrap_or(false),
        caching_duration_days,
        timeout_ms,
        max_retries,
        rate_limit_per_minute,
    })
}

fn required_string(
    issues: &mut Vec<ConfigIssue>,
    field: &'static str,
    value: Option<String>,
) -> String {
    match value {
        Some(value) if !value.is_empty() => value,
        _ => {
            issues.push(ConfigIssue {
                field,
                message: format!("{field} is required"),
            });
            String::new()
        }
    }
}

fn positive<T>(issues: &mut Vec<ConfigIssue>, field: &'static str, value: Option<i64>, default: i64) -> T
where
    T: TryFrom<i64> + Default,
{
    let value = value.unwrap_or(default);
    if value <= 0 {
        issues.push(ConfigIssue {
            field,
            message: format!("must be a positive integer, got {value}"),
        });
        return T::default();
    }
    fits(issues, field, value)
}

fn non_negative<T>(issues: &mut Vec<ConfigIssue>, field: &'static str, value: Option<i64>, default: i64) -> T
where
    T: TryFrom<i64> + Default,
{
    let value = value.unwrap_or(default);
    if value < 0 {
        issues.push(ConfigIssue {
            field,
            message: format!("must be zero or greater, got {value}"),
        });
        return T::default();
    }
    fits(issues, field, value)
}

/// `value` in the field's storage type, or an issue when it does not fit
fn fits<T>(issues: &mut Vec<ConfigIssue>, field: &'static str, value: i64) -> T
where
    T: TryFrom<i64> + Default,
{
    T::try_from(value).unwrap_or_else(|_| {
        issues.push(ConfigIssue {
            field,
            message: format!("is too large, got {value}"),
        });
        T::default()
    })
}
