//! Retry message formatting
//!
//! Keeps retry, recovery and final-failure log lines consistent across operations,
//! and attaches remediation hints to the final failure.

use std::time::Duration;

use super::endpoints::TASK_ERROR_THRESHOLD;
use super::error::ApiError;

/// Classification of retry errors for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// HTTP 429 or local limiter refusal
    RateLimit,
    /// No response: refused, aborted, timed out
    ConnectionFailed,
    /// HTTP 5xx
    ServerError(u32),
    /// Task-level status 40000 and above inside a 200 response
    TaskError(u32),
    /// HTTP 401/403
    AuthFailed(u32),
    /// HTTP 402
    QuotaExceeded,
    /// Other HTTP 4xx
    ClientError(u32),
    /// No status at all (decode failures and the like)
    Unknown,
}

impl RetryErrorType {
    /// Classify a failed attempt for messaging purposes
    pub fn from_error(err: &ApiError) -> Self {
        match err {
            ApiError::RateLimit { .. } => Self::RateLimit,
            ApiError::Connection { .. } => Self::ConnectionFailed,
            ApiError::Authentication { status_code, .. } => Self::AuthFailed(*status_code),
            ApiError::QuotaExceeded { .. } => Self::QuotaExceeded,
            ApiError::Generic { status_code, .. } => match *status_code {
                0 => Self::Unknown,
                code if code >= TASK_ERROR_THRESHOLD => Self::TaskError(code),
                code @ 500..=599 => Self::ServerError(code),
                code => Self::ClientError(code),
            },
        }
    }

    /// User-friendly description string used inside retry log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate limit exceeded",
            Self::ConnectionFailed => "connection failed",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::TaskError(_) => "task rejected",
            Self::AuthFailed(code) => match code {
                401 => "authentication failed (401)",
                403 => "authentication failed (403)",
                _ => "authentication failed",
            },
            Self::QuotaExceeded => "insufficient balance (402)",
            Self::ClientError(code) => match code {
                404 => "endpoint not found",
                _ => "client error",
            },
            Self::Unknown => "unexpected error",
        }
    }

    /// Suggested remediation presented with actionable guidance after failures.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::RateLimit => "Lower --rate-limit-per-minute or wait before retrying",
            Self::ConnectionFailed => "Verify internet connectivity and DNS resolution",
            Self::ServerError(_) => "DataForSEO may be experiencing issues, try again later",
            Self::TaskError(_) => "Check keyword, location and language parameters",
            Self::AuthFailed(_) => "Reconnect credentials: check DATAFORSEO_LOGIN and DATAFORSEO_PASSWORD",
            Self::QuotaExceeded => "Top up the DataForSEO account balance",
            Self::ClientError(_) => "Review request parameters against the DataForSEO API docs",
            Self::Unknown => "Re-run with RUST_LOG=keyword_data_gateway=debug for details",
        }
    }
}

/// Context for formatting retry messages.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Current attempt number (1-based)
    pub attempt: u32,
    /// Maximum number of attempts configured (initial attempt plus retries)
    pub max_attempts: u32,
    /// Type of error that triggered retry
    pub error_type: RetryErrorType,
    /// Backoff duration until next attempt
    pub backoff_duration: Duration,
    /// Operation being performed (e.g., "keyword-suggestions")
    pub operation: String,
    /// Original error message for details
    pub error_message: String,
}

impl RetryContext {
    /// Context for a failed attempt
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        err: &ApiError,
        backoff_duration: Duration,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type: RetryErrorType::from_error(err),
            backoff_duration,
            operation: operation.into(),
            error_message: err.message().to_string(),
        }
    }

    /// Format standardized retry message with attempt counters and context.
    pub fn format_retry(&self) -> String {
        format!(
            "Retrying {} (attempt {}/{}) after {} - waiting {:.1} seconds...",
            self.operation_display(),
            self.attempt,
            self.max_attempts,
            self.error_type.description(),
            self.backoff_duration.as_secs_f64()
        )
    }

    /// Format retry success message when a previous attempt eventually works.
    pub fn format_success(&self) -> String {
        format!(
            "Retry attempt {}/{} for {} succeeded",
            self.attempt,
            self.max_attempts,
            self.operation_display()
        )
    }

    /// Format final failure summary with actionable suggestions.
    pub fn format_failure(&self) -> String {
        let mut lines = vec![
            format!(
                "[FAILED] {} failed after {} attempt(s)",
                self.operation_display(),
                self.attempt
            ),
            format!("  Last error: {}", self.error_message),
            format!("  Cause: {}", self.error_type.description()),
            "  Suggestions:".to_string(),
        ];

        for suggestion in self.format_suggestions() {
            lines.push(format!("    - {suggestion}"));
        }

        lines.join("\n")
    }

    /// Derive suggestions tailored to the current retry context.
    pub fn format_suggestions(&self) -> Vec<String> {
        let mut suggestions = vec![self.error_type.suggestion().to_string()];
        if self.attempt >= self.max_attempts {
            suggestions.push(format!(
                "Try increasing --max-retries (current: {})",
                self.max_attempts.saturating_sub(1)
            ));
        }
        suggestions
    }

    fn operation_display(&self) -> &str {
        if self.operation.is_empty() {
            "request"
        } else {
            &self.operation
        }
    }
}
