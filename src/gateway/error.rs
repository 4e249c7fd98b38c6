//! Error taxonomy and classification
//!
//! Every failure raised below the client façade passes through [`classify`] exactly once.
//! Code above it (retry loop, façade, CLI) only ever sees [`ApiError`].

use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

use super::rate_limit::MAX_BACKOFF_MS;
use super::transport::TransportError;

/// Fallback wait when a 429 carries no usable `retry-after` header.
pub const DEFAULT_RETRY_AFTER_MS: u64 = 30_000;

/// Classified API error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// Catch-all carrying the upstream status (0 when there was none)
    #[error("{message}")]
    Generic {
        /// Human readable message
        message: String,
        /// HTTP or task status code
        status_code: u32,
        /// Raw response body, when one was received
        response_body: Option<Value>,
    },

    /// Credentials rejected (401/403). Never retried.
    #[error("{message}")]
    Authentication {
        /// Human readable message
        message: String,
        /// HTTP status code
        status_code: u32,
        /// Raw response body
        response_body: Option<Value>,
    },

    /// Rate limit hit, either upstream (429) or by the local limiter
    #[error("{message}")]
    RateLimit {
        /// Human readable message
        message: String,
        /// HTTP status code
        status_code: u32,
        /// How long to wait before the next attempt
        retry_after_ms: u64,
        /// Raw response body
        response_body: Option<Value>,
    },

    /// No response at all: refused, aborted, timed out or dropped
    #[error("{message}")]
    Connection {
        /// Human readable message
        message: String,
        /// Raw response body
        response_body: Option<Value>,
    },

    /// Account balance exhausted (402). Never retried.
    #[error("{message}")]
    QuotaExceeded {
        /// Human readable message
        message: String,
        /// HTTP status code
        status_code: u32,
        /// Raw response body
        response_body: Option<Value>,
    },
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Discriminant of [`ApiError`] without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// [`ApiError::Generic`]
    Generic,
    /// [`ApiError::Authentication`]
    Authentication,
    /// [`ApiError::RateLimit`]
    RateLimit,
    /// [`ApiError::Connection`]
    Connection,
    /// [`ApiError::QuotaExceeded`]
    QuotaExceeded,
}

impl ErrorKind {
    /// Short label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Generic => "generic",
            ErrorKind::Authentication => "authentication",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Connection => "connection",
            ErrorKind::QuotaExceeded => "quota_exceeded",
        }
    }
}

impl ApiError {
    /// Generic error without a response body
    pub fn generic(message: impl Into<String>, status_code: u32) -> Self {
        ApiError::Generic {
            message: message.into(),
            status_code,
            response_body: None,
        }
    }

    /// Rate limit error raised locally, before any request was sent
    pub fn local_rate_limit(retry_after_ms: u64) -> Self {
        ApiError::RateLimit {
            message: format!("Rate limit exceeded locally, retry in {retry_after_ms}ms"),
            status_code: 429,
            retry_after_ms,
            response_body: None,
        }
    }

    /// Attach a raw response body
    pub fn with_body(mut self, body: Value) -> Self {
        match &mut self {
            ApiError::Generic { response_body, .. }
            | ApiError::Authentication { response_body, .. }
            | ApiError::RateLimit { response_body, .. }
            | ApiError::Connection { response_body, .. }
            | ApiError::QuotaExceeded { response_body, .. } => *response_body = Some(body),
        }
        self
    }

    /// Error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Generic { .. } => ErrorKind::Generic,
            ApiError::Authentication { .. } => ErrorKind::Authentication,
            ApiError::RateLimit { .. } => ErrorKind::RateLimit,
            ApiError::Connection { .. } => ErrorKind::Connection,
            ApiError::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
        }
    }

    /// Message as surfaced to the caller
    pub fn message(&self) -> &str {
        match self {
            ApiError::Generic { message, .. }
            | ApiError::Authentication { message, .. }
            | ApiError::RateLimit { message, .. }
            | ApiError::Connection { message, .. }
            | ApiError::QuotaExceeded { message, .. } => message,
        }
    }

    /// HTTP or task status code; 0 when no response was received
    pub fn status_code(&self) -> u32 {
        match self {
            ApiError::Generic { status_code, .. }
            | ApiError::Authentication { status_code, .. }
            | ApiError::RateLimit { status_code, .. }
            | ApiError::QuotaExceeded { status_code, .. } => *status_code,
            ApiError::Connection { .. } => 0,
        }
    }

    /// Raw response body, if any
    pub fn response_body(&self) -> Option<&Value> {
        match self {
            ApiError::Generic { response_body, .. }
            | ApiError::Authentication { response_body, .. }
            | ApiError::RateLimit { response_body, .. }
            | ApiError::Connection { response_body, .. }
            | ApiError::QuotaExceeded { response_body, .. } => response_body.as_ref(),
        }
    }

    /// Server-provided wait for rate limit errors
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ApiError::RateLimit { retry_after_ms, .. } => Some(*retry_after_ms),
            _ => None,
        }
    }

    /// Errors that no amount of retrying will fix
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ApiError::Authentication { .. } | ApiError::QuotaExceeded { .. }
        )
    }

    /// Errors worth retrying: rate limits, connection failures and upstream 5xx
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::RateLimit { .. } | ApiError::Connection { .. } => true,
            ApiError::Generic { status_code, .. } => (500..600).contains(status_code),
            ApiError::Authentication { .. } | ApiError::QuotaExceeded { .. } => false,
        }
    }

    /// What the user should do about it
    pub fn user_hint(&self) -> &'static str {
        match self {
            ApiError::Authentication { .. } => "reconnect credentials",
            ApiError::QuotaExceeded { .. } => "insufficient balance, top up the account",
            ApiError::RateLimit { .. } => "slow down and try again later",
            ApiError::Connection { .. } => "check network connectivity",
            ApiError::Generic { .. } => "check request parameters",
        }
    }
}

/// Network-level failure codes that never produced an HTTP response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkCode {
    /// ECONNREFUSED
    ConnectionRefused,
    /// ECONNABORTED
    ConnectionAborted,
    /// ETIMEDOUT
    TimedOut,
    /// ERR_NETWORK
    Network,
}

impl NetworkCode {
    /// Conventional code string
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkCode::ConnectionRefused => "ECONNREFUSED",
            NetworkCode::ConnectionAborted => "ECONNABORTED",
            NetworkCode::TimedOut => "ETIMEDOUT",
            NetworkCode::Network => "ERR_NETWORK",
        }
    }
}

impl FromStr for NetworkCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ECONNREFUSED" => Ok(NetworkCode::ConnectionRefused),
            "ECONNABORTED" => Ok(NetworkCode::ConnectionAborted),
            "ETIMEDOUT" => Ok(NetworkCode::TimedOut),
            "ERR_NETWORK" => Ok(NetworkCode::Network),
            _ => Err(format!("Unknown network code: {s}")),
        }
    }
}

impl std::fmt::Display for NetworkCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw, unclassified failure
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// Already classified; passes through [`classify`] untouched
    Classified(ApiError),
    /// A response arrived with a non-success HTTP status
    Status {
        /// HTTP status
        status: u16,
        /// Transport message
        message: String,
        /// Response headers, names lower-cased
        headers: HashMap<String, String>,
        /// Response body, JSON when it parsed, a string otherwise
        body: Option<Value>,
    },
    /// No response; the transport reported a network code
    Network {
        /// Failure code
        code: NetworkCode,
        /// Transport message
        message: String,
    },
    /// Anything else
    Message(String),
}

impl Failure {
    /// HTTP status failure with the conventional message
    pub fn status(status: u16, headers: HashMap<String, String>, body: Option<Value>) -> Self {
        Failure::Status {
            status,
            message: format!("Request failed with status code {status}"),
            headers,
            body,
        }
    }

    /// Network failure from a code string such as `ECONNREFUSED`.
    /// Unknown codes degrade to [`Failure::Message`].
    pub fn network(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code.parse::<NetworkCode>() {
            Ok(code) => Failure::Network { code, message },
            Err(_) => Failure::Message(message),
        }
    }
}

impl From<ApiError> for Failure {
    fn from(err: ApiError) -> Self {
        Failure::Classified(err)
    }
}

impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Self {
        match err.code {
            Some(code) => Failure::Network {
                code,
                message: err.message,
            },
            None => Failure::Message(err.message),
        }
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Failure::Message(message)
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Failure::Message(message.to_string())
    }
}

impl From<serde_json::Error> for Failure {
    fn from(err: serde_json::Error) -> Self {
        Failure::Message(format!("Failed to deserialize response: {err}"))
    }
}

/// Map any failure onto the error taxonomy.
///
/// Total and idempotent: an already classified error comes back unchanged.
pub fn classify(failure: impl Into<Failure>) -> ApiError {
    match failure.into() {
        Failure::Classified(err) => err,
        Failure::Status {
            status,
            message,
            headers,
            body,
        } => {
            let message = if message.is_empty() {
                format!("HTTP {status}")
            } else {
                message
            };
            let status_code = u32::from(status);

            match status {
                401 | 403 => ApiError::Authentication {
                    message,
                    status_code,
                    response_body: body,
                },
                429 => ApiError::RateLimit {
                    message,
                    status_code,
                    retry_after_ms: parse_retry_after(&headers),
                    response_body: body,
                },
                402 => ApiError::QuotaExceeded {
                    message,
                    status_code,
                    response_body: body,
                },
                _ => ApiError::Generic {
                    message,
                    status_code,
                    response_body: body,
                },
            }
        }
        Failure::Network { message, .. } => ApiError::Connection {
            message: if message.is_empty() {
                "Network error".to_string()
            } else {
                message
            },
            response_body: None,
        },
        Failure::Message(message) => ApiError::generic(message, 0),
    }
}

/// `retry-after` in seconds, converted to milliseconds.
///
/// Only the delta-seconds form is understood; HTTP dates and garbage fall back to the default.
/// Waits longer than the limiter's maximum backoff are capped to it.
fn parse_retry_after(headers: &HashMap<String, String>) -> u64 {
    headers
        .get("retry-after")
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| ((secs * 1000.0).round() as u64).min(MAX_BACKOFF_MS))
        .unwrap_or(DEFAULT_RETRY_AFTER_MS)
}
