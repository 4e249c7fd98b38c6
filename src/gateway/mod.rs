//! DataForSEO API access layer
//!
//! - [`config`] - Validated client configuration
//! - [`error`] - Error taxonomy and failure classification
//! - [`transport`] / [`http`] - HTTP seam and authenticated JSON calls
//! - [`rate_limit`] - Admission control
//! - [`retry`] - Retry orchestration
//! - [`client`] - The façade tying it all together

/// Client façade
pub mod client;
/// Client configuration
pub mod config;
/// Endpoint paths and operations
pub mod endpoints;
/// Error taxonomy
pub mod error;
/// Keyword suggestion filters
pub mod filters;
/// Authenticated JSON requests
pub mod http;
/// Sliding-window rate limiter
pub mod rate_limit;
/// Retry with backoff
pub mod retry;
/// Retry log formatting
pub mod retry_formatter;
/// HTTP transport seam
pub mod transport;

pub use client::{DataForSeoClient, DataForSeoClientBuilder, ANY_LANGUAGE};
pub use config::{create_config, ClientConfig, ConfigError, ConfigInput};
pub use error::{classify, ApiError, ApiResult, ErrorKind};
pub use filters::KeywordFilters;
pub use rate_limit::{Admission, RateLimiter};
pub use retry::RetryPolicy;
