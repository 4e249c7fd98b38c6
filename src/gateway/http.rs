//! Authenticated JSON requests against the DataForSEO API
//!
//! Wraps an [`HttpTransport`] with:
//! - Basic authentication
//! - URL building from the configured base URL
//! - Non-2xx responses turned into [`Failure::Status`]
//! - JSON body decoding
//!
//! Retries and rate limiting happen one level up, in the client façade.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::endpoints::endpoint_url;
use super::error::Failure;
use super::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::metrics::generate_correlation_id;

/// Authenticated JSON client for one API host
#[derive(Clone)]
pub struct DataForSeoHttp {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    authorization: String,
}

impl DataForSeoHttp {
    /// Create a client for `base_url` authenticating as `username`
    ///
    /// # Arguments
    /// * `transport` - Shared transport (Arc for cheap cloning)
    /// * `base_url` - API root, e.g. "<https://api.dataforseo.com/v3>"
    /// * `username` / `password` - Basic auth credentials
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: impl Into<String>,
        username: &str,
        password: &str,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            authorization: basic_auth(username, password),
        }
    }

    /// API root this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and decode the JSON body
    pub async fn get_json(&self, path: &str) -> Result<Value, Failure> {
        let request = HttpRequest::get(endpoint_url(&self.base_url, path));
        self.execute(request).await
    }

    /// POST `body` to `path` and decode the JSON body
    pub async fn post_json(&self, path: &str, body: Value) -> Result<Value, Failure> {
        let request = HttpRequest::post(endpoint_url(&self.base_url, path)).with_body(body);
        self.execute(request).await
    }

    async fn execute(&self, request: HttpRequest) -> Result<Value, Failure> {
        let request = request
            .with_header("Authorization", self.authorization.clone())
            .with_header("Content-Type", "application/json");

        let correlation_id = generate_correlation_id();
        debug!(
            correlation_id = %correlation_id,
            method = ?request.method,
            endpoint = %request.url,
            "Sending request"
        );

        let response = self.transport.send(request).await.map_err(|e| {
            debug!(correlation_id = %correlation_id, error = %e.message, "Transport failure");
            e
        })?;
        debug!(correlation_id = %correlation_id, status_code = response.status, "Response received");
        decode_response(response)
    }
}

impl std::fmt::Debug for DataForSeoHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataForSeoHttp")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// `Basic base64(username:password)`
pub fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

fn decode_response(response: HttpResponse) -> Result<Value, Failure> {
    if !response.is_success() {
        let body = if response.body.is_empty() {
            None
        } else {
            Some(
                response
                    .json_body()
                    .unwrap_or_else(|_| Value::String(response.body.clone())),
            )
        };
        return Err(Failure::status(response.status, response.headers, body));
    }

    Ok(response.json_body()?)
}
