//! HTTP transport for the `RunPod` GraphQL API.
//!
//! The transport moves one document to the API and hands back the decoded
//! JSON body. It does not look inside the body and never retries: some
//! verbs (create) are not idempotent, so retry policy belongs to the caller.

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::Credentials;
use crate::error::{HalldyllError, Result, TransportError};

/// `RunPod` API base URL.
pub const RUNPOD_API_URL: &str = "https://api.runpod.io/graphql";

/// Maximum number of characters of an error body kept in [`TransportError::Status`].
pub const MAX_ERROR_BODY_CHARS: usize = 500;

/// GraphQL request structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlRequest {
    /// Query or mutation text.
    pub query: &'static str,
    /// Variables referenced by the query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
}

/// Sends GraphQL documents to `RunPod`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request and returns the decoded response body.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on connection failure, timeout, a non-2xx
    /// status, or a body that is not JSON.
    async fn send(
        &self,
        request: &GraphQlRequest,
        credentials: &Credentials,
        timeout: Duration,
    ) -> std::result::Result<serde_json::Value, TransportError>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// HTTP client.
    client: Client,
    /// GraphQL endpoint.
    url: String,
}

impl HttpTransport {
    /// Creates a transport for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HalldyllError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &GraphQlRequest,
        credentials: &Credentials,
        timeout: Duration,
    ) -> std::result::Result<serde_json::Value, TransportError> {
        trace!("Executing GraphQL document: {}", request.query);

        let response = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", credentials.api_key()),
            )
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| classify(&e, timeout))?;

        let status = response.status();
        debug!(status = status.as_u16(), "RunPod responded");

        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(error = %e, "Failed to read error response body");
                    String::new()
                }
            };
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate_body(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        let body = response.bytes().await.map_err(|e| classify(&e, timeout))?;

        serde_json::from_slice(&body).map_err(|e| {
            TransportError::invalid_response(format!("Failed to parse response: {e}"))
        })
    }
}

/// Maps a `reqwest` failure onto the transport taxonomy.
fn classify(error: &reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout { timeout }
    } else {
        TransportError::network(format!("Request failed: {error}"))
    }
}

/// Keeps at most `max_chars` characters of `body`.
#[must_use]
pub fn truncate_body(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((cut, _)) => body[..cut].to_string(),
        None => body.to_string(),
    }
}
