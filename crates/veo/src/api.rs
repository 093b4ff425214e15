//! REST API client for the Gemini video-generation endpoints.
//!
//! Wraps operation submission, operation polling, and video download
//! using [`reqwest`]. Failures are classified here, at the HTTP boundary,
//! so the driver can branch on [`VeoApiError::EntityNotFound`] instead of
//! inspecting message text.

use std::path::Path;

use async_trait::async_trait;

use crate::messages::{Operation, VideoRequest, ENTITY_NOT_FOUND_MESSAGE};

/// Production Gemini API base URL.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Header carrying the API key on every request.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Errors from the Veo REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum VeoApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The model or operation does not exist for the credential in use.
    #[error("Requested entity was not found: {0}")]
    EntityNotFound(String),

    /// The service returned a non-2xx status code.
    #[error("Veo API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response body was not the expected JSON.
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Writing a downloaded video failed.
    #[error("Failed to write video: {0}")]
    Io(#[from] std::io::Error),
}

/// The remote side of a generation: submit an operation, then look it up.
#[async_trait]
pub trait VideoService: Send + Sync {
    /// Submit a generation request and return the new operation.
    async fn create_operation(
        &self,
        api_key: &str,
        request: &VideoRequest,
    ) -> Result<Operation, VeoApiError>;

    /// Fetch the current state of an operation by name.
    async fn get_operation(&self, api_key: &str, name: &str) -> Result<Operation, VeoApiError>;
}

/// HTTP client for the Gemini API.
#[derive(Debug, Clone)]
pub struct VeoApi {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl VeoApi {
    /// Create a new API client.
    ///
    /// * `base_url` - API root, e.g. [`DEFAULT_API_BASE`].
    /// * `model`    - Veo model name, e.g. `veo-3.1-fast-generate-preview`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, model)
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for sharing timeouts and connection pools).
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// Download a finished video to `dest`.
    ///
    /// `url` is the decorated locator returned by the driver, so it already
    /// carries the key. Returns the number of bytes written.
    pub async fn download_video(&self, url: &str, dest: &Path) -> Result<u64, VeoApiError> {
        let response = self.client.get(url).send().await?;
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;

        tokio::fs::write(dest, &bytes).await?;

        tracing::info!(
            size_bytes = bytes.len(),
            "Downloaded video to {}",
            dest.display(),
        );
        Ok(bytes.len() as u64)
    }

    // ---- private helpers ----

    fn predict_url(&self) -> String {
        format!("{}/models/{}:predictLongRunning", self.base_url, self.model)
    }

    fn operation_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name.trim_start_matches('/'))
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a classified error carrying the
    /// body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, VeoApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(classify_failure(status.as_u16(), body));
        }
        Ok(response)
    }

    /// Parse a successful response body as an [`Operation`].
    async fn parse_operation(response: reqwest::Response) -> Result<Operation, VeoApiError> {
        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        Ok(crate::messages::parse_operation(&text)?)
    }
}

#[async_trait]
impl VideoService for VeoApi {
    async fn create_operation(
        &self,
        api_key: &str,
        request: &VideoRequest,
    ) -> Result<Operation, VeoApiError> {
        let response = self
            .client
            .post(self.predict_url())
            .header(API_KEY_HEADER, api_key)
            .json(&request.to_predict_body())
            .send()
            .await?;

        Self::parse_operation(response).await
    }

    async fn get_operation(&self, api_key: &str, name: &str) -> Result<Operation, VeoApiError> {
        let response = self
            .client
            .get(self.operation_url(name))
            .header(API_KEY_HEADER, api_key)
            .send()
            .await?;

        Self::parse_operation(response).await
    }
}

/// Map a non-2xx response onto a [`VeoApiError`].
///
/// Only bodies carrying the service's "Requested entity was not found"
/// message become [`VeoApiError::EntityNotFound`]. Any other failure,
/// including a 404 for an unknown model or a wrong API root, is a plain
/// [`VeoApiError::ApiError`].
pub fn classify_failure(status: u16, body: String) -> VeoApiError {
    if body.contains(ENTITY_NOT_FOUND_MESSAGE) {
        VeoApiError::EntityNotFound(body)
    } else {
        VeoApiError::ApiError { status, body }
    }
}
