// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Gemini REST API.
//!
//! Provides [`GeminiClient`] which handles request construction,
//! authentication, per-request timeouts, and transient error retry.

use std::time::Duration;

use maddy_core::MaddyError;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{
    ApiErrorResponse, EmbedContentRequest, EmbedContentResponse, GenerateContentRequest,
    GenerateContentResponse,
};

/// HTTP client for Gemini API communication.
///
/// Manages the API key header, connection pooling, and retry logic
/// for transient errors (429, 500, 503).
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
}

impl GeminiClient {
    /// Creates a new client.
    ///
    /// # Arguments
    /// * `api_key` - Google AI API key, sent as `x-goog-api-key`
    /// * `base_url` - API root, e.g. `https://generativelanguage.googleapis.com/v1beta`
    /// * `timeout` - Whole-request timeout
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, MaddyError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| MaddyError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| MaddyError::Completion {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            max_retries: 1,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Calls `models/{model}:generateContent`.
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, MaddyError> {
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        self.post_json(&url, request).await
    }

    /// Calls `models/{model}:embedContent`.
    pub async fn embed_content(
        &self,
        model: &str,
        request: &EmbedContentRequest,
    ) -> Result<EmbedContentResponse, MaddyError> {
        let url = format!("{}/models/{model}:embedContent", self.base_url);
        self.post_json(&url, request).await
    }

    /// Posts a JSON body and decodes a JSON response.
    ///
    /// On transient errors (429, 500, 503), retries once after a 1-second delay.
    async fn post_json<Req, Resp>(&self, url: &str, body: &Req) -> Result<Resp, MaddyError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying Gemini request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(url)
                .json(body)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;

            let status = response.status();
            debug!(status = %status, attempt, "Gemini response received");

            if status.is_success() {
                let text = response.text().await.map_err(|e| self.transport_error(e))?;
                return serde_json::from_str(&text).map_err(|e| MaddyError::Completion {
                    message: format!("failed to parse API response: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            let text = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %text, "transient error, will retry");
                last_error = Some(api_error(status, &text));
                continue;
            }

            // Non-transient error or exhausted retries.
            return Err(api_error(status, &text));
        }

        Err(last_error.unwrap_or_else(|| MaddyError::Completion {
            message: "request failed after retries".into(),
            source: None,
        }))
    }

    fn transport_error(&self, e: reqwest::Error) -> MaddyError {
        if e.is_timeout() {
            MaddyError::Timeout {
                duration: self.timeout,
            }
        } else {
            MaddyError::Completion {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            }
        }
    }
}

/// Builds an error from a non-2xx response, preferring the API's own message.
fn api_error(status: reqwest::StatusCode, body: &str) -> MaddyError {
    let message = match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => format!(
            "Gemini API error ({} {}): {}",
            api_err.error.code, api_err.error.status, api_err.error.message
        ),
        Err(_) => format!("API returned {status}: {body}"),
    };
    MaddyError::Completion {
        message,
        source: None,
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}
