// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gemini embedding adapter.

use std::time::Duration;

use async_trait::async_trait;
use maddy_config::model::GeminiConfig;
use maddy_core::error::MaddyError;
use maddy_core::traits::{EmbeddingAdapter, PluginAdapter};
use maddy_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
use tracing::debug;

use crate::client::GeminiClient;
use crate::resolve_api_key;
use crate::types::{ApiContent, ApiPart, EmbedContentRequest};

/// Embeds text through `models/{model}:embedContent`, one call per text.
pub struct GeminiEmbedder {
    client: GeminiClient,
    model: String,
}

impl GeminiEmbedder {
    /// Creates an embedder from the `[gemini]` config section.
    pub fn new(config: &GeminiConfig) -> Result<Self, MaddyError> {
        let api_key = resolve_api_key(config.api_key.as_deref(), |var| std::env::var(var).ok())?;
        let client = GeminiClient::new(
            &api_key,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self::with_client(client, config.embedding_model.clone()))
    }

    pub fn with_client(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, MaddyError> {
        let request = EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: ApiContent {
                role: None,
                parts: vec![ApiPart::Text {
                    text: text.to_string(),
                }],
            },
        };
        let response = self.client.embed_content(&self.model, &request).await?;
        if response.embedding.values.is_empty() {
            return Err(MaddyError::Completion {
                message: "embedding response carried no values".into(),
                source: None,
            });
        }
        Ok(response.embedding.values)
    }
}

#[async_trait]
impl PluginAdapter for GeminiEmbedder {
    fn name(&self) -> &str {
        "gemini-embedding"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MaddyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MaddyError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for GeminiEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MaddyError> {
        let mut embeddings = Vec::with_capacity(input.texts.len());
        for text in &input.texts {
            embeddings.push(self.embed_one(text).await?);
        }
        let dimensions = embeddings.first().map_or(0, Vec::len);
        debug!(count = embeddings.len(), dimensions, "embeddings generated");
        Ok(EmbeddingOutput {
            embeddings,
            dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedder(base_url: &str) -> GeminiEmbedder {
        let client = GeminiClient::new("k", base_url, Duration::from_secs(5)).unwrap();
        GeminiEmbedder::with_client(client, "embedding-001")
    }

    #[tokio::test]
    async fn embeds_each_text_with_qualified_model_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/embedding-001:embedContent"))
            .and(header("x-goog-api-key", "k"))
            .and(body_json(serde_json::json!({
                "model": "models/embedding-001",
                "content": {"parts": [{"text": "hello"}]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": {"values": [0.1, 0.2, 0.3]}
            })))
            .expect(2)
            .mount(&server)
            .await;

        let output = embedder(&server.uri())
            .embed(EmbeddingInput {
                texts: vec!["hello".into(), "hello".into()],
            })
            .await
            .unwrap();

        assert_eq!(output.embeddings.len(), 2);
        assert_eq!(output.dimensions, 3);
    }

    #[tokio::test]
    async fn empty_embedding_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": {"values": []}
            })))
            .mount(&server)
            .await;

        let err = embedder(&server.uri())
            .embed(EmbeddingInput {
                texts: vec!["x".into()],
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no values"));
    }

    #[tokio::test]
    async fn api_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {"code": 403, "message": "Permission denied", "status": "PERMISSION_DENIED"}
            })))
            .mount(&server)
            .await;

        let err = embedder(&server.uri())
            .embed(EmbeddingInput {
                texts: vec!["x".into()],
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("PERMISSION_DENIED"), "got: {err}");
    }
}
