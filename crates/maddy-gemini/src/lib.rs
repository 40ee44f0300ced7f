// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini adapters for Maddy.
//!
//! This crate implements [`ProviderAdapter`] for `generateContent`, covering
//! both text and vision requests, and [`EmbeddingAdapter`] for `embedContent`.

pub mod client;
pub mod embedder;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use maddy_config::model::GeminiConfig;
use maddy_core::error::MaddyError;
use maddy_core::traits::{PluginAdapter, ProviderAdapter};
use maddy_core::types::{
    AdapterType, ContentBlock, HealthStatus, ProviderMessage, ProviderRequest, ProviderResponse,
    Role, TokenUsage,
};
use tracing::{debug, info};

pub use crate::client::GeminiClient;
pub use crate::embedder::GeminiEmbedder;
use crate::types::{
    ApiContent, ApiPart, GenerateContentRequest, GenerationConfig, InlineData, SystemInstruction,
};

/// Environment variables consulted, in order, when the config carries no key.
const API_KEY_VARS: &[&str] = &["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Gemini provider implementing [`ProviderAdapter`].
///
/// Requests that carry image parts are sent to the vision model, all others
/// to the text model.
pub struct GeminiProvider {
    client: GeminiClient,
    model: String,
    vision_model: String,
}

impl GeminiProvider {
    /// Creates a provider from the `[gemini]` config section.
    ///
    /// # API Key Resolution
    /// 1. `gemini.api_key` if set and non-empty
    /// 2. `GOOGLE_API_KEY` environment variable
    /// 3. `GEMINI_API_KEY` environment variable
    /// 4. Returns a config error
    pub fn new(config: &GeminiConfig) -> Result<Self, MaddyError> {
        let api_key = resolve_api_key(config.api_key.as_deref(), |var| std::env::var(var).ok())?;
        let client = GeminiClient::new(
            &api_key,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;

        info!(
            model = %config.model,
            vision_model = %config.vision_model,
            "Gemini provider initialized"
        );

        Ok(Self::with_client(
            client,
            config.model.clone(),
            config.vision_model.clone(),
        ))
    }

    /// Creates a provider around an existing client.
    pub fn with_client(client: GeminiClient, model: String, vision_model: String) -> Self {
        Self {
            client,
            model,
            vision_model,
        }
    }

    /// The model a request will be routed to.
    pub fn model_for(&self, request: &ProviderRequest) -> &str {
        if request.image_count() > 0 {
            &self.vision_model
        } else {
            &self.model
        }
    }

    /// Converts a [`ProviderRequest`] into the `generateContent` wire shape.
    fn to_api_request(request: &ProviderRequest) -> GenerateContentRequest {
        let system_instruction = (!request.system_prompt.is_empty()).then(|| SystemInstruction {
            parts: vec![ApiPart::Text {
                text: request.system_prompt.clone(),
            }],
        });

        GenerateContentRequest {
            system_instruction,
            contents: request.messages.iter().map(convert_message).collect(),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        }
    }
}

#[async_trait]
impl PluginAdapter for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, MaddyError> {
        // Avoid spending tokens on health checks.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MaddyError> {
        debug!("Gemini provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for GeminiProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, MaddyError> {
        let model = self.model_for(&request).to_string();
        let api_request = Self::to_api_request(&request);
        debug!(
            model = %model,
            messages = api_request.contents.len(),
            images = request.image_count(),
            "sending generateContent request"
        );

        let response = self.client.generate_content(&model, &api_request).await?;

        Ok(ProviderResponse {
            content: response.text(),
            finish_reason: response.finish_reason(),
            usage: response.usage_metadata.map(|u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            }),
            model: response.model_version.unwrap_or(model),
        })
    }
}

/// Resolves the API key from config, then the environment via `lookup`.
pub fn resolve_api_key(
    config_key: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, MaddyError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.to_string());
    }

    API_KEY_VARS
        .iter()
        .find_map(|var| lookup(var).filter(|v| !v.is_empty()))
        .ok_or_else(|| {
            MaddyError::Config(
                "Gemini API key not found. Set gemini.api_key in config or the GOOGLE_API_KEY or GEMINI_API_KEY environment variable.".into(),
            )
        })
}

/// Converts a core message to a Gemini turn. Assistant turns use the "model" role.
fn convert_message(message: &ProviderMessage) -> ApiContent {
    let role = match message.role {
        Role::Human => "user",
        Role::Assistant => "model",
    };
    ApiContent {
        role: Some(role.to_string()),
        parts: message.content.iter().map(convert_block).collect(),
    }
}

fn convert_block(block: &ContentBlock) -> ApiPart {
    match block {
        ContentBlock::Text { text } => ApiPart::Text { text: text.clone() },
        ContentBlock::Image { mime_type, data } => ApiPart::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.clone(),
                data: BASE64.encode(data),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request_with(messages: Vec<ProviderMessage>) -> ProviderRequest {
        ProviderRequest {
            system_prompt: "You are MaddyBot.".into(),
            messages,
            max_tokens: 1024,
            temperature: 0.7,
        }
    }

    fn provider(base_url: &str) -> GeminiProvider {
        let client = GeminiClient::new("k", base_url, Duration::from_secs(5)).unwrap();
        GeminiProvider::with_client(client, "text-model".into(), "vision-model".into())
    }

    #[test]
    fn resolve_api_key_from_config() {
        let key = resolve_api_key(Some("cfg-key"), |_| Some("env-key".into())).unwrap();
        assert_eq!(key, "cfg-key");
    }

    #[test]
    fn resolve_api_key_prefers_google_over_gemini_var() {
        let env = HashMap::from([
            ("GOOGLE_API_KEY", "google"),
            ("GEMINI_API_KEY", "gemini"),
        ]);
        let key = resolve_api_key(Some(""), |v| env.get(v).map(|s| s.to_string())).unwrap();
        assert_eq!(key, "google");
    }

    #[test]
    fn resolve_api_key_falls_back_to_gemini_var() {
        let key = resolve_api_key(None, |v| (v == "GEMINI_API_KEY").then(|| "gemini".into())).unwrap();
        assert_eq!(key, "gemini");
    }

    #[test]
    fn resolve_api_key_missing_is_config_error() {
        let err = resolve_api_key(None, |_| None).unwrap_err();
        assert!(matches!(err, MaddyError::Config(_)));
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn assistant_turns_use_model_role() {
        let req = request_with(vec![
            ProviderMessage::text(Role::Human, "hi"),
            ProviderMessage::text(Role::Assistant, "hello"),
            ProviderMessage::text(Role::Human, "how are you?"),
        ]);
        let api = GeminiProvider::to_api_request(&req);
        let roles: Vec<_> = api.contents.iter().map(|c| c.role.clone().unwrap()).collect();
        assert_eq!(roles, ["user", "model", "user"]);
        assert!(api.system_instruction.is_some());
    }

    #[test]
    fn empty_system_prompt_is_omitted() {
        let mut req = request_with(vec![ProviderMessage::text(Role::Human, "hi")]);
        req.system_prompt.clear();
        assert!(GeminiProvider::to_api_request(&req).system_instruction.is_none());
    }

    #[test]
    fn image_blocks_become_base64_inline_data() {
        let req = request_with(vec![ProviderMessage {
            role: Role::Human,
            content: vec![
                ContentBlock::Text {
                    text: "what is this?".into(),
                },
                ContentBlock::Image {
                    mime_type: "image/png".into(),
                    data: vec![0x89, b'P', b'N', b'G'],
                },
            ],
        }]);
        let api = GeminiProvider::to_api_request(&req);
        match &api.contents[0].parts[1] {
            ApiPart::InlineData { inline_data } => {
                assert_eq!(inline_data.mime_type, "image/png");
                assert_eq!(inline_data.data, "iVBORw==");
            }
            other => panic!("expected inline data, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn complete_routes_text_to_text_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/text-model:generateContent"))
            .and(body_partial_json(serde_json::json!({
                "systemInstruction": {"parts": [{"text": "You are MaddyBot."}]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "4"}]}, "finishReason": "STOP"}],
                "usageMetadata": {"promptTokenCount": 20, "candidatesTokenCount": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider(&server.uri())
            .complete(request_with(vec![ProviderMessage::text(Role::Human, "2+2?")]))
            .await
            .unwrap();

        assert_eq!(response.content, "4");
        assert_eq!(response.model, "text-model");
        assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(
            response.usage,
            Some(TokenUsage {
                input_tokens: 20,
                output_tokens: 1
            })
        );
    }

    #[tokio::test]
    async fn complete_routes_images_to_vision_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/vision-model:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "A cat."}]}}],
                "modelVersion": "vision-model-001"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let req = request_with(vec![ProviderMessage {
            role: Role::Human,
            content: vec![ContentBlock::Image {
                mime_type: "image/jpeg".into(),
                data: vec![1, 2, 3],
            }],
        }]);
        let response = provider(&server.uri()).complete(req).await.unwrap();
        assert_eq!(response.content, "A cat.");
        assert_eq!(response.model, "vision-model-001");
        assert!(response.usage.is_none());
    }

    #[test]
    fn plugin_adapter_metadata() {
        let provider = provider("http://localhost:1");
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.adapter_type(), AdapterType::Provider);
    }
}
