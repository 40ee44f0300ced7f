// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock completion provider for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with scripted replies,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use maddy_core::MaddyError;
use maddy_core::traits::{PluginAdapter, ProviderAdapter};
use maddy_core::types::{AdapterType, HealthStatus, ProviderRequest, ProviderResponse, TokenUsage};

/// Model name reported on mock responses.
pub const MOCK_MODEL: &str = "mock-model";

/// One scripted provider behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Reply with this text.
    Text(String),
    /// Reply with no text.
    Empty,
    /// Fail with a completion error carrying this message.
    Fail(String),
    /// Never return. Pair with a paused clock to exercise timeouts.
    Hang,
}

impl From<&str> for MockReply {
    fn from(text: &str) -> Self {
        MockReply::Text(text.to_string())
    }
}

/// A mock provider that plays back a script of replies.
///
/// Replies are popped from a FIFO queue. When the queue is empty,
/// a default "mock response" text is returned. Every request is recorded.
#[derive(Default)]
pub struct MockProvider {
    script: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<ProviderRequest>>,
    calls: AtomicUsize,
    fail_vision: AtomicBool,
}

impl MockProvider {
    /// Create a new mock provider with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock provider pre-loaded with the given replies.
    pub fn with_replies(replies: impl IntoIterator<Item = MockReply>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Append a reply to the end of the script.
    pub fn push(&self, reply: MockReply) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Make every request that carries images fail, regardless of the script.
    pub fn fail_vision(&self, fail: bool) {
        self.fail_vision.store(fail, Ordering::SeqCst);
    }

    /// Number of `complete` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    fn next_reply(&self) -> MockReply {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| MockReply::Text("mock response".to_string()))
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, MaddyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MaddyError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, MaddyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let has_images = request.image_count() > 0;
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        if has_images && self.fail_vision.load(Ordering::SeqCst) {
            return Err(MaddyError::Completion {
                message: "vision model unavailable".into(),
                source: None,
            });
        }

        let content = match self.next_reply() {
            MockReply::Text(text) => text,
            MockReply::Empty => String::new(),
            MockReply::Fail(message) => {
                return Err(MaddyError::Completion {
                    message,
                    source: None,
                });
            }
            MockReply::Hang => {
                std::future::pending::<()>().await;
                String::new()
            }
        };

        Ok(ProviderResponse {
            content,
            model: MOCK_MODEL.to_string(),
            finish_reason: Some("STOP".to_string()),
            usage: Some(TokenUsage {
                input_tokens: 10,
                output_tokens: 20,
            }),
        })
    }
}
