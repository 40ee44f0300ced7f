// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The exchange cycle.
//!
//! One call to [`Orchestrator::exchange`] runs a single user message through
//! fact extraction, profile update, episodic retrieval, prompt assembly and
//! completion, then records the turn in the window and hands the transcript
//! to the background writer. The orchestrator holds no per-session state;
//! everything it mutates arrives through the caller's [`SessionContext`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use maddy_config::MaddyConfig;
use maddy_context::{Persona, PromptAssembler};
use maddy_core::error::MaddyError;
use maddy_core::traits::ProviderAdapter;
use maddy_core::types::{ContentBlock, ProfileFacts, ProviderRequest, ProviderResponse, SessionId};
use maddy_memory::{FactExtractor, MemorySystem};
use tracing::{debug, info, warn};

use crate::session::{ExchangeState, SessionContext};

/// Exchanges slower than this are logged at `warn`.
const SLOW_EXCHANGE: Duration = Duration::from_secs(10);

/// MIME type assumed for images that arrive without one.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Window text recorded for an image-only message.
const IMAGE_ONLY_WINDOW_TEXT: &str = "[Image(s) attached]";

/// Transcript text persisted for an image-only message.
const IMAGE_ONLY_MEMORY_TEXT: &str = "[Image(s)]";

/// An image attached to a message, still base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub base64: String,
    pub mime_type: String,
}

impl ImageInput {
    pub fn new(base64: impl Into<String>, mime_type: Option<String>) -> Self {
        Self {
            base64: base64.into(),
            mime_type: mime_type
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string()),
        }
    }
}

/// The result of a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeOutcome {
    pub reply: String,
    /// The provider returned nothing and the canned reply was used.
    pub fallback_used: bool,
    /// The vision path failed and the reply came from the text retry.
    pub vision_fallback: bool,
}

/// Runs exchanges against a completion provider and long-term memory.
pub struct Orchestrator {
    provider: Arc<dyn ProviderAdapter>,
    memory: Arc<MemorySystem>,
    assembler: PromptAssembler,
    extractor: FactExtractor,
    timeout: Duration,
    fallback_reply: String,
    episodic_k: usize,
    window_size: usize,
}

impl Orchestrator {
    /// Creates an orchestrator from config with the default fact rules.
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        memory: Arc<MemorySystem>,
        persona: Persona,
        config: &MaddyConfig,
    ) -> Self {
        info!(
            provider = provider.name(),
            memory_enabled = memory.is_enabled(),
            window_size = config.context.window_size,
            "orchestrator initialized"
        );
        Self {
            provider,
            memory,
            assembler: PromptAssembler::new(
                persona,
                config.gemini.max_tokens,
                config.gemini.temperature,
            ),
            extractor: FactExtractor::default(),
            timeout: Duration::from_secs(config.gemini.timeout_secs),
            fallback_reply: config.context.fallback_reply.clone(),
            episodic_k: config.memory.episodic_results,
            window_size: config.context.window_size,
        }
    }

    /// Replaces the fact extraction rules.
    pub fn with_extractor(mut self, extractor: FactExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn memory(&self) -> &Arc<MemorySystem> {
        &self.memory
    }

    /// Opens a session with a fresh random id.
    pub fn new_session(&self) -> SessionContext {
        self.session_with_id(SessionId(uuid::Uuid::new_v4().to_string()))
    }

    /// Opens a session under a caller-chosen id.
    pub fn session_with_id(&self, id: SessionId) -> SessionContext {
        debug!(session_id = %id, "session opened");
        SessionContext::new(id, self.window_size, self.memory.session())
    }

    /// Runs one text exchange.
    ///
    /// Completion failures, including timeouts, come back as
    /// [`MaddyError::Exchange`] and leave the window and memory untouched.
    /// Memory failures never fail the exchange.
    pub async fn exchange(
        &self,
        session: &mut SessionContext,
        message: &str,
    ) -> Result<ExchangeOutcome, MaddyError> {
        let started = Instant::now();
        let outcome = self.run_text(session, message, true).await;
        log_latency(session, started);
        outcome
    }

    /// Runs one exchange with image attachments.
    ///
    /// Images go to the provider as binary parts on the final human turn. If
    /// anything on that path fails, the exchange is retried once as text with
    /// a note that the images could not be analyzed.
    pub async fn exchange_with_media(
        &self,
        session: &mut SessionContext,
        message: &str,
        images: &[ImageInput],
    ) -> Result<ExchangeOutcome, MaddyError> {
        if images.is_empty() {
            return self.exchange(session, message).await;
        }

        let started = Instant::now();
        let profile = self.update_profile(session, message).await;
        let episodic = self.retrieve(session, message).await;

        let vision = match decode_images(images) {
            Ok(parts) => {
                let mut human = Vec::with_capacity(parts.len() + 1);
                if !message.is_empty() {
                    human.push(ContentBlock::Text {
                        text: message.to_string(),
                    });
                }
                human.extend(parts);
                let request = self
                    .assembler
                    .assemble(&profile, &episodic, session.window(), human);
                session.transition(ExchangeState::PromptAssembled);
                debug!(images = request.image_count(), "sending vision request");
                self.complete(session, request).await
            }
            Err(e) => Err(e),
        };

        let outcome = match vision {
            Ok(response) => {
                let window_text = non_empty_or(message, IMAGE_ONLY_WINDOW_TEXT);
                let memory_text = non_empty_or(message, IMAGE_ONLY_MEMORY_TEXT);
                Ok(self.finish(session, window_text, memory_text, response))
            }
            Err(e) => {
                warn!(
                    session_id = %session.id(),
                    images = images.len(),
                    error = %e,
                    "vision path failed, retrying as text"
                );
                let noted = format!(
                    "[User attached {} image(s), but they could not be analyzed.]\n\n{message}",
                    images.len()
                );
                self.run_text(session, &noted, false)
                    .await
                    .map(|outcome| ExchangeOutcome {
                        vision_fallback: true,
                        ..outcome
                    })
            }
        };

        log_latency(session, started);
        outcome
    }

    /// Drains the episodic writer and shuts down the provider and store.
    pub async fn shutdown(&self, drain_timeout: Duration) -> Result<(), MaddyError> {
        self.memory.shutdown(drain_timeout).await?;
        self.provider.shutdown().await
    }

    /// The text pipeline. With `extract` false the fact stages pass through
    /// without extracting again; the vision retry uses this since facts were
    /// already recorded.
    async fn run_text(
        &self,
        session: &mut SessionContext,
        message: &str,
        extract: bool,
    ) -> Result<ExchangeOutcome, MaddyError> {
        let profile = if extract {
            self.update_profile(session, message).await
        } else {
            // Facts from this message were recorded by the first attempt.
            session.transition(ExchangeState::Start);
            session.transition(ExchangeState::FactsExtracted);
            session.transition(ExchangeState::ProfileUpdated);
            session.memory().read_profile_cache().await
        };
        let episodic = self.retrieve(session, message).await;

        let request = self.assembler.assemble(
            &profile,
            &episodic,
            session.window(),
            vec![ContentBlock::Text {
                text: message.to_string(),
            }],
        );
        session.transition(ExchangeState::PromptAssembled);

        let response = self
            .complete(session, request)
            .await
            .map_err(MaddyError::exchange)?;
        Ok(self.finish(session, message, message, response))
    }

    /// Extracts and persists facts, then returns the session's full profile.
    async fn update_profile(&self, session: &mut SessionContext, message: &str) -> ProfileFacts {
        session.transition(ExchangeState::Start);
        let facts = self.extractor.extract(message);
        session.transition(ExchangeState::FactsExtracted);
        if !facts.is_empty() {
            debug!(session_id = %session.id(), keys = facts.len(), "profile facts extracted");
            session.memory().write_profile(&facts).await;
        }
        session.transition(ExchangeState::ProfileUpdated);
        session.memory().read_profile_cache().await
    }

    async fn retrieve(&self, session: &mut SessionContext, message: &str) -> String {
        let episodic = session
            .memory()
            .search_episodic(message, self.episodic_k)
            .await;
        session.transition(ExchangeState::MemoryRetrieved);
        episodic
    }

    /// Calls the provider under the completion timeout.
    async fn complete(
        &self,
        session: &mut SessionContext,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, MaddyError> {
        session.transition(ExchangeState::CompletionRequested);
        let result = match tokio::time::timeout(self.timeout, self.provider.complete(request)).await
        {
            Ok(result) => result,
            Err(_) => Err(MaddyError::Timeout {
                duration: self.timeout,
            }),
        };
        match &result {
            Ok(_) => session.transition(ExchangeState::Succeeded),
            Err(e) => {
                warn!(session_id = %session.id(), error = %e, "completion failed");
                session.transition(ExchangeState::Failed);
            }
        }
        result
    }

    /// Records a successful reply in the window and queues the transcript.
    fn finish(
        &self,
        session: &mut SessionContext,
        window_text: &str,
        memory_text: &str,
        response: ProviderResponse,
    ) -> ExchangeOutcome {
        let fallback_used = response.is_blank();
        let reply = if fallback_used {
            warn!(session_id = %session.id(), "provider returned an empty reply, using fallback");
            self.fallback_reply.clone()
        } else {
            response.content
        };

        session.window_mut().append_exchange(window_text, reply.clone());
        session.transition(ExchangeState::WindowUpdated);

        session
            .memory()
            .write_episodic(memory_text, &reply, &response.model);
        session.transition(ExchangeState::BackgroundWriteScheduled);
        session.transition(ExchangeState::Done);

        ExchangeOutcome {
            reply,
            fallback_used,
            vision_fallback: false,
        }
    }
}

/// Decodes every attachment, failing on the first undecodable payload.
/// Empty payloads are skipped.
fn decode_images(images: &[ImageInput]) -> Result<Vec<ContentBlock>, MaddyError> {
    images
        .iter()
        .filter(|img| !img.base64.is_empty())
        .map(|img| {
            let data = BASE64
                .decode(img.base64.trim())
                .map_err(|e| MaddyError::InvalidRequest(format!("undecodable image: {e}")))?;
            Ok(ContentBlock::Image {
                mime_type: img.mime_type.clone(),
                data,
            })
        })
        .collect()
}

fn non_empty_or<'a>(text: &'a str, fallback: &'a str) -> &'a str {
    if text.is_empty() { fallback } else { text }
}

fn log_latency(session: &SessionContext, started: Instant) {
    let elapsed = started.elapsed();
    if elapsed > SLOW_EXCHANGE {
        warn!(
            session_id = %session.id(),
            elapsed_ms = elapsed.as_millis() as u64,
            "slow exchange"
        );
    } else {
        debug!(
            session_id = %session.id(),
            elapsed_ms = elapsed.as_millis() as u64,
            "exchange complete"
        );
    }
}
