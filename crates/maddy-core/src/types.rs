// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by adapters, the memory layer, and the exchange cycle.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Embedding,
    VectorStore,
}

/// Who produced a turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Assistant,
}

/// One human message or one assistant reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Fact key under which the user's name is stored.
pub const NAME_FACT: &str = "name";

/// Structured user facts keyed by fact name. Ordered so serialization is stable.
pub type ProfileFacts = BTreeMap<String, String>;

/// The two independent document collections of the memory store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum Collection {
    /// Transcripts of past exchanges.
    #[strum(serialize = "maddy-memory")]
    #[serde(rename = "maddy-memory")]
    Episodic,
    /// Extracted user facts.
    #[strum(serialize = "maddy-user-info")]
    #[serde(rename = "maddy-user-info")]
    Profile,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Episodic => "maddy-memory",
            Collection::Profile => "maddy-user-info",
        }
    }
}

/// Metadata attached to every stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub recorded_at: DateTime<Utc>,
    /// Model that produced the reply, for episodic documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Document kind tag, e.g. `user_info` for profile documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// A key-less document held by a vector store collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Creates a document stamped with the current time.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: DocumentMetadata {
                recorded_at: Utc::now(),
                model: None,
                kind: None,
            },
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.metadata.model = Some(model.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.metadata.kind = Some(kind.into());
        self
    }
}

/// A content block within a provider message.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text { text: String },
    /// Raw image bytes; providers encode them for the wire.
    Image { mime_type: String, data: Vec<u8> },
}

/// A single message sent to a completion provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl ProviderMessage {
    /// Builds a text-only message.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }
}

/// A request to a completion provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub system_prompt: String,
    /// Prior turns oldest-first, then the new human message last.
    pub messages: Vec<ProviderMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ProviderRequest {
    /// Number of image parts across all messages.
    pub fn image_count(&self) -> usize {
        self.messages
            .iter()
            .flat_map(|m| m.content.iter())
            .filter(|b| matches!(b, ContentBlock::Image { .. }))
            .count()
    }
}

/// Token usage reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// The normalized reply every completion provider returns.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub content: String,
    pub model: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

impl ProviderResponse {
    /// True when the reply carries no visible text.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Input for an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output from an embedding adapter, one vector per input text.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}
