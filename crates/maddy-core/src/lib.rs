// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Maddy chat assistant.
//!
//! This crate provides the adapter traits, the error type, and the common
//! types shared by the memory layer, the completion provider, and the
//! exchange orchestrator.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::MaddyError;
pub use types::{
    AdapterType, Collection, ContentBlock, Document, DocumentMetadata, EmbeddingInput,
    EmbeddingOutput, HealthStatus, NAME_FACT, ProfileFacts, ProviderMessage, ProviderRequest,
    ProviderResponse, Role, SessionId, TokenUsage, Turn,
};

pub use traits::{EmbeddingAdapter, PluginAdapter, ProviderAdapter, VectorStoreAdapter};
