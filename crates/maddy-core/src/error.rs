// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Maddy chat assistant.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type used across all Maddy adapters and the exchange cycle.
///
/// Variants map onto the failure kinds a caller can act on. Memory failures
/// are recovered inside the memory layer and only surface from the `try_*`
/// entry points; completion failures are wrapped into [`MaddyError::Exchange`]
/// before they reach the caller of an exchange.
#[derive(Debug, Error)]
pub enum MaddyError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// The vector store or embedding backend could not be constructed or queried.
    #[error("memory unavailable: {message}")]
    MemoryUnavailable {
        message: String,
        source: Option<BoxError>,
    },

    /// The remote completion call failed (transport, auth, malformed response).
    #[error("completion failed: {message}")]
    Completion {
        message: String,
        source: Option<BoxError>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// A whole exchange failed. The message is safe to show to a user.
    #[error("failed to process message: {message}")]
    Exchange {
        message: String,
        source: Option<BoxError>,
    },

    /// The inbound request carried nothing to respond to.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The HTTP gateway could not bind or stopped unexpectedly.
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<BoxError>,
    },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage { source: BoxError },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MaddyError {
    /// Wraps a completion-side failure into a user-legible exchange error.
    pub fn exchange(cause: MaddyError) -> Self {
        MaddyError::Exchange {
            message: cause.to_string(),
            source: Some(Box::new(cause)),
        }
    }

    /// Shorthand for a memory failure caused by another error.
    pub fn memory(message: impl Into<String>, source: MaddyError) -> Self {
        MaddyError::MemoryUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if this error came from the memory layer.
    pub fn is_memory(&self) -> bool {
        matches!(
            self,
            MaddyError::MemoryUnavailable { .. } | MaddyError::Storage { .. }
        )
    }
}
