// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for the remote completion API.

use async_trait::async_trait;

use crate::error::MaddyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse};

/// Adapter for a language model completion API.
///
/// A request whose final message carries image parts is a vision request;
/// providers route it to a vision-capable model. Errors are reported as
/// [`MaddyError::Completion`] or [`MaddyError::Timeout`].
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a completion request and returns the full normalized response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, MaddyError>;
}
