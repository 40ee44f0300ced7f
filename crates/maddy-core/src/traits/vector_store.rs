// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector store adapter trait for the append-only document collections.

use async_trait::async_trait;

use crate::error::MaddyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Collection, Document};

/// An append-only, key-less document store with nearest-neighbor search.
///
/// Implementations must tolerate concurrent `add` and `similarity_search`
/// calls on the same collection.
#[async_trait]
pub trait VectorStoreAdapter: PluginAdapter {
    /// Appends a document to a collection.
    async fn add(&self, collection: Collection, document: Document) -> Result<(), MaddyError>;

    /// Returns up to `k` documents from `collection`, nearest to `query` first.
    async fn similarity_search(
        &self,
        collection: Collection,
        query: &str,
        k: usize,
    ) -> Result<Vec<Document>, MaddyError>;
}
