// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory vector store and deterministic embedder for tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use maddy_core::MaddyError;
use maddy_core::traits::{EmbeddingAdapter, PluginAdapter, VectorStoreAdapter};
use maddy_core::types::{
    AdapterType, Collection, Document, EmbeddingInput, EmbeddingOutput, HealthStatus,
};

/// A vector store kept in memory.
///
/// Search ranks documents by how many query words they share, newest first
/// on ties, so tests get stable nearest-first ordering without embeddings.
#[derive(Default)]
pub struct MockVectorStore {
    documents: Mutex<Vec<(Collection, Document)>>,
    adds: AtomicUsize,
    searches: AtomicUsize,
    fail_adds: AtomicBool,
    fail_searches: AtomicBool,
}

impl MockVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `add` fail.
    pub fn fail_adds(&self, fail: bool) {
        self.fail_adds.store(fail, Ordering::SeqCst);
    }

    /// Make every `similarity_search` fail.
    pub fn fail_searches(&self, fail: bool) {
        self.fail_searches.store(fail, Ordering::SeqCst);
    }

    /// Successful and failed `add` calls.
    pub fn add_calls(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }

    /// Successful and failed `similarity_search` calls.
    pub fn search_calls(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    /// Documents stored in `collection`, oldest first.
    pub fn documents(&self, collection: Collection) -> Vec<Document> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(c, _)| *c == collection)
            .map(|(_, d)| d.clone())
            .collect()
    }

    /// Seeds a document directly, bypassing counters and failure toggles.
    pub fn seed(&self, collection: Collection, document: Document) {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((collection, document));
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl PluginAdapter for MockVectorStore {
    fn name(&self) -> &str {
        "mock-vector-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::VectorStore
    }

    async fn health_check(&self) -> Result<HealthStatus, MaddyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MaddyError> {
        Ok(())
    }
}

#[async_trait]
impl VectorStoreAdapter for MockVectorStore {
    async fn add(&self, collection: Collection, document: Document) -> Result<(), MaddyError> {
        self.adds.fetch_add(1, Ordering::SeqCst);
        if self.fail_adds.load(Ordering::SeqCst) {
            return Err(MaddyError::Internal("mock store rejected write".into()));
        }
        self.seed(collection, document);
        Ok(())
    }

    async fn similarity_search(
        &self,
        collection: Collection,
        query: &str,
        k: usize,
    ) -> Result<Vec<Document>, MaddyError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.fail_searches.load(Ordering::SeqCst) {
            return Err(MaddyError::Internal("mock store search failed".into()));
        }
        let query_words = words(query);
        let mut scored: Vec<(usize, usize, Document)> = self
            .documents(collection)
            .into_iter()
            .enumerate()
            .map(|(i, doc)| (words(&doc.content).intersection(&query_words).count(), i, doc))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
        Ok(scored.into_iter().take(k).map(|(_, _, doc)| doc).collect())
    }
}

/// Embeds text as letter frequencies, so texts sharing words land close together.
#[derive(Debug, Default)]
pub struct MockEmbedder {
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub const DIMENSIONS: usize = 26;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; Self::DIMENSIONS];
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        v
    }
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
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
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MaddyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(EmbeddingOutput {
            embeddings: input.texts.iter().map(|t| Self::vector(t)).collect(),
            dimensions: Self::DIMENSIONS,
        })
    }
}
