// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lazily constructed, shared handle to the vector store.
//!
//! The store and its embedding client are built on first use rather than at
//! startup, so sessions that never touch memory never pay for it. Construction
//! runs at most once even when a foreground read races a background write; a
//! failed construction is retried on the next use.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use maddy_core::error::MaddyError;
use maddy_core::traits::{EmbeddingAdapter, VectorStoreAdapter};
use maddy_core::types::{Collection, Document};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::store::SqliteVectorStore;

type StoreFactory =
    Box<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn VectorStoreAdapter>, MaddyError>> + Send + Sync>;

/// Shared entry point to the memory collections.
pub struct MemoryBackend {
    store: OnceCell<Arc<dyn VectorStoreAdapter>>,
    factory: Option<StoreFactory>,
    attempts: AtomicUsize,
}

impl MemoryBackend {
    /// A backend whose store is built by `factory` on first use.
    pub fn lazy<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn VectorStoreAdapter>, MaddyError>> + Send + 'static,
    {
        Self {
            store: OnceCell::new(),
            factory: Some(Box::new(move || factory().boxed())),
            attempts: AtomicUsize::new(0),
        }
    }

    /// A backend that opens `<dir>/maddy.db` on first use.
    pub fn sqlite(dir: impl Into<PathBuf>, embedder: Arc<dyn EmbeddingAdapter>) -> Self {
        let dir = dir.into();
        Self::lazy(move || {
            let dir = dir.clone();
            let embedder = embedder.clone();
            async move {
                let store = SqliteVectorStore::open(&dir, embedder).await?;
                info!(path = %dir.display(), "memory store initialized");
                Ok(Arc::new(store) as Arc<dyn VectorStoreAdapter>)
            }
        })
    }

    /// A backend wrapping an already constructed store.
    pub fn with_store(store: Arc<dyn VectorStoreAdapter>) -> Self {
        Self {
            store: OnceCell::new_with(Some(store)),
            factory: None,
            attempts: AtomicUsize::new(0),
        }
    }

    /// A backend for `memory.enabled = false`. Every operation reports unavailable.
    pub fn disabled() -> Self {
        Self {
            store: OnceCell::new(),
            factory: None,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.factory.is_some() || self.store.initialized()
    }

    pub fn is_initialized(&self) -> bool {
        self.store.initialized()
    }

    /// How many times construction has been attempted.
    pub fn construction_attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Returns the shared store, constructing it on first call.
    pub async fn store(&self) -> Result<Arc<dyn VectorStoreAdapter>, MaddyError> {
        let store = self
            .store
            .get_or_try_init(|| async {
                let factory = self.factory.as_ref().ok_or_else(|| MaddyError::MemoryUnavailable {
                    message: "memory is disabled".to_string(),
                    source: None,
                })?;
                self.attempts.fetch_add(1, Ordering::Relaxed);
                factory().await.map_err(|e| {
                    warn!(error = %e, "memory store construction failed");
                    MaddyError::memory("store construction failed", e)
                })
            })
            .await?;
        Ok(store.clone())
    }

    /// Appends a document to a collection.
    pub async fn add(&self, collection: Collection, document: Document) -> Result<(), MaddyError> {
        self.store()
            .await?
            .add(collection, document)
            .await
            .map_err(|e| MaddyError::memory(format!("write to {collection} failed"), e))
    }

    /// Nearest-first search over a collection.
    pub async fn search(
        &self,
        collection: Collection,
        query: &str,
        k: usize,
    ) -> Result<Vec<Document>, MaddyError> {
        self.store()
            .await?
            .similarity_search(collection, query, k)
            .await
            .map_err(|e| MaddyError::memory(format!("search of {collection} failed"), e))
    }

    /// Shuts the store down if it was ever constructed.
    pub async fn shutdown(&self) -> Result<(), MaddyError> {
        match self.store.get() {
            Some(store) => store.shutdown().await,
            None => Ok(()),
        }
    }
}
