// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete exchange stack with a mock provider and
//! either an in-memory or a temp-dir SQLite vector store. Provides
//! `exchange()` to drive the full pipeline in tests.

use std::sync::Arc;
use std::time::Duration;

use maddy_agent::{ExchangeOutcome, Orchestrator, SessionContext};
use maddy_config::MaddyConfig;
use maddy_context::Persona;
use maddy_core::MaddyError;
use maddy_memory::{MemoryBackend, MemorySystem};

use crate::mock_provider::{MockProvider, MockReply};
use crate::mock_store::{MockEmbedder, MockVectorStore};

/// Persona used by harness-built orchestrators unless overridden.
pub const TEST_PERSONA: &str = "You are a test assistant.";

enum StoreKind {
    InMemory,
    Sqlite,
    Disabled,
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    replies: Vec<MockReply>,
    persona: String,
    config: MaddyConfig,
    store: StoreKind,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            replies: Vec::new(),
            persona: TEST_PERSONA.to_string(),
            config: MaddyConfig::default(),
            store: StoreKind::InMemory,
        }
    }

    /// Set scripted provider replies.
    pub fn with_replies(mut self, replies: impl IntoIterator<Item = MockReply>) -> Self {
        self.replies = replies.into_iter().collect();
        self
    }

    /// Set a custom persona.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    /// Adjust the config before the stack is built.
    pub fn with_config(mut self, edit: impl FnOnce(&mut MaddyConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    /// Back memory with a SQLite store in a temp dir instead of the in-memory mock.
    pub fn with_sqlite_memory(mut self) -> Self {
        self.store = StoreKind::Sqlite;
        self
    }

    /// Run with memory disabled.
    pub fn without_memory(mut self) -> Self {
        self.store = StoreKind::Disabled;
        self.config.memory.enabled = false;
        self
    }

    /// Build the harness. Must be called inside a tokio runtime.
    pub fn build(self) -> Result<TestHarness, MaddyError> {
        let provider = Arc::new(MockProvider::with_replies(self.replies));

        let (memory, store, temp_dir) = match self.store {
            StoreKind::InMemory => {
                let store = Arc::new(MockVectorStore::new());
                let backend = Arc::new(MemoryBackend::with_store(store.clone()));
                (MemorySystem::new(backend, &self.config.memory), Some(store), None)
            }
            StoreKind::Sqlite => {
                let temp_dir = tempfile::TempDir::new()
                    .map_err(|e| MaddyError::Storage { source: e.into() })?;
                let backend = Arc::new(MemoryBackend::sqlite(
                    temp_dir.path(),
                    Arc::new(MockEmbedder::new()),
                ));
                (
                    MemorySystem::new(backend, &self.config.memory),
                    None,
                    Some(temp_dir),
                )
            }
            StoreKind::Disabled => (MemorySystem::disabled(), None, None),
        };

        let orchestrator = Orchestrator::new(
            provider.clone(),
            Arc::new(memory),
            Persona::new(self.persona),
            &self.config,
        );

        Ok(TestHarness {
            provider,
            store,
            orchestrator: Arc::new(orchestrator),
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters.
pub struct TestHarness {
    /// The mock completion provider.
    pub provider: Arc<MockProvider>,
    /// The in-memory store, when the harness uses one.
    pub store: Option<Arc<MockVectorStore>>,
    pub orchestrator: Arc<Orchestrator>,
    pub config: MaddyConfig,
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    /// Create a new harness builder.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default settings and the given replies.
    pub fn with_replies(
        replies: impl IntoIterator<Item = MockReply>,
    ) -> Result<TestHarness, MaddyError> {
        Self::builder().with_replies(replies).build()
    }

    /// The in-memory store. Panics if the harness was built with another backend.
    pub fn store(&self) -> &MockVectorStore {
        self.store
            .as_deref()
            .expect("harness was not built with the in-memory store")
    }

    pub fn session(&self) -> SessionContext {
        self.orchestrator.new_session()
    }

    /// Runs one text exchange on `session`.
    pub async fn exchange(
        &self,
        session: &mut SessionContext,
        message: &str,
    ) -> Result<ExchangeOutcome, MaddyError> {
        self.orchestrator.exchange(session, message).await
    }

    /// Drains background writes so their effects can be asserted.
    pub async fn flush(&self) {
        let _ = self.orchestrator.shutdown(Duration::from_secs(5)).await;
    }
}
