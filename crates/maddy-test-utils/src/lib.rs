// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Maddy integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Mock completion provider with scripted replies
//! - [`MockVectorStore`] - In-memory vector store with failure toggles
//! - [`MockEmbedder`] - Deterministic letter-frequency embedder
//! - [`TestHarness`] - Orchestrator wired to the mocks

pub mod harness;
pub mod mock_provider;
pub mod mock_store;

pub use harness::{TEST_PERSONA, TestHarness, TestHarnessBuilder};
pub use mock_provider::{MOCK_MODEL, MockProvider, MockReply};
pub use mock_store::{MockEmbedder, MockVectorStore};
