// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term memory for Maddy.
//!
//! Two collections live in one vector store: episodic transcripts of past
//! exchanges, and profile documents holding facts the user has stated about
//! themselves.
//!
//! ## Architecture
//!
//! - **FactExtractor**: pattern rules that pull profile facts out of a message
//! - **SqliteVectorStore**: SQLite persistence with BLOB embeddings and cosine ranking
//! - **MemoryBackend**: lazily constructed, shared handle to the store
//! - **EpisodicWriter**: bounded queue and worker for off-path transcript writes
//! - **MemorySystem / SessionMemory**: per-session profile cache and episodic search

pub mod backend;
pub mod facts;
pub mod session;
pub mod store;
pub mod types;
pub mod writer;

pub use backend::MemoryBackend;
pub use facts::{FactExtractor, FactRule};
pub use session::{MemorySystem, SessionMemory};
pub use store::SqliteVectorStore;
pub use types::*;
pub use writer::{EpisodicJob, EpisodicWriter, WriterStats};
