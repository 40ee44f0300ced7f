// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP chat API.
//!
//! The gateway turns `POST /api/chat` requests into exchanges against a shared
//! [`maddy_agent::Orchestrator`]. It owns the map of live sessions, so each
//! client conversation keeps its own window and profile cache between
//! requests, and it exposes routes to list and end those sessions.

pub mod compose;
pub mod handlers;
pub mod server;

pub use compose::{ChatRequest, ComposedMessage, FileUpload, ImageMetadata, ImageUpload, compose};
pub use handlers::{ChatResponse, HealthResponse, SessionInfo, SessionListResponse};
pub use server::{AppState, DEFAULT_SESSION_ID, SessionHandle, router, serve, serve_listener};
