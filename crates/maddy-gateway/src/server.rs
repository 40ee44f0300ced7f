// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use dashmap::DashMap;
use maddy_agent::{Orchestrator, SessionContext};
use maddy_config::model::GatewayConfig;
use maddy_core::MaddyError;
use maddy_core::types::SessionId;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;

/// Session used by requests that carry no `session_id`.
pub const DEFAULT_SESSION_ID: &str = "default";

/// A live session. The lock serializes exchanges within one conversation.
pub type SessionHandle = Arc<Mutex<SessionContext>>;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Live sessions keyed by id.
    pub sessions: Arc<DashMap<String, SessionHandle>>,
    /// Process start time for uptime calculation.
    pub started: Instant,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            sessions: Arc::new(DashMap::new()),
            started: Instant::now(),
        }
    }

    /// Looks up a session, opening it on first use.
    ///
    /// A blank or missing id maps to [`DEFAULT_SESSION_ID`]. An unknown id
    /// is adopted, so clients may pick their own.
    pub fn session(&self, requested: Option<&str>) -> (String, SessionHandle) {
        let id = requested
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_SESSION_ID)
            .to_string();

        let handle = self
            .sessions
            .entry(id.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(
                    self.orchestrator.session_with_id(SessionId(id.clone())),
                ))
            })
            .value()
            .clone();

        (id, handle)
    }

    /// Unregisters `handle` if it is still the session stored under `id`.
    ///
    /// Used when a session's first exchange fails, so a failed request does
    /// not leave an empty session behind.
    pub fn discard_session(&self, id: &str, handle: &SessionHandle) -> bool {
        self.sessions
            .remove_if(id, |_, current| Arc::ptr_eq(current, handle))
            .is_some()
    }
}

/// Builds the gateway router.
///
/// Routes:
/// - POST /api/chat
/// - GET /api/sessions
/// - DELETE /api/sessions/{id}
/// - GET /health
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/api/chat", post(handlers::post_chat))
        .route("/api/sessions", get(handlers::get_sessions))
        .route("/api/sessions/{id}", delete(handlers::delete_session))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds to the configured host:port and serves until `shutdown` is cancelled.
pub async fn serve(
    config: &GatewayConfig,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), MaddyError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| MaddyError::Gateway {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    serve_listener(listener, state, config.max_body_bytes, shutdown).await
}

/// Serves on an already bound listener. In-flight requests finish before this returns.
pub async fn serve_listener(
    listener: TcpListener,
    state: AppState,
    max_body_bytes: usize,
    shutdown: CancellationToken,
) -> Result<(), MaddyError> {
    if let Ok(addr) = listener.local_addr() {
        info!("gateway listening on http://{addr}");
    }

    axum::serve(listener, router(state, max_body_bytes))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| MaddyError::Gateway {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    info!("gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use maddy_test_utils::TestHarness;

    #[tokio::test]
    async fn blank_and_missing_ids_map_to_default() {
        let harness = TestHarness::with_replies([]).unwrap();
        let state = AppState::new(harness.orchestrator.clone());

        let (missing, first) = state.session(None);
        let (blank, second) = state.session(Some("   "));

        assert_eq!(missing, DEFAULT_SESSION_ID);
        assert_eq!(blank, DEFAULT_SESSION_ID);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(state.sessions.len(), 1);
    }

    #[tokio::test]
    async fn discard_ignores_a_replaced_session() {
        let harness = TestHarness::with_replies([]).unwrap();
        let state = AppState::new(harness.orchestrator.clone());

        let (id, stale) = state.session(Some("s1"));
        state.sessions.remove(&id);
        let (_, current) = state.session(Some("s1"));

        assert!(!state.discard_session(&id, &stale));
        assert!(state.sessions.contains_key("s1"));
        assert!(state.discard_session(&id, &current));
        assert!(state.sessions.is_empty());
    }
}
