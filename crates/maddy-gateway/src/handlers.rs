// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the chat API.
//!
//! Handles POST /api/chat, GET /api/sessions, DELETE /api/sessions/{id} and
//! GET /health.

use std::time::Instant;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::compose::{ChatRequest, compose};
use crate::server::AppState;

/// Reply sent when a request carries nothing to respond to.
pub const EMPTY_REQUEST_REPLY: &str = "I need a message, file, image, or audio to respond to.";

/// Response body for POST /api/chat.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    /// The session the exchange ran in. Absent when no session was opened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Response body for GET /api/sessions.
#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionInfo>,
}

/// Information about a single live session.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub id: String,
    /// An exchange is running in this session right now.
    pub busy: bool,
    /// Completed exchanges. Unknown while busy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchanges: Option<u64>,
    /// RFC 3339 creation time. Unknown while busy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn reply(status: StatusCode, reply: impl Into<String>, session_id: Option<String>) -> Response {
    (
        status,
        Json(ChatResponse {
            reply: reply.into(),
            session_id,
        }),
    )
        .into_response()
}

/// POST /api/chat
///
/// Composes the message from its attachments, runs one exchange in the
/// requested session and returns the reply. Sessions are opened on first use
/// and discarded again if no exchange in them has succeeded yet.
pub async fn post_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!(error = %rejection, "rejected chat request");
            return reply(
                rejection.status(),
                format!("Invalid request: {}", rejection.body_text()),
                None,
            );
        }
    };

    let composed = compose(&body);
    if composed.is_blank() {
        return reply(StatusCode::BAD_REQUEST, EMPTY_REQUEST_REPLY, None);
    }

    let (session_id, handle) = state.session(body.session_id.as_deref());
    let mut session = handle.lock().await;

    let started = Instant::now();
    let result = if composed.images.is_empty() {
        state.orchestrator.exchange(&mut session, &composed.text).await
    } else {
        state
            .orchestrator
            .exchange_with_media(&mut session, &composed.text, &composed.images)
            .await
    };

    match result {
        Ok(outcome) => {
            info!(
                session_id = %session_id,
                images = composed.images.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                fallback = outcome.fallback_used,
                vision_fallback = outcome.vision_fallback,
                "chat reply sent"
            );
            reply(StatusCode::OK, outcome.reply, Some(session_id))
        }
        Err(e) => {
            error!(session_id = %session_id, error = %e, "chat exchange failed");
            let never_used = session.exchanges() == 0;
            drop(session);
            if never_used && state.discard_session(&session_id, &handle) {
                info!(session_id = %session_id, "discarded session after failed first exchange");
            }
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("I encountered an error processing your request: {e}. Please try again."),
                Some(session_id),
            )
        }
    }
}

/// GET /api/sessions
pub async fn get_sessions(State(state): State<AppState>) -> Json<SessionListResponse> {
    let handles: Vec<_> = state
        .sessions
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().clone()))
        .collect();

    let mut sessions: Vec<SessionInfo> = handles
        .into_iter()
        .map(|(id, session)| match session.try_lock() {
            Ok(session) => SessionInfo {
                id,
                busy: false,
                exchanges: Some(session.exchanges()),
                created_at: Some(session.created_at().to_rfc3339()),
            },
            Err(_) => SessionInfo {
                id,
                busy: true,
                exchanges: None,
                created_at: None,
            },
        })
        .collect();
    sessions.sort_by(|a, b| a.id.cmp(&b.id));

    Json(SessionListResponse { sessions })
}

/// DELETE /api/sessions/{id}
///
/// Drops the session's window and profile cache. Long-term memory is kept.
pub async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.sessions.remove(&id) {
        Some(_) => {
            info!(session_id = %id, "session ended");
            StatusCode::NO_CONTENT.into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("session not found: {id}"),
            }),
        )
            .into_response(),
    }
}

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
    })
}
