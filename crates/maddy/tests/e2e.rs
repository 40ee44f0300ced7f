// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete Maddy pipeline.
//!
//! Each test builds an isolated stack: mock or wiremock-backed provider,
//! temp-dir SQLite memory, and the real gateway where HTTP is involved.
//! Tests are independent and order-insensitive.

use std::sync::Arc;
use std::time::Duration;

use maddy_agent::Orchestrator;
use maddy_config::MaddyConfig;
use maddy_context::Persona;
use maddy_core::traits::ProviderAdapter;
use maddy_gateway::AppState;
use maddy_gemini::{GeminiClient, GeminiProvider};
use maddy_memory::{MemoryBackend, MemorySystem};
use maddy_test_utils::{MockEmbedder, MockProvider, MockVectorStore, TestHarness};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sqlite_memory(dir: &std::path::Path, config: &MaddyConfig) -> Arc<MemorySystem> {
    let backend = Arc::new(MemoryBackend::sqlite(dir, Arc::new(MockEmbedder::new())));
    Arc::new(MemorySystem::new(backend, &config.memory))
}

// ---- HTTP gateway over a real socket ----

#[tokio::test]
async fn gateway_serves_chat_and_shuts_down_gracefully() {
    let harness = TestHarness::builder()
        .with_replies(["Nice to meet you, Sam!".into(), "Hello again, Sam.".into()])
        .with_sqlite_memory()
        .build()
        .unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();
    let server = tokio::spawn(maddy_gateway::serve_listener(
        listener,
        AppState::new(harness.orchestrator.clone()),
        1024 * 1024,
        cancel.clone(),
    ));

    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/chat");

    let first: serde_json::Value = client
        .post(&url)
        .json(&json!({"message": "Call me Sam."}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["reply"], "Nice to meet you, Sam!");

    // A different session still knows the name through the profile store.
    let second = client
        .post(&url)
        .json(&json!({"message": "Who am I?", "session_id": "other"}))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), reqwest::StatusCode::OK);
    let system_prompt = harness.provider.last_request().unwrap().system_prompt;
    assert!(
        system_prompt.contains("The user's name is Sam"),
        "got: {system_prompt}"
    );

    let health: serde_json::Value = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop after cancellation")
        .unwrap()
        .unwrap();
}

// ---- Gemini wire format through the orchestrator ----

#[tokio::test]
async fn exchange_reaches_gemini_with_persona_and_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-test:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "Call me Sam. What's 2+2?"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "4, Sam."}]}, "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 30, "candidatesTokenCount": 3}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new("test-key", &server.uri(), Duration::from_secs(5)).unwrap();
    let provider: Arc<dyn ProviderAdapter> = Arc::new(GeminiProvider::with_client(
        client,
        "gemini-test".into(),
        "gemini-vision-test".into(),
    ));
    let store = Arc::new(MockVectorStore::new());
    let config = MaddyConfig::default();
    let memory = Arc::new(MemorySystem::new(
        Arc::new(MemoryBackend::with_store(store.clone())),
        &config.memory,
    ));
    let orchestrator = Orchestrator::new(provider, memory, Persona::new("You are Maddy."), &config);

    let mut session = orchestrator.new_session();
    let outcome = orchestrator
        .exchange(&mut session, "Call me Sam. What's 2+2?")
        .await
        .unwrap();
    assert_eq!(outcome.reply, "4, Sam.");
    assert_eq!(session.window().len(), 2);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let system = body["systemInstruction"]["parts"][0]["text"].as_str().unwrap();
    assert!(system.starts_with("You are Maddy."), "got: {system}");
    assert!(system.contains("The user's name is Sam"), "got: {system}");

    orchestrator.shutdown(Duration::from_secs(5)).await.unwrap();
    assert_eq!(store.documents(maddy_core::Collection::Episodic).len(), 1);
}

#[tokio::test]
async fn gemini_failure_surfaces_as_exchange_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
        })))
        .mount(&server)
        .await;

    let client = GeminiClient::new("bad-key", &server.uri(), Duration::from_secs(5)).unwrap();
    let provider: Arc<dyn ProviderAdapter> =
        Arc::new(GeminiProvider::with_client(client, "m".into(), "v".into()));
    let config = MaddyConfig::default();
    let orchestrator = Orchestrator::new(
        provider,
        Arc::new(MemorySystem::disabled()),
        Persona::new("p"),
        &config,
    );

    let mut session = orchestrator.new_session();
    let err = orchestrator.exchange(&mut session, "hello").await.unwrap_err();

    assert!(matches!(err, maddy_core::MaddyError::Exchange { .. }));
    assert!(err.to_string().contains("API key not valid"), "got: {err}");
    assert!(session.window().is_empty());
}

// ---- Long-term memory survives a restart ----

#[tokio::test]
async fn episodic_memory_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = MaddyConfig::default();

    {
        let provider = Arc::new(MockProvider::with_replies(["Margherita, always.".into()]));
        let orchestrator = Orchestrator::new(
            provider,
            sqlite_memory(dir.path(), &config),
            Persona::new("p"),
            &config,
        );
        let mut session = orchestrator.new_session();
        orchestrator
            .exchange(&mut session, "What pizza should I order tonight?")
            .await
            .unwrap();
        orchestrator.shutdown(Duration::from_secs(5)).await.unwrap();
        assert_eq!(orchestrator.memory().writer_stats().written, 1);
    }

    let provider = Arc::new(MockProvider::new());
    let orchestrator = Orchestrator::new(
        provider.clone(),
        sqlite_memory(dir.path(), &config),
        Persona::new("p"),
        &config,
    );
    let mut session = orchestrator.new_session();
    orchestrator
        .exchange(&mut session, "Which pizza did you suggest?")
        .await
        .unwrap();

    let system_prompt = provider.last_request().unwrap().system_prompt;
    assert!(
        system_prompt.contains("Margherita, always."),
        "got: {system_prompt}"
    );
    orchestrator.shutdown(Duration::from_secs(5)).await.unwrap();
}

// ---- Configuration ----

#[test]
fn effective_config_round_trips_with_redacted_key() {
    let config = maddy_config::load_and_validate_str(
        r#"
        [gemini]
        api_key = "secret"

        [gateway]
        port = 8080
        "#,
    )
    .unwrap();

    let rendered = maddy_config::render_effective(&config).unwrap();
    assert!(!rendered.contains("secret"));
    assert!(rendered.contains("<redacted>"));

    let reparsed = maddy_config::load_and_validate_str(&rendered).unwrap();
    assert_eq!(reparsed.gateway.port, 8080);
    assert_eq!(reparsed.context.window_size, config.context.window_size);
}

#[test]
fn invalid_config_reports_every_problem() {
    let errors = maddy_config::load_and_validate_str(
        r#"
        [context]
        window_size = 1

        [gemini]
        temperature = 5.0
        "#,
    )
    .unwrap_err();
    assert!(errors.len() >= 2, "got: {errors:?}");
}
