// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the exchange cycle.
//!
//! Each test builds an isolated TestHarness with a mock provider and an
//! in-memory store. Tests are independent and order-insensitive.

use std::time::Duration;

use maddy_agent::{ExchangeState, ImageInput};
use maddy_core::MaddyError;
use maddy_core::types::{Collection, ContentBlock, Document, Role};
use maddy_test_utils::{MockReply, TestHarness};

const NAME_INSTRUCTION: &str = "IMPORTANT: The user's name is Sam.";

// ---- Basic exchange ----

#[tokio::test]
async fn reply_is_returned_and_window_updated() {
    let harness = TestHarness::with_replies(["Hello there!".into()]).unwrap();
    let mut session = harness.session();

    let outcome = harness.exchange(&mut session, "Hi").await.unwrap();

    assert_eq!(outcome.reply, "Hello there!");
    assert!(!outcome.fallback_used);
    assert!(!outcome.vision_fallback);
    assert_eq!(session.state(), ExchangeState::Done);
    assert_eq!(session.exchanges(), 1);

    let history = session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::Human);
    assert_eq!(history[0].content, "Hi");
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].content, "Hello there!");
}

#[tokio::test]
async fn call_me_sam_binds_name_and_persists_profile() {
    let harness = TestHarness::with_replies(["4, Sam.".into()]).unwrap();
    let mut session = harness.session();

    let outcome = harness
        .exchange(&mut session, "Call me Sam. What's 2+2?")
        .await
        .unwrap();

    assert_eq!(outcome.reply, "4, Sam.");
    assert_eq!(harness.provider.calls(), 1);
    assert_eq!(session.window().len(), 2);

    let profile = harness.store().documents(Collection::Profile);
    assert_eq!(profile.len(), 1);
    assert_eq!(profile[0].content, "name: Sam");

    let request = harness.provider.last_request().unwrap();
    assert!(request.system_prompt.starts_with(maddy_test_utils::TEST_PERSONA));
    assert!(request.system_prompt.contains(NAME_INSTRUCTION));
}

#[tokio::test]
async fn prior_turns_precede_the_new_message() {
    let harness = TestHarness::with_replies(["one".into(), "two".into()]).unwrap();
    let mut session = harness.session();

    harness.exchange(&mut session, "first").await.unwrap();
    harness.exchange(&mut session, "second").await.unwrap();

    let request = harness.provider.last_request().unwrap();
    let texts: Vec<_> = request
        .messages
        .iter()
        .map(|m| match &m.content[0] {
            ContentBlock::Text { text } => (m.role, text.clone()),
            ContentBlock::Image { .. } => panic!("unexpected image"),
        })
        .collect();
    assert_eq!(
        texts,
        vec![
            (Role::Human, "first".to_string()),
            (Role::Assistant, "one".to_string()),
            (Role::Human, "second".to_string()),
        ]
    );
}

#[tokio::test]
async fn window_is_capped_at_configured_size() {
    let harness = TestHarness::builder()
        .with_config(|c| c.context.window_size = 4)
        .build()
        .unwrap();
    let mut session = harness.session();

    for i in 0..5 {
        harness.exchange(&mut session, &format!("m{i}")).await.unwrap();
    }

    let history = session.history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].content, "m3");
    assert_eq!(history[2].content, "m4");
}

// ---- Fallback and failure ----

#[tokio::test]
async fn blank_reply_uses_fallback() {
    let harness = TestHarness::with_replies([MockReply::Text("   ".into())]).unwrap();
    let mut session = harness.session();

    let outcome = harness.exchange(&mut session, "hello").await.unwrap();

    assert!(outcome.fallback_used);
    assert_eq!(
        outcome.reply,
        "I'm sorry, I couldn't generate a response. Please try again."
    );
    assert_eq!(session.history()[1].content, outcome.reply);
}

#[tokio::test]
async fn completion_error_is_wrapped_and_leaves_session_untouched() {
    let harness = TestHarness::with_replies([MockReply::Fail("quota exceeded".into())]).unwrap();
    let mut session = harness.session();

    let err = harness.exchange(&mut session, "hello").await.unwrap_err();

    assert!(matches!(err, MaddyError::Exchange { .. }));
    let msg = err.to_string();
    assert!(msg.starts_with("failed to process message:"), "got: {msg}");
    assert!(msg.contains("quota exceeded"), "got: {msg}");
    assert!(session.window().is_empty());
    assert_eq!(session.state(), ExchangeState::Failed);

    harness.flush().await;
    assert!(harness.store().documents(Collection::Episodic).is_empty());
    assert_eq!(harness.orchestrator.memory().writer_stats().scheduled, 0);
}

#[tokio::test(start_paused = true)]
async fn completion_timeout_is_wrapped() {
    let harness = TestHarness::builder()
        .with_replies([MockReply::Hang])
        .with_config(|c| c.gemini.timeout_secs = 30)
        .build()
        .unwrap();
    let mut session = harness.session();

    let err = harness.exchange(&mut session, "hello").await.unwrap_err();

    assert!(matches!(err, MaddyError::Exchange { .. }));
    assert!(err.to_string().contains("timed out"), "got: {err}");
    assert!(session.window().is_empty());
    assert_eq!(harness.orchestrator.memory().writer_stats().scheduled, 0);
}

// ---- Memory ----

#[tokio::test]
async fn episodic_write_lands_after_flush() {
    let harness = TestHarness::with_replies(["Rust is a language.".into()]).unwrap();
    let mut session = harness.session();

    harness.exchange(&mut session, "What is Rust?").await.unwrap();
    harness.flush().await;

    let docs = harness.store().documents(Collection::Episodic);
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].content, "User: What is Rust?\nAssistant: Rust is a language.");
    assert_eq!(docs[0].metadata.model.as_deref(), Some(maddy_test_utils::MOCK_MODEL));
}

#[tokio::test]
async fn relevant_past_exchange_is_injected() {
    let harness = TestHarness::with_replies(["Sure.".into()]).unwrap();
    harness.store().seed(
        Collection::Episodic,
        Document::new("User: my favourite pizza is margherita\nAssistant: Noted."),
    );
    let mut session = harness.session();

    harness
        .exchange(&mut session, "Which pizza do I like?")
        .await
        .unwrap();

    let prompt = harness.provider.last_request().unwrap().system_prompt;
    assert!(prompt.contains("--- Relevant Past Conversations ---"), "got: {prompt}");
    assert!(prompt.contains("margherita"));
}

#[tokio::test]
async fn store_failures_never_fail_the_exchange() {
    let harness = TestHarness::with_replies(["still here".into()]).unwrap();
    harness.store().fail_adds(true);
    harness.store().fail_searches(true);
    let mut session = harness.session();

    let outcome = harness
        .exchange(&mut session, "My name is Ravi.")
        .await
        .unwrap();

    assert_eq!(outcome.reply, "still here");
    // The cache still carries what the user just said.
    let prompt = harness.provider.last_request().unwrap().system_prompt;
    assert!(prompt.contains("The user's name is Ravi."));
    assert!(!prompt.contains("Relevant Past Conversations"));
}

#[tokio::test]
async fn stored_name_is_recalled_in_a_new_session() {
    let harness = TestHarness::with_replies(["Hi Maadhu".into(), "Welcome back".into()]).unwrap();

    let mut first = harness.session();
    harness.exchange(&mut first, "My name is Maadhu.").await.unwrap();

    let mut second = harness.session();
    harness.exchange(&mut second, "hello again").await.unwrap();

    let prompt = harness.provider.last_request().unwrap().system_prompt;
    assert!(prompt.contains("The user's name is Maadhu."), "got: {prompt}");
}

#[tokio::test]
async fn profile_is_loaded_once_per_session() {
    let harness = TestHarness::builder().build().unwrap();
    let mut session = harness.session();

    harness.exchange(&mut session, "one").await.unwrap();
    harness.exchange(&mut session, "two").await.unwrap();
    harness.exchange(&mut session, "three").await.unwrap();

    // One profile load plus one episodic search per exchange.
    assert_eq!(harness.store().search_calls(), 1 + 3);
}

#[tokio::test]
async fn disabled_memory_still_answers() {
    let harness = TestHarness::builder()
        .with_replies(["ok".into()])
        .without_memory()
        .build()
        .unwrap();
    let mut session = harness.session();

    let outcome = harness.exchange(&mut session, "Call me Sam").await.unwrap();
    assert_eq!(outcome.reply, "ok");
    let prompt = harness.provider.last_request().unwrap().system_prompt;
    assert!(prompt.contains(NAME_INSTRUCTION));
}

#[tokio::test]
async fn sqlite_memory_round_trip() {
    let harness = TestHarness::builder()
        .with_replies(["Noted.".into(), "You like tea.".into()])
        .with_sqlite_memory()
        .build()
        .unwrap();

    let mut session = harness.session();
    harness
        .exchange(&mut session, "I really enjoy green tea")
        .await
        .unwrap();
    // Drain the writer so the transcript is searchable.
    let memory = harness.orchestrator.memory().clone();
    memory.shutdown(Duration::from_secs(5)).await.unwrap();
    assert_eq!(memory.writer_stats().written, 1);

    let block = memory.session().search_episodic("green tea", 2).await;
    assert!(block.contains("User: I really enjoy green tea"), "got: {block}");
}

// ---- Vision ----

#[tokio::test]
async fn image_goes_to_provider_as_binary_part() {
    let harness = TestHarness::with_replies(["A red square.".into()]).unwrap();
    let mut session = harness.session();

    let outcome = harness
        .orchestrator
        .exchange_with_media(
            &mut session,
            "What is this?",
            &[ImageInput::new("AQID", Some("image/png".into()))],
        )
        .await
        .unwrap();

    assert_eq!(outcome.reply, "A red square.");
    assert!(!outcome.vision_fallback);
    let request = harness.provider.last_request().unwrap();
    assert_eq!(request.image_count(), 1);
    let last = request.messages.last().unwrap();
    assert_eq!(
        last.content,
        vec![
            ContentBlock::Text {
                text: "What is this?".into()
            },
            ContentBlock::Image {
                mime_type: "image/png".into(),
                data: vec![1, 2, 3]
            },
        ]
    );
}

#[tokio::test]
async fn image_only_message_records_placeholder() {
    let harness = TestHarness::with_replies(["Nice photo.".into()]).unwrap();
    let mut session = harness.session();

    harness
        .orchestrator
        .exchange_with_media(&mut session, "", &[ImageInput::new("AQID", None)])
        .await
        .unwrap();

    assert_eq!(session.history()[0].content, "[Image(s) attached]");
}

#[tokio::test]
async fn failing_vision_retries_once_as_text() {
    let harness = TestHarness::with_replies(["I can't see it, sorry.".into()]).unwrap();
    harness.provider.fail_vision(true);
    let mut session = harness.session();

    let outcome = harness
        .orchestrator
        .exchange_with_media(
            &mut session,
            "Describe this",
            &[ImageInput::new("AQID", None), ImageInput::new("BAUG", None)],
        )
        .await
        .unwrap();

    assert!(outcome.vision_fallback);
    assert_eq!(outcome.reply, "I can't see it, sorry.");
    assert_eq!(harness.provider.calls(), 2);

    let retry = harness.provider.last_request().unwrap();
    assert_eq!(retry.image_count(), 0);
    let expected = "[User attached 2 image(s), but they could not be analyzed.]\n\nDescribe this";
    assert_eq!(
        retry.messages.last().unwrap().content,
        vec![ContentBlock::Text {
            text: expected.into()
        }]
    );
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history()[0].content, expected);
}

#[tokio::test]
async fn undecodable_image_falls_back_without_a_vision_call() {
    let harness = TestHarness::with_replies(["text only".into()]).unwrap();
    let mut session = harness.session();

    let outcome = harness
        .orchestrator
        .exchange_with_media(&mut session, "look", &[ImageInput::new("%%%", None)])
        .await
        .unwrap();

    assert!(outcome.vision_fallback);
    assert_eq!(harness.provider.calls(), 1);
}

#[tokio::test]
async fn vision_retry_does_not_rewrite_profile() {
    let harness = TestHarness::with_replies(["ok".into()]).unwrap();
    harness.provider.fail_vision(true);
    let mut session = harness.session();

    harness
        .orchestrator
        .exchange_with_media(&mut session, "Call me Sam", &[ImageInput::new("AQID", None)])
        .await
        .unwrap();

    assert_eq!(harness.store().documents(Collection::Profile).len(), 1);
    let prompt = harness.provider.last_request().unwrap().system_prompt;
    assert!(prompt.contains(NAME_INSTRUCTION));
}

#[tokio::test]
async fn vision_retry_walks_every_exchange_state() {
    let harness = TestHarness::with_replies(["from text".into()]).unwrap();
    harness.provider.fail_vision(true);
    let mut session = harness.session();

    harness
        .orchestrator
        .exchange_with_media(&mut session, "what is it?", &[ImageInput::new("AQID", None)])
        .await
        .unwrap();

    assert_eq!(
        session.trace(),
        &[
            ExchangeState::Start,
            ExchangeState::FactsExtracted,
            ExchangeState::ProfileUpdated,
            ExchangeState::MemoryRetrieved,
            ExchangeState::PromptAssembled,
            ExchangeState::CompletionRequested,
            ExchangeState::Succeeded,
            ExchangeState::WindowUpdated,
            ExchangeState::BackgroundWriteScheduled,
            ExchangeState::Done,
        ]
    );
    assert_eq!(session.exchanges(), 1);
}

#[tokio::test]
async fn text_exchange_trace_matches_vision_retry_trace() {
    let harness = TestHarness::with_replies(["plain".into()]).unwrap();
    let mut session = harness.session();

    harness.exchange(&mut session, "hello").await.unwrap();

    assert_eq!(session.trace().first(), Some(&ExchangeState::Start));
    assert_eq!(session.trace().len(), 10);
    assert_eq!(session.trace().last(), Some(&ExchangeState::Done));
}
