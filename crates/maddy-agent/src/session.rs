// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session state for a single conversation.
//!
//! A [`SessionContext`] owns the conversation window and the session's view of
//! memory. The caller owns its lifecycle and lends it mutably to each
//! exchange, so one session never runs two exchanges at once.
//!
//! Each exchange walks the states Start -> FactsExtracted -> ProfileUpdated ->
//! MemoryRetrieved -> PromptAssembled -> CompletionRequested -> Succeeded |
//! Failed -> WindowUpdated -> BackgroundWriteScheduled -> Done.

use chrono::{DateTime, Utc};
use maddy_context::ConversationWindow;
use maddy_core::types::{SessionId, Turn};
use maddy_memory::SessionMemory;
use tracing::debug;

/// States in the exchange FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// No exchange has run yet, or a new one is starting.
    Start,
    FactsExtracted,
    ProfileUpdated,
    MemoryRetrieved,
    PromptAssembled,
    CompletionRequested,
    Succeeded,
    /// The completion failed; window and memory were left untouched.
    Failed,
    WindowUpdated,
    BackgroundWriteScheduled,
    Done,
}

impl std::fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeState::Start => write!(f, "start"),
            ExchangeState::FactsExtracted => write!(f, "facts_extracted"),
            ExchangeState::ProfileUpdated => write!(f, "profile_updated"),
            ExchangeState::MemoryRetrieved => write!(f, "memory_retrieved"),
            ExchangeState::PromptAssembled => write!(f, "prompt_assembled"),
            ExchangeState::CompletionRequested => write!(f, "completion_requested"),
            ExchangeState::Succeeded => write!(f, "succeeded"),
            ExchangeState::Failed => write!(f, "failed"),
            ExchangeState::WindowUpdated => write!(f, "window_updated"),
            ExchangeState::BackgroundWriteScheduled => write!(f, "background_write_scheduled"),
            ExchangeState::Done => write!(f, "done"),
        }
    }
}

/// Everything one conversation carries between exchanges.
pub struct SessionContext {
    id: SessionId,
    window: ConversationWindow,
    memory: SessionMemory,
    state: ExchangeState,
    /// States visited since the last `Start`.
    trace: Vec<ExchangeState>,
    exchanges: u64,
    created_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(id: SessionId, window_size: usize, memory: SessionMemory) -> Self {
        Self {
            id,
            window: ConversationWindow::new(window_size),
            memory,
            state: ExchangeState::Start,
            trace: Vec::new(),
            exchanges: 0,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns the current exchange state.
    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// States the latest exchange attempt passed through, starting at `Start`.
    ///
    /// A vision exchange that fell back to text reports the text retry.
    pub fn trace(&self) -> &[ExchangeState] {
        &self.trace
    }

    pub fn window(&self) -> &ConversationWindow {
        &self.window
    }

    /// Recent turns, oldest first.
    pub fn history(&self) -> Vec<Turn> {
        self.window.recent()
    }

    pub fn memory(&self) -> &SessionMemory {
        &self.memory
    }

    /// Number of exchanges that completed successfully.
    pub fn exchanges(&self) -> u64 {
        self.exchanges
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn window_mut(&mut self) -> &mut ConversationWindow {
        &mut self.window
    }

    pub(crate) fn transition(&mut self, next: ExchangeState) {
        debug!(session_id = %self.id, from = %self.state, to = %next, "exchange state");
        self.state = next;
        if next == ExchangeState::Start {
            self.trace.clear();
        }
        self.trace.push(next);
        if next == ExchangeState::Done {
            self.exchanges += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maddy_memory::MemorySystem;

    fn session() -> SessionContext {
        SessionContext::new(SessionId("s-1".into()), 4, MemorySystem::disabled().session())
    }

    #[test]
    fn new_session_starts_empty() {
        let s = session();
        assert_eq!(s.state(), ExchangeState::Start);
        assert!(s.window().is_empty());
        assert_eq!(s.window().capacity(), 4);
        assert_eq!(s.exchanges(), 0);
        assert_eq!(s.id().to_string(), "s-1");
    }

    #[test]
    fn done_counts_an_exchange() {
        let mut s = session();
        s.transition(ExchangeState::Failed);
        assert_eq!(s.exchanges(), 0);
        s.transition(ExchangeState::Done);
        assert_eq!(s.exchanges(), 1);
        assert_eq!(s.state(), ExchangeState::Done);
    }

    #[test]
    fn start_resets_the_trace() {
        let mut s = session();
        s.transition(ExchangeState::Start);
        s.transition(ExchangeState::FactsExtracted);
        s.transition(ExchangeState::Failed);
        s.transition(ExchangeState::Start);
        s.transition(ExchangeState::FactsExtracted);
        assert_eq!(
            s.trace(),
            &[ExchangeState::Start, ExchangeState::FactsExtracted]
        );
    }

    #[test]
    fn state_display() {
        assert_eq!(ExchangeState::Start.to_string(), "start");
        assert_eq!(
            ExchangeState::BackgroundWriteScheduled.to_string(),
            "background_write_scheduled"
        );
        assert_eq!(ExchangeState::Failed.to_string(), "failed");
    }
}
