// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded short-term conversation window.

use std::collections::VecDeque;

use maddy_core::types::Turn;

/// Ordered buffer of the most recent turns, capped at a fixed capacity.
///
/// Appending past capacity evicts the oldest turns first. The window is
/// never persisted; it lives and dies with its session.
#[derive(Debug, Clone)]
pub struct ConversationWindow {
    turns: VecDeque<Turn>,
    capacity: usize,
}

impl ConversationWindow {
    /// Creates an empty window. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Appends a turn, evicting from the front until `len() <= capacity()`.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
        }
    }

    /// Appends a human message and the assistant's reply as two turns.
    pub fn append_exchange(&mut self, human: impl Into<String>, assistant: impl Into<String>) {
        self.append(Turn::human(human));
        self.append(Turn::assistant(assistant));
    }

    /// Returns the retained turns, oldest first.
    pub fn recent(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    /// Iterates the retained turns without cloning.
    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
