// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-term context and prompt assembly for the Maddy chat assistant.
//!
//! - **Persona**: the static instruction opening every system prompt
//! - **ConversationWindow**: the bounded per-session history
//! - **PromptAssembler**: combines persona, profile facts, episodic memory,
//!   and the window into a [`maddy_core::ProviderRequest`]

pub mod persona;
pub mod prompt;
pub mod window;

pub use persona::Persona;
pub use prompt::{AssembledPrompt, PromptAssembler, assemble, name_instruction};
pub use window::ConversationWindow;
