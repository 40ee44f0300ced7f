// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly from persona, profile facts, episodic memory, and the window.

use maddy_core::types::{
    ContentBlock, NAME_FACT, ProfileFacts, ProviderMessage, ProviderRequest, Role,
};

use crate::persona::Persona;
use crate::window::ConversationWindow;

/// A fully assembled prompt, before generation parameters are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledPrompt {
    pub system_prompt: String,
    /// Window turns oldest-first, then the new human message.
    pub messages: Vec<ProviderMessage>,
}

impl AssembledPrompt {
    pub fn into_request(self, max_tokens: u32, temperature: f32) -> ProviderRequest {
        ProviderRequest {
            system_prompt: self.system_prompt,
            messages: self.messages,
            max_tokens,
            temperature,
        }
    }
}

/// Deterministic prompt assembly.
///
/// The system prompt is the persona, then a name-binding instruction when the
/// profile holds a name, then the episodic block verbatim when non-empty.
/// No truncation happens here; the window already bounds the history.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    persona: Persona,
    max_tokens: u32,
    temperature: f32,
}

impl PromptAssembler {
    pub fn new(persona: Persona, max_tokens: u32, temperature: f32) -> Self {
        Self {
            persona,
            max_tokens,
            temperature,
        }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Assembles a completion request for one exchange.
    pub fn assemble(
        &self,
        facts: &ProfileFacts,
        episodic: &str,
        window: &ConversationWindow,
        human: Vec<ContentBlock>,
    ) -> ProviderRequest {
        assemble(self.persona.text(), facts, episodic, window, human)
            .into_request(self.max_tokens, self.temperature)
    }
}

/// Builds the system prompt and message list for one exchange.
pub fn assemble(
    persona: &str,
    facts: &ProfileFacts,
    episodic: &str,
    window: &ConversationWindow,
    human: Vec<ContentBlock>,
) -> AssembledPrompt {
    let mut system_prompt = persona.to_string();

    if let Some(name) = facts.get(NAME_FACT) {
        system_prompt.push_str("\n\n");
        system_prompt.push_str(&name_instruction(name));
    }

    if !episodic.is_empty() {
        system_prompt.push_str("\n\n");
        system_prompt.push_str(episodic);
    }

    let mut messages: Vec<ProviderMessage> = window
        .iter()
        .map(|turn| ProviderMessage::text(turn.role, turn.content.clone()))
        .collect();
    messages.push(ProviderMessage {
        role: Role::Human,
        content: human,
    });

    AssembledPrompt {
        system_prompt,
        messages,
    }
}

/// The instruction binding the assistant's form of address to the user's name.
pub fn name_instruction(name: &str) -> String {
    format!(
        "IMPORTANT: The user's name is {name}. Always use this name when addressing them. \
         Remember this name for future conversations."
    )
}
