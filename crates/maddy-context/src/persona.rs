// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loads the static persona instruction that opens every system prompt.

use maddy_config::model::AgentConfig;
use tracing::{info, warn};

/// The assistant's persona instruction, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    text: String,
}

impl Persona {
    /// Loads the persona from config.
    ///
    /// # Priority
    /// 1. `persona_file`, read from disk and trimmed
    /// 2. `persona`, inline string
    /// 3. Default: "You are {name}, a helpful AI assistant. ..."
    ///
    /// An unreadable or empty file falls through to the next source.
    pub async fn load(config: &AgentConfig) -> Self {
        if let Some(ref file_path) = config.persona_file {
            match tokio::fs::read_to_string(file_path).await {
                Ok(content) if !content.trim().is_empty() => {
                    info!(path = file_path.as_str(), "loaded persona from file");
                    return Self::new(content.trim());
                }
                Ok(_) => {
                    warn!(path = file_path.as_str(), "persona file is empty, falling back");
                }
                Err(e) => {
                    warn!(
                        path = file_path.as_str(),
                        error = %e,
                        "failed to read persona file, falling back"
                    );
                }
            }
        }

        if let Some(ref persona) = config.persona
            && !persona.trim().is_empty()
        {
            return Self::new(persona.clone());
        }

        Self::default_for(&config.name)
    }

    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The built-in persona for an assistant called `name`.
    pub fn default_for(name: &str) -> Self {
        Self::new(format!(
            "You are {name}, a helpful AI assistant. Be friendly, concise, and direct. \
             Keep responses brief unless detailed explanation is requested."
        ))
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_persona_uses_agent_name() {
        let persona = Persona::load(&AgentConfig::default()).await;
        assert!(persona.text().starts_with("You are MaddyBot, a helpful AI assistant."));
        assert!(persona.text().ends_with("detailed explanation is requested."));
    }

    #[tokio::test]
    async fn inline_persona_overrides_default() {
        let config = AgentConfig {
            persona: Some("Custom persona.".into()),
            ..Default::default()
        };
        assert_eq!(Persona::load(&config).await.text(), "Custom persona.");
    }

    #[tokio::test]
    async fn file_persona_overrides_inline() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("persona.md");
        std::fs::write(&file_path, "  File-based persona.\n").unwrap();

        let config = AgentConfig {
            persona: Some("Inline.".into()),
            persona_file: Some(file_path.to_string_lossy().into_owned()),
            ..Default::default()
        };
        assert_eq!(Persona::load(&config).await.text(), "File-based persona.");
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_inline() {
        let config = AgentConfig {
            persona: Some("Fallback.".into()),
            persona_file: Some("/nonexistent/persona.md".into()),
            ..Default::default()
        };
        assert_eq!(Persona::load(&config).await.text(), "Fallback.");
    }
}
