// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Maddy chat assistant.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Maddy configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MaddyConfig {
    /// Assistant identity and persona settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Google Gemini API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Long-term memory settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Short-term conversation context settings.
    #[serde(default)]
    pub context: ContextConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Assistant identity and persona configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Inline persona instruction. Overridden by `persona_file` if both set.
    #[serde(default)]
    pub persona: Option<String>,

    /// Path to a file containing the persona instruction.
    #[serde(default)]
    pub persona_file: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            persona: None,
            persona_file: None,
        }
    }
}

fn default_agent_name() -> String {
    "MaddyBot".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Google Gemini API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// API key. `None` falls back to `GOOGLE_API_KEY` then `GEMINI_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for text-only completions.
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used when the request carries images.
    #[serde(default = "default_model")]
    pub vision_model: String,

    /// Model used for document embeddings.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// API base URL (override for proxies and tests).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Maximum output tokens per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            vision_model: default_model(),
            embedding_model: default_embedding_model(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_embedding_model() -> String {
    "embedding-001".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    30
}

/// Long-term memory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Enable the memory system. When false, no memory operations occur.
    #[serde(default = "default_memory_enabled")]
    pub enabled: bool,

    /// Directory holding the memory database.
    #[serde(default = "default_memory_path")]
    pub path: String,

    /// Number of past exchanges injected into each prompt.
    #[serde(default = "default_episodic_results")]
    pub episodic_results: usize,

    /// Query used to locate profile documents on first profile read.
    #[serde(default = "default_profile_probe")]
    pub profile_probe: String,

    /// Number of profile documents scanned on first profile read.
    #[serde(default = "default_profile_results")]
    pub profile_results: usize,

    /// Capacity of the background episodic write queue.
    #[serde(default = "default_write_queue_capacity")]
    pub write_queue_capacity: usize,

    /// Seconds to wait for queued writes at shutdown.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_memory_enabled(),
            path: default_memory_path(),
            episodic_results: default_episodic_results(),
            profile_probe: default_profile_probe(),
            profile_results: default_profile_results(),
            write_queue_capacity: default_write_queue_capacity(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

fn default_memory_enabled() -> bool {
    true
}

fn default_memory_path() -> String {
    "./memory".to_string()
}

fn default_episodic_results() -> usize {
    2
}

fn default_profile_probe() -> String {
    "user name information".to_string()
}

fn default_profile_results() -> usize {
    5
}

fn default_write_queue_capacity() -> usize {
    64
}

fn default_drain_timeout_secs() -> u64 {
    5
}

/// Conversation context configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Maximum number of turns kept in the conversation window.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Reply substituted when the model returns blank text.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            fallback_reply: default_fallback_reply(),
        }
    }
}

fn default_window_size() -> usize {
    6
}

fn default_fallback_reply() -> String {
    "I'm sorry, I couldn't generate a response. Please try again.".to_string()
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    5000
}

fn default_max_body_bytes() -> usize {
    50 * 1024 * 1024
}
