// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./maddy.toml` > `~/.config/maddy/maddy.toml` > `/etc/maddy/maddy.toml`
//! with environment variable overrides via `MADDY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MaddyConfig;

/// Sections recognized by the env var mapping, in match order.
const SECTIONS: &[&str] = &["agent", "gemini", "memory", "context", "gateway"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/maddy/maddy.toml` (system-wide)
/// 3. `~/.config/maddy/maddy.toml` (user XDG config)
/// 4. `./maddy.toml` (local directory)
/// 5. `MADDY_*` environment variables
pub fn load_config() -> Result<MaddyConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<MaddyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MaddyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MaddyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MaddyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MaddyConfig::default()))
        .merge(Toml::file("/etc/maddy/maddy.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("maddy/maddy.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("maddy.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `MADDY_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys contain
/// underscores: `MADDY_MEMORY_WRITE_QUEUE_CAPACITY` must become
/// `memory.write_queue_capacity`.
fn env_provider() -> Env {
    Env::prefixed("MADDY_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name onto a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("agent_name"), "agent.name");
        assert_eq!(
            map_env_key("memory_write_queue_capacity"),
            "memory.write_queue_capacity"
        );
        assert_eq!(map_env_key("gemini_api_key"), "gemini.api_key");
        assert_eq!(map_env_key("context_window_size"), "context.window_size");
    }

    #[test]
    fn unknown_section_is_left_alone() {
        assert_eq!(map_env_key("telemetry_enabled"), "telemetry_enabled");
    }

    #[test]
    fn env_overrides_toml_in_jail() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("maddy.toml", "[gateway]\nport = 6000\n")?;
            jail.set_env("MADDY_GATEWAY_PORT", "7000");
            jail.set_env("MADDY_MEMORY_EPISODIC_RESULTS", "4");

            let config = load_config_from_path(Path::new("maddy.toml"))?;
            assert_eq!(config.gateway.port, 7000);
            assert_eq!(config.memory.episodic_results, 4);
            Ok(())
        });
    }
}
