// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::MaddyConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation instead of failing on the first one.
pub fn validate_config(config: &MaddyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.context.window_size < 2 {
        fail(format!(
            "context.window_size must be at least 2 to hold one exchange, got {}",
            config.context.window_size
        ));
    }

    if config.context.fallback_reply.trim().is_empty() {
        fail("context.fallback_reply must not be empty".to_string());
    }

    let temperature = config.gemini.temperature;
    if !(0.0..=2.0).contains(&temperature) {
        fail(format!(
            "gemini.temperature must be between 0.0 and 2.0, got {temperature}"
        ));
    }

    if config.gemini.max_tokens == 0 {
        fail("gemini.max_tokens must be greater than 0".to_string());
    }

    if config.gemini.timeout_secs == 0 {
        fail("gemini.timeout_secs must be greater than 0".to_string());
    }

    if !config.gemini.base_url.starts_with("http://")
        && !config.gemini.base_url.starts_with("https://")
    {
        fail(format!(
            "gemini.base_url must be an http(s) URL, got `{}`",
            config.gemini.base_url
        ));
    }

    if config.memory.path.trim().is_empty() {
        fail("memory.path must not be empty".to_string());
    }

    if config.memory.write_queue_capacity == 0 {
        fail("memory.write_queue_capacity must be greater than 0".to_string());
    }

    if config.memory.profile_results == 0 {
        fail("memory.profile_results must be greater than 0".to_string());
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        assert!(validate_config(&MaddyConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = MaddyConfig::default();
        config.context.window_size = 1;
        config.gemini.temperature = 3.5;
        config.memory.write_queue_capacity = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3, "got: {errors:?}");
    }

    #[test]
    fn rejects_bad_host() {
        let mut config = MaddyConfig::default();
        config.gateway.host = "local host!".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("gateway.host"));
    }

    #[test]
    fn accepts_ipv6_host() {
        let mut config = MaddyConfig::default();
        config.gateway.host = "::1".into();
        assert!(validate_config(&config).is_ok());
    }
}
