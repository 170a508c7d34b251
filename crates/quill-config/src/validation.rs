// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic validation applied after deserialization.

use crate::diagnostic::ConfigError;
use crate::model::QuillConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Collects every semantic problem rather than stopping at the first.
pub fn validate(config: &QuillConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if !config.api.base_url.starts_with("http://") && !config.api.base_url.starts_with("https://") {
        errors.push(ConfigError::new(format!(
            "api.base_url must be an http(s) URL, got `{}`",
            config.api.base_url
        )));
    }
    if config.api.timeout_secs == 0 {
        errors.push(ConfigError::new("api.timeout_secs must be greater than 0"));
    }
    if config.assistant.typewriter_min_ms > config.assistant.typewriter_max_ms {
        errors.push(ConfigError::new(format!(
            "assistant.typewriter_min_ms ({}) must not exceed typewriter_max_ms ({})",
            config.assistant.typewriter_min_ms, config.assistant.typewriter_max_ms
        )));
    }
    if !LOG_LEVELS.contains(&config.client.log_level.as_str()) {
        errors.push(
            ConfigError::new(format!(
                "client.log_level must be one of {LOG_LEVELS:?}, got `{}`",
                config.client.log_level
            ))
            .with_suggestion("client.log_level = \"info\""),
        );
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&QuillConfig::default()).is_empty());
    }

    #[test]
    fn bad_url_and_zero_timeout_are_both_reported() {
        let mut config = QuillConfig::default();
        config.api.base_url = "ftp://nope".into();
        config.api.timeout_secs = 0;
        let errors = validate(&config);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn inverted_typewriter_bounds_are_rejected() {
        let mut config = QuillConfig::default();
        config.assistant.typewriter_min_ms = 100;
        config.assistant.typewriter_max_ms = 10;
        assert_eq!(validate(&config).len(), 1);
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let mut config = QuillConfig::default();
        config.client.log_level = "verbose".into();
        assert_eq!(validate(&config).len(), 1);
    }
}
