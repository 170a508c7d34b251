// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./quill.toml` > `~/.config/quill/quill.toml` >
//! `/etc/quill/quill.toml` with environment variable overrides via the
//! `QUILL_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::QuillConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/quill/quill.toml` (system-wide)
/// 3. `~/.config/quill/quill.toml` (user XDG config)
/// 4. `./quill.toml` (local directory)
/// 5. `QUILL_*` environment variables
pub fn load_config() -> Result<QuillConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<QuillConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(QuillConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<QuillConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(QuillConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for
/// diagnostic use so callers can inspect source metadata).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(QuillConfig::default()))
        .merge(Toml::file("/etc/quill/quill.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("quill/quill.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("quill.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so underscore-containing
/// key names stay unambiguous: `QUILL_ASSISTANT_TYPEWRITER_MIN_MS` must map
/// to `assistant.typewriter_min_ms`, not `assistant.typewriter.min.ms`.
fn env_provider() -> Env {
    Env::prefixed("QUILL_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("api_", "api.", 1)
            .replacen("assistant_", "assistant.", 1)
            .replacen("auth_", "auth.", 1)
            .replacen("client_", "client.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.api.timeout_secs, 60);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[api]
base_url = "https://staging.quill.dev"

[assistant]
reasoning = true
typewriter_max_ms = 20
"#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://staging.quill.dev");
        assert!(config.assistant.reasoning);
        assert_eq!(config.assistant.typewriter_max_ms, 20);
        // Untouched keys keep their defaults.
        assert_eq!(config.assistant.typewriter_min_ms, 8);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result = load_config_from_str(
            r#"
[api]
base_ulr = "typo"
"#,
        );
        assert!(result.is_err());
    }
}
