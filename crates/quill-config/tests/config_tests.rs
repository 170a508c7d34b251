// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Quill configuration system.

use quill_config::diagnostic::{suggest_key, KNOWN_KEYS};
use quill_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_quill_config() {
    let toml = r#"
[api]
base_url = "https://platform.example.org"
timeout_secs = 30

[assistant]
reasoning = true
scope = ["papers", "notes"]
typewriter_min_ms = 5
typewriter_max_ms = 25
typewriter_total_ms = 2000

[auth]
token = "qt-123"

[client]
author = "ada"
log_level = "debug"
"#;
    let config = load_config_from_str(toml).expect("config should load");
    assert_eq!(config.api.base_url, "https://platform.example.org");
    assert_eq!(config.api.timeout_secs, 30);
    assert!(config.assistant.reasoning);
    assert_eq!(config.assistant.scope, vec!["papers", "notes"]);
    assert_eq!(config.auth.token, "qt-123");
    assert_eq!(config.client.author.as_deref(), Some("ada"));
    assert_eq!(config.client.log_level, "debug");
}

/// An unknown key fails loading and earns a did-you-mean suggestion.
#[test]
fn unknown_key_gets_suggestion() {
    let toml = r#"
[assistant]
typewriter_min = 5
"#;
    let errors = load_and_validate_str(toml).expect_err("typo should be rejected");
    assert!(!errors.is_empty());
    let with_suggestion = errors.iter().find(|e| e.suggestion.is_some());
    assert!(
        with_suggestion.is_some(),
        "expected a suggestion among: {errors:?}"
    );
}

/// Semantic validation runs after deserialization and collects all errors.
#[test]
fn semantic_errors_are_collected_together() {
    let toml = r#"
[api]
base_url = "not-a-url"
timeout_secs = 0
"#;
    let errors = load_and_validate_str(toml).expect_err("invalid values should be rejected");
    assert_eq!(errors.len(), 2, "both problems reported: {errors:?}");
}

/// Type mismatches are reported as load errors, not panics.
#[test]
fn type_mismatch_is_an_error() {
    let toml = r#"
[api]
timeout_secs = "sixty"
"#;
    assert!(load_and_validate_str(toml).is_err());
}

/// The suggestion helper recognizes near-miss dotted keys.
#[test]
fn suggestion_quality_on_known_typos() {
    assert_eq!(
        suggest_key("assistant.typewriter_min", KNOWN_KEYS).as_deref(),
        Some("assistant.typewriter_min_ms")
    );
    assert_eq!(
        suggest_key("auth.tokn", KNOWN_KEYS).as_deref(),
        Some("auth.token")
    );
}

/// Defaults load without any file present.
#[test]
fn defaults_validate_cleanly() {
    let config = load_and_validate_str("").expect("defaults should be valid");
    assert_eq!(config.assistant.typewriter_total_ms, 2500);
}

/// A config file on disk loads through the path-based loader.
#[test]
fn loads_from_explicit_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("quill.toml");
    std::fs::write(&path, "[client]\nauthor = \"grace\"\n").expect("write config");

    let config = quill_config::load_config_from_path(&path).expect("config should load");
    assert_eq!(config.client.author.as_deref(), Some("grace"));
}
