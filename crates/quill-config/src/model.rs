// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Quill client.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup with actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Quill configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuillConfig {
    /// Platform API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Assistant request and display settings.
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Local client identity and logging.
    #[serde(default)]
    pub client: ClientConfig,
}

/// Platform API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL of the platform backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout for REST calls, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Assistant request defaults and reveal pacing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantConfig {
    /// Ask the backend to use extended reasoning.
    #[serde(default)]
    pub reasoning: bool,

    /// Default retrieval scope tags sent with each question.
    #[serde(default)]
    pub scope: Vec<String>,

    /// Fastest per-character reveal interval, in milliseconds.
    #[serde(default = "default_typewriter_min_ms")]
    pub typewriter_min_ms: u64,

    /// Slowest per-character reveal interval, in milliseconds.
    #[serde(default = "default_typewriter_max_ms")]
    pub typewriter_max_ms: u64,

    /// Upper bound on a whole reveal, in milliseconds.
    #[serde(default = "default_typewriter_total_ms")]
    pub typewriter_total_ms: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            reasoning: false,
            scope: Vec::new(),
            typewriter_min_ms: default_typewriter_min_ms(),
            typewriter_max_ms: default_typewriter_max_ms(),
            typewriter_total_ms: default_typewriter_total_ms(),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Bearer token for the platform backend.
    #[serde(default)]
    pub token: String,
}

/// Local client identity and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Display name attached to exchanges this client creates.
    #[serde(default)]
    pub author: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            author: None,
            log_level: default_log_level(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.quill.dev".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_typewriter_min_ms() -> u64 {
    8
}

fn default_typewriter_max_ms() -> u64 {
    40
}

fn default_typewriter_total_ms() -> u64 {
    2500
}

fn default_log_level() -> String {
    "info".to_string()
}
