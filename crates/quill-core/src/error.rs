// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Quill client engine.

use thiserror::Error;

/// The primary error type used across all Quill crates.
#[derive(Debug, Error)]
pub enum QuillError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Streaming transport errors (network failure, non-2xx, malformed event frame).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication failed after the single credential refresh attempt.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// REST API errors (history, paper actions, reference search, uploads).
    #[error("api error: {message}")]
    Api {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A suggested action carried a payload the dispatcher cannot apply.
    #[error("action error: {0}")]
    Action(String),

    /// The request was cancelled by the caller. Not a failure.
    #[error("request cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl QuillError {
    /// True when the error is a user-initiated cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, QuillError::Cancelled)
    }
}
