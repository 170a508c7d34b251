// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered TOML configuration for the Quill client.
//!
//! Figment merges compiled defaults, the XDG file hierarchy, and `QUILL_*`
//! environment variables; unknown keys are rejected with did-you-mean
//! suggestions and semantic validation collects every problem at once.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::QuillConfig;

use diagnostic::{suggest_key, unknown_field, KNOWN_KEYS};

/// Loads from the XDG hierarchy and validates. Collects every error.
pub fn load_and_validate() -> Result<QuillConfig, Vec<ConfigError>> {
    finish(loader::load_config())
}

/// Loads from a TOML string and validates.
pub fn load_and_validate_str(toml_content: &str) -> Result<QuillConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content))
}

fn finish(loaded: Result<QuillConfig, figment::Error>) -> Result<QuillConfig, Vec<ConfigError>> {
    let config = loaded.map_err(|e| {
        e.into_iter()
            .map(|err| {
                let message = err.to_string();
                let suggestion = unknown_field(&message)
                    .and_then(|field| suggest_key(field, KNOWN_KEYS));
                ConfigError {
                    message,
                    suggestion,
                }
            })
            .collect::<Vec<_>>()
    })?;

    let errors = validation::validate(&config);
    if errors.is_empty() {
        Ok(config)
    } else {
        Err(errors)
    }
}
