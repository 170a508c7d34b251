// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Actionable configuration error reporting with did-you-mean suggestions.

/// A configuration problem with an optional key suggestion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    pub message: String,
    pub suggestion: Option<String>,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Every recognized config key, dotted, for suggestion matching.
pub const KNOWN_KEYS: &[&str] = &[
    "api.base_url",
    "api.timeout_secs",
    "assistant.reasoning",
    "assistant.scope",
    "assistant.typewriter_min_ms",
    "assistant.typewriter_max_ms",
    "assistant.typewriter_total_ms",
    "auth.token",
    "client.author",
    "client.log_level",
];

/// Suggests the closest known key for an unknown one, if any is close enough.
///
/// Serde reports bare field names while the known list is dotted, so each
/// candidate is scored against both its full key and its final segment.
pub fn suggest_key(unknown: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .map(|k| {
            let leaf = k.rsplit('.').next().unwrap_or(k);
            let score =
                strsim::jaro_winkler(unknown, k).max(strsim::jaro_winkler(unknown, leaf));
            (*k, score)
        })
        .filter(|(_, score)| *score >= 0.85)
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(k, _)| k.to_string())
}

/// Extracts the backtick-quoted field from a serde "unknown field" message.
pub fn unknown_field(message: &str) -> Option<&str> {
    let rest = message.split("unknown field `").nth(1)?;
    rest.split('`').next()
}

/// Renders errors to stderr, one per line, with suggestions indented.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        eprintln!("quill: config error: {}", error.message);
        if let Some(suggestion) = &error.suggestion {
            eprintln!("       did you mean `{suggestion}`?");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_key() {
        let suggestion = suggest_key("api.base_ulr", KNOWN_KEYS);
        assert_eq!(suggestion.as_deref(), Some("api.base_url"));
    }

    #[test]
    fn suggests_from_bare_field_name() {
        // Serde's unknown-field messages carry the bare name only.
        let suggestion = suggest_key("base_ulr", KNOWN_KEYS);
        assert_eq!(suggestion.as_deref(), Some("api.base_url"));
    }

    #[test]
    fn no_suggestion_for_distant_key() {
        assert!(suggest_key("zzz.qqq", KNOWN_KEYS).is_none());
    }

    #[test]
    fn extracts_unknown_field_from_serde_message() {
        let msg = "unknown field `base_ulr`, expected one of `base_url`, `timeout_secs`";
        assert_eq!(unknown_field(msg), Some("base_ulr"));
        assert_eq!(unknown_field("something else"), None);
    }
}
