// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Citation and markdown post-processing for assistant answers.
//!
//! Pure functions: resolve inline `[n]` reference markers against the
//! response's citation list and strip internal control blocks the backend
//! embeds for its own bookkeeping. No I/O, no state.

use quill_core::types::Citation;

/// Opening/closing tags of backend control blocks that must never render.
const INTERNAL_OPEN: &str = "<internal>";
const INTERNAL_CLOSE: &str = "</internal>";

/// Formats a raw assistant message for display.
///
/// Strips control blocks first so markers inside them are never resolved.
pub fn format_message(text: &str, citations: &[Citation]) -> String {
    let stripped = strip_internal_blocks(text);
    resolve_citations(&stripped, citations)
}

/// Removes `<internal>…</internal>` spans. An unclosed block is stripped to
/// the end of the text.
pub fn strip_internal_blocks(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find(INTERNAL_OPEN) {
        result.push_str(&rest[..open]);
        let after_open = &rest[open + INTERNAL_OPEN.len()..];
        match after_open.find(INTERNAL_CLOSE) {
            Some(close) => rest = &after_open[close + INTERNAL_CLOSE.len()..],
            None => return result,
        }
    }
    result.push_str(rest);
    result
}

/// Replaces `[n]` markers with display labels from the citation list.
///
/// A marker with a known citation becomes `[Title](url)` (or `[Title]`
/// without a url); unknown markers are left untouched.
pub fn resolve_citations(text: &str, citations: &[Citation]) -> String {
    if citations.is_empty() {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'[' {
            // Candidate marker: '[' digits ']'
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > i + 1 && j < bytes.len() && bytes[j] == b']' {
                let marker: u32 = text[i + 1..j].parse().unwrap_or(0);
                if let Some(citation) = citations.iter().find(|c| c.marker == marker) {
                    match &citation.url {
                        Some(url) => {
                            result.push_str(&format!("[{}]({url})", citation.title));
                        }
                        None => {
                            result.push_str(&format!("[{}]", citation.title));
                        }
                    }
                    i = j + 1;
                    continue;
                }
            }
        }
        let ch_len = text[i..].chars().next().map(char::len_utf8).unwrap_or(1);
        result.push_str(&text[i..i + ch_len]);
        i += ch_len;
    }
    result
}
