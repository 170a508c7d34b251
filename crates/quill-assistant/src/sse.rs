// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for assistant endpoint streaming responses.
//!
//! Converts a reqwest response byte stream into typed [`StreamFrame`] variants
//! using the `eventsource-stream` crate, so frames split across arbitrary
//! chunk boundaries are reassembled correctly. The assistant protocol tags
//! frames in the JSON `data:` payload rather than the SSE event name.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use quill_core::types::AssistantResponse;
use quill_core::QuillError;

/// Typed frames from the assistant streaming protocol.
#[derive(Debug, Clone)]
pub enum StreamFrame {
    /// A text token appended to the answer. Strictly ordered.
    Token { content: String },
    /// Replaces the current phase label; does not affect accumulated text.
    Status { message: String },
    /// Terminal: the final structured payload. No meaningful frames follow.
    Result { response: AssistantResponse },
    /// Terminal: the backend reported a failure mid-answer.
    Error { message: String },
}

/// Parses a reqwest streaming response into a stream of typed [`StreamFrame`]s.
///
/// Unknown frame types are silently skipped so newer backends never break the
/// client. Frames whose `data:` payload is not valid JSON are surfaced as
/// error items; the caller degrades to the accumulated text rather than
/// aborting the exchange.
pub fn parse_sse_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<StreamFrame, QuillError>> + Send>> {
    let event_stream = response.bytes_stream().eventsource();

    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => parse_frame(&event.data),
            Err(e) => Some(Err(QuillError::Transport {
                message: format!("SSE stream error: {e}"),
                source: Some(Box::new(e)),
            })),
        }
    });

    Box::pin(mapped)
}

/// Decodes one `data:` payload. Returns `None` for frames to skip.
fn parse_frame(data: &str) -> Option<Result<StreamFrame, QuillError>> {
    // Keep-alive comments arrive as empty data lines.
    if data.trim().is_empty() {
        return None;
    }

    let mut value: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            return Some(Err(QuillError::Transport {
                message: format!("malformed stream frame: {e}"),
                source: Some(Box::new(e)),
            }));
        }
    };

    let kind = value.get("type").and_then(|v| v.as_str()).unwrap_or_default();
    let frame = match kind {
        "token" => StreamFrame::Token {
            content: value
                .get("content")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        },
        "status" => StreamFrame::Status {
            message: value
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        },
        "result" => {
            // The payload may be nested under "response" or flattened.
            let payload = match value.get_mut("response") {
                Some(p) => p.take(),
                None => {
                    if let Some(obj) = value.as_object_mut() {
                        obj.remove("type");
                    }
                    value
                }
            };
            match serde_json::from_value::<AssistantResponse>(payload) {
                Ok(response) => StreamFrame::Result { response },
                Err(e) => {
                    return Some(Err(QuillError::Transport {
                        message: format!("malformed result frame: {e}"),
                        source: Some(Box::new(e)),
                    }));
                }
            }
        }
        "error" => StreamFrame::Error {
            message: value
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("assistant reported an error")
                .to_string(),
        },
        // Unknown frame types are skipped for forward compatibility.
        _ => return None,
    };
    Some(Ok(frame))
}
