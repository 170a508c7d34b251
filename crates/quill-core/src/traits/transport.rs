// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport seam for the assistant endpoint.
//!
//! The real implementation lives in `quill-assistant`; tests substitute a
//! scripted mock from `quill-test-utils`.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::QuillError;
use crate::types::{AssistantQuery, AssistantResponse, ChannelId, ProjectId};

/// Receives incremental stream events for one in-flight exchange.
///
/// Tokens are delivered strictly in arrival order. After the transport
/// returns (or the request is cancelled) no further callbacks fire.
#[async_trait]
pub trait StreamSink: Send + Sync {
    /// A text token was appended to the answer.
    async fn on_token(&self, content: &str);

    /// The backend replaced the current phase label ("Searching sources…").
    async fn on_status(&self, message: &str);
}

/// A sink that drops all events. Useful for fire-and-forget requests.
pub struct NullSink;

#[async_trait]
impl StreamSink for NullSink {
    async fn on_token(&self, _content: &str) {}
    async fn on_status(&self, _message: &str) {}
}

/// Opens a streaming request to the assistant and drives it to completion.
#[async_trait]
pub trait AssistantTransport: Send + Sync {
    /// Asks `query.question` on the given channel.
    ///
    /// Streams tokens and phase labels into `sink` and resolves with the
    /// final structured payload. Implementations must return
    /// [`QuillError::Cancelled`] and stop emitting sink events once `cancel`
    /// is triggered, and must degrade transport failures into a complete
    /// fallback response embedding whatever partial text accumulated.
    async fn ask(
        &self,
        project: &ProjectId,
        channel: &ChannelId,
        query: AssistantQuery,
        sink: &dyn StreamSink,
        cancel: CancellationToken,
    ) -> Result<AssistantResponse, QuillError>;
}
