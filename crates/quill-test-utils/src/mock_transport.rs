// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock assistant transport for deterministic testing.
//!
//! `MockTransport` implements `AssistantTransport` with pre-scripted
//! replies, enabling fast, CI-runnable tests without a backend. Replies are
//! popped from a FIFO queue; when the queue is empty, a default echo
//! response is returned.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use quill_core::traits::{AssistantTransport, StreamSink};
use quill_core::types::{AssistantQuery, AssistantResponse, ChannelId, ProjectId};
use quill_core::QuillError;

/// One scripted stream event delivered before the terminal payload.
#[derive(Debug, Clone)]
pub enum ScriptedFrame {
    Token(String),
    Status(String),
    /// Pause, observing cancellation. Long delays make cancellation windows
    /// deterministic in tests.
    Delay(Duration),
}

/// One scripted round-trip: frames, then the terminal payload.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub frames: Vec<ScriptedFrame>,
    pub response: AssistantResponse,
}

impl MockReply {
    /// A reply that streams the given tokens before the terminal payload.
    pub fn streamed(tokens: &[&str], response: AssistantResponse) -> Self {
        Self {
            frames: tokens
                .iter()
                .map(|t| ScriptedFrame::Token((*t).to_string()))
                .collect(),
            response,
        }
    }

    /// A reply delivered without any streamed tokens (fast path).
    pub fn direct(response: AssistantResponse) -> Self {
        Self {
            frames: Vec::new(),
            response,
        }
    }

    pub fn with_status(mut self, message: &str) -> Self {
        self.frames.insert(0, ScriptedFrame::Status(message.to_string()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.frames.push(ScriptedFrame::Delay(delay));
        self
    }
}

/// A mock transport that replays scripted replies.
pub struct MockTransport {
    replies: Mutex<VecDeque<MockReply>>,
    questions: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            questions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from(replies)),
            questions: Mutex::new(Vec::new()),
        }
    }

    pub async fn add_reply(&self, reply: MockReply) {
        self.replies.lock().await.push_back(reply);
    }

    /// Questions asked so far, in order.
    pub async fn questions(&self) -> Vec<String> {
        self.questions.lock().await.clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssistantTransport for MockTransport {
    async fn ask(
        &self,
        _project: &ProjectId,
        _channel: &ChannelId,
        query: AssistantQuery,
        sink: &dyn StreamSink,
        cancel: CancellationToken,
    ) -> Result<AssistantResponse, QuillError> {
        self.questions.lock().await.push(query.question.clone());

        let reply = self.replies.lock().await.pop_front().unwrap_or_else(|| {
            MockReply::direct(AssistantResponse {
                message: format!("mock answer to: {}", query.question),
                ..AssistantResponse::default()
            })
        });

        for frame in reply.frames {
            if cancel.is_cancelled() {
                return Err(QuillError::Cancelled);
            }
            match frame {
                ScriptedFrame::Token(content) => sink.on_token(&content).await,
                ScriptedFrame::Status(message) => sink.on_status(&message).await,
                ScriptedFrame::Delay(duration) => {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(QuillError::Cancelled),
                        _ = tokio::time::sleep(duration) => {}
                    }
                }
            }
        }
        if cancel.is_cancelled() {
            return Err(QuillError::Cancelled);
        }
        Ok(reply.response)
    }
}

/// A sink that records every event it receives.
#[derive(Default)]
pub struct RecordingSink {
    pub tokens: std::sync::Mutex<Vec<String>>,
    pub statuses: std::sync::Mutex<Vec<String>>,
}

#[async_trait]
impl StreamSink for RecordingSink {
    async fn on_token(&self, content: &str) {
        self.tokens.lock().unwrap().push(content.to_string());
    }

    async fn on_status(&self, message: &str) {
        self.statuses.lock().unwrap().push(message.to_string());
    }
}
