// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the assistant streaming endpoint.
//!
//! Provides [`AssistantClient`] which handles request construction, bearer
//! auth with refresh-once-then-fail semantics, SSE streaming, the plain-JSON
//! non-streaming fallback, and cancellation. Failures other than cancellation
//! degrade into a complete fallback payload embedding whatever partial text
//! accumulated, so an exchange never ends blank or stuck.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use quill_core::traits::{AssistantTransport, CredentialSource, StreamSink};
use quill_core::types::{AssistantQuery, AssistantResponse, ChannelId, ProjectId};
use quill_core::QuillError;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::sse::{self, StreamFrame};

/// Default end-to-end timeout for one assistant request, matching the
/// longest reasoning answers the backend produces.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// HTTP client for the assistant endpoint.
#[derive(Clone)]
pub struct AssistantClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialSource>,
}

impl AssistantClient {
    /// Creates a new assistant client against `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self, QuillError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| QuillError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn endpoint(&self, project: &ProjectId, channel: &ChannelId) -> String {
        format!(
            "{}/projects/{}/discussion/channels/{}/assistant?stream=true",
            self.base_url, project.0, channel.0
        )
    }

    /// Inner request path; errors here are degraded by [`AssistantTransport::ask`].
    async fn try_ask(
        &self,
        project: &ProjectId,
        channel: &ChannelId,
        query: &AssistantQuery,
        sink: &dyn StreamSink,
        cancel: &CancellationToken,
        accumulated: &mut String,
    ) -> Result<AssistantResponse, QuillError> {
        let url = self.endpoint(project, channel);
        let mut token = self.credentials.current().await?;
        let mut refreshed = false;

        let response = loop {
            let send = self.client.post(&url).bearer_auth(&token).json(query).send();
            let response = tokio::select! {
                _ = cancel.cancelled() => return Err(QuillError::Cancelled),
                r = send => r.map_err(|e| QuillError::Transport {
                    message: format!("assistant request failed: {e}"),
                    source: Some(Box::new(e)),
                })?,
            };

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                if refreshed {
                    return Err(QuillError::Auth(format!(
                        "assistant endpoint rejected credentials twice ({status})"
                    )));
                }
                debug!(status = %status, "credentials rejected, refreshing once");
                refreshed = true;
                token = self.credentials.refresh().await?;
                continue;
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(QuillError::Transport {
                    message: format!("assistant endpoint returned {status}: {body}"),
                    source: None,
                });
            }
            break response;
        };

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !content_type.contains("text/event-stream") {
            // The server chose not to stream: the body is the full payload.
            let body = tokio::select! {
                _ = cancel.cancelled() => return Err(QuillError::Cancelled),
                b = response.json::<AssistantResponse>() => b,
            };
            return body.map_err(|e| QuillError::Transport {
                message: format!("failed to parse assistant response body: {e}"),
                source: Some(Box::new(e)),
            });
        }

        let mut stream = sse::parse_sse_stream(response);
        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => return Err(QuillError::Cancelled),
                f = stream.next() => f,
            };
            match frame {
                Some(Ok(StreamFrame::Token { content })) => {
                    accumulated.push_str(&content);
                    sink.on_token(&content).await;
                }
                Some(Ok(StreamFrame::Status { message })) => {
                    sink.on_status(&message).await;
                }
                Some(Ok(StreamFrame::Result { response })) => return Ok(response),
                Some(Ok(StreamFrame::Error { message })) => {
                    warn!(error = %message, "assistant stream reported an error");
                    return Ok(fallback_response(accumulated, Some(&message)));
                }
                Some(Err(e)) => return Err(e),
                // Connection closed without a result frame: the accumulated
                // text is all we will get.
                None => return Ok(fallback_response(accumulated, None)),
            }
        }
    }
}

#[async_trait]
impl AssistantTransport for AssistantClient {
    async fn ask(
        &self,
        project: &ProjectId,
        channel: &ChannelId,
        query: AssistantQuery,
        sink: &dyn StreamSink,
        cancel: CancellationToken,
    ) -> Result<AssistantResponse, QuillError> {
        let mut accumulated = String::new();
        match self
            .try_ask(project, channel, &query, sink, &cancel, &mut accumulated)
            .await
        {
            Ok(response) => Ok(response),
            Err(QuillError::Cancelled) => Err(QuillError::Cancelled),
            Err(e) => {
                warn!(error = %e, "assistant request degraded to fallback payload");
                Ok(fallback_response(&accumulated, Some(&e.to_string())))
            }
        }
    }
}

/// Builds the terminal payload for a request that ended without a `result`
/// frame, embedding whatever partial text streamed so far.
fn fallback_response(partial: &str, error: Option<&str>) -> AssistantResponse {
    let message = match (partial.is_empty(), error) {
        (false, Some(e)) => format!("{partial}\n\n(The response was interrupted: {e})"),
        (true, Some(e)) => format!("The assistant could not complete this request: {e}"),
        (_, None) => partial.to_string(),
    };
    AssistantResponse {
        message,
        ..AssistantResponse::default()
    }
}

/// A fixed bearer token with no refresh path.
///
/// A 401 with static credentials is fatal on the first retry, which matches
/// API-token deployments where refresh is an operator action.
pub struct StaticCredentials {
    token: String,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn current(&self) -> Result<String, QuillError> {
        Ok(self.token.clone())
    }

    async fn refresh(&self) -> Result<String, QuillError> {
        Err(QuillError::Auth(
            "static credentials cannot be refreshed".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::traits::transport::NullSink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;
    use wiremock::matchers::{header, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Credentials that rotate to a fresh token on refresh.
    struct RotatingCredentials {
        tokens: Mutex<Vec<String>>,
        refreshes: AtomicUsize,
    }

    impl RotatingCredentials {
        fn new(tokens: Vec<&str>) -> Self {
            Self {
                tokens: Mutex::new(tokens.into_iter().rev().map(String::from).collect()),
                refreshes: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CredentialSource for RotatingCredentials {
        async fn current(&self) -> Result<String, QuillError> {
            let tokens = self.tokens.lock().await;
            tokens
                .last()
                .cloned()
                .ok_or_else(|| QuillError::Auth("no token".into()))
        }

        async fn refresh(&self) -> Result<String, QuillError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            let mut tokens = self.tokens.lock().await;
            tokens.pop();
            tokens
                .last()
                .cloned()
                .ok_or_else(|| QuillError::Auth("refresh exhausted".into()))
        }
    }

    /// Sink that records tokens and phase labels.
    #[derive(Default)]
    struct RecordingSink {
        tokens: std::sync::Mutex<Vec<String>>,
        statuses: std::sync::Mutex<Vec<String>>,
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

    fn ids() -> (ProjectId, ChannelId) {
        (ProjectId("p1".into()), ChannelId("c1".into()))
    }

    fn query(q: &str) -> AssistantQuery {
        AssistantQuery {
            question: q.into(),
            ..AssistantQuery::default()
        }
    }

    fn sse_body(frames: &[&str]) -> String {
        frames
            .iter()
            .map(|f| format!("data: {f}\n\n"))
            .collect::<String>()
    }

    #[tokio::test]
    async fn streams_tokens_then_result() {
        let server = MockServer::start().await;
        let body = sse_body(&[
            r#"{"type":"status","message":"Searching sources…"}"#,
            r#"{"type":"token","content":"Here"}"#,
            r#"{"type":"token","content":" are 3 papers"}"#,
            r#"{"type":"result","response":{"message":"Here are 3 papers"}}"#,
        ]);
        Mock::given(method("POST"))
            .and(path_regex(r"^/projects/p1/discussion/channels/c1/assistant$"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body, "text/event-stream"),
            )
            .mount(&server)
            .await;

        let client = AssistantClient::new(
            server.uri(),
            Arc::new(StaticCredentials::new("tok")),
        )
        .unwrap();
        let sink = RecordingSink::default();
        let (project, channel) = ids();
        let response = client
            .ask(&project, &channel, query("find papers"), &sink, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.message, "Here are 3 papers");
        assert_eq!(
            *sink.tokens.lock().unwrap(),
            vec!["Here", " are 3 papers"]
        );
        assert_eq!(*sink.statuses.lock().unwrap(), vec!["Searching sources…"]);
    }

    #[tokio::test]
    async fn refreshes_credentials_once_on_401() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_string(r#"{"message":"after refresh"}"#),
            )
            .mount(&server)
            .await;

        let creds = Arc::new(RotatingCredentials::new(vec!["stale", "fresh"]));
        let client = AssistantClient::new(server.uri(), creds.clone()).unwrap();
        let (project, channel) = ids();
        let response = client
            .ask(&project, &channel, query("q"), &NullSink, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.message, "after refresh");
        assert_eq!(creds.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_auth_failure_degrades_without_more_retries() {
        let server = MockServer::start().await;
        // Both tokens rejected; exactly two attempts expected.
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let creds = Arc::new(RotatingCredentials::new(vec!["a", "b"]));
        let client = AssistantClient::new(server.uri(), creds.clone()).unwrap();
        let (project, channel) = ids();
        let response = client
            .ask(&project, &channel, query("q"), &NullSink, CancellationToken::new())
            .await
            .unwrap();

        assert!(response.message.contains("could not complete"));
        assert_eq!(creds.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn plain_json_body_when_server_does_not_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_string(r#"{"message":"not streamed","reasoning_used":true}"#),
            )
            .mount(&server)
            .await;

        let client = AssistantClient::new(
            server.uri(),
            Arc::new(StaticCredentials::new("tok")),
        )
        .unwrap();
        let (project, channel) = ids();
        let response = client
            .ask(&project, &channel, query("q"), &NullSink, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.message, "not streamed");
        assert!(response.reasoning_used);
    }

    #[tokio::test]
    async fn stream_end_without_result_falls_back_to_accumulated_text() {
        let server = MockServer::start().await;
        let body = sse_body(&[
            r#"{"type":"token","content":"partial "}"#,
            r#"{"type":"token","content":"answer"}"#,
        ]);
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body, "text/event-stream"),
            )
            .mount(&server)
            .await;

        let client = AssistantClient::new(
            server.uri(),
            Arc::new(StaticCredentials::new("tok")),
        )
        .unwrap();
        let (project, channel) = ids();
        let response = client
            .ask(&project, &channel, query("q"), &NullSink, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.message, "partial answer");
    }

    #[tokio::test]
    async fn error_frame_embeds_partial_text_and_message() {
        let server = MockServer::start().await;
        let body = sse_body(&[
            r#"{"type":"token","content":"half an answer"}"#,
            r#"{"type":"error","message":"model unavailable"}"#,
        ]);
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body, "text/event-stream"),
            )
            .mount(&server)
            .await;

        let client = AssistantClient::new(
            server.uri(),
            Arc::new(StaticCredentials::new("tok")),
        )
        .unwrap();
        let (project, channel) = ids();
        let response = client
            .ask(&project, &channel, query("q"), &NullSink, CancellationToken::new())
            .await
            .unwrap();

        assert!(response.message.starts_with("half an answer"));
        assert!(response.message.contains("model unavailable"));
    }

    #[tokio::test]
    async fn non_2xx_degrades_into_fallback_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = AssistantClient::new(
            server.uri(),
            Arc::new(StaticCredentials::new("tok")),
        )
        .unwrap();
        let (project, channel) = ids();
        let response = client
            .ask(&project, &channel, query("q"), &NullSink, CancellationToken::new())
            .await
            .unwrap();

        assert!(response.message.contains("could not complete"));
    }

    #[tokio::test]
    async fn cancellation_is_an_error_not_a_fallback() {
        let server = MockServer::start().await;
        // Delay the response so the cancel fires first.
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string("data: {\"type\":\"token\",\"content\":\"x\"}\n\n")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = AssistantClient::new(
            server.uri(),
            Arc::new(StaticCredentials::new("tok")),
        )
        .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (project, channel) = ids();
        let result = client
            .ask(&project, &channel, query("q"), &NullSink, cancel)
            .await;

        assert!(matches!(result, Err(QuillError::Cancelled)));
    }
}
