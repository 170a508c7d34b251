// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the platform REST endpoints.
//!
//! Shares the transport conventions of the assistant client: bearer auth
//! with a single credential refresh on 401/403, one retry after a 1-second
//! delay on transient errors (429, 500, 503), and error bodies folded into
//! the returned error message.

use std::sync::Arc;
use std::time::Duration;

use quill_core::traits::CredentialSource;
use quill_core::types::{AssistantExchange, ChannelId, ProjectId};
use quill_core::QuillError;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{
    BatchSearchResults, ExchangeRecord, PaperActionResult, PaperActionType, SearchResults,
    TopicResults,
};

/// HTTP client for history, paper actions, uploads, and reference search.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialSource>,
    max_retries: u32,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self, QuillError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| QuillError::Api {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            max_retries: 1,
        })
    }

    /// Fetches the persisted exchange log for a channel, oldest first.
    pub async fn fetch_history(
        &self,
        project: &ProjectId,
        channel: &ChannelId,
    ) -> Result<Vec<AssistantExchange>, QuillError> {
        let url = format!(
            "{}/projects/{}/discussion/channels/{}/assistant/history",
            self.base_url, project.0, channel.0
        );
        let records: Vec<ExchangeRecord> = self
            .send_json(|client, token| client.get(&url).bearer_auth(token))
            .await?;
        Ok(records.into_iter().map(ExchangeRecord::into_exchange).collect())
    }

    /// Executes a paper action (`add_reference`, `create_paper`, `edit_paper`).
    pub async fn execute_paper_action(
        &self,
        project: &ProjectId,
        action: PaperActionType,
        payload: serde_json::Value,
    ) -> Result<PaperActionResult, QuillError> {
        let url = format!("{}/projects/{}/papers/actions", self.base_url, project.0);
        let body = serde_json::json!({ "action_type": action, "payload": payload });
        self.send_json(|client, token| client.post(&url).bearer_auth(token).json(&body))
            .await
    }

    /// Uploads a PDF for a library reference. Binary outcome, no progress.
    pub async fn upload_pdf(
        &self,
        project: &ProjectId,
        reference_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<(), QuillError> {
        let url = format!(
            "{}/projects/{}/references/{}/pdf",
            self.base_url, project.0, reference_id
        );
        // Multipart forms are consumed on send, so each attempt rebuilds one.
        let file_name = file_name.to_string();
        let make_form = move || {
            let part = reqwest::multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
            reqwest::multipart::Form::new().part("file", part)
        };
        let _: serde_json::Value = self
            .send_json(move |client, token| {
                client.post(&url).bearer_auth(token).multipart(make_form())
            })
            .await?;
        Ok(())
    }

    /// Searches for candidate papers.
    pub async fn search_references(
        &self,
        project: &ProjectId,
        query: &str,
    ) -> Result<SearchResults, QuillError> {
        let url = format!("{}/projects/{}/references/search", self.base_url, project.0);
        self.send_json(|client, token| {
            client.get(&url).bearer_auth(token).query(&[("query", query)])
        })
        .await
    }

    /// Batch-search variant: one result set per topic.
    pub async fn batch_search_references(
        &self,
        project: &ProjectId,
        topics: &[String],
    ) -> Result<Vec<TopicResults>, QuillError> {
        let url = format!(
            "{}/projects/{}/references/search/batch",
            self.base_url, project.0
        );
        let body = serde_json::json!({ "topics": topics });
        let batch: BatchSearchResults = self
            .send_json(|client, token| client.post(&url).bearer_auth(token).json(&body))
            .await?;
        Ok(batch.results)
    }

    /// Sends a request with auth-refresh-once and transient-retry-once.
    async fn send_json<T, F>(&self, build: F) -> Result<T, QuillError>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client, &str) -> reqwest::RequestBuilder,
    {
        let mut token = self.credentials.current().await?;
        let mut refreshed = false;
        let mut attempt = 0u32;

        loop {
            let response = build(&self.client, &token)
                .send()
                .await
                .map_err(|e| QuillError::Api {
                    message: format!("request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;
            let status = response.status();
            debug!(status = %status, attempt, "api response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| QuillError::Api {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                return serde_json::from_str(&body).map_err(|e| QuillError::Api {
                    message: format!("failed to parse response: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                if refreshed {
                    return Err(QuillError::Auth(format!(
                        "api rejected credentials twice ({status})"
                    )));
                }
                refreshed = true;
                token = self.credentials.refresh().await?;
                continue;
            }

            if is_transient_error(status) && attempt < self.max_retries {
                attempt += 1;
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient api error, will retry");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(QuillError::Api {
                message: format!("api returned {status}: {body}"),
                source: None,
            });
        }
    }
}

/// Transient statuses worth one retry.
fn is_transient_error(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}
