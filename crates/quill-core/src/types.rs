// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Quill workspace.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

/// Unique identifier for a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

/// Unique identifier for a discussion channel within a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

/// Unique identifier for an assistant exchange.
///
/// Locally generated (UUID v4) until the server assigns the persisted id;
/// the store reconciles the two during history merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeId(pub String);

impl std::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ExchangeId {
    /// Generates a fresh client-side id for an optimistic placeholder.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Lifecycle state of an assistant exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExchangeStatus {
    /// Placeholder inserted optimistically, no text yet.
    Pending,
    /// At least one token received or a phase label set.
    Streaming,
    /// Terminal payload received and fully revealed.
    Complete,
}

/// Token accounting reported by the assistant backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// A resolved source citation attached to an assistant answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Inline reference marker as it appears in the text, e.g. `1`.
    pub marker: u32,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

/// A candidate paper returned by a reference search. Immutable once returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredPaper {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub open_access: bool,
    #[serde(default)]
    pub pdf_url: Option<String>,
}

/// Per-paper ingestion status as reported by the backend or a local upload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, Hash,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IngestionStatus {
    /// Added to the library, full-text fetch not yet resolved.
    Pending,
    /// A manual PDF upload is in flight.
    Uploading,
    Success,
    Failed,
    /// The user chose to continue with the abstract only. Terminal, not an error.
    NoPdf,
}

impl IngestionStatus {
    /// Terminal states never transition except via an explicit retry.
    pub fn is_terminal(&self) -> bool {
        matches!(self, IngestionStatus::Success | IngestionStatus::NoPdf)
    }
}

/// Per-paper ingestion record, keyed per channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionState {
    #[serde(default)]
    pub reference_id: Option<String>,
    pub status: IngestionStatus,
    /// True while the add-to-library call itself is still in flight.
    #[serde(default)]
    pub is_adding: bool,
}

/// One entry of a `library_update` action payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionUpdate {
    /// Index into the paper list of the correlated `search_results` action.
    pub index: usize,
    #[serde(default)]
    pub reference_id: Option<String>,
    pub ingestion_status: IngestionStatus,
}

/// Payload of a `search_results` suggested action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResultsPayload {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub papers: Vec<DiscoveredPaper>,
    #[serde(default)]
    pub search_id: Option<String>,
}

/// Payload of a `library_update` suggested action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryUpdatePayload {
    #[serde(default)]
    pub search_id: Option<String>,
    #[serde(default)]
    pub updates: Vec<IngestionUpdate>,
}

/// A structured follow-up directive returned by the assistant.
///
/// Produced by the backend, consumed exactly once by the action dispatcher
/// per `(exchange, index)` pair. Unknown kinds are preserved as [`SuggestedAction::Other`]
/// so a newer backend never breaks deserialization.
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestedAction {
    SearchResults(SearchResultsPayload),
    LibraryUpdate(LibraryUpdatePayload),
    PaperCreated { paper_id: String },
    PaperUpdated { paper_id: String },
    Other { kind: String, payload: serde_json::Value },
}

impl SuggestedAction {
    /// The wire tag for this action kind.
    pub fn kind(&self) -> &str {
        match self {
            SuggestedAction::SearchResults(_) => "search_results",
            SuggestedAction::LibraryUpdate(_) => "library_update",
            SuggestedAction::PaperCreated { .. } => "paper_created",
            SuggestedAction::PaperUpdated { .. } => "paper_updated",
            SuggestedAction::Other { kind, .. } => kind,
        }
    }
}

impl<'de> Deserialize<'de> for SuggestedAction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut value = serde_json::Value::deserialize(deserializer)?;
        let kind = value
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| D::Error::custom("suggested action missing \"type\""))?
            .to_string();

        // Payload may be nested under "payload" or flattened alongside "type".
        let payload = match value.get_mut("payload") {
            Some(p) => p.take(),
            None => {
                if let Some(obj) = value.as_object_mut() {
                    obj.remove("type");
                }
                value
            }
        };

        let action = match kind.as_str() {
            "search_results" => SuggestedAction::SearchResults(
                serde_json::from_value(payload).map_err(D::Error::custom)?,
            ),
            "library_update" => SuggestedAction::LibraryUpdate(
                serde_json::from_value(payload).map_err(D::Error::custom)?,
            ),
            "paper_created" => {
                let paper_id = payload
                    .get("paper_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                SuggestedAction::PaperCreated { paper_id }
            }
            "paper_updated" => {
                let paper_id = payload
                    .get("paper_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                SuggestedAction::PaperUpdated { paper_id }
            }
            _ => SuggestedAction::Other { kind, payload },
        };
        Ok(action)
    }
}

impl Serialize for SuggestedAction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let payload = match self {
            SuggestedAction::SearchResults(p) => {
                serde_json::to_value(p).map_err(serde::ser::Error::custom)?
            }
            SuggestedAction::LibraryUpdate(p) => {
                serde_json::to_value(p).map_err(serde::ser::Error::custom)?
            }
            SuggestedAction::PaperCreated { paper_id } | SuggestedAction::PaperUpdated { paper_id } => {
                serde_json::json!({ "paper_id": paper_id })
            }
            SuggestedAction::Other { payload, .. } => payload.clone(),
        };
        serde_json::json!({ "type": self.kind(), "payload": payload }).serialize(serializer)
    }
}

/// The final structured payload of an assistant answer.
///
/// Empty/default while the answer is still streaming.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub suggested_actions: Vec<SuggestedAction>,
    #[serde(default)]
    pub reasoning_used: bool,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// One question/answer round-trip with the assistant.
#[derive(Debug, Clone)]
pub struct AssistantExchange {
    /// Authoritative once equal to the server-confirmed id.
    pub id: ExchangeId,
    /// Local correlation nonce; set for exchanges created in this session,
    /// `None` for records rehydrated from persisted history. Used solely for
    /// merge-matching, never as a durable identifier.
    pub client_key: Option<String>,
    pub question: String,
    pub status: ExchangeStatus,
    pub response: AssistantResponse,
    /// The progressively-revealed text shown to the user; may lag behind
    /// `response.message` during typewriter playback.
    pub display_message: String,
    /// Short phase label shown while no tokens have arrived yet.
    pub status_message: Option<String>,
    /// Action keys (`exchange_id:action_index`) already dispatched.
    pub applied_actions: HashSet<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
    /// True if loaded from the server's persisted log rather than created in
    /// this session; gates which actions may auto-trigger side effects.
    pub from_history: bool,
}

impl AssistantExchange {
    /// Creates an optimistic local placeholder for a just-asked question.
    pub fn local(question: impl Into<String>, author: Option<String>) -> Self {
        Self {
            id: ExchangeId::generate(),
            client_key: Some(uuid::Uuid::new_v4().to_string()),
            question: question.into(),
            status: ExchangeStatus::Pending,
            response: AssistantResponse::default(),
            display_message: String::new(),
            status_message: None,
            applied_actions: HashSet::new(),
            created_at: Utc::now(),
            completed_at: None,
            author,
            from_history: false,
        }
    }

    /// The idempotency key for action `index` of this exchange.
    pub fn action_key(&self, index: usize) -> String {
        format!("{}:{index}", self.id)
    }
}

/// One prior turn included in the request's conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub question: String,
    pub answer: String,
}

/// Request body for the assistant endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantQuery {
    pub question: String,
    #[serde(default)]
    pub reasoning: bool,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_search_results: Option<Vec<DiscoveredPaper>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_search_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_history: Option<Vec<HistoryTurn>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggested_action_parses_nested_payload() {
        let json = serde_json::json!({
            "type": "search_results",
            "payload": {"query": "transformers", "papers": [], "search_id": "s1"}
        });
        let action: SuggestedAction = serde_json::from_value(json).unwrap();
        match action {
            SuggestedAction::SearchResults(p) => {
                assert_eq!(p.query, "transformers");
                assert_eq!(p.search_id.as_deref(), Some("s1"));
            }
            other => panic!("expected SearchResults, got {other:?}"),
        }
    }

    #[test]
    fn suggested_action_parses_flattened_payload() {
        let json = serde_json::json!({
            "type": "library_update",
            "search_id": "s2",
            "updates": [{"index": 0, "reference_id": "r1", "ingestion_status": "success"}]
        });
        let action: SuggestedAction = serde_json::from_value(json).unwrap();
        match action {
            SuggestedAction::LibraryUpdate(p) => {
                assert_eq!(p.search_id.as_deref(), Some("s2"));
                assert_eq!(p.updates.len(), 1);
                assert_eq!(p.updates[0].ingestion_status, IngestionStatus::Success);
            }
            other => panic!("expected LibraryUpdate, got {other:?}"),
        }
    }

    #[test]
    fn unknown_action_kind_is_preserved() {
        let json = serde_json::json!({
            "type": "open_settings",
            "payload": {"tab": "billing"}
        });
        let action: SuggestedAction = serde_json::from_value(json).unwrap();
        match &action {
            SuggestedAction::Other { kind, payload } => {
                assert_eq!(kind, "open_settings");
                assert_eq!(payload["tab"], "billing");
            }
            other => panic!("expected Other, got {other:?}"),
        }
        // Round-trips back to the same tag.
        let round = serde_json::to_value(&action).unwrap();
        assert_eq!(round["type"], "open_settings");
    }

    #[test]
    fn suggested_action_without_type_is_rejected() {
        let json = serde_json::json!({"payload": {}});
        assert!(serde_json::from_value::<SuggestedAction>(json).is_err());
    }

    #[test]
    fn assistant_response_defaults_all_fields() {
        let resp: AssistantResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.message.is_empty());
        assert!(resp.suggested_actions.is_empty());
        assert!(resp.usage.is_none());
    }

    #[test]
    fn ingestion_status_serde_snake_case() {
        let status: IngestionStatus = serde_json::from_str("\"no_pdf\"").unwrap();
        assert_eq!(status, IngestionStatus::NoPdf);
        assert!(status.is_terminal());
        assert_eq!(status.to_string(), "no_pdf");
    }

    #[test]
    fn local_exchange_has_client_key_and_pending_status() {
        let ex = AssistantExchange::local("find papers", Some("ada".into()));
        assert!(ex.client_key.is_some());
        assert_eq!(ex.status, ExchangeStatus::Pending);
        assert!(!ex.from_history);
        assert_eq!(ex.action_key(2), format!("{}:2", ex.id));
    }
}
