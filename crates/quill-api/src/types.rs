// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the platform REST endpoints.

use chrono::{DateTime, Utc};
use quill_core::types::{
    AssistantExchange, AssistantResponse, DiscoveredPaper, ExchangeId, ExchangeStatus,
    IngestionStatus,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One persisted exchange as returned by the history endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeRecord {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub response: AssistantResponse,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<ExchangeStatus>,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

impl ExchangeRecord {
    /// Converts a persisted record into a rehydrated exchange.
    ///
    /// Historical records are fully revealed and flagged `from_history`, which
    /// gates auto-triggered side effects during dispatch.
    pub fn into_exchange(self) -> AssistantExchange {
        let display_message = self.response.message.clone();
        AssistantExchange {
            id: ExchangeId(self.id),
            client_key: None,
            question: self.question,
            status: self.status.unwrap_or(ExchangeStatus::Complete),
            response: self.response,
            display_message,
            status_message: self.status_message,
            applied_actions: Default::default(),
            created_at: self.created_at,
            completed_at: self.completed_at,
            author: self.author,
            from_history: true,
        }
    }
}

/// Paper actions executable against a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaperActionType {
    AddReference,
    CreatePaper,
    EditPaper,
}

/// Outcome of a paper action.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaperActionResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub ingestion_status: Option<IngestionStatus>,
}

/// Result of a single-query reference search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub papers: Vec<DiscoveredPaper>,
}

/// One topic's results within a batch search.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicResults {
    pub topic: String,
    #[serde(default)]
    pub papers: Vec<DiscoveredPaper>,
}

/// Envelope of the batch-search variant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchSearchResults {
    #[serde(default)]
    pub results: Vec<TopicResults>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_converts_to_rehydrated_exchange() {
        let record: ExchangeRecord = serde_json::from_value(serde_json::json!({
            "id": "srv-1",
            "question": "find papers",
            "response": {"message": "found them"},
            "created_at": "2026-08-01T10:00:00Z",
            "status": "complete",
            "author": "ada"
        }))
        .unwrap();

        let exchange = record.into_exchange();
        assert_eq!(exchange.id.0, "srv-1");
        assert!(exchange.from_history);
        assert!(exchange.client_key.is_none());
        assert_eq!(exchange.display_message, "found them");
        assert_eq!(exchange.status, ExchangeStatus::Complete);
        assert!(exchange.applied_actions.is_empty());
    }

    #[test]
    fn record_without_status_defaults_to_complete() {
        let record: ExchangeRecord = serde_json::from_value(serde_json::json!({
            "id": "srv-2",
            "question": "q",
            "created_at": "2026-08-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(record.into_exchange().status, ExchangeStatus::Complete);
    }

    #[test]
    fn paper_action_type_wire_names() {
        assert_eq!(PaperActionType::AddReference.to_string(), "add_reference");
        assert_eq!(
            serde_json::to_string(&PaperActionType::EditPaper).unwrap(),
            "\"edit_paper\""
        );
    }
}
