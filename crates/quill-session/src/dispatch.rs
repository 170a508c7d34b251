// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Suggested-action dispatcher.
//!
//! Scans complete exchanges and applies each suggested action exactly once,
//! keyed by `exchange_id:action_index`. The dispatcher is safe to re-run on
//! every store update: previously applied actions are skipped outright, and
//! the key is recorded before the side effect so a failing payload cannot be
//! retried into a double application.

use quill_core::types::{ChannelId, ExchangeId, SuggestedAction};
use quill_core::QuillError;
use quill_discovery::{DiscoveryState, LibraryUpdateResult, Notification};
use quill_exchange::ExchangeStore;
use tracing::debug;

/// What a dispatched action did, for UI notification and navigation.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Search results were published to the exchange's inline view and the
    /// channel queue.
    SearchResultsShown {
        exchange: ExchangeId,
        query: String,
        added: usize,
    },
    /// Ingestion state was written. `verified` is false for history-derived
    /// updates awaiting fresh confirmation.
    IngestionUpdated {
        exchange: ExchangeId,
        updated: usize,
        verified: bool,
    },
    /// The update referenced a superseded search and was ignored.
    StaleUpdateIgnored {
        exchange: ExchangeId,
        search_id: Option<String>,
    },
    /// A paper was created; UI may navigate to it.
    PaperCreated { paper_id: String },
    /// A paper was updated; UI may navigate to it.
    PaperUpdated { paper_id: String },
    /// An action payload could not be applied.
    ActionFailed { key: String, error: String },
    /// An unrecognized action kind was acknowledged without effect.
    Acknowledged { kind: String },
}

struct PendingAction {
    exchange: ExchangeId,
    key: String,
    from_history: bool,
    action: SuggestedAction,
}

/// Runs one dispatch pass over the store.
///
/// At most once per `(exchange, action index)` across any number of re-runs
/// or history merges. No ordering is guaranteed between different actions of
/// one exchange; each is independently idempotent.
pub fn dispatch_actions(
    channel: &ChannelId,
    store: &mut ExchangeStore,
    discovery: &mut DiscoveryState,
) -> Vec<ActionOutcome> {
    let pending: Vec<PendingAction> = store
        .complete_exchanges()
        .flat_map(|exchange| {
            exchange
                .response
                .suggested_actions
                .iter()
                .enumerate()
                .filter(|(index, _)| !exchange.applied_actions.contains(&exchange.action_key(*index)))
                .map(|(index, action)| PendingAction {
                    exchange: exchange.id.clone(),
                    key: exchange.action_key(index),
                    from_history: exchange.from_history,
                    action: action.clone(),
                })
                .collect::<Vec<_>>()
        })
        .collect();

    let mut outcomes = Vec::new();
    for pending in pending {
        // Record first: even a failing payload is consumed exactly once.
        if !store.record_applied(&pending.exchange, pending.key.clone()) {
            continue;
        }
        debug!(key = %pending.key, kind = pending.action.kind(), "dispatching suggested action");
        let channel_state = discovery.channel_mut(channel);

        match pending.action {
            SuggestedAction::SearchResults(payload) => {
                channel_state.queue.finish_search();
                let added = channel_state.record_search(
                    &pending.exchange,
                    payload.search_id.as_deref(),
                    &payload.papers,
                );
                outcomes.push(ActionOutcome::SearchResultsShown {
                    exchange: pending.exchange,
                    query: payload.query,
                    added,
                });
            }
            SuggestedAction::LibraryUpdate(payload) => {
                if payload.search_id.is_none() {
                    let error = QuillError::Action(
                        "library update is missing its search_id".into(),
                    )
                    .to_string();
                    channel_state
                        .queue
                        .set_notification(Notification::ActionFailed {
                            message: error.clone(),
                        });
                    outcomes.push(ActionOutcome::ActionFailed {
                        key: pending.key,
                        error,
                    });
                    continue;
                }
                match channel_state.apply_library_update(&payload, pending.from_history) {
                    LibraryUpdateResult::Applied { updated, verified } => {
                        outcomes.push(ActionOutcome::IngestionUpdated {
                            exchange: pending.exchange,
                            updated,
                            verified,
                        });
                    }
                    LibraryUpdateResult::StaleIgnored => {
                        outcomes.push(ActionOutcome::StaleUpdateIgnored {
                            exchange: pending.exchange,
                            search_id: payload.search_id,
                        });
                    }
                }
            }
            SuggestedAction::PaperCreated { paper_id } => {
                outcomes.push(ActionOutcome::PaperCreated { paper_id });
            }
            SuggestedAction::PaperUpdated { paper_id } => {
                outcomes.push(ActionOutcome::PaperUpdated { paper_id });
            }
            SuggestedAction::Other { kind, .. } => {
                outcomes.push(ActionOutcome::Acknowledged { kind });
            }
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::types::{
        AssistantResponse, DiscoveredPaper, IngestionStatus, IngestionUpdate,
        LibraryUpdatePayload, SearchResultsPayload,
    };
    use std::time::Instant;

    fn channel() -> ChannelId {
        ChannelId("c1".into())
    }

    fn paper(id: &str, title: &str) -> DiscoveredPaper {
        DiscoveredPaper {
            id: id.into(),
            title: title.into(),
            ..DiscoveredPaper::default()
        }
    }

    fn search_action(query: &str, papers: Vec<DiscoveredPaper>, sid: &str) -> SuggestedAction {
        SuggestedAction::SearchResults(SearchResultsPayload {
            query: query.into(),
            papers,
            search_id: Some(sid.into()),
        })
    }

    fn library_action(sid: Option<&str>, updates: Vec<IngestionUpdate>) -> SuggestedAction {
        SuggestedAction::LibraryUpdate(LibraryUpdatePayload {
            search_id: sid.map(String::from),
            updates,
        })
    }

    /// Completes a local exchange whose result carries the given actions.
    fn complete_with_actions(
        store: &mut ExchangeStore,
        question: &str,
        actions: Vec<SuggestedAction>,
    ) -> ExchangeId {
        let id = store.insert_local(question, None);
        store.apply_token(&id, "answer");
        store.apply_result(
            &id,
            AssistantResponse {
                message: "answer".into(),
                suggested_actions: actions,
                ..AssistantResponse::default()
            },
            Instant::now(),
        );
        id
    }

    #[test]
    fn search_results_publish_and_mark_applied() {
        let mut store = ExchangeStore::default();
        let mut discovery = DiscoveryState::default();
        let papers = vec![paper("a", "A"), paper("b", "B"), paper("c", "C")];
        let id = complete_with_actions(
            &mut store,
            "find papers about transformers",
            vec![search_action("transformers", papers, "s1")],
        );

        let outcomes = dispatch_actions(&channel(), &mut store, &mut discovery);

        assert_eq!(
            outcomes,
            vec![ActionOutcome::SearchResultsShown {
                exchange: id.clone(),
                query: "transformers".into(),
                added: 3,
            }]
        );
        let ex = store.exchange(&id).unwrap();
        assert!(ex.applied_actions.contains(&format!("{id}:0")));
        let chan = discovery.channel_mut(&channel());
        assert_eq!(chan.queue.papers().len(), 3);
        assert_eq!(chan.latest_search_id(), Some("s1"));
        assert_eq!(chan.inline_results(&id).unwrap().len(), 3);
    }

    #[test]
    fn dispatch_is_idempotent_across_reruns() {
        let mut store = ExchangeStore::default();
        let mut discovery = DiscoveryState::default();
        complete_with_actions(
            &mut store,
            "q",
            vec![search_action("q", vec![paper("a", "A")], "s1")],
        );

        let first = dispatch_actions(&channel(), &mut store, &mut discovery);
        let second = dispatch_actions(&channel(), &mut store, &mut discovery);
        let third = dispatch_actions(&channel(), &mut store, &mut discovery);

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert!(third.is_empty());
        assert_eq!(discovery.channel_mut(&channel()).queue.papers().len(), 1);
    }

    #[test]
    fn library_update_flows_into_ingestion_state() {
        let mut store = ExchangeStore::default();
        let mut discovery = DiscoveryState::default();
        complete_with_actions(
            &mut store,
            "find",
            vec![search_action("q", vec![paper("a", "A")], "s1")],
        );
        dispatch_actions(&channel(), &mut store, &mut discovery);

        complete_with_actions(
            &mut store,
            "add the first one",
            vec![library_action(
                Some("s1"),
                vec![IngestionUpdate {
                    index: 0,
                    reference_id: Some("r1".into()),
                    ingestion_status: IngestionStatus::Success,
                }],
            )],
        );
        let outcomes = dispatch_actions(&channel(), &mut store, &mut discovery);

        assert!(matches!(
            outcomes[0],
            ActionOutcome::IngestionUpdated { updated: 1, verified: true, .. }
        ));
        let chan = discovery.channel_mut(&channel());
        let entry = chan.ingestion("a").unwrap();
        assert_eq!(entry.reference_id.as_deref(), Some("r1"));
        assert_eq!(entry.status, IngestionStatus::Success);
    }

    #[test]
    fn stale_library_update_is_marked_applied_but_ignored() {
        let mut store = ExchangeStore::default();
        let mut discovery = DiscoveryState::default();
        complete_with_actions(
            &mut store,
            "first search",
            vec![search_action("q1", vec![paper("a", "A")], "s1")],
        );
        complete_with_actions(
            &mut store,
            "second search",
            vec![search_action("q2", vec![paper("b", "B")], "s2")],
        );
        dispatch_actions(&channel(), &mut store, &mut discovery);

        let stale_id = complete_with_actions(
            &mut store,
            "late update",
            vec![library_action(
                Some("s1"),
                vec![IngestionUpdate {
                    index: 0,
                    reference_id: Some("r1".into()),
                    ingestion_status: IngestionStatus::Success,
                }],
            )],
        );
        let outcomes = dispatch_actions(&channel(), &mut store, &mut discovery);

        assert_eq!(
            outcomes,
            vec![ActionOutcome::StaleUpdateIgnored {
                exchange: stale_id.clone(),
                search_id: Some("s1".into()),
            }]
        );
        let chan = discovery.channel_mut(&channel());
        assert!(chan.ingestion("a").is_none());
        // Marked applied: a re-run does not surface it again.
        assert!(dispatch_actions(&channel(), &mut store, &mut discovery).is_empty());
    }

    #[test]
    fn missing_search_id_raises_action_failure_only_once() {
        let mut store = ExchangeStore::default();
        let mut discovery = DiscoveryState::default();
        complete_with_actions(&mut store, "q", vec![library_action(None, vec![])]);

        let outcomes = dispatch_actions(&channel(), &mut store, &mut discovery);
        assert!(matches!(outcomes[0], ActionOutcome::ActionFailed { .. }));
        assert!(matches!(
            discovery.channel_mut(&channel()).queue.take_notification(),
            Some(Notification::ActionFailed { .. })
        ));
        assert!(dispatch_actions(&channel(), &mut store, &mut discovery).is_empty());
    }

    #[test]
    fn failing_action_does_not_block_siblings() {
        let mut store = ExchangeStore::default();
        let mut discovery = DiscoveryState::default();
        complete_with_actions(
            &mut store,
            "q",
            vec![
                library_action(None, vec![]),
                search_action("q", vec![paper("a", "A")], "s1"),
            ],
        );

        let outcomes = dispatch_actions(&channel(), &mut store, &mut discovery);
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0], ActionOutcome::ActionFailed { .. }));
        assert!(matches!(outcomes[1], ActionOutcome::SearchResultsShown { .. }));
    }

    #[test]
    fn history_search_results_apply_but_updates_stay_unverified() {
        let mut store = ExchangeStore::default();
        let mut discovery = DiscoveryState::default();

        // Simulate rehydrated history: merge in complete exchanges flagged
        // from_history carrying a search and its library update.
        let mut history_search = quill_core::types::AssistantExchange::local("find", None);
        history_search.client_key = None;
        history_search.from_history = true;
        history_search.status = quill_core::types::ExchangeStatus::Complete;
        history_search.response = AssistantResponse {
            message: "found".into(),
            suggested_actions: vec![search_action("q", vec![paper("a", "A")], "s1")],
            ..AssistantResponse::default()
        };
        let mut history_update = quill_core::types::AssistantExchange::local("added", None);
        history_update.client_key = None;
        history_update.from_history = true;
        history_update.status = quill_core::types::ExchangeStatus::Complete;
        history_update.created_at = history_search.created_at + chrono::Duration::seconds(1);
        history_update.response = AssistantResponse {
            message: "added".into(),
            suggested_actions: vec![library_action(
                Some("s1"),
                vec![IngestionUpdate {
                    index: 0,
                    reference_id: Some("r1".into()),
                    ingestion_status: IngestionStatus::Success,
                }],
            )],
            ..AssistantResponse::default()
        };
        store.merge_history(vec![history_search, history_update]);

        let outcomes = dispatch_actions(&channel(), &mut store, &mut discovery);

        // Search data is embedded, so it applies even from history.
        assert!(matches!(outcomes[0], ActionOutcome::SearchResultsShown { .. }));
        assert!(matches!(
            outcomes[1],
            ActionOutcome::IngestionUpdated { verified: false, .. }
        ));
        let chan = discovery.channel_mut(&channel());
        assert!(chan.ingestion_unverified);
        assert_eq!(chan.ingestion("a").unwrap().status, IngestionStatus::Success);
        assert!(chan.queue.take_notification().is_none());
    }

    #[test]
    fn paper_created_and_unknown_kinds_only_mark_applied() {
        let mut store = ExchangeStore::default();
        let mut discovery = DiscoveryState::default();
        let id = complete_with_actions(
            &mut store,
            "q",
            vec![
                SuggestedAction::PaperCreated { paper_id: "p9".into() },
                SuggestedAction::Other {
                    kind: "open_settings".into(),
                    payload: serde_json::json!({}),
                },
            ],
        );

        let outcomes = dispatch_actions(&channel(), &mut store, &mut discovery);
        assert_eq!(
            outcomes,
            vec![
                ActionOutcome::PaperCreated { paper_id: "p9".into() },
                ActionOutcome::Acknowledged { kind: "open_settings".into() },
            ]
        );
        let ex = store.exchange(&id).unwrap();
        assert_eq!(ex.applied_actions.len(), 2);
    }
}
