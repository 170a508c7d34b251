// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered store of assistant exchanges for one channel.
//!
//! Owns the per-exchange lifecycle (`pending -> streaming -> complete`),
//! optimistic local insertion, token/status/result application, and the
//! merge of server-persisted history with locally-created unsynced records.
//!
//! All mutation goes through `&mut self` methods; async callbacks compose by
//! queueing state transitions through the single owner rather than racing on
//! shared fields. Events addressed to an exchange that no longer exists
//! (cancelled, superseded by merge) are no-ops.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::Utc;
use quill_core::types::{AssistantExchange, AssistantResponse, ExchangeId, ExchangeStatus};
use tracing::debug;

use crate::typewriter::{RevealPacing, Typewriter};

/// Identifier remappings produced by a history merge, so sibling stores
/// (discovery correlation maps) can follow superseded local ids.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// `(superseded local id, authoritative server id)` pairs.
    pub remapped: Vec<(ExchangeId, ExchangeId)>,
}

/// Ordered collection of assistant exchanges with reveal scheduling.
pub struct ExchangeStore {
    exchanges: Vec<AssistantExchange>,
    reveals: HashMap<ExchangeId, Typewriter>,
    pacing: RevealPacing,
}

impl Default for ExchangeStore {
    fn default() -> Self {
        Self::new(RevealPacing::default())
    }
}

impl ExchangeStore {
    pub fn new(pacing: RevealPacing) -> Self {
        Self {
            exchanges: Vec::new(),
            reveals: HashMap::new(),
            pacing,
        }
    }

    /// Inserts an optimistic placeholder for a just-asked question.
    pub fn insert_local(
        &mut self,
        question: impl Into<String>,
        author: Option<String>,
    ) -> ExchangeId {
        let exchange = AssistantExchange::local(question, author);
        let id = exchange.id.clone();
        self.exchanges.push(exchange);
        id
    }

    pub fn exchange(&self, id: &ExchangeId) -> Option<&AssistantExchange> {
        self.exchanges.iter().find(|e| &e.id == id)
    }

    pub fn exchanges(&self) -> &[AssistantExchange] {
        &self.exchanges
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Exchanges whose terminal payload is fully revealed.
    pub fn complete_exchanges(&self) -> impl Iterator<Item = &AssistantExchange> {
        self.exchanges
            .iter()
            .filter(|e| e.status == ExchangeStatus::Complete)
    }

    /// Appends a streamed token. No-op if the exchange was removed.
    pub fn apply_token(&mut self, id: &ExchangeId, content: &str) {
        let Some(exchange) = self.exchanges.iter_mut().find(|e| &e.id == id) else {
            debug!(exchange = %id, "token for missing exchange dropped");
            return;
        };
        if exchange.status == ExchangeStatus::Complete {
            return;
        }
        exchange.status = ExchangeStatus::Streaming;
        exchange.status_message = None;
        exchange.display_message.push_str(content);
    }

    /// Replaces the phase label. No-op if the exchange was removed.
    pub fn apply_status(&mut self, id: &ExchangeId, message: &str) {
        let Some(exchange) = self.exchanges.iter_mut().find(|e| &e.id == id) else {
            return;
        };
        if exchange.status == ExchangeStatus::Complete {
            return;
        }
        exchange.status = ExchangeStatus::Streaming;
        exchange.status_message = Some(message.to_string());
    }

    /// Applies the terminal payload.
    ///
    /// If tokens already streamed, the final text is set directly and the
    /// exchange completes. Otherwise a synthetic typewriter reveal plays the
    /// final text; empty text completes immediately.
    pub fn apply_result(&mut self, id: &ExchangeId, response: AssistantResponse, now: Instant) {
        let Some(exchange) = self.exchanges.iter_mut().find(|e| &e.id == id) else {
            debug!(exchange = %id, "result for missing exchange dropped");
            return;
        };
        let streamed = !exchange.display_message.is_empty();
        exchange.status_message = None;

        if streamed || response.message.is_empty() {
            exchange.display_message = response.message.clone();
            exchange.response = response;
            exchange.status = ExchangeStatus::Complete;
            exchange.completed_at = Some(Utc::now());
            self.reveals.remove(id);
            return;
        }

        exchange.status = ExchangeStatus::Streaming;
        self.reveals
            .insert(id.clone(), Typewriter::new(response.message.clone(), self.pacing, now));
        exchange.response = response;
    }

    /// Advances every active reveal. Returns true while any reveal remains.
    pub fn advance_reveals(&mut self, now: Instant) -> bool {
        let mut finished = Vec::new();
        for (id, reveal) in self.reveals.iter_mut() {
            reveal.advance(now);
            if let Some(exchange) = self.exchanges.iter_mut().find(|e| &e.id == id) {
                exchange.display_message = reveal.revealed().to_string();
                if reveal.is_done() {
                    exchange.status = ExchangeStatus::Complete;
                    exchange.completed_at = Some(Utc::now());
                    finished.push(id.clone());
                }
            } else {
                // Exchange removed mid-reveal.
                finished.push(id.clone());
            }
        }
        for id in finished {
            self.reveals.remove(&id);
        }
        !self.reveals.is_empty()
    }

    pub fn has_active_reveals(&self) -> bool {
        !self.reveals.is_empty()
    }

    /// Removes a placeholder (cancellation). Later events for the id no-op.
    pub fn remove(&mut self, id: &ExchangeId) -> bool {
        self.reveals.remove(id);
        let before = self.exchanges.len();
        self.exchanges.retain(|e| &e.id != id);
        before != self.exchanges.len()
    }

    /// Records that an action key was dispatched. False if the exchange is gone.
    pub fn record_applied(&mut self, id: &ExchangeId, key: String) -> bool {
        match self.exchanges.iter_mut().find(|e| &e.id == id) {
            Some(exchange) => {
                exchange.applied_actions.insert(key);
                true
            }
            None => false,
        }
    }

    /// Merges a server history batch with the local store.
    ///
    /// Dedup order: server id first, then normalized question text for
    /// unsynced locals (the local entry is superseded; its id is remapped and
    /// its locally-recorded applied actions are carried over, rekeyed to the
    /// server id). Remaining unsynced locals are kept, and the combined list
    /// is sorted by creation time.
    pub fn merge_history(&mut self, server: Vec<AssistantExchange>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        let mut server = server;
        let locals = std::mem::take(&mut self.exchanges);

        // Pass 1: same-id matches. A still-streaming local owns its record;
        // a completed one defers to the server copy, keeping applied actions.
        let mut id_matched: HashSet<usize> = HashSet::new();
        let mut remaining = Vec::new();
        for local in locals {
            match server.iter().position(|s| s.id == local.id) {
                Some(idx) => {
                    id_matched.insert(idx);
                    if local.status != ExchangeStatus::Complete {
                        server[idx] = local;
                    } else {
                        server[idx]
                            .applied_actions
                            .extend(local.applied_actions.iter().cloned());
                    }
                }
                None => remaining.push(local),
            }
        }

        // Pass 2: question-text matches for unsynced locals. Each server
        // exchange absorbs at most one local, earliest created first.
        let mut absorbed: HashSet<usize> = HashSet::new();
        for local in remaining {
            if local.client_key.is_none() {
                self.exchanges.push(local);
                continue;
            }
            let norm = normalize_question(&local.question);
            let candidate = server
                .iter()
                .enumerate()
                .filter(|(i, s)| {
                    !id_matched.contains(i)
                        && !absorbed.contains(i)
                        && normalize_question(&s.question) == norm
                })
                .min_by_key(|(_, s)| s.created_at)
                .map(|(i, _)| i);

            match candidate {
                Some(idx) => {
                    absorbed.insert(idx);
                    debug!(local = %local.id, server = %server[idx].id, "unsynced local superseded by server exchange");
                    self.reveals.remove(&local.id);
                    let rekeyed = rekey_actions(&local.applied_actions, &local.id, &server[idx].id);
                    server[idx].applied_actions.extend(rekeyed);
                    outcome.remapped.push((local.id, server[idx].id.clone()));
                }
                None => self.exchanges.push(local),
            }
        }

        self.exchanges.extend(server);
        self.exchanges.sort_by_key(|e| e.created_at);
        outcome
    }
}

/// Normalization used solely for merge-matching of question text.
pub fn normalize_question(question: &str) -> String {
    question
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Rewrites `old:index` action keys to `new:index` for a remapped exchange.
fn rekey_actions(keys: &HashSet<String>, old: &ExchangeId, new: &ExchangeId) -> Vec<String> {
    let prefix = format!("{old}:");
    keys.iter()
        .map(|k| match k.strip_prefix(&prefix) {
            Some(rest) => format!("{new}:{rest}"),
            None => k.clone(),
        })
        .collect()
}
