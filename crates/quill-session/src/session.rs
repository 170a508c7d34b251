// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-channel session that drives an exchange from question to dispatch.
//!
//! The session owns the channel's exchange store handle, the transport, and
//! the shared discovery state. `ask()` inserts an optimistic placeholder,
//! streams events into it, applies the terminal payload (driving a
//! typewriter reveal when the answer arrived without streaming), then runs
//! the action dispatcher. In-flight operations are independent per exchange:
//! each holds its own cancellation token, and every event re-resolves its
//! exchange by id, so a cancelled placeholder swallows late events.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use quill_core::traits::{AssistantTransport, StreamSink};
use quill_core::types::{
    AssistantExchange, AssistantQuery, ChannelId, ExchangeId, ExchangeStatus, HistoryTurn,
    ProjectId,
};
use quill_core::QuillError;
use quill_discovery::DiscoveryState;
use quill_exchange::{ExchangeStore, RevealPacing};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::dispatch::{dispatch_actions, ActionOutcome};

/// Prior turns included with each request, newest last.
const MAX_HISTORY_TURNS: usize = 12;

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub reasoning: bool,
    pub scope: Vec<String>,
}

/// Result of a completed `ask`.
#[derive(Debug)]
pub struct AskOutcome {
    pub exchange: ExchangeId,
    pub outcomes: Vec<ActionOutcome>,
}

/// Session for one discussion channel.
pub struct ChannelSession {
    project: ProjectId,
    channel: ChannelId,
    transport: Arc<dyn AssistantTransport>,
    store: Arc<Mutex<ExchangeStore>>,
    discovery: Arc<Mutex<DiscoveryState>>,
    cancels: Mutex<HashMap<ExchangeId, CancellationToken>>,
    observer: Option<Arc<dyn StreamSink>>,
    author: Option<String>,
    reveal_tick: Duration,
}

impl ChannelSession {
    pub fn new(
        project: ProjectId,
        channel: ChannelId,
        transport: Arc<dyn AssistantTransport>,
    ) -> Self {
        Self {
            project,
            channel,
            transport,
            store: Arc::new(Mutex::new(ExchangeStore::default())),
            discovery: Arc::new(Mutex::new(DiscoveryState::default())),
            cancels: Mutex::new(HashMap::new()),
            observer: None,
            author: None,
            reveal_tick: Duration::from_millis(16),
        }
    }

    /// Shares discovery state across sessions of one project.
    pub fn with_discovery(mut self, discovery: Arc<Mutex<DiscoveryState>>) -> Self {
        self.discovery = discovery;
        self
    }

    /// Taps stream events (tokens, phase labels) as they are applied.
    pub fn with_observer(mut self, observer: Arc<dyn StreamSink>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Overrides reveal pacing (and tick) for the typewriter playback.
    pub fn with_pacing(mut self, pacing: RevealPacing, tick: Duration) -> Self {
        self.store = Arc::new(Mutex::new(ExchangeStore::new(pacing)));
        self.reveal_tick = tick;
        self
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn store(&self) -> Arc<Mutex<ExchangeStore>> {
        self.store.clone()
    }

    pub fn discovery(&self) -> Arc<Mutex<DiscoveryState>> {
        self.discovery.clone()
    }

    /// Asks a question and drives the exchange to `complete`, then runs one
    /// dispatch pass. Returns [`QuillError::Cancelled`] if the exchange was
    /// cancelled mid-flight; the placeholder is removed, not failed.
    pub async fn ask(
        &self,
        question: &str,
        options: AskOptions,
    ) -> Result<AskOutcome, QuillError> {
        let exchange_id;
        let history;
        {
            let mut store = self.store.lock().await;
            exchange_id = store.insert_local(question, self.author.clone());
            history = conversation_history(&store, &exchange_id);
        }
        let query = self.build_query(question, options, history).await;

        let cancel = CancellationToken::new();
        self.cancels
            .lock()
            .await
            .insert(exchange_id.clone(), cancel.clone());
        info!(exchange = %exchange_id, channel = %self.channel.0, "asking assistant");

        let sink = StoreSink {
            store: self.store.clone(),
            exchange: exchange_id.clone(),
            observer: self.observer.clone(),
        };
        let result = self
            .transport
            .ask(&self.project, &self.channel, query, &sink, cancel)
            .await;
        self.cancels.lock().await.remove(&exchange_id);

        match result {
            Ok(response) => {
                self.store
                    .lock()
                    .await
                    .apply_result(&exchange_id, response, Instant::now());
                // Drive any synthetic reveal to completion.
                loop {
                    let revealing = self.store.lock().await.advance_reveals(Instant::now());
                    if !revealing {
                        break;
                    }
                    tokio::time::sleep(self.reveal_tick).await;
                }
                let outcomes = {
                    let mut store = self.store.lock().await;
                    let mut discovery = self.discovery.lock().await;
                    dispatch_actions(&self.channel, &mut store, &mut discovery)
                };
                Ok(AskOutcome {
                    exchange: exchange_id,
                    outcomes,
                })
            }
            Err(QuillError::Cancelled) => {
                debug!(exchange = %exchange_id, "exchange cancelled, removing placeholder");
                self.store.lock().await.remove(&exchange_id);
                Err(QuillError::Cancelled)
            }
            Err(e) => Err(e),
        }
    }

    /// Cancels an in-flight exchange and removes its placeholder.
    pub async fn cancel(&self, exchange: &ExchangeId) -> bool {
        if let Some(token) = self.cancels.lock().await.remove(exchange) {
            token.cancel();
        }
        self.store.lock().await.remove(exchange)
    }

    /// Merges a server history batch, follows id remaps in discovery state,
    /// and replays the dispatcher. History exchanges arrive flagged
    /// `from_history`, which suppresses confident ingestion notifications.
    pub async fn load_history(&self, server: Vec<AssistantExchange>) -> Vec<ActionOutcome> {
        let mut store = self.store.lock().await;
        let merge = store.merge_history(server);
        let mut discovery = self.discovery.lock().await;
        let channel_state = discovery.channel_mut(&self.channel);
        for (old, new) in &merge.remapped {
            channel_state.remap_exchange(old, new);
        }
        dispatch_actions(&self.channel, &mut store, &mut discovery)
    }

    async fn build_query(
        &self,
        question: &str,
        options: AskOptions,
        history: Vec<HistoryTurn>,
    ) -> AssistantQuery {
        let discovery = self.discovery.lock().await;
        let (recent_search_results, recent_search_id) = match discovery.channel(&self.channel) {
            Some(chan) => (
                (!chan.queue.papers().is_empty()).then(|| chan.queue.papers().to_vec()),
                chan.latest_search_id().map(String::from),
            ),
            None => (None, None),
        };
        AssistantQuery {
            question: question.into(),
            reasoning: options.reasoning,
            scope: options.scope,
            recent_search_results,
            recent_search_id,
            conversation_history: (!history.is_empty()).then_some(history),
        }
    }
}

/// The last completed turns, excluding the exchange being asked.
fn conversation_history(store: &ExchangeStore, current: &ExchangeId) -> Vec<HistoryTurn> {
    let mut turns: Vec<HistoryTurn> = store
        .exchanges()
        .iter()
        .filter(|e| e.status == ExchangeStatus::Complete && &e.id != current)
        .map(|e| HistoryTurn {
            question: e.question.clone(),
            answer: e.response.message.clone(),
        })
        .collect();
    if turns.len() > MAX_HISTORY_TURNS {
        turns.drain(..turns.len() - MAX_HISTORY_TURNS);
    }
    turns
}

/// Routes stream events into the store, with an optional observer tap.
struct StoreSink {
    store: Arc<Mutex<ExchangeStore>>,
    exchange: ExchangeId,
    observer: Option<Arc<dyn StreamSink>>,
}

#[async_trait]
impl StreamSink for StoreSink {
    async fn on_token(&self, content: &str) {
        self.store.lock().await.apply_token(&self.exchange, content);
        if let Some(observer) = &self.observer {
            observer.on_token(content).await;
        }
    }

    async fn on_status(&self, message: &str) {
        self.store.lock().await.apply_status(&self.exchange, message);
        if let Some(observer) = &self.observer {
            observer.on_status(message).await;
        }
    }
}
