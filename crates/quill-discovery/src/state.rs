// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel-keyed discovery and ingestion state.
//!
//! One [`ChannelState`] per channel id: a discovery queue, a per-paper
//! ingestion map, the latest search correlation id, and inline result lists
//! keyed by exchange. Keying everything by channel is what keeps a
//! late-arriving response for one channel from corrupting another's view.
//! A single owner mutates a partition at a time; all updates go through
//! `&mut self` methods.

use std::collections::HashMap;

use quill_core::types::{
    ChannelId, DiscoveredPaper, ExchangeId, IngestionState, IngestionStatus, LibraryUpdatePayload,
};
use tracing::{debug, warn};

use crate::queue::{DiscoveryQueue, Notification};

/// The paper list published by one `search_results` action, kept so a later
/// `library_update` can resolve indexes even after newer searches ran.
#[derive(Debug, Clone)]
pub struct SearchRecord {
    pub exchange_id: ExchangeId,
    pub papers: Vec<DiscoveredPaper>,
}

/// Outcome of applying a `library_update` payload.
#[derive(Debug, Clone, PartialEq)]
pub enum LibraryUpdateResult {
    /// Ingestion state was written for `updated` papers.
    Applied { updated: usize, verified: bool },
    /// The update referenced a superseded search; state untouched.
    StaleIgnored,
}

/// Discovery/ingestion state for one channel.
#[derive(Debug, Default)]
pub struct ChannelState {
    pub queue: DiscoveryQueue,
    ingestion: HashMap<String, IngestionState>,
    latest_search_id: Option<String>,
    searches: HashMap<String, SearchRecord>,
    inline_results: HashMap<ExchangeId, Vec<DiscoveredPaper>>,
    /// Set when ingestion claims came from rehydrated history and need a
    /// fresh confirmation before success/failure banners are trusted.
    pub ingestion_unverified: bool,
}

impl ChannelState {
    pub fn ingestion(&self, paper_id: &str) -> Option<&IngestionState> {
        self.ingestion.get(paper_id)
    }

    pub fn ingestion_entries(&self) -> impl Iterator<Item = (&String, &IngestionState)> {
        self.ingestion.iter()
    }

    pub fn latest_search_id(&self) -> Option<&str> {
        self.latest_search_id.as_deref()
    }

    pub fn inline_results(&self, exchange: &ExchangeId) -> Option<&[DiscoveredPaper]> {
        self.inline_results.get(exchange).map(Vec::as_slice)
    }

    /// Publishes the results of a `search_results` action: inline view for
    /// the exchange plus the channel queue, and records the search id as the
    /// channel's latest for later `library_update` correlation.
    pub fn record_search(
        &mut self,
        exchange_id: &ExchangeId,
        search_id: Option<&str>,
        papers: &[DiscoveredPaper],
    ) -> usize {
        self.inline_results
            .insert(exchange_id.clone(), papers.to_vec());
        let added = self.queue.add_papers(papers);
        if let Some(sid) = search_id {
            self.latest_search_id = Some(sid.to_string());
            self.searches.insert(
                sid.to_string(),
                SearchRecord {
                    exchange_id: exchange_id.clone(),
                    papers: papers.to_vec(),
                },
            );
        }
        added
    }

    /// Applies a `library_update` payload against this channel.
    ///
    /// Only the channel's latest search may mutate state; updates from a
    /// superseded search are reported stale and ignored. Indexes resolve
    /// against the originating search's paper list, falling back to the
    /// current queue. History-derived updates mark the channel unverified
    /// instead of raising a confident notification.
    pub fn apply_library_update(
        &mut self,
        payload: &LibraryUpdatePayload,
        from_history: bool,
    ) -> LibraryUpdateResult {
        let search_id = payload.search_id.as_deref().unwrap_or_default();
        if self.latest_search_id.as_deref() != Some(search_id) {
            debug!(
                search_id,
                latest = self.latest_search_id.as_deref().unwrap_or("<none>"),
                "stale library update ignored"
            );
            return LibraryUpdateResult::StaleIgnored;
        }

        let source: Vec<DiscoveredPaper> = match self.searches.get(search_id) {
            Some(record) => record.papers.clone(),
            None => self.queue.papers().to_vec(),
        };

        let mut updated = 0;
        for update in &payload.updates {
            let Some(paper) = source.get(update.index) else {
                warn!(index = update.index, "library update index out of range");
                continue;
            };
            self.set_ingestion(
                &paper.id,
                IngestionState {
                    reference_id: update.reference_id.clone(),
                    status: update.ingestion_status,
                    is_adding: false,
                },
            );
            updated += 1;
        }

        if from_history {
            self.ingestion_unverified = true;
        } else if updated > 0 {
            self.queue.set_notification(Notification::PapersAdded {
                count: updated,
                verified: true,
            });
        }
        LibraryUpdateResult::Applied {
            updated,
            verified: !from_history,
        }
    }

    /// Writes an ingestion entry unless the current state is terminal.
    /// Terminal states only move via the explicit retry paths below.
    fn set_ingestion(&mut self, paper_id: &str, state: IngestionState) {
        if let Some(existing) = self.ingestion.get(paper_id)
            && existing.status.is_terminal()
        {
            debug!(paper = paper_id, status = %existing.status, "ignoring update to terminal ingestion state");
            return;
        }
        self.ingestion.insert(paper_id.to_string(), state);
    }

    /// The user asked to add a paper to the library; the call is in flight.
    pub fn begin_add(&mut self, paper_id: &str) {
        self.ingestion.insert(
            paper_id.to_string(),
            IngestionState {
                reference_id: None,
                status: IngestionStatus::Pending,
                is_adding: true,
            },
        );
    }

    /// The add-to-library call resolved with the backend's reported outcome.
    pub fn confirm_add(
        &mut self,
        paper_id: &str,
        reference_id: Option<String>,
        status: IngestionStatus,
    ) {
        self.ingestion.insert(
            paper_id.to_string(),
            IngestionState {
                reference_id,
                status,
                is_adding: false,
            },
        );
    }

    /// Starts a manual PDF upload for a failed ingestion. Returns false when
    /// the paper is not in a retryable state.
    pub fn upload_started(&mut self, paper_id: &str) -> bool {
        match self.ingestion.get_mut(paper_id) {
            Some(entry) if entry.status == IngestionStatus::Failed => {
                entry.status = IngestionStatus::Uploading;
                true
            }
            _ => false,
        }
    }

    /// Resolves a manual upload.
    pub fn upload_finished(&mut self, paper_id: &str, success: bool) {
        if let Some(entry) = self.ingestion.get_mut(paper_id) {
            entry.status = if success {
                IngestionStatus::Success
            } else {
                IngestionStatus::Failed
            };
        }
    }

    /// Explicit "continue with abstract": a terminal non-error resolution.
    pub fn continue_with_abstract(&mut self, paper_id: &str) -> bool {
        match self.ingestion.get_mut(paper_id) {
            Some(entry) if entry.status == IngestionStatus::Failed => {
                entry.status = IngestionStatus::NoPdf;
                true
            }
            _ => false,
        }
    }

    /// Follows an exchange-id remap from a history merge.
    pub fn remap_exchange(&mut self, old: &ExchangeId, new: &ExchangeId) {
        if let Some(papers) = self.inline_results.remove(old) {
            self.inline_results.insert(new.clone(), papers);
        }
        for record in self.searches.values_mut() {
            if &record.exchange_id == old {
                record.exchange_id = new.clone();
            }
        }
    }
}

/// All channels' discovery state, partitioned by channel id.
#[derive(Debug, Default)]
pub struct DiscoveryState {
    channels: HashMap<ChannelId, ChannelState>,
}

impl DiscoveryState {
    pub fn channel(&self, id: &ChannelId) -> Option<&ChannelState> {
        self.channels.get(id)
    }

    pub fn channel_mut(&mut self, id: &ChannelId) -> &mut ChannelState {
        self.channels.entry(id.clone()).or_default()
    }
}
