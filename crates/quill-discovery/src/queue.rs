// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session-scoped queue of discovered papers for one channel.
//!
//! A new search clears the queue (with a notification) so stale results never
//! blend with a new query. Within one search session, results from multiple
//! assistant turns accumulate, deduplicated by normalized title, and
//! dismissed entries can be restored.

use quill_core::types::DiscoveredPaper;
use serde::{Deserialize, Serialize};

/// User-facing notifications raised by discovery/ingestion state changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// A new search cleared the previous candidate list.
    ResultsCleared { count: usize },
    /// Papers were reported added to the library. `verified` is false when
    /// the claim came from a rehydrated historical exchange and needs fresh
    /// confirmation before it can be trusted.
    PapersAdded { count: usize, verified: bool },
    /// A suggested action could not be applied.
    ActionFailed { message: String },
}

/// Per-channel discovery queue.
#[derive(Debug, Default)]
pub struct DiscoveryQueue {
    papers: Vec<DiscoveredPaper>,
    pub query: Option<String>,
    pub is_searching: bool,
    notification: Option<Notification>,
    dismissed: Vec<DiscoveredPaper>,
}

impl DiscoveryQueue {
    /// The visible candidate list.
    pub fn papers(&self) -> &[DiscoveredPaper] {
        &self.papers
    }

    /// Papers dismissed within the current search session.
    pub fn dismissed(&self) -> &[DiscoveredPaper] {
        &self.dismissed
    }

    /// Begins a new search: clears candidates and dismissals, raising a
    /// notification when anything was discarded.
    pub fn start_search(&mut self, query: impl Into<String>) {
        let cleared = self.papers.len() + self.dismissed.len();
        if cleared > 0 {
            self.notification = Some(Notification::ResultsCleared { count: cleared });
        }
        self.papers.clear();
        self.dismissed.clear();
        self.query = Some(query.into());
        self.is_searching = true;
    }

    pub fn finish_search(&mut self) {
        self.is_searching = false;
    }

    /// Appends papers, deduplicated by normalized title against both the
    /// visible queue and the dismissed set. Returns how many were added.
    pub fn add_papers(&mut self, incoming: &[DiscoveredPaper]) -> usize {
        let mut added = 0;
        for paper in incoming {
            let title = normalize_title(&paper.title);
            let seen = self
                .papers
                .iter()
                .chain(self.dismissed.iter())
                .any(|p| normalize_title(&p.title) == title);
            if !seen {
                self.papers.push(paper.clone());
                added += 1;
            }
        }
        added
    }

    /// Removes a paper from the visible queue, keeping it restorable.
    pub fn dismiss(&mut self, paper_id: &str) -> bool {
        match self.papers.iter().position(|p| p.id == paper_id) {
            Some(idx) => {
                let paper = self.papers.remove(idx);
                self.dismissed.push(paper);
                true
            }
            None => false,
        }
    }

    /// Restores every paper dismissed in the current search session.
    pub fn restore_dismissed(&mut self) -> usize {
        let restored = self.dismissed.len();
        self.papers.append(&mut self.dismissed);
        restored
    }

    pub fn set_notification(&mut self, notification: Notification) {
        self.notification = Some(notification);
    }

    /// Pops the pending notification, if any.
    pub fn take_notification(&mut self) -> Option<Notification> {
        self.notification.take()
    }
}

/// Title normalization used solely for dedup.
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
