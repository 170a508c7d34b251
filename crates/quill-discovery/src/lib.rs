// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-channel paper discovery and ingestion tracking.
//!
//! State is partitioned by channel id so switching the active channel swaps
//! the visible state without cross-channel leakage. Queues accumulate search
//! results within one search session; ingestion entries track each paper
//! added to the library through `pending`, `uploading`, `success`, `failed`,
//! and `no_pdf`.

pub mod queue;
pub mod state;

pub use queue::{normalize_title, DiscoveryQueue, Notification};
pub use state::{ChannelState, DiscoveryState, LibraryUpdateResult, SearchRecord};
