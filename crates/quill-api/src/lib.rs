// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST client for the Quill platform backend.
//!
//! Covers the consumed endpoints outside the assistant stream: exchange
//! history, paper actions, PDF uploads, and reference search.

pub mod client;
pub mod types;

pub use client::ApiClient;
pub use types::{
    BatchSearchResults, ExchangeRecord, PaperActionResult, PaperActionType, SearchResults,
    TopicResults,
};
