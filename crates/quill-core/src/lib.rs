// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Quill research workspace client.
//!
//! This crate provides the error type, identifiers, domain types, and the
//! trait seams (transport, credentials) used throughout the Quill workspace.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::QuillError;
pub use traits::{AssistantTransport, CredentialSource, StreamSink};
pub use types::{
    AssistantExchange, AssistantQuery, AssistantResponse, ChannelId, ExchangeId, ExchangeStatus,
    IngestionState, IngestionStatus, ProjectId, SuggestedAction,
};
