// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming transport for the Quill assistant endpoint.
//!
//! [`AssistantClient`] opens the SSE request, decodes token/status/result
//! frames, handles auth refresh and cancellation, and degrades failures into
//! complete fallback payloads. [`format`] post-processes final answers.

pub mod client;
pub mod format;
pub mod sse;

pub use client::{AssistantClient, StaticCredentials};
pub use sse::StreamFrame;
