// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assistant exchange store for the Quill client engine.
//!
//! One [`ExchangeStore`] per channel holds the ordered question/answer
//! records, drives the `pending -> streaming -> complete` lifecycle, merges
//! server history against optimistic local entries, and schedules the
//! typewriter reveal for answers that arrive without streaming.

pub mod store;
pub mod typewriter;

pub use store::{normalize_question, ExchangeStore, MergeOutcome};
pub use typewriter::{RevealPacing, Typewriter};
