// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel session and suggested-action dispatch for Quill.
//!
//! [`ChannelSession`] drives one channel's exchanges end to end: optimistic
//! insertion, streaming, terminal payload application, typewriter reveal,
//! and the exactly-once dispatch of suggested actions into discovery state.

pub mod dispatch;
pub mod session;

pub use dispatch::{dispatch_actions, ActionOutcome};
pub use session::{AskOptions, AskOutcome, ChannelSession};
