// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for the Quill workspace.
//!
//! Provides a scripted [`MockTransport`] and a [`RecordingSink`] so engine
//! tests run without a backend.

pub mod mock_transport;

pub use mock_transport::{MockReply, MockTransport, RecordingSink, ScriptedFrame};
