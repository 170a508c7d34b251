// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the engine and its external collaborators.

pub mod credentials;
pub mod transport;

pub use credentials::CredentialSource;
pub use transport::{AssistantTransport, StreamSink};
