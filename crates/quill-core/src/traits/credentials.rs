// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential seam for bearer-token auth with single-refresh semantics.

use async_trait::async_trait;

use crate::error::QuillError;

/// Supplies and refreshes the bearer token for backend requests.
///
/// The transport performs exactly one `refresh()` per request on a 401/403
/// before failing; a refresh that errors makes the request fatal.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// The current bearer token.
    async fn current(&self) -> Result<String, QuillError>;

    /// Obtains a fresh token after an auth rejection and returns it.
    async fn refresh(&self) -> Result<String, QuillError>;
}
