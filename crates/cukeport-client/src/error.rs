// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for cukeport-client

use thiserror::Error;

use crate::gateway::Handle;

/// Errors reported by a backend call's completion
///
/// Completions are shared between the issuing handler and the drain barrier,
/// so the error is `Clone` and carries rendered messages rather than sources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The backend answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Http {
        /// Response status code
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// The request never got a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with something we could not read
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// The call was rejected without reaching a backend
    #[error("Rejected: {0}")]
    Rejected(String),

    /// A handle this call depends on failed to resolve
    #[error("Dependency {handle} failed: {reason}")]
    Dependency {
        /// The handle that failed
        handle: Handle,
        /// Why it failed
        reason: String,
    },

    /// The handle was never issued by this gateway
    #[error("Unknown handle: {0}")]
    UnknownHandle(Handle),

    /// The configured endpoint is not a usable URL
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}
