// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for cukeport-messages

use thiserror::Error;

/// Errors that can occur while reading a cucumber message stream
#[derive(Debug, Error)]
pub enum MessagesError {
    /// Error parsing JSON
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Error parsing JSON at a known stream position
    #[error("JSON parse error on line {line}: {source}")]
    JsonParseAt {
        /// 1-based line number in the stream
        line: usize,
        /// Underlying parse error
        source: serde_json::Error,
    },

    /// Error reading the message stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The line was valid JSON but not an envelope
    #[error("Invalid envelope: {message}")]
    InvalidEnvelope {
        /// Description of the format error
        message: String,
    },
}
