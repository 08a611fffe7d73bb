// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! NDJSON message stream parsing
//!
//! A cucumber runner started with `--format message` writes one envelope per
//! line. This module parses complete streams and single lines, and offers a
//! [`StreamParser`] for incremental parsing as lines arrive.
//!
//! # Example
//!
//! ```no_run
//! use cukeport_messages::parser::{parse_stream, StreamParser};
//!
//! // Parse a complete stream
//! let output = r#"{"testRunStarted":{"timestamp":{"seconds":0,"nanos":0}}}"#;
//! let envelopes = parse_stream(output).unwrap();
//!
//! // Or parse line by line
//! let mut parser = StreamParser::new();
//! parser.process_line(output).unwrap();
//! ```

use std::collections::BTreeMap;

use crate::envelope::Envelope;
use crate::error::MessagesError;

/// Parse a single NDJSON line
///
/// Blank lines yield `None`.
///
/// # Errors
///
/// Returns `MessagesError::JsonParse` if the line is invalid JSON, or
/// `MessagesError::InvalidEnvelope` if it is not an envelope object.
pub fn parse_envelope(line: &str) -> Result<Option<Envelope>, MessagesError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_str(line)?;
    Envelope::from_value(value).map(Some)
}

/// Parse a complete NDJSON message stream
///
/// # Errors
///
/// Returns `MessagesError::JsonParseAt` naming the first malformed line.
pub fn parse_stream(output: &str) -> Result<Vec<Envelope>, MessagesError> {
    let mut parser = StreamParser::new();
    let mut envelopes = Vec::new();
    for line in output.lines() {
        if let Some(envelope) = parser.process_line(line)? {
            envelopes.push(envelope);
        }
    }
    Ok(envelopes)
}

// ============================================================================
// Streaming Parser for incremental parsing
// ============================================================================

/// A streaming parser for cucumber NDJSON output
#[derive(Debug, Default)]
pub struct StreamParser {
    line: usize,
    counts: BTreeMap<String, usize>,
}

impl StreamParser {
    /// Create a new streaming parser
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a single line of output
    ///
    /// # Errors
    ///
    /// Returns `MessagesError::JsonParseAt` if the line is invalid JSON, or
    /// `MessagesError::InvalidEnvelope` if it is not an envelope object.
    pub fn process_line(&mut self, line: &str) -> Result<Option<Envelope>, MessagesError> {
        self.line += 1;
        let envelope = parse_envelope(line).map_err(|e| match e {
            MessagesError::JsonParse(source) => MessagesError::JsonParseAt {
                line: self.line,
                source,
            },
            other => other,
        })?;

        if let Some(ref envelope) = envelope {
            *self.counts.entry(envelope.kind().to_string()).or_insert(0) += 1;
        }
        Ok(envelope)
    }

    /// Number of lines seen so far, blank lines included
    #[must_use]
    pub fn lines_seen(&self) -> usize {
        self.line
    }

    /// Number of envelopes parsed for a message kind
    #[must_use]
    pub fn count(&self, kind: &str) -> usize {
        self.counts.get(kind).copied().unwrap_or(0)
    }

    /// Envelope counts keyed by message kind
    #[must_use]
    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }
}
