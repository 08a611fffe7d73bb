// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Sources of cucumber message envelopes

use async_trait::async_trait;
use cukeport_messages::{Envelope, StreamParser};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::trace;

use crate::error::ReportError;

/// Produces envelopes in runner order
#[async_trait]
pub trait EnvelopeSource: Send {
    /// Next envelope, or `None` at the end of the stream
    ///
    /// A malformed line yields `ReportError::Messages`; the line is consumed,
    /// so the caller may keep reading.
    async fn next_envelope(&mut self) -> Result<Option<Envelope>, ReportError>;
}

/// Reads an NDJSON message stream line by line
pub struct NdjsonSource<R> {
    lines: Lines<R>,
    parser: StreamParser,
}

impl<R: AsyncBufRead + Unpin + Send> NdjsonSource<R> {
    /// Wrap a buffered reader
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            parser: StreamParser::new(),
        }
    }

    /// The parser, for per-kind counts
    pub fn parser(&self) -> &StreamParser {
        &self.parser
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> EnvelopeSource for NdjsonSource<R> {
    async fn next_envelope(&mut self) -> Result<Option<Envelope>, ReportError> {
        while let Some(line) = self.lines.next_line().await? {
            if let Some(envelope) = self.parser.process_line(&line)? {
                trace!(kind = envelope.kind(), line = self.parser.lines_seen(), "Read envelope");
                return Ok(Some(envelope));
            }
        }
        Ok(None)
    }
}
