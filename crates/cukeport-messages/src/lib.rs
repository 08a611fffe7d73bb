// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! cukeport-messages: Cucumber message stream processing for cukeport
//!
//! This library crate models the cucumber messages protocol (the NDJSON
//! stream written by `--format message`) and resolves finished test case
//! attempts for the cukeport reporter.
//!
//! # Example
//!
//! ```no_run
//! use cukeport_messages::{AttemptCollector, AttemptLookup, StreamParser};
//!
//! let mut parser = StreamParser::new();
//! let mut collector = AttemptCollector::new();
//!
//! let line = r#"{"testCaseStarted":{"id":"1","testCaseId":"tc","attempt":0}}"#;
//! if let Some(envelope) = parser.process_line(line).unwrap() {
//!     collector.ingest(&envelope);
//! }
//! let attempt = collector.test_case_attempt("1");
//! ```

pub mod collector;
pub mod envelope;
pub mod error;
pub mod parser;
pub mod result;

pub use collector::{AttemptCollector, AttemptLookup, TestCaseAttempt};
pub use envelope::{
    Attachment, ContentEncoding, DataTable, DocString, Envelope, Feature, GherkinDocument, Hook,
    Pickle, PickleStep, PickleStepArgument, StepDefinition, Tag, TableCell, TableRow, TestCase,
    TestCaseFinished, TestCaseStarted, TestRunFinished, TestRunStarted, TestStep,
    TestStepFinished,
};
pub use error::MessagesError;
pub use parser::{StreamParser, parse_envelope, parse_stream};
pub use result::{Duration, TestStepResult, TestStepResultStatus, Timestamp};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::collector::{AttemptCollector, AttemptLookup, TestCaseAttempt};
    pub use crate::envelope::Envelope;
    pub use crate::error::MessagesError;
    pub use crate::parser::{StreamParser, parse_stream};
    pub use crate::result::{TestStepResult, TestStepResultStatus};
}
