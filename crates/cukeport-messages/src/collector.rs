// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Test case attempt lookup
//!
//! Reporting happens when a `testCaseFinished` message arrives, but that
//! message only carries the attempt ID. Everything else (the feature, the
//! pickle, the step plan, each step's result and attachments) arrived earlier
//! in separate messages. [`AttemptCollector`] indexes those messages so that a
//! finished attempt can be resolved into a self-contained [`TestCaseAttempt`].

use std::collections::HashMap;

use tracing::trace;

use crate::envelope::{Attachment, Envelope, GherkinDocument, Pickle, TestCase, TestCaseStarted};
use crate::result::TestStepResult;

/// Everything known about one finished attempt of a test case
#[derive(Debug, Clone, PartialEq)]
pub struct TestCaseAttempt {
    /// Document the pickle was compiled from
    pub gherkin_document: GherkinDocument,
    /// The executed scenario
    pub pickle: Pickle,
    /// The step plan
    pub test_case: TestCase,
    /// Zero-based attempt number
    pub attempt: u32,
    /// Whether the runner will try again
    pub will_be_retried: bool,
    /// Results keyed by test step ID
    pub step_results: HashMap<String, TestStepResult>,
    /// Attachments keyed by test step ID, in arrival order
    pub step_attachments: HashMap<String, Vec<Attachment>>,
}

impl TestCaseAttempt {
    /// Result of a step, or an `UNKNOWN` result if the step never finished
    #[must_use]
    pub fn step_result(&self, test_step_id: &str) -> TestStepResult {
        self.step_results
            .get(test_step_id)
            .cloned()
            .unwrap_or_else(TestStepResult::unknown)
    }

    /// Attachments of a step, in arrival order
    #[must_use]
    pub fn step_attachments(&self, test_step_id: &str) -> &[Attachment] {
        self.step_attachments
            .get(test_step_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Check if this is not the first attempt of the test case
    #[must_use]
    pub fn is_retry(&self) -> bool {
        self.attempt > 0
    }
}

/// Resolves a `testCaseStartedId` into a complete attempt
pub trait AttemptLookup {
    /// Look up an attempt by its `testCaseStartedId`
    fn test_case_attempt(&self, test_case_started_id: &str) -> Option<TestCaseAttempt>;
}

#[derive(Debug, Default)]
struct AttemptRecord {
    started: Option<TestCaseStarted>,
    will_be_retried: bool,
    step_results: HashMap<String, TestStepResult>,
    step_attachments: HashMap<String, Vec<Attachment>>,
}

/// Indexes a message stream so finished attempts can be looked up
#[derive(Debug, Default)]
pub struct AttemptCollector {
    gherkin_documents: HashMap<String, GherkinDocument>,
    pickles: HashMap<String, Pickle>,
    test_cases: HashMap<String, TestCase>,
    attempts: HashMap<String, AttemptRecord>,
}

impl AttemptCollector {
    /// Create an empty collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an envelope
    ///
    /// Message kinds that carry no attempt data are ignored.
    pub fn ingest(&mut self, envelope: &Envelope) {
        match envelope {
            Envelope::GherkinDocument(document) => {
                self.gherkin_documents
                    .insert(document.uri.clone(), document.clone());
            }
            Envelope::Pickle(pickle) => {
                self.pickles.insert(pickle.id.clone(), pickle.clone());
            }
            Envelope::TestCase(test_case) => {
                self.test_cases
                    .insert(test_case.id.clone(), test_case.clone());
            }
            Envelope::TestCaseStarted(started) => {
                self.attempts.entry(started.id.clone()).or_default().started =
                    Some(started.clone());
            }
            Envelope::TestStepFinished(finished) => {
                self.attempts
                    .entry(finished.test_case_started_id.clone())
                    .or_default()
                    .step_results
                    .insert(
                        finished.test_step_id.clone(),
                        finished.test_step_result.clone(),
                    );
            }
            Envelope::Attachment(attachment) => {
                let (Some(started_id), Some(step_id)) =
                    (&attachment.test_case_started_id, &attachment.test_step_id)
                else {
                    trace!(media_type = %attachment.media_type, "Ignoring attachment outside a step");
                    return;
                };
                self.attempts
                    .entry(started_id.clone())
                    .or_default()
                    .step_attachments
                    .entry(step_id.clone())
                    .or_default()
                    .push(attachment.clone());
            }
            Envelope::TestCaseFinished(finished) => {
                self.attempts
                    .entry(finished.test_case_started_id.clone())
                    .or_default()
                    .will_be_retried = finished.will_be_retried;
            }
            _ => {}
        }
    }

    /// Number of attempts seen so far
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.attempts.values().filter(|a| a.started.is_some()).count()
    }

    /// Drop the data held for an attempt once it has been reported
    pub fn forget(&mut self, test_case_started_id: &str) {
        self.attempts.remove(test_case_started_id);
    }
}

impl AttemptLookup for AttemptCollector {
    fn test_case_attempt(&self, test_case_started_id: &str) -> Option<TestCaseAttempt> {
        let record = self.attempts.get(test_case_started_id)?;
        let started = record.started.as_ref()?;
        let test_case = self.test_cases.get(&started.test_case_id)?;
        let pickle = self.pickles.get(&test_case.pickle_id)?;
        let gherkin_document = self.gherkin_documents.get(&pickle.uri)?;

        Some(TestCaseAttempt {
            gherkin_document: gherkin_document.clone(),
            pickle: pickle.clone(),
            test_case: test_case.clone(),
            attempt: started.attempt,
            will_be_retried: record.will_be_retried,
            step_results: record.step_results.clone(),
            step_attachments: record.step_attachments.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_stream;
    use crate::result::TestStepResultStatus;
    use similar_asserts::assert_eq;

    const STREAM: &str = r#"{"gherkinDocument":{"uri":"a.feature","feature":{"name":"A","description":"","tags":[]}}}
{"pickle":{"id":"p1","uri":"a.feature","name":"one","tags":[],"steps":[{"id":"ps1","text":"a step"}]}}
{"testCase":{"id":"tc1","pickleId":"p1","testSteps":[{"id":"ts1","hookId":"h1"},{"id":"ts2","pickleStepId":"ps1"}]}}
{"testCaseStarted":{"id":"tcs1","testCaseId":"tc1","attempt":1}}
{"testStepFinished":{"testCaseStartedId":"tcs1","testStepId":"ts1","testStepResult":{"status":"PASSED","duration":{"seconds":0,"nanos":0}}}}
{"attachment":{"testCaseStartedId":"tcs1","testStepId":"ts2","body":"hello","mediaType":"text/x.cucumber.log+plain"}}
{"attachment":{"body":"run level","mediaType":"text/plain"}}
{"testCaseFinished":{"testCaseStartedId":"tcs1","willBeRetried":false}}"#;

    fn collector() -> AttemptCollector {
        let mut collector = AttemptCollector::new();
        for envelope in parse_stream(STREAM).expect("Should parse") {
            collector.ingest(&envelope);
        }
        collector
    }

    #[test]
    fn test_resolves_attempt() {
        let collector = collector();
        let attempt = collector.test_case_attempt("tcs1").expect("attempt");

        assert_eq!(attempt.pickle.name, "one");
        assert_eq!(attempt.gherkin_document.uri, "a.feature");
        assert_eq!(attempt.attempt, 1);
        assert!(attempt.is_retry());
        assert!(!attempt.will_be_retried);
        assert_eq!(attempt.step_attachments("ts2").len(), 1);
        assert_eq!(attempt.step_attachments("ts1").len(), 0);
    }

    #[test]
    fn test_unfinished_step_is_unknown() {
        let collector = collector();
        let attempt = collector.test_case_attempt("tcs1").expect("attempt");

        assert_eq!(attempt.step_result("ts1").status, TestStepResultStatus::Passed);
        assert_eq!(attempt.step_result("ts2").status, TestStepResultStatus::Unknown);
    }

    #[test]
    fn test_unknown_attempt() {
        let collector = collector();
        assert!(collector.test_case_attempt("missing").is_none());
    }

    #[test]
    fn test_forget_drops_attempt() {
        let mut collector = collector();
        assert_eq!(collector.attempt_count(), 1);
        collector.forget("tcs1");
        assert_eq!(collector.attempt_count(), 0);
        assert!(collector.test_case_attempt("tcs1").is_none());
    }
}
