// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Integration tests for cukeport-messages
//!
//! These tests verify parsing of a recorded cucumber-js message stream and
//! attempt resolution against it.

use std::path::Path;

use cukeport_messages::{
    AttemptCollector, AttemptLookup, ContentEncoding, Envelope, StreamParser,
    TestStepResultStatus, parse_stream,
};
use proptest::prelude::*;
use similar_asserts::assert_eq;

/// Get the fixtures directory for test data
fn fixtures_dir() -> std::path::PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    Path::new(&manifest_dir).join("tests/fixtures")
}

fn fixture_stream() -> String {
    let fixture_path = fixtures_dir().join("checkout-run.ndjson");
    std::fs::read_to_string(&fixture_path).expect("Failed to read checkout-run.ndjson fixture")
}

fn collected() -> AttemptCollector {
    let mut collector = AttemptCollector::new();
    for envelope in parse_stream(&fixture_stream()).expect("Failed to parse fixture") {
        collector.ingest(&envelope);
    }
    collector
}

#[test]
fn test_parse_fixture_counts() {
    let mut parser = StreamParser::new();
    for line in fixture_stream().lines() {
        parser.process_line(line).expect("Failed to parse line");
    }

    assert_eq!(parser.count("gherkinDocument"), 2);
    assert_eq!(parser.count("pickle"), 3);
    assert_eq!(parser.count("hook"), 2);
    assert_eq!(parser.count("testCaseStarted"), 4);
    assert_eq!(parser.count("testCaseFinished"), 4);
    assert_eq!(parser.count("attachment"), 6);
    // Kinds that are not modelled are still counted by name
    assert_eq!(parser.count("meta"), 1);
    assert_eq!(parser.count("testStepStarted"), 4);
}

#[test]
fn test_unmodelled_kinds_parse_as_other() {
    let envelopes = parse_stream(&fixture_stream()).expect("Failed to parse fixture");
    let others: Vec<&str> = envelopes
        .iter()
        .filter(|e| matches!(e, Envelope::Other(_)))
        .map(Envelope::kind)
        .collect();

    assert!(others.contains(&"meta"));
    assert!(others.contains(&"source"));
    assert!(others.contains(&"testStepStarted"));
}

#[test]
fn test_resolve_first_attempt() {
    let collector = collected();
    let attempt = collector
        .test_case_attempt("tcs1")
        .expect("tcs1 should resolve");

    let feature = attempt
        .gherkin_document
        .feature
        .as_ref()
        .expect("feature present");
    assert_eq!(feature.name, "Checkout");
    assert_eq!(feature.tags.len(), 1);
    assert_eq!(attempt.pickle.name, "Pay by card");
    assert_eq!(attempt.test_case.test_steps.len(), 4);
    assert!(!attempt.is_retry());

    let failed = attempt.step_result("ts3");
    assert_eq!(failed.status, TestStepResultStatus::Failed);
    assert_eq!(failed.duration.as_millis(), 1_500);
    assert!(failed.message.as_deref().unwrap_or("").contains("card declined"));

    let screenshot = &attempt.step_attachments("ts3")[0];
    assert_eq!(screenshot.media_type, "image/png");
    assert_eq!(screenshot.content_encoding, ContentEncoding::Base64);
    assert_eq!(screenshot.file_name.as_deref(), Some("declined.png"));
}

#[test]
fn test_resolve_retried_attempts() {
    let collector = collected();

    let first = collector.test_case_attempt("tcs2").expect("tcs2");
    assert!(first.will_be_retried);
    assert_eq!(first.step_result("ts6").status, TestStepResultStatus::Failed);

    let second = collector.test_case_attempt("tcs3").expect("tcs3");
    assert!(!second.will_be_retried);
    assert!(second.is_retry());
    assert_eq!(second.step_result("ts6").status, TestStepResultStatus::Passed);
    // Same test case, so same pickle
    assert_eq!(first.pickle.id, second.pickle.id);
}

#[test]
fn test_attempt_count() {
    let collector = collected();
    assert_eq!(collector.attempt_count(), 4);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: arbitrary input never panics the streaming parser
    #[test]
    fn stream_parser_never_panics(input in ".{0,200}") {
        let mut parser = StreamParser::new();
        for line in input.lines() {
            let _ = parser.process_line(line);
        }
    }

    /// Property: unknown single-key objects always parse as `Other`
    #[test]
    fn unknown_kinds_are_other(kind in "[a-z]{3,12}Unmodelled") {
        let line = format!("{{\"{kind}\":{{}}}}");
        let envelope = cukeport_messages::parse_envelope(&line)
            .expect("valid JSON")
            .expect("not blank");
        prop_assert_eq!(envelope, Envelope::Other(kind));
    }
}
