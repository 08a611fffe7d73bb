// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for attempt resolution
//!
//! Feeds whatever envelopes parse into an `AttemptCollector` and resolves
//! every attempt ID mentioned, in any order the input chooses.

#![no_main]

use libfuzzer_sys::fuzz_target;

use cukeport_messages::{AttemptCollector, AttemptLookup, Envelope, parse_envelope};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let mut collector = AttemptCollector::new();
        let mut ids = Vec::new();

        for line in input.lines() {
            if let Ok(Some(envelope)) = parse_envelope(line) {
                if let Envelope::TestCaseFinished(ref finished) = envelope {
                    ids.push(finished.test_case_started_id.clone());
                }
                collector.ingest(&envelope);
            }
        }

        for id in ids {
            let _ = collector.test_case_attempt(&id);
        }
    }
});
