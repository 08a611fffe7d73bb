// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Fuzz target for the NDJSON stream parser
//!
//! This fuzzes the `StreamParser` which processes cucumber message output
//! line-by-line incrementally.

#![no_main]

use libfuzzer_sys::fuzz_target;

use cukeport_messages::StreamParser;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let mut parser = StreamParser::new();

        // Process each line - parser should never panic
        for line in input.lines() {
            let _ = parser.process_line(line);
        }

        let _ = parser.counts();
    }
});
