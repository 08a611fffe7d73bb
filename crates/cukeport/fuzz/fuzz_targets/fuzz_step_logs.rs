#![no_main]

//! Fuzz target for attribute directives in step logs
//!
//! Any sequence of log lines must yield unique attributes, one at most per
//! directive line.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use cukeport::attributes::{extract_attributes, is_directive};
use cukeport::format::prepare_content;
use cukeport_messages::Attachment;

#[derive(Debug, Arbitrary)]
struct StepLogs {
    lines: Vec<String>,
    media_type: String,
}

fuzz_target!(|input: StepLogs| {
    let attachments: Vec<Attachment> = input.lines.iter().map(Attachment::log).collect();
    let attributes = extract_attributes(&attachments);

    let directives = attachments.iter().filter(|a| is_directive(a)).count();
    assert!(attributes.len() <= directives);
    for (i, attribute) in attributes.iter().enumerate() {
        assert!(!attributes[i + 1..].contains(attribute));
    }

    for line in &input.lines {
        let _ = prepare_content(&input.media_type, line);
    }
});
