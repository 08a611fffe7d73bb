// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Attribute directives embedded in step log lines
//!
//! A step may log `rp_attribute: key:value` (or `rp_attribute: value`) to tag
//! its test item. Directive lines become attributes and are never forwarded
//! as logs.

use std::sync::LazyLock;

use cukeport_client::Attribute;
use cukeport_messages::Attachment;
use indexmap::IndexSet;
use regex::Regex;

static DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^rp_attribute:\s*").expect("directive regex compiles"));

/// The directive payload of an attachment, if it is a directive log line
#[must_use]
pub fn directive(attachment: &Attachment) -> Option<&str> {
    if !attachment.is_log() {
        return None;
    }
    DIRECTIVE
        .find(&attachment.body)
        .map(|m| &attachment.body[m.end()..])
}

/// Check if an attachment is a directive log line
#[must_use]
pub fn is_directive(attachment: &Attachment) -> bool {
    directive(attachment).is_some()
}

/// Parse `key:value` on the first colon
///
/// Both halves must be non-empty for a keyed attribute; otherwise the whole
/// text becomes the value.
#[must_use]
pub fn parse_attribute(text: &str) -> Attribute {
    match text.split_once(':') {
        Some((key, value)) if !key.is_empty() && !value.is_empty() => Attribute::new(key, value),
        _ => Attribute::value_only(text),
    }
}

/// Extract the deduplicated attributes of a test case
///
/// Directives are collected across every step's attachments, in order of
/// first appearance.
pub fn extract_attributes<'a, I>(attachments: I) -> Vec<Attribute>
where
    I: IntoIterator<Item = &'a Attachment>,
{
    attachments
        .into_iter()
        .filter_map(directive)
        .collect::<IndexSet<&str>>()
        .into_iter()
        .map(parse_attribute)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn test_directive_detection() {
        assert_eq!(
            directive(&Attachment::log("rp_attribute: owner:payments")),
            Some("owner:payments")
        );
        assert_eq!(directive(&Attachment::log("rp_attribute:flaky")), Some("flaky"));
        assert_eq!(directive(&Attachment::log("cart ready")), None);
        assert_eq!(directive(&Attachment::log(" rp_attribute: late")), None);
    }

    #[test]
    fn test_only_log_media_type_counts() {
        let plain = Attachment::new("rp_attribute: owner:payments", "text/plain");
        assert!(!is_directive(&plain));
    }

    #[test]
    fn test_parse_attribute_first_colon() {
        assert_eq!(parse_attribute("owner:payments"), Attribute::new("owner", "payments"));
        assert_eq!(parse_attribute("url:http://x"), Attribute::new("url", "http://x"));
        assert_eq!(parse_attribute("flaky"), Attribute::value_only("flaky"));
        assert_eq!(parse_attribute(":x"), Attribute::value_only(":x"));
        assert_eq!(parse_attribute("x:"), Attribute::value_only("x:"));
    }

    #[test]
    fn test_extract_deduplicates_in_order() {
        let attachments = vec![
            Attachment::log("rp_attribute: owner:payments"),
            Attachment::log("cart ready"),
            Attachment::log("rp_attribute: flaky"),
            Attachment::log("rp_attribute: owner:payments"),
        ];
        assert_eq!(
            extract_attributes(&attachments),
            vec![
                Attribute::new("owner", "payments"),
                Attribute::value_only("flaky")
            ]
        );
    }
}
