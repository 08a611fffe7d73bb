// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Rendering of gherkin data into backend-displayable markup
//!
//! All functions here are pure. Markup is emitted verbatim; cell values and
//! doc strings are not escaped, matching what the backend renders for other
//! cucumber reporters.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cukeport_messages::{DataTable, DocString, PickleStep, Tag};

/// Media types whose bodies are base64-encoded before upload
const ENCODED_MEDIA_TYPES: [&str; 2] = ["text/plain", "application/json"];

/// Render tags as `<code>` spans with no separator
///
/// Order and duplicates are preserved.
#[must_use]
pub fn format_tags(tags: &[Tag]) -> String {
    tags.iter()
        .map(|tag| format!("<code>{}</code>", tag.name))
        .collect()
}

/// Render a data table as an HTML table
#[must_use]
pub fn format_data_table(table: &DataTable) -> String {
    let mut out = String::from("<table><tbody>");
    for row in &table.rows {
        out.push_str("<tr>");
        for cell in &row.cells {
            out.push_str("<td>");
            out.push_str(&cell.value);
            out.push_str("</td>");
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    out
}

/// Render a doc string as preformatted code
#[must_use]
pub fn format_doc_string(doc_string: &DocString) -> String {
    format!("<pre><code>{}</code></pre>", doc_string.content)
}

/// Display name of a gherkin step, including its table or doc string
#[must_use]
pub fn step_display_name(step: &PickleStep) -> String {
    let mut parts = vec![step.text.clone()];
    if let Some(argument) = &step.argument {
        if let Some(table) = &argument.data_table {
            parts.push(format_data_table(table));
        }
        if let Some(doc_string) = &argument.doc_string {
            parts.push(format_doc_string(doc_string));
        }
    }
    parts.join("\n")
}

/// Suite description: feature tags, a newline, then the feature description
#[must_use]
pub fn suite_description(tags: &[Tag], description: &str) -> String {
    format!("{}\n{}", format_tags(tags), description)
}

/// Prepare an attachment body for transport
///
/// Bodies of `text/plain` and `application/json` attachments are
/// base64-encoded; every other body is passed through unchanged.
#[must_use]
pub fn prepare_content(media_type: &str, body: &str) -> String {
    if ENCODED_MEDIA_TYPES.contains(&media_type) {
        STANDARD.encode(body.as_bytes())
    } else {
        body.to_string()
    }
}
