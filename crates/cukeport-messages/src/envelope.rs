// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Cucumber message envelopes
//!
//! A cucumber runner emits one envelope per line. Each envelope is a JSON
//! object with a single key naming the message kind, e.g.
//! `{"testCaseFinished": {"testCaseStartedId": "7", "willBeRetried": false}}`.
//! Only the kinds and fields needed for reporting are modelled here; any other
//! kind parses to [`Envelope::Other`] and unknown fields are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MessagesError;
use crate::result::{TestStepResult, Timestamp};

// ============================================================================
// Envelope
// ============================================================================

/// A single message from the runner
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Envelope {
    /// A parsed feature file
    GherkinDocument(GherkinDocument),
    /// A compiled scenario
    Pickle(Pickle),
    /// Step definition registration
    StepDefinition(StepDefinition),
    /// Hook registration
    Hook(Hook),
    /// The run has started
    TestRunStarted(TestRunStarted),
    /// A test case plan (steps and hooks bound to a pickle)
    TestCase(TestCase),
    /// One attempt of a test case has started
    TestCaseStarted(TestCaseStarted),
    /// A step of an attempt has finished
    TestStepFinished(TestStepFinished),
    /// Something attached or logged during a step
    Attachment(Attachment),
    /// One attempt of a test case has finished
    TestCaseFinished(TestCaseFinished),
    /// The run has finished
    TestRunFinished(TestRunFinished),
    /// Any message kind not modelled here
    #[serde(skip_serializing)]
    Other(String),
}

impl Envelope {
    /// Convert a decoded JSON value into an envelope
    ///
    /// # Errors
    ///
    /// Returns `MessagesError::InvalidEnvelope` if the value is not an object
    /// with at least one key, or `MessagesError::JsonParse` if the body of a
    /// known message kind does not match its schema.
    pub fn from_value(value: Value) -> Result<Self, MessagesError> {
        let Value::Object(map) = value else {
            return Err(MessagesError::InvalidEnvelope {
                message: "expected a JSON object".to_string(),
            });
        };
        let Some((kind, body)) = map.into_iter().next() else {
            return Err(MessagesError::InvalidEnvelope {
                message: "envelope has no message".to_string(),
            });
        };

        let envelope = match kind.as_str() {
            "gherkinDocument" => Self::GherkinDocument(serde_json::from_value(body)?),
            "pickle" => Self::Pickle(serde_json::from_value(body)?),
            "stepDefinition" => Self::StepDefinition(serde_json::from_value(body)?),
            "hook" => Self::Hook(serde_json::from_value(body)?),
            "testRunStarted" => Self::TestRunStarted(serde_json::from_value(body)?),
            "testCase" => Self::TestCase(serde_json::from_value(body)?),
            "testCaseStarted" => Self::TestCaseStarted(serde_json::from_value(body)?),
            "testStepFinished" => Self::TestStepFinished(serde_json::from_value(body)?),
            "attachment" => Self::Attachment(serde_json::from_value(body)?),
            "testCaseFinished" => Self::TestCaseFinished(serde_json::from_value(body)?),
            "testRunFinished" => Self::TestRunFinished(serde_json::from_value(body)?),
            _ => Self::Other(kind),
        };
        Ok(envelope)
    }

    /// The protocol name of this message kind
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::GherkinDocument(_) => "gherkinDocument",
            Self::Pickle(_) => "pickle",
            Self::StepDefinition(_) => "stepDefinition",
            Self::Hook(_) => "hook",
            Self::TestRunStarted(_) => "testRunStarted",
            Self::TestCase(_) => "testCase",
            Self::TestCaseStarted(_) => "testCaseStarted",
            Self::TestStepFinished(_) => "testStepFinished",
            Self::Attachment(_) => "attachment",
            Self::TestCaseFinished(_) => "testCaseFinished",
            Self::TestRunFinished(_) => "testRunFinished",
            Self::Other(kind) => kind,
        }
    }
}

// ============================================================================
// Gherkin
// ============================================================================

/// A parsed feature file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GherkinDocument {
    /// Path of the feature file
    pub uri: String,
    /// The feature, absent for empty files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<Feature>,
}

/// A gherkin feature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    /// Feature name
    pub name: String,
    /// Free-text description below the feature line
    #[serde(default)]
    pub description: String,
    /// Tags placed on the feature
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// A gherkin tag (`@smoke`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name including the leading `@`
    pub name: String,
}

impl Tag {
    /// Create a tag from its name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

// ============================================================================
// Pickles
// ============================================================================

/// A compiled scenario, ready to execute
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pickle {
    /// Pickle ID
    pub id: String,
    /// URI of the gherkin document this pickle came from
    pub uri: String,
    /// Scenario name
    pub name: String,
    /// Inherited and own tags
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Steps of the scenario
    #[serde(default)]
    pub steps: Vec<PickleStep>,
}

/// A step in a pickle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickleStep {
    /// Pickle step ID
    pub id: String,
    /// Step text, with keyword stripped
    pub text: String,
    /// Data table or doc string argument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<PickleStepArgument>,
}

/// Argument attached to a pickle step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickleStepArgument {
    /// Tabular argument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_table: Option<DataTable>,
    /// Multi-line text argument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_string: Option<DocString>,
}

/// A gherkin data table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    /// Table rows in source order
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

/// A data table row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Row cells in source order
    #[serde(default)]
    pub cells: Vec<TableCell>,
}

/// A data table cell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    /// Cell text
    pub value: String,
}

/// A gherkin doc string
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocString {
    /// Literal content
    pub content: String,
    /// Optional media type annotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

// ============================================================================
// Support code
// ============================================================================

/// Step definition registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Definition ID
    pub id: String,
}

/// Hook registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hook {
    /// Hook ID
    pub id: String,
    /// Name given to the hook by the user, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// ============================================================================
// Execution
// ============================================================================

/// The run has started
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestRunStarted {
    /// When the run started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

/// The run has finished
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestRunFinished {
    /// Whether the run as a whole succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// When the run finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

/// A test case plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Test case ID
    pub id: String,
    /// The pickle this test case executes
    pub pickle_id: String,
    /// Steps and hooks in execution order
    #[serde(default)]
    pub test_steps: Vec<TestStep>,
}

/// A step of a test case plan: either a pickle step or a hook
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStep {
    /// Test step ID
    pub id: String,
    /// Set for gherkin steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickle_step_id: Option<String>,
    /// Set for hooks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_id: Option<String>,
}

/// One attempt of a test case has started
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseStarted {
    /// Attempt ID, referenced by later messages as `testCaseStartedId`
    pub id: String,
    /// The test case being attempted
    pub test_case_id: String,
    /// Zero-based attempt number
    #[serde(default)]
    pub attempt: u32,
    /// When the attempt started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

/// A step of an attempt has finished
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStepFinished {
    /// The attempt the step belongs to
    pub test_case_started_id: String,
    /// The finished step
    pub test_step_id: String,
    /// Outcome of the step
    pub test_step_result: TestStepResult,
    /// When the step finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

/// How an attachment body is encoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentEncoding {
    /// Body is the literal content
    #[default]
    Identity,
    /// Body is base64
    Base64,
}

/// Something attached or logged during a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// The attempt the attachment belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case_started_id: Option<String>,
    /// The step the attachment belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_step_id: Option<String>,
    /// Attachment body
    pub body: String,
    /// Encoding of `body`
    #[serde(default)]
    pub content_encoding: ContentEncoding,
    /// Declared media type
    pub media_type: String,
    /// Suggested file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl Attachment {
    /// Media type cucumber uses for `log()` calls
    pub const LOG_MEDIA_TYPE: &'static str = "text/x.cucumber.log+plain";

    /// Create an attachment with identity encoding
    pub fn new(body: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            test_case_started_id: None,
            test_step_id: None,
            body: body.into(),
            content_encoding: ContentEncoding::Identity,
            media_type: media_type.into(),
            file_name: None,
        }
    }

    /// Create a plain-text log line
    pub fn log(body: impl Into<String>) -> Self {
        Self::new(body, Self::LOG_MEDIA_TYPE)
    }

    /// Check if this attachment is a `log()` line
    #[must_use]
    pub fn is_log(&self) -> bool {
        self.media_type == Self::LOG_MEDIA_TYPE
    }
}

/// One attempt of a test case has finished
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseFinished {
    /// The attempt that finished
    pub test_case_started_id: String,
    /// True when the runner will try this test case again
    #[serde(default)]
    pub will_be_retried: bool,
    /// When the attempt finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}
