// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Request models for the reporting backend
//!
//! Field names and value spellings follow the backend's JSON API: camelCase
//! keys and epoch-millisecond timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A key/value (or value-only) label attached to a launch or item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    /// Optional key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Value
    pub value: String,
    /// System attributes are hidden in the backend UI
    #[serde(default)]
    pub system: bool,
}

impl Attribute {
    /// Create a key/value attribute
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: value.into(),
            system: false,
        }
    }

    /// Create a key-less attribute
    pub fn value_only(value: impl Into<String>) -> Self {
        Self {
            key: None,
            value: value.into(),
            system: false,
        }
    }
}

/// Launch visibility mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LaunchMode {
    /// Regular launch
    #[default]
    Default,
    /// Debug launch, hidden from the main launch list
    Debug,
}

impl std::str::FromStr for LaunchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEFAULT" => Ok(Self::Default),
            "DEBUG" => Ok(Self::Debug),
            other => Err(format!("unknown launch mode '{other}', expected DEFAULT or DEBUG")),
        }
    }
}

/// Kind of test item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    /// A grouping of tests (one per feature)
    Suite,
    /// A step (also used for scenarios)
    Step,
}

/// Status vocabulary of the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Passed
    Passed,
    /// Failed
    Failed,
    /// Skipped
    Skipped,
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Log severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Trace
    Trace,
    /// Debug
    Debug,
    /// Info
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

// ============================================================================
// Requests
// ============================================================================

/// Start a launch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartLaunchRequest {
    /// Launch name
    pub name: String,
    /// Start time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    /// Launch description
    pub description: String,
    /// Launch attributes
    pub attributes: Vec<Attribute>,
    /// Visibility mode
    pub mode: LaunchMode,
}

/// Finish a launch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishLaunchRequest {
    /// End time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
}

/// Start a test item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartItemRequest {
    /// Item name
    pub name: String,
    /// Start time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    /// Item description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Item kind
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Item attributes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    /// Whether the item counts towards launch statistics
    pub has_stats: bool,
    /// Marks a retry of an earlier item with the same identity
    pub retry: bool,
}

impl StartItemRequest {
    /// Create a request with stats enabled and no retry flag
    pub fn new(name: impl Into<String>, item_type: ItemType, start_time: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            start_time,
            description: None,
            item_type,
            attributes: Vec::new(),
            has_stats: true,
            retry: false,
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the attributes
    #[must_use]
    pub fn with_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Exclude the item from launch statistics
    #[must_use]
    pub fn without_stats(mut self) -> Self {
        self.has_stats = false;
        self
    }

    /// Set the retry flag
    #[must_use]
    pub fn with_retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }
}

/// Finish a test item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishItemRequest {
    /// Final status
    pub status: ItemStatus,
    /// End time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
}

/// A log entry attached to an item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRequest {
    /// Severity
    pub level: LogLevel,
    /// Message text
    pub message: String,
    /// Log time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,
}

/// A file sent along with a log entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogFile {
    /// File name shown in the backend
    pub name: String,
    /// Media type
    #[serde(rename = "type")]
    pub media_type: String,
    /// Base64 content
    pub content: String,
}
