// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Test step result types

use serde::{Deserialize, Serialize};

/// Outcome of a single test step as reported by the runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStepResult {
    /// Native step status
    pub status: TestStepResultStatus,
    /// How long the step took
    #[serde(default)]
    pub duration: Duration,
    /// Failure message (stack trace, assertion text)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TestStepResult {
    /// Result recorded for a step the runner never finished
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            status: TestStepResultStatus::Unknown,
            duration: Duration::default(),
            message: None,
        }
    }

    /// Check if the step passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == TestStepResultStatus::Passed
    }
}

/// Runner-native step statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStepResultStatus {
    /// Step passed
    Passed,
    /// Step was skipped
    Skipped,
    /// Step is marked pending
    Pending,
    /// No step definition matched
    Undefined,
    /// More than one step definition matched
    Ambiguous,
    /// Step failed
    Failed,
    /// Status was never reported, or is not one this crate knows
    #[serde(other)]
    Unknown,
}

/// A protocol duration: whole seconds plus a nanosecond remainder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duration {
    /// Whole seconds
    #[serde(default)]
    pub seconds: u64,
    /// Nanosecond remainder
    #[serde(default)]
    pub nanos: u32,
}

impl Duration {
    /// Create a duration from its protocol parts
    #[must_use]
    pub fn new(seconds: u64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }

    /// Whole milliseconds, with the nanosecond part truncated
    #[must_use]
    pub fn as_millis(&self) -> u64 {
        self.seconds * 1_000 + u64::from(self.nanos / 1_000_000)
    }
}

/// A protocol timestamp (seconds and nanos since the Unix epoch)
pub type Timestamp = Duration;
