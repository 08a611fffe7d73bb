// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Status mapping and step timing

use chrono::{DateTime, TimeDelta, Utc};
use cukeport_client::ItemStatus;
use cukeport_messages::{Duration, TestStepResultStatus};

/// Map a runner status onto the backend vocabulary
#[must_use]
pub fn item_status(status: TestStepResultStatus) -> ItemStatus {
    match status {
        TestStepResultStatus::Passed => ItemStatus::Passed,
        TestStepResultStatus::Skipped => ItemStatus::Skipped,
        TestStepResultStatus::Unknown
        | TestStepResultStatus::Pending
        | TestStepResultStatus::Undefined
        | TestStepResultStatus::Ambiguous
        | TestStepResultStatus::Failed => ItemStatus::Failed,
    }
}

/// Check if a step status fails its test case
///
/// Passed and skipped steps do not.
#[must_use]
pub fn is_failing(status: TestStepResultStatus) -> bool {
    !matches!(
        status,
        TestStepResultStatus::Passed | TestStepResultStatus::Skipped
    )
}

/// Aggregate status of a test item
#[must_use]
pub fn test_item_status(any_step_failed: bool) -> ItemStatus {
    if any_step_failed {
        ItemStatus::Failed
    } else {
        ItemStatus::Passed
    }
}

/// End time of a step that started at `cursor` and ran for `duration`
///
/// Sub-millisecond remainders are truncated.
#[must_use]
pub fn step_end(cursor: DateTime<Utc>, duration: &Duration) -> DateTime<Utc> {
    let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
    TimeDelta::try_milliseconds(millis)
        .and_then(|delta| cursor.checked_add_signed(delta))
        .unwrap_or(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use similar_asserts::assert_eq;

    #[test]
    fn test_item_status_mapping() {
        assert_eq!(item_status(TestStepResultStatus::Passed), ItemStatus::Passed);
        assert_eq!(item_status(TestStepResultStatus::Skipped), ItemStatus::Skipped);
        for status in [
            TestStepResultStatus::Failed,
            TestStepResultStatus::Ambiguous,
            TestStepResultStatus::Undefined,
            TestStepResultStatus::Pending,
            TestStepResultStatus::Unknown,
        ] {
            assert_eq!(item_status(status), ItemStatus::Failed, "{status:?}");
        }
    }

    #[test]
    fn test_skipped_is_not_failing() {
        assert!(!is_failing(TestStepResultStatus::Skipped));
        assert!(!is_failing(TestStepResultStatus::Passed));
        assert!(is_failing(TestStepResultStatus::Pending));
    }

    #[test]
    fn test_test_item_status() {
        assert_eq!(test_item_status(false), ItemStatus::Passed);
        assert_eq!(test_item_status(true), ItemStatus::Failed);
    }

    #[test]
    fn test_step_end_truncates_nanos() {
        let start = Utc.timestamp_millis_opt(10_000).unwrap();
        let end = step_end(start, &Duration::new(1, 2_999_999));
        assert_eq!(end, Utc.timestamp_millis_opt(11_002).unwrap());
    }
}
