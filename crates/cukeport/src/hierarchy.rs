// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Launch, suite, test and step state for one run
//!
//! [`Hierarchy`] owns the handles the backend hands out and the set of
//! pending calls. Creates are issued outward-in (launch, suite, test, step)
//! and closes inward-out. Suites stay open until the launch finishes, since
//! a later test case may belong to a feature that was already reported.

use chrono::{DateTime, Utc};
use cukeport_client::{
    Attribute, Completion, FinishItemRequest, FinishLaunchRequest, Gateway, GatewayError, Handle,
    ItemStatus, ItemType, LaunchMode, LogFile, LogLevel, LogRequest, StartItemRequest,
    StartLaunchRequest, Submitted,
};
use cukeport_messages::{Attachment, Duration, Tag, TestStepResultStatus};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::attributes::is_directive;
use crate::error::ReportError;
use crate::format::{format_tags, prepare_content, suite_description};
use crate::pending::{DrainReport, PendingSet};
use crate::retry::{RetryPolicy, retry};
use crate::status::{item_status, step_end, test_item_status};

/// File name used for attachments that carry none
const DEFAULT_ATTACHMENT_NAME: &str = "attachment";

/// Launch fields resolved from configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchSettings {
    /// Launch name
    pub name: String,
    /// Launch description
    pub description: String,
    /// Launch attributes
    pub attributes: Vec<Attribute>,
    /// Visibility mode
    pub mode: LaunchMode,
}

/// A step ready to be reported
#[derive(Debug, Clone, PartialEq)]
pub struct StepDescriptor {
    /// Display name
    pub name: String,
    /// Runner status
    pub status: TestStepResultStatus,
    /// Reported duration
    pub duration: Duration,
    /// Failure message, if any
    pub message: Option<String>,
    /// Attachments and log lines, in arrival order
    pub attachments: Vec<Attachment>,
}

/// An opened test item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestItem {
    /// Backend handle
    pub handle: Handle,
    /// Wall-clock time the item was opened at
    pub start_time: DateTime<Utc>,
}

/// Backend handles and pending calls of the current run
pub struct Hierarchy<G> {
    gateway: G,
    policy: RetryPolicy,
    launch: Option<Handle>,
    suites: IndexMap<String, Handle>,
    pending: PendingSet,
}

impl<G: Gateway> Hierarchy<G> {
    /// Create an empty hierarchy
    pub fn new(gateway: G, policy: RetryPolicy) -> Self {
        Self {
            gateway,
            policy,
            launch: None,
            suites: IndexMap::new(),
            pending: PendingSet::new(),
        }
    }

    /// The gateway calls are issued through
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Handle of the open launch
    pub fn launch(&self) -> Option<Handle> {
        self.launch
    }

    /// Names of the open suites, in creation order
    pub fn open_suites(&self) -> impl Iterator<Item = &str> {
        self.suites.keys().map(String::as_str)
    }

    /// Number of calls not yet drained
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn require_launch(&self) -> Result<Handle, ReportError> {
        self.launch.ok_or(ReportError::LaunchNotStarted)
    }

    /// Start the launch of this run
    pub async fn open_launch(&mut self, settings: &LaunchSettings) -> Result<Handle, ReportError> {
        if let Some(launch) = self.launch {
            warn!(%launch, "Launch already started, reusing it");
            return Ok(launch);
        }

        let request = StartLaunchRequest {
            name: settings.name.clone(),
            start_time: self.gateway.now(),
            description: settings.description.clone(),
            attributes: settings.attributes.clone(),
            mode: settings.mode,
        };
        let handle = submit(
            &self.gateway,
            &mut self.pending,
            self.policy,
            "start launch",
            |gateway| gateway.start_launch(request.clone()),
        )
        .await?;

        info!(launch = %handle, name = %settings.name, mode = ?settings.mode, "Launch started");
        self.launch = Some(handle);
        Ok(handle)
    }

    /// Return the suite of a feature, creating it on first use
    pub async fn ensure_suite(
        &mut self,
        feature_name: &str,
        tags: &[Tag],
        description: &str,
    ) -> Result<Handle, ReportError> {
        if let Some(handle) = self.suites.get(feature_name) {
            return Ok(*handle);
        }
        let launch = self.require_launch()?;

        let request = StartItemRequest::new(feature_name, ItemType::Suite, self.gateway.now())
            .with_description(suite_description(tags, description));
        let handle = submit(
            &self.gateway,
            &mut self.pending,
            self.policy,
            "start suite",
            |gateway| gateway.start_item(request.clone(), &launch, None),
        )
        .await?;

        debug!(suite = %handle, feature = feature_name, "Suite started");
        self.suites.insert(feature_name.to_string(), handle);
        Ok(handle)
    }

    /// Start a test item under a suite
    pub async fn open_test_item(
        &mut self,
        name: &str,
        tags: &[Tag],
        attributes: Vec<Attribute>,
        is_retry: bool,
        parent: &Handle,
    ) -> Result<TestItem, ReportError> {
        let launch = self.require_launch()?;
        let start_time = self.gateway.now();

        let request = StartItemRequest::new(name, ItemType::Step, start_time)
            .with_description(format_tags(tags))
            .with_attributes(attributes)
            .with_retry(is_retry);
        let handle = submit(
            &self.gateway,
            &mut self.pending,
            self.policy,
            "start test item",
            |gateway| gateway.start_item(request.clone(), &launch, Some(parent)),
        )
        .await?;

        debug!(item = %handle, name, retry = is_retry, "Test item started");
        Ok(TestItem { handle, start_time })
    }

    /// Report one step under a test item and return its end time
    ///
    /// The step starts at `cursor` and ends `duration` later. Directive log
    /// lines are not forwarded.
    pub async fn run_step(
        &mut self,
        step: &StepDescriptor,
        parent: &Handle,
        cursor: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, ReportError> {
        let launch = self.require_launch()?;

        let request =
            StartItemRequest::new(step.name.as_str(), ItemType::Step, cursor).without_stats();
        let handle = submit(
            &self.gateway,
            &mut self.pending,
            self.policy,
            "start step",
            |gateway| gateway.start_item(request.clone(), &launch, Some(parent)),
        )
        .await?;

        if let Some(message) = &step.message {
            let log = LogRequest {
                level: LogLevel::Error,
                message: message.clone(),
                time: cursor,
            };
            complete(
                &self.gateway,
                &mut self.pending,
                self.policy,
                "send error log",
                |gateway| gateway.send_log(&handle, log.clone(), None),
            )
            .await?;
        }

        for attachment in step.attachments.iter().filter(|a| !is_directive(a)) {
            let (log, file) = attachment_log(attachment, cursor);
            complete(
                &self.gateway,
                &mut self.pending,
                self.policy,
                "send log",
                |gateway| gateway.send_log(&handle, log.clone(), file.clone()),
            )
            .await?;
        }

        let end_time = step_end(cursor, &step.duration);
        let finish = FinishItemRequest {
            status: item_status(step.status),
            end_time,
        };
        complete(
            &self.gateway,
            &mut self.pending,
            self.policy,
            "finish step",
            |gateway| gateway.finish_item(&handle, finish.clone()),
        )
        .await?;

        Ok(end_time)
    }

    /// Finish a test item
    pub async fn close_test_item(
        &mut self,
        handle: &Handle,
        any_step_failed: bool,
        end_time: DateTime<Utc>,
    ) -> Result<(), ReportError> {
        let finish = FinishItemRequest {
            status: test_item_status(any_step_failed),
            end_time,
        };
        complete(
            &self.gateway,
            &mut self.pending,
            self.policy,
            "finish test item",
            |gateway| gateway.finish_item(handle, finish.clone()),
        )
        .await?;
        debug!(item = %handle, status = %finish.status, "Test item finished");
        Ok(())
    }

    /// Drain every pending call, close open suites, then close the launch
    ///
    /// Run state is reset afterwards, whatever the outcome. Suite close
    /// failures do not stop the launch from being closed; the first one is
    /// returned once the launch is finished.
    pub async fn drain_and_finish_launch(&mut self) -> Result<DrainReport, ReportError> {
        let mut report = self.pending.drain().await;
        info!(
            settled = report.settled,
            failed = report.failed,
            "Pending backend calls drained"
        );

        let suites = std::mem::take(&mut self.suites);
        let Some(launch) = self.launch.take() else {
            return Err(ReportError::LaunchNotStarted);
        };

        let end_time = self.gateway.now();
        let mut first_error = None;
        for (feature, suite) in &suites {
            let finish = FinishItemRequest {
                status: ItemStatus::Passed,
                end_time,
            };
            let closed = complete(
                &self.gateway,
                &mut self.pending,
                self.policy,
                "finish suite",
                |gateway| gateway.finish_item(suite, finish.clone()),
            )
            .await;
            if let Err(e) = closed {
                warn!(feature = %feature, error = %e, "Could not close suite");
                first_error.get_or_insert(e);
            }
        }

        let finished = complete(
            &self.gateway,
            &mut self.pending,
            self.policy,
            "finish launch",
            |gateway| gateway.finish_launch(&launch, FinishLaunchRequest { end_time }),
        )
        .await;

        let tail = self.pending.drain().await;
        report.settled += tail.settled;
        report.failed += tail.failed;

        finished?;
        if let Some(e) = first_error {
            return Err(e);
        }
        info!(%launch, suites = suites.len(), "Launch finished");
        Ok(report)
    }
}

/// Build the log request (and file) for a non-directive attachment
fn attachment_log(attachment: &Attachment, time: DateTime<Utc>) -> (LogRequest, Option<LogFile>) {
    if attachment.is_log() {
        let log = LogRequest {
            level: LogLevel::Info,
            message: attachment.body.clone(),
            time,
        };
        return (log, None);
    }

    let log = LogRequest {
        level: LogLevel::Info,
        message: "Attachment".to_string(),
        time,
    };
    let file = LogFile {
        name: attachment
            .file_name
            .clone()
            .unwrap_or_else(|| DEFAULT_ATTACHMENT_NAME.to_string()),
        media_type: attachment.media_type.clone(),
        content: prepare_content(&attachment.media_type, &attachment.body),
    };
    (log, Some(file))
}

/// Issue a create call under the retry policy
///
/// Only the last attempt's completion is recorded as pending. An exhausted
/// call whose error is ignored still fails with [`ReportError::Abandoned`], since there
/// is no handle to build on.
async fn submit<G, F>(
    gateway: &G,
    pending: &mut PendingSet,
    policy: RetryPolicy,
    label: &str,
    mut issue: F,
) -> Result<Handle, ReportError>
where
    G: Gateway,
    F: FnMut(&G) -> Submitted,
{
    let mut last = None;
    let outcome = retry(label, policy, || {
        let submitted = issue(gateway);
        last = Some(submitted.completion.clone());
        async move {
            submitted.completion.await?;
            Ok::<_, GatewayError>(submitted.handle)
        }
    })
    .await;
    if let Some(completion) = last {
        pending.push(label, completion);
    }

    match outcome {
        Ok(Some(handle)) => Ok(handle),
        Ok(None) => Err(ReportError::Abandoned {
            operation: label.to_string(),
        }),
        Err(e) => Err(ReportError::gateway(label, e)),
    }
}

/// Issue a call that produces no handle under the retry policy
///
/// Only the last attempt's completion is recorded as pending. An exhausted
/// call whose error is ignored counts as done.
async fn complete<G, F>(
    gateway: &G,
    pending: &mut PendingSet,
    policy: RetryPolicy,
    label: &str,
    mut issue: F,
) -> Result<(), ReportError>
where
    G: Gateway,
    F: FnMut(&G) -> Completion,
{
    let mut last = None;
    let outcome = retry(label, policy, || {
        let completion = issue(gateway);
        last = Some(completion.clone());
        completion
    })
    .await;
    if let Some(completion) = last {
        pending.push(label, completion);
    }

    outcome
        .map(|_| ())
        .map_err(|e| ReportError::gateway(label, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cukeport_client::{InMemoryGateway, Operation, RecordedCall};
    use similar_asserts::assert_eq;

    fn frozen_gateway() -> InMemoryGateway {
        let gateway = InMemoryGateway::new();
        gateway.freeze_clock(Utc.timestamp_millis_opt(1_000_000).unwrap());
        gateway
    }

    fn settings() -> LaunchSettings {
        LaunchSettings {
            name: "nightly".to_string(),
            ..Default::default()
        }
    }

    fn step(name: &str, status: TestStepResultStatus, millis: u64) -> StepDescriptor {
        StepDescriptor {
            name: name.to_string(),
            status,
            duration: Duration::new(millis / 1_000, ((millis % 1_000) * 1_000_000) as u32),
            message: None,
            attachments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_suite_is_memoized() {
        let gateway = frozen_gateway();
        let mut hierarchy = Hierarchy::new(gateway.clone(), RetryPolicy::default());
        hierarchy.open_launch(&settings()).await.expect("launch");

        let first = hierarchy
            .ensure_suite("Checkout", &[Tag::new("@shop")], "Paying")
            .await
            .expect("suite");
        let second = hierarchy
            .ensure_suite("Checkout", &[], "ignored")
            .await
            .expect("suite");

        assert_eq!(first, second);
        assert_eq!(gateway.count(Operation::StartItem), 1);
        assert_eq!(hierarchy.open_suites().collect::<Vec<_>>(), vec!["Checkout"]);
    }

    #[tokio::test]
    async fn test_suite_requires_launch() {
        let mut hierarchy = Hierarchy::new(frozen_gateway(), RetryPolicy::default());
        let result = hierarchy.ensure_suite("Checkout", &[], "").await;
        assert!(matches!(result, Err(ReportError::LaunchNotStarted)));
    }

    #[tokio::test]
    async fn test_steps_advance_cursor() {
        let gateway = frozen_gateway();
        let mut hierarchy = Hierarchy::new(gateway.clone(), RetryPolicy::default());
        hierarchy.open_launch(&settings()).await.expect("launch");
        let suite = hierarchy.ensure_suite("Checkout", &[], "").await.expect("suite");
        let item = hierarchy
            .open_test_item("Pay by card", &[], Vec::new(), false, &suite)
            .await
            .expect("item");

        let mut cursor = item.start_time;
        for descriptor in [
            step("Before", TestStepResultStatus::Passed, 1),
            step("I pay", TestStepResultStatus::Passed, 250),
            step("After", TestStepResultStatus::Passed, 1_500),
        ] {
            cursor = hierarchy
                .run_step(&descriptor, &item.handle, cursor)
                .await
                .expect("step");
        }
        assert_eq!(cursor, Utc.timestamp_millis_opt(1_001_751).unwrap());

        let ends: Vec<i64> = gateway
            .calls_of(Operation::FinishItem)
            .iter()
            .filter_map(|call| match call {
                RecordedCall::FinishItem { request, .. } => Some(request.end_time.timestamp_millis()),
                _ => None,
            })
            .collect();
        assert_eq!(ends, vec![1_000_001, 1_000_251, 1_001_751]);
    }

    #[tokio::test]
    async fn test_step_logs_error_and_attachments() {
        let gateway = frozen_gateway();
        let mut hierarchy = Hierarchy::new(gateway.clone(), RetryPolicy::default());
        hierarchy.open_launch(&settings()).await.expect("launch");
        let suite = hierarchy.ensure_suite("Checkout", &[], "").await.expect("suite");
        let item = hierarchy
            .open_test_item("Pay by card", &[], Vec::new(), false, &suite)
            .await
            .expect("item");

        let mut descriptor = step("I pay", TestStepResultStatus::Failed, 10);
        descriptor.message = Some("card declined".to_string());
        descriptor.attachments = vec![
            Attachment::log("rp_attribute: owner:payments"),
            Attachment::log("cart ready"),
            Attachment::new("hello", "text/plain"),
        ];
        hierarchy
            .run_step(&descriptor, &item.handle, item.start_time)
            .await
            .expect("step");

        let logs: Vec<(LogLevel, String, Option<LogFile>)> = gateway
            .calls_of(Operation::SendLog)
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::SendLog { request, file, .. } => {
                    Some((request.level, request.message, file))
                }
                _ => None,
            })
            .collect();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].0, LogLevel::Error);
        assert_eq!(logs[0].1, "card declined");
        assert_eq!(logs[1].1, "cart ready");
        assert_eq!(logs[2].1, "Attachment");
        assert_eq!(
            logs[2].2,
            Some(LogFile {
                name: "attachment".to_string(),
                media_type: "text/plain".to_string(),
                content: "aGVsbG8=".to_string(),
            })
        );

        let statuses: Vec<ItemStatus> = gateway
            .calls_of(Operation::FinishItem)
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::FinishItem { request, .. } => Some(request.status),
                _ => None,
            })
            .collect();
        assert_eq!(statuses, vec![ItemStatus::Failed]);
    }

    #[tokio::test]
    async fn test_create_is_retried() {
        let gateway = frozen_gateway();
        gateway.reject_times(1, |call| call.operation() == Operation::StartLaunch);
        let mut hierarchy = Hierarchy::new(gateway.clone(), RetryPolicy::new(2, false));

        hierarchy.open_launch(&settings()).await.expect("second attempt");
        assert_eq!(gateway.count(Operation::StartLaunch), 2);
        assert_eq!(hierarchy.pending_len(), 1);

        let report = hierarchy.drain_and_finish_launch().await.expect("finish");
        assert_eq!(report.failed, 0);
        assert_eq!(report.settled, 2);
    }

    #[tokio::test]
    async fn test_exhausted_create_is_gateway_error() {
        let gateway = frozen_gateway();
        gateway.reject_when(|_| true);
        let mut hierarchy = Hierarchy::new(gateway.clone(), RetryPolicy::new(3, false));

        let result = hierarchy.open_launch(&settings()).await;
        assert!(matches!(
            result,
            Err(ReportError::Gateway {
                source: GatewayError::Rejected(_),
                ..
            })
        ));
        assert_eq!(gateway.count(Operation::StartLaunch), 3);
        assert_eq!(hierarchy.launch(), None);
    }

    #[tokio::test]
    async fn test_ignored_create_is_abandoned() {
        let gateway = frozen_gateway();
        gateway.reject_when(|_| true);
        let mut hierarchy = Hierarchy::new(gateway, RetryPolicy::new(1, true));

        let result = hierarchy.open_launch(&settings()).await;
        assert!(matches!(result, Err(ReportError::Abandoned { .. })));
    }

    #[tokio::test]
    async fn test_finish_closes_suites_then_launch() {
        let gateway = frozen_gateway();
        let mut hierarchy = Hierarchy::new(gateway.clone(), RetryPolicy::default());
        let launch = hierarchy.open_launch(&settings()).await.expect("launch");
        let checkout = hierarchy.ensure_suite("Checkout", &[], "").await.expect("suite");
        let search = hierarchy.ensure_suite("Search", &[], "").await.expect("suite");

        let report = hierarchy.drain_and_finish_launch().await.expect("finish");
        assert_eq!(report.failed, 0);
        assert_eq!(report.settled, 6);

        let tail: Vec<RecordedCall> = gateway.calls().into_iter().skip(3).collect();
        assert!(matches!(
            &tail[0],
            RecordedCall::FinishItem { item, request } if *item == checkout && request.status == ItemStatus::Passed
        ));
        assert!(matches!(&tail[1], RecordedCall::FinishItem { item, .. } if *item == search));
        assert!(matches!(&tail[2], RecordedCall::FinishLaunch { launch: l, .. } if *l == launch));

        assert_eq!(hierarchy.launch(), None);
        assert_eq!(hierarchy.open_suites().count(), 0);
        assert_eq!(hierarchy.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_failed_suite_close_still_finishes_launch() {
        let gateway = frozen_gateway();
        let mut hierarchy = Hierarchy::new(gateway.clone(), RetryPolicy::default());
        hierarchy.open_launch(&settings()).await.expect("launch");
        hierarchy.ensure_suite("Checkout", &[], "").await.expect("suite");
        gateway.reject_when(|call| call.operation() == Operation::FinishItem);

        let result = hierarchy.drain_and_finish_launch().await;
        assert!(matches!(result, Err(ReportError::Gateway { .. })));
        assert_eq!(gateway.count(Operation::FinishLaunch), 1);
        assert_eq!(hierarchy.launch(), None);
    }

    #[test]
    fn test_attachment_log_uses_file_name() {
        let mut attachment = Attachment::new("iVBORw0KGgo=", "image/png");
        attachment.file_name = Some("declined.png".to_string());
        let at = Utc.timestamp_millis_opt(0).unwrap();
        let (log, file) = attachment_log(&attachment, at);
        assert_eq!(log.message, "Attachment");
        let file = file.expect("file");
        assert_eq!(file.name, "declined.png");
        assert_eq!(file.content, "iVBORw0KGgo=");
    }
}
