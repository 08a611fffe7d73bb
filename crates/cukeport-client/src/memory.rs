// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! In-process gateway that records calls instead of sending them
//!
//! Used for dry runs and tests. Every call is recorded in issue order and
//! resolves immediately, unless a scripted rejection matches it.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::GatewayError;
use crate::gateway::{Completion, Gateway, Handle, Submitted, rejected, resolved};
use crate::model::{
    FinishItemRequest, FinishLaunchRequest, LogFile, LogRequest, StartItemRequest,
    StartLaunchRequest,
};

/// Kind of backend call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// `start_launch`
    StartLaunch,
    /// `finish_launch`
    FinishLaunch,
    /// `start_item`
    StartItem,
    /// `finish_item`
    FinishItem,
    /// `send_log`
    SendLog,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::StartLaunch => "start_launch",
            Self::FinishLaunch => "finish_launch",
            Self::StartItem => "start_item",
            Self::FinishItem => "finish_item",
            Self::SendLog => "send_log",
        };
        f.write_str(s)
    }
}

/// A call as the gateway received it
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    /// A launch was started
    StartLaunch {
        /// Issued handle
        handle: Handle,
        /// Request payload
        request: StartLaunchRequest,
    },
    /// A launch was finished
    FinishLaunch {
        /// Launch handle
        launch: Handle,
        /// Request payload
        request: FinishLaunchRequest,
    },
    /// An item was started
    StartItem {
        /// Issued handle
        handle: Handle,
        /// Request payload
        request: StartItemRequest,
        /// Owning launch
        launch: Handle,
        /// Parent item, if nested
        parent: Option<Handle>,
    },
    /// An item was finished
    FinishItem {
        /// Item handle
        item: Handle,
        /// Request payload
        request: FinishItemRequest,
    },
    /// A log entry was sent
    SendLog {
        /// Item handle
        item: Handle,
        /// Request payload
        request: LogRequest,
        /// Attached file
        file: Option<LogFile>,
    },
}

impl RecordedCall {
    /// Kind of this call
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::StartLaunch { .. } => Operation::StartLaunch,
            Self::FinishLaunch { .. } => Operation::FinishLaunch,
            Self::StartItem { .. } => Operation::StartItem,
            Self::FinishItem { .. } => Operation::FinishItem,
            Self::SendLog { .. } => Operation::SendLog,
        }
    }

    /// Name of the started item, for `StartItem` calls
    #[must_use]
    pub fn item_name(&self) -> Option<&str> {
        match self {
            Self::StartItem { request, .. } => Some(&request.name),
            _ => None,
        }
    }
}

type Matcher = Box<dyn Fn(&RecordedCall) -> bool + Send + Sync>;

struct Rejection {
    matcher: Matcher,
    remaining: Option<usize>,
}

#[derive(Default)]
struct State {
    calls: Vec<RecordedCall>,
    rejections: Vec<Rejection>,
    rejected: usize,
    frozen_at: Option<DateTime<Utc>>,
}

/// Totals over the recorded calls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallSummary {
    /// Launches started
    pub launches_started: usize,
    /// Launches finished
    pub launches_finished: usize,
    /// Items started
    pub items_started: usize,
    /// Items finished
    pub items_finished: usize,
    /// Log entries without a file
    pub logs: usize,
    /// Log entries carrying a file
    pub attachments: usize,
    /// Calls answered with a scripted rejection
    pub rejected: usize,
}

/// Gateway that records calls in memory
#[derive(Clone, Default)]
pub struct InMemoryGateway {
    state: Arc<Mutex<State>>,
}

impl fmt::Debug for InMemoryGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("InMemoryGateway")
            .field("calls", &state.calls.len())
            .field("rejections", &state.rejections.len())
            .field("frozen_at", &state.frozen_at)
            .finish()
    }
}

impl InMemoryGateway {
    /// Create a gateway with a live clock and no rejections
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop the clock at `at`
    pub fn freeze_clock(&self, at: DateTime<Utc>) {
        self.lock().frozen_at = Some(at);
    }

    /// Move a frozen clock forward
    pub fn advance_clock(&self, by: Duration) {
        let mut state = self.lock();
        if let Some(at) = state.frozen_at {
            state.frozen_at = Some(at + by);
        }
    }

    /// Reject every call matching `matcher`
    pub fn reject_when<F>(&self, matcher: F)
    where
        F: Fn(&RecordedCall) -> bool + Send + Sync + 'static,
    {
        self.lock().rejections.push(Rejection {
            matcher: Box::new(matcher),
            remaining: None,
        });
    }

    /// Reject the next `times` calls matching `matcher`
    pub fn reject_times<F>(&self, times: usize, matcher: F)
    where
        F: Fn(&RecordedCall) -> bool + Send + Sync + 'static,
    {
        self.lock().rejections.push(Rejection {
            matcher: Box::new(matcher),
            remaining: Some(times),
        });
    }

    /// Every call received so far, in issue order
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Calls of one kind, in issue order
    #[must_use]
    pub fn calls_of(&self, operation: Operation) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .cloned()
            .collect()
    }

    /// Number of calls of one kind
    #[must_use]
    pub fn count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Totals over every recorded call
    #[must_use]
    pub fn summary(&self) -> CallSummary {
        let state = self.lock();
        let mut summary = CallSummary {
            rejected: state.rejected,
            ..Default::default()
        };
        for call in &state.calls {
            match call {
                RecordedCall::StartLaunch { .. } => summary.launches_started += 1,
                RecordedCall::FinishLaunch { .. } => summary.launches_finished += 1,
                RecordedCall::StartItem { .. } => summary.items_started += 1,
                RecordedCall::FinishItem { .. } => summary.items_finished += 1,
                RecordedCall::SendLog { file: Some(_), .. } => summary.attachments += 1,
                RecordedCall::SendLog { file: None, .. } => summary.logs += 1,
            }
        }
        summary
    }

    /// Record a call and decide its completion
    fn record(&self, call: RecordedCall) -> Completion {
        let mut state = self.lock();
        let operation = call.operation();

        let mut reject = false;
        for rejection in state.rejections.iter_mut() {
            if rejection.remaining == Some(0) || !(rejection.matcher)(&call) {
                continue;
            }
            if let Some(remaining) = rejection.remaining.as_mut() {
                *remaining -= 1;
            }
            reject = true;
            break;
        }

        state.calls.push(call);
        if reject {
            state.rejected += 1;
            debug!(%operation, "Rejecting recorded call");
            rejected(GatewayError::Rejected(format!(
                "scripted rejection of {operation}"
            )))
        } else {
            resolved()
        }
    }
}

impl Gateway for InMemoryGateway {
    fn now(&self) -> DateTime<Utc> {
        self.lock().frozen_at.unwrap_or_else(Utc::now)
    }

    fn start_launch(&self, request: StartLaunchRequest) -> Submitted {
        let handle = Handle::new();
        let completion = self.record(RecordedCall::StartLaunch { handle, request });
        Submitted { handle, completion }
    }

    fn finish_launch(&self, launch: &Handle, request: FinishLaunchRequest) -> Completion {
        self.record(RecordedCall::FinishLaunch {
            launch: *launch,
            request,
        })
    }

    fn start_item(
        &self,
        request: StartItemRequest,
        launch: &Handle,
        parent: Option<&Handle>,
    ) -> Submitted {
        let handle = Handle::new();
        let completion = self.record(RecordedCall::StartItem {
            handle,
            request,
            launch: *launch,
            parent: parent.copied(),
        });
        Submitted { handle, completion }
    }

    fn finish_item(&self, item: &Handle, request: FinishItemRequest) -> Completion {
        self.record(RecordedCall::FinishItem {
            item: *item,
            request,
        })
    }

    fn send_log(&self, item: &Handle, request: LogRequest, file: Option<LogFile>) -> Completion {
        self.record(RecordedCall::SendLog {
            item: *item,
            request,
            file,
        })
    }
}
