// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! The reporting backend contract
//!
//! Every call returns immediately. Create calls hand back a temporary
//! [`Handle`] that later calls may reference as a parent before the backend
//! has accepted the create; the [`Completion`] resolves once the backend has
//! durably accepted (or rejected) the operation.

use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::model::{
    FinishItemRequest, FinishLaunchRequest, LogFile, LogRequest, StartItemRequest,
    StartLaunchRequest,
};

/// Temporary identifier for a launch or item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(Uuid);

impl Handle {
    /// Issue a fresh handle
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completion signal of a backend call
///
/// Cloneable so that the issuing handler and the drain barrier can both
/// await it.
pub type Completion = Shared<BoxFuture<'static, Result<(), GatewayError>>>;

/// Wrap a future as a [`Completion`]
pub fn completion<F>(future: F) -> Completion
where
    F: Future<Output = Result<(), GatewayError>> + Send + 'static,
{
    future.boxed().shared()
}

/// A completion that has already succeeded
#[must_use]
pub fn resolved() -> Completion {
    completion(futures::future::ready(Ok(())))
}

/// A completion that has already failed
#[must_use]
pub fn rejected(error: GatewayError) -> Completion {
    completion(futures::future::ready(Err(error)))
}

/// Result of a create call
#[derive(Clone)]
pub struct Submitted {
    /// Temporary handle, usable as a parent right away
    pub handle: Handle,
    /// Resolves when the backend accepted the create
    pub completion: Completion,
}

impl fmt::Debug for Submitted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submitted")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// Capability surface of the reporting backend
pub trait Gateway: Send + Sync {
    /// Backend clock used for wall-clock timestamps
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Start a launch
    fn start_launch(&self, request: StartLaunchRequest) -> Submitted;

    /// Finish a launch
    fn finish_launch(&self, launch: &Handle, request: FinishLaunchRequest) -> Completion;

    /// Start an item under a launch, optionally nested under a parent item
    fn start_item(
        &self,
        request: StartItemRequest,
        launch: &Handle,
        parent: Option<&Handle>,
    ) -> Submitted;

    /// Finish an item
    fn finish_item(&self, item: &Handle, request: FinishItemRequest) -> Completion;

    /// Attach a log entry, optionally with a file, to an item
    fn send_log(&self, item: &Handle, request: LogRequest, file: Option<LogFile>) -> Completion;
}

impl<G: Gateway + ?Sized> Gateway for Box<G> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn start_launch(&self, request: StartLaunchRequest) -> Submitted {
        (**self).start_launch(request)
    }

    fn finish_launch(&self, launch: &Handle, request: FinishLaunchRequest) -> Completion {
        (**self).finish_launch(launch, request)
    }

    fn start_item(
        &self,
        request: StartItemRequest,
        launch: &Handle,
        parent: Option<&Handle>,
    ) -> Submitted {
        (**self).start_item(request, launch, parent)
    }

    fn finish_item(&self, item: &Handle, request: FinishItemRequest) -> Completion {
        (**self).finish_item(item, request)
    }

    fn send_log(&self, item: &Handle, request: LogRequest, file: Option<LogFile>) -> Completion {
        (**self).send_log(item, request, file)
    }
}
