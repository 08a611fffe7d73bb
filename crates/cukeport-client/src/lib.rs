// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! cukeport-client: reporting backend gateway for cukeport
//!
//! This library crate defines the [`Gateway`] contract used by the projection
//! engine, the request models it carries, and two implementations:
//!
//! - [`HttpGateway`] sends requests to a ReportPortal-compatible API
//! - [`InMemoryGateway`] records calls for dry runs and tests
//!
//! Every gateway call returns immediately. Create calls hand back a temporary
//! [`Handle`] that can be used as a parent straight away; the accompanying
//! [`Completion`] resolves once the backend has accepted the call.
//!
//! ```rust
//! use cukeport_client::prelude::*;
//! use chrono::Utc;
//!
//! # async fn demo() {
//! let gateway = InMemoryGateway::new();
//! let launch = gateway.start_launch(StartLaunchRequest {
//!     name: "nightly".to_string(),
//!     start_time: Utc::now(),
//!     description: String::new(),
//!     attributes: Vec::new(),
//!     mode: LaunchMode::Default,
//! });
//! launch.completion.await.expect("accepted");
//! assert_eq!(gateway.count(Operation::StartLaunch), 1);
//! # }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod gateway;
pub mod http;
pub mod memory;
pub mod model;

pub use error::GatewayError;
pub use gateway::{Completion, Gateway, Handle, Submitted, completion, rejected, resolved};
pub use http::HttpGateway;
pub use memory::{CallSummary, InMemoryGateway, Operation, RecordedCall};
pub use model::{
    Attribute, FinishItemRequest, FinishLaunchRequest, ItemStatus, ItemType, LaunchMode,
    LogFile, LogLevel, LogRequest, StartItemRequest, StartLaunchRequest,
};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::GatewayError;
    pub use crate::gateway::{Completion, Gateway, Handle, Submitted};
    pub use crate::http::HttpGateway;
    pub use crate::memory::{CallSummary, InMemoryGateway, Operation, RecordedCall};
    pub use crate::model::{
        Attribute, FinishItemRequest, FinishLaunchRequest, ItemStatus, ItemType, LaunchMode,
        LogFile, LogLevel, LogRequest, StartItemRequest, StartLaunchRequest,
    };
}
