// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for the projection engine

use cukeport_client::GatewayError;
use cukeport_messages::MessagesError;
use thiserror::Error;

/// Errors surfaced while projecting a message stream
#[derive(Debug, Error)]
pub enum ReportError {
    /// A backend call failed after exhausting its retry budget
    #[error("{operation} failed: {source}")]
    Gateway {
        /// Label of the failed call
        operation: String,
        /// Last error reported by the backend
        #[source]
        source: GatewayError,
    },

    /// A create call failed and its error was swallowed, so there is no
    /// handle to continue with
    #[error("{operation} abandoned after backend failures")]
    Abandoned {
        /// Label of the abandoned call
        operation: String,
    },

    /// The gherkin document of a test case has no feature
    #[error("Gherkin document {uri} has no feature")]
    MissingFeature {
        /// Document uri
        uri: String,
    },

    /// No attempt could be resolved for a finished test case
    #[error("Unknown test case attempt: {id}")]
    UnknownTestCase {
        /// The `testCaseStartedId`
        id: String,
    },

    /// A test case finished before the run started
    #[error("No launch has been started")]
    LaunchNotStarted,

    /// The message stream could not be parsed
    #[error(transparent)]
    Messages(#[from] MessagesError),

    /// Reading the message stream failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    /// Wrap a gateway error with the label of the call that produced it
    pub fn gateway(operation: impl Into<String>, source: GatewayError) -> Self {
        Self::Gateway {
            operation: operation.into(),
            source,
        }
    }
}
