// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Barrier over every backend call issued during a run

use cukeport_client::Completion;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

struct PendingOperation {
    label: String,
    completion: Completion,
}

/// Outstanding backend calls, drained once at the end of a run
#[derive(Default)]
pub struct PendingSet {
    operations: Vec<PendingOperation>,
}

impl std::fmt::Debug for PendingSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingSet")
            .field("len", &self.operations.len())
            .finish()
    }
}

/// Outcome of draining a [`PendingSet`]
///
/// A retried call is pushed once, with its last attempt, so a rejection that
/// a later attempt recovered from is not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Operations awaited
    pub settled: usize,
    /// Operations whose final attempt was an error
    pub failed: usize,
}

impl PendingSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issued call
    pub fn push(&mut self, label: impl Into<String>, completion: Completion) {
        self.operations.push(PendingOperation {
            label: label.into(),
            completion,
        });
    }

    /// Number of recorded calls
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if no calls are recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Await every recorded call and empty the set
    ///
    /// Failures are logged and counted, never returned.
    pub async fn drain(&mut self) -> DrainReport {
        let operations = std::mem::take(&mut self.operations);
        debug!(count = operations.len(), "Draining pending backend calls");

        let results = join_all(operations.iter().map(|op| op.completion.clone())).await;

        let mut report = DrainReport {
            settled: results.len(),
            failed: 0,
        };
        for (operation, result) in operations.iter().zip(results) {
            if let Err(e) = result {
                report.failed += 1;
                warn!(operation = %operation.label, error = %e, "Backend call did not complete");
            }
        }
        report
    }
}
