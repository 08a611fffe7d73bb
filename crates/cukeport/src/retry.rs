// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Bounded retry of a single asynchronous operation

use std::fmt::Display;
use std::future::Future;

use tracing::{debug, error};

/// How many times to try an operation and what to do when every try fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts; values below 1 are treated as 1
    pub retries: u32,
    /// Swallow the final error instead of returning it
    pub ignore_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            ignore_errors: false,
        }
    }
}

impl RetryPolicy {
    /// Create a policy
    #[must_use]
    pub fn new(retries: u32, ignore_errors: bool) -> Self {
        Self {
            retries,
            ignore_errors,
        }
    }

    /// Number of attempts actually made
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.retries.max(1)
    }
}

/// Run `operation` until it succeeds or the policy's attempts are used up
///
/// Each failed attempt is logged at error level. Attempts run strictly one
/// after another with no delay in between.
///
/// Returns `Ok(Some(value))` on success, `Ok(None)` when every attempt failed
/// and errors are ignored, and the last error otherwise.
pub async fn retry<T, E, F, Fut>(
    label: &str,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<Option<T>, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = label, attempt, "Backend call succeeded after retry");
                }
                return Ok(Some(value));
            }
            Err(e) => {
                error!(
                    operation = label,
                    attempt,
                    attempts,
                    error = %e,
                    "Backend call failed"
                );
                if attempt >= attempts {
                    return if policy.ignore_errors { Ok(None) } else { Err(e) };
                }
                attempt += 1;
            }
        }
    }
}
