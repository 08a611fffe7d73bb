// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Routing of runner events onto the hierarchy
//!
//! [`Dispatcher::dispatch`] takes one envelope at a time, in runner order,
//! and awaits everything it issues before returning.

use cukeport_client::Gateway;
use cukeport_messages::{AttemptLookup, Envelope, TestCaseFinished};
use tracing::{debug, info, trace, warn};

use crate::config::ReporterConfig;
use crate::error::ReportError;
use crate::hierarchy::{Hierarchy, LaunchSettings};
use crate::pending::DrainReport;
use crate::projection::{Registry, TestCaseProjection, project};

/// Counters over one dispatcher's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct DispatchStats {
    /// Test cases reported
    pub reported: usize,
    /// Attempts skipped because the runner will retry them
    pub retried: usize,
    /// Errors logged and skipped
    pub ignored_errors: usize,
}

/// Entry point for the runner's event stream
pub struct Dispatcher<G> {
    hierarchy: Hierarchy<G>,
    registry: Registry,
    settings: LaunchSettings,
    enabled: bool,
    ignore_errors: bool,
    stats: DispatchStats,
    last_drain: Option<DrainReport>,
}

impl<G: Gateway> Dispatcher<G> {
    /// Create a dispatcher reporting through `gateway`
    pub fn new(gateway: G, config: &ReporterConfig) -> Self {
        Self {
            hierarchy: Hierarchy::new(gateway, config.retry_policy()),
            registry: Registry::new(),
            settings: config.launch_settings(),
            enabled: config.enable,
            ignore_errors: config.ignore_errors,
            stats: DispatchStats::default(),
            last_drain: None,
        }
    }

    /// The underlying hierarchy state
    pub fn hierarchy(&self) -> &Hierarchy<G> {
        &self.hierarchy
    }

    /// Hook names seen so far
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Counters so far
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Drain report of the last finished launch
    pub fn last_drain(&self) -> Option<DrainReport> {
        self.last_drain
    }

    /// Handle one envelope
    ///
    /// `attempts` must already have ingested `envelope`.
    ///
    /// # Errors
    ///
    /// Returns the failure of this event unless errors are ignored, in which
    /// case it is logged and `Ok(())` is returned.
    pub async fn dispatch<L>(&mut self, envelope: &Envelope, attempts: &L) -> Result<(), ReportError>
    where
        L: AttemptLookup + ?Sized,
    {
        if !self.enabled {
            return Ok(());
        }

        match self.route(envelope, attempts).await {
            Ok(()) => Ok(()),
            Err(e) if self.ignore_errors => {
                self.stats.ignored_errors += 1;
                warn!(kind = envelope.kind(), error = %e, "Ignoring reporting error");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn route<L>(&mut self, envelope: &Envelope, attempts: &L) -> Result<(), ReportError>
    where
        L: AttemptLookup + ?Sized,
    {
        match envelope {
            Envelope::Hook(hook) => {
                self.registry.register_hook(hook);
                Ok(())
            }
            Envelope::TestRunStarted(_) => {
                self.hierarchy.open_launch(&self.settings).await?;
                Ok(())
            }
            Envelope::TestCaseFinished(finished) => self.finish_test_case(finished, attempts).await,
            Envelope::TestRunFinished(_) => {
                let report = self.hierarchy.drain_and_finish_launch().await?;
                self.last_drain = Some(report);
                info!(
                    reported = self.stats.reported,
                    retried = self.stats.retried,
                    calls = report.settled,
                    failed_calls = report.failed,
                    "Run reported"
                );
                Ok(())
            }
            other => {
                trace!(kind = other.kind(), "Ignoring envelope");
                Ok(())
            }
        }
    }

    async fn finish_test_case<L>(
        &mut self,
        finished: &TestCaseFinished,
        attempts: &L,
    ) -> Result<(), ReportError>
    where
        L: AttemptLookup + ?Sized,
    {
        if finished.will_be_retried {
            self.stats.retried += 1;
            debug!(
                test_case_started_id = %finished.test_case_started_id,
                "Attempt will be retried, not reporting it"
            );
            return Ok(());
        }

        let attempt = attempts
            .test_case_attempt(&finished.test_case_started_id)
            .ok_or_else(|| ReportError::UnknownTestCase {
                id: finished.test_case_started_id.clone(),
            })?;
        let projection = project(&attempt, &self.registry)?;
        self.report(&projection).await?;
        self.stats.reported += 1;
        Ok(())
    }

    /// Suite (lazily), then test item, then each step, then close the item
    async fn report(&mut self, projection: &TestCaseProjection) -> Result<(), ReportError> {
        let suite = self
            .hierarchy
            .ensure_suite(
                &projection.feature_name,
                &projection.feature_tags,
                &projection.feature_description,
            )
            .await?;
        let item = self
            .hierarchy
            .open_test_item(
                &projection.name,
                &projection.tags,
                projection.attributes.clone(),
                projection.is_retry,
                &suite,
            )
            .await?;

        let mut cursor = item.start_time;
        for step in &projection.steps {
            cursor = self.hierarchy.run_step(step, &item.handle, cursor).await?;
        }

        self.hierarchy
            .close_test_item(&item.handle, projection.any_step_failed(), cursor)
            .await
    }
}
