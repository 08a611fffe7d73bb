// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! cukeport library
//!
//! The projection engine behind the `cukeport` binary: it consumes a
//! cucumber message stream and re-projects it onto a ReportPortal-style
//! launch → suite → test → step hierarchy through a [`Gateway`].
//!
//! ```rust,no_run
//! use cukeport::{ReporterConfig, run};
//! use cukeport::source::NdjsonSource;
//! use cukeport_client::InMemoryGateway;
//!
//! # async fn demo() -> Result<(), cukeport::ReportError> {
//! let input: &[u8] = b"{\"testRunStarted\":{}}\n{\"testRunFinished\":{}}\n";
//! let gateway = InMemoryGateway::new();
//! let config = ReporterConfig { launch: "nightly".to_string(), ..Default::default() };
//! let report = run(&config, gateway.clone(), &mut NdjsonSource::new(input)).await?;
//! assert_eq!(report.envelopes, 2);
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod hierarchy;
pub mod pending;
pub mod projection;
pub mod retry;
pub mod source;
pub mod status;

use cukeport_client::Gateway;
use cukeport_messages::{AttemptCollector, Envelope};
use serde::Serialize;
use tracing::{debug, warn};

pub use config::{Config, ConfigError, ReporterConfig};
pub use dispatcher::{DispatchStats, Dispatcher};
pub use error::ReportError;
pub use pending::DrainReport;
pub use source::EnvelopeSource;

/// Outcome of [`run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Envelopes read from the stream
    pub envelopes: usize,
    /// Malformed lines skipped
    pub skipped_lines: usize,
    /// Dispatcher counters
    pub dispatch: DispatchStats,
    /// Drain report of the finished launch, if the run finished
    pub drain: Option<DrainReport>,
}

/// Feed every envelope of `source` through a dispatcher
///
/// Each envelope is first recorded by the attempt collector, then
/// dispatched. Attempts are forgotten once finished.
///
/// # Errors
///
/// Returns the first unignored error. Malformed lines are skipped with a
/// warning when errors are ignored.
pub async fn run<G, S>(
    config: &ReporterConfig,
    gateway: G,
    source: &mut S,
) -> Result<RunReport, ReportError>
where
    G: Gateway,
    S: EnvelopeSource + ?Sized,
{
    let mut dispatcher = Dispatcher::new(gateway, config);
    let mut collector = AttemptCollector::new();
    let mut report = RunReport::default();

    loop {
        let envelope = match source.next_envelope().await {
            Ok(Some(envelope)) => envelope,
            Ok(None) => break,
            Err(ReportError::Messages(e)) if config.ignore_errors => {
                report.skipped_lines += 1;
                warn!(error = %e, "Skipping malformed message");
                continue;
            }
            Err(e) => return Err(e),
        };
        report.envelopes += 1;

        collector.ingest(&envelope);
        dispatcher.dispatch(&envelope, &collector).await?;

        if let Envelope::TestCaseFinished(finished) = &envelope {
            collector.forget(&finished.test_case_started_id);
        }
    }

    report.dispatch = dispatcher.stats();
    report.drain = dispatcher.last_drain();
    debug!(?report, "Stream exhausted");
    Ok(report)
}
