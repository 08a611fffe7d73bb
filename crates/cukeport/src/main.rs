// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! cukeport: report cucumber message streams to ReportPortal
//!
//! Reads the NDJSON stream written by a cucumber runner's `message`
//! formatter, from a file or stdin, and reports it as a launch.

use anyhow::{Context, Result};
use clap::Parser;
use cukeport::source::NdjsonSource;
use cukeport::{Config, RunReport, run};
use cukeport_client::{CallSummary, HttpGateway, InMemoryGateway};
use serde::Serialize;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::info;

/// Printed to stdout after a dry run
#[derive(Serialize)]
struct DryRunSummary {
    calls: CallSummary,
    run: RunReport,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Config::parse();

    // Logs go to stderr; stdout carries the dry-run summary
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(cli.log_level().into()),
        )
        .init();

    let reporter = cli.reporter_config().context("Invalid configuration")?;

    let input: Box<dyn AsyncBufRead + Unpin + Send> = match &cli.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let mut source = NdjsonSource::new(input);

    if cli.dry_run || !reporter.enable {
        info!("Starting cukeport dry run...");
        let gateway = InMemoryGateway::new();
        let report = run(&reporter, gateway.clone(), &mut source).await?;
        let summary = DryRunSummary {
            calls: gateway.summary(),
            run: report,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    info!(endpoint = %reporter.endpoint, project = %reporter.project, "Starting cukeport...");
    let gateway = HttpGateway::new(&reporter.endpoint, &reporter.project, &reporter.token)
        .context("Failed to create backend client")?;
    let report = run(&reporter, gateway, &mut source).await?;
    info!(
        envelopes = report.envelopes,
        reported = report.dispatch.reported,
        skipped_lines = report.skipped_lines,
        "Done"
    );
    Ok(())
}
