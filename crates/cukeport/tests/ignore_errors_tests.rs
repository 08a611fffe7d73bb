// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Tests for the error policy with an unreachable backend
//!
//! Every failed backend attempt must be logged at error level, and with
//! `ignoreErrors` set the run must complete regardless.


use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

use cukeport::{Dispatcher, ReportError, ReporterConfig};
use cukeport_client::{InMemoryGateway, Operation};
use cukeport_messages::{AttemptCollector, Envelope, TestRunStarted};
use similar_asserts::assert_eq;
use tracing::Level;

use fixtures::{checkout_run, frozen_gateway, run_stream, test_config};

// ============================================================================
// Log capture
// ============================================================================

/// Collects formatted log output in memory
#[derive(Clone, Default)]
struct LogBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock().expect("log buffer")).into_owned()
    }

    fn error_lines(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains("ERROR"))
            .map(str::to_string)
            .collect()
    }
}

struct LogBufferGuard<'a> {
    guard: MutexGuard<'a, Vec<u8>>,
}

impl Write for LogBufferGuard<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.guard.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = LogBufferGuard<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogBufferGuard {
            guard: self.bytes.lock().expect("log buffer"),
        }
    }
}

fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(Level::TRACE)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}

fn unreachable_backend() -> InMemoryGateway {
    let gateway = frozen_gateway();
    gateway.reject_when(|_| true);
    gateway
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_each_failed_attempt_is_logged_at_error_level() {
    let (logs, _guard) = capture_logs();
    let gateway = unreachable_backend();
    let config = ReporterConfig {
        retry: 2,
        ignore_errors: true,
        ..test_config()
    };
    let mut dispatcher = Dispatcher::new(gateway.clone(), &config);

    dispatcher
        .dispatch(
            &Envelope::TestRunStarted(TestRunStarted::default()),
            &AttemptCollector::new(),
        )
        .await
        .expect("errors are ignored");

    assert_eq!(gateway.count(Operation::StartLaunch), 2);
    let errors = logs.error_lines();
    assert_eq!(errors.len(), 2, "{}", logs.contents());
    assert!(errors.iter().all(|line| line.contains("Backend call failed")));
    assert!(errors[1].contains("attempt=2"));
    assert_eq!(dispatcher.stats().ignored_errors, 1);
}

#[tokio::test]
async fn test_full_run_completes_against_unreachable_backend() {
    let (logs, _guard) = capture_logs();
    let gateway = unreachable_backend();
    let config = ReporterConfig {
        ignore_errors: true,
        ..test_config()
    };

    let report = run_stream(&checkout_run(), &config, &gateway)
        .await
        .expect("run completes");

    // Launch start, three test cases and the run finish each fail
    assert_eq!(gateway.count(Operation::StartLaunch), 1);
    assert_eq!(gateway.count(Operation::StartItem), 0);
    assert_eq!(report.dispatch.reported, 0);
    assert_eq!(report.dispatch.ignored_errors, 5);
    assert_eq!(report.drain, None);
    assert!(logs.contents().contains("Ignoring reporting error"));
}

#[tokio::test]
async fn test_unreachable_backend_fails_without_ignore_errors() {
    let gateway = unreachable_backend();
    let config = ReporterConfig {
        retry: 3,
        ..test_config()
    };

    let result = run_stream(&checkout_run(), &config, &gateway).await;
    match result {
        Err(ReportError::Gateway { operation, .. }) => assert_eq!(operation, "start launch"),
        other => panic!("expected a gateway error, got {other:?}"),
    }
    assert_eq!(gateway.count(Operation::StartLaunch), 3);
}

#[tokio::test]
async fn test_failed_logs_do_not_fail_the_item() {
    let gateway = frozen_gateway();
    gateway.reject_when(|call| call.operation() == Operation::SendLog);
    let config = ReporterConfig {
        ignore_errors: true,
        ..test_config()
    };

    let report = run_stream(&checkout_run(), &config, &gateway)
        .await
        .expect("run completes");

    assert_eq!(report.dispatch.reported, 3);
    assert_eq!(report.dispatch.ignored_errors, 0);
    assert_eq!(gateway.summary().items_finished, 13);
    assert_eq!(report.drain.map(|d| d.failed), Some(4));
}
