// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Correlating one run of the external runner.
//!
//! [`CorrelationEngine`] ties the components together: it waits for the test
//! report to stabilize, then for each executed source file ingests the attempt
//! log, attributes the report's tests and aggregates both into a
//! [`RunSummary`].

use crate::{
    aggregate::ResultAggregator,
    config::RunlensConfig,
    directives::RequestDirectiveSource,
    errors::RunCancelledError,
    helpers::plural,
    ingest::AttemptLogIngestor,
    report::{TestAttribution, TestReportParser},
    wait::{ReportStabilizationWaiter, WaitOutcome},
};
use camino::{Utf8Path, Utf8PathBuf};
use runlens_metadata::RunSummary;
use std::{future::Future, time::SystemTime};
use tracing::info;

/// One executed request-source file and the attempt log it produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInput {
    /// The request-source file that was executed.
    pub source_file: Utf8PathBuf,

    /// The JSONL attempt log written while executing it.
    pub log_path: Utf8PathBuf,
}

impl FileInput {
    /// Creates a new `FileInput`.
    pub fn new(source_file: impl Into<Utf8PathBuf>, log_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            source_file: source_file.into(),
            log_path: log_path.into(),
        }
    }
}

/// Options for [`CorrelationEngine::run`].
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Whether to wait for the test report to be rewritten before reading it.
    pub wait: bool,

    /// The modification time of the latest report before the runner started.
    /// See [`CorrelationEngine::capture_baseline`].
    pub baseline: Option<SystemTime>,

    /// Read this report instead of locating one in the reports directory.
    pub report_path: Option<Utf8PathBuf>,
}

/// The result of a correlation run.
#[derive(Clone, Debug)]
pub struct CorrelationRun {
    /// The unified result model.
    pub summary: RunSummary,

    /// The report that was read, if one was found.
    pub report_path: Option<Utf8PathBuf>,

    /// How the stabilization wait ended, if it ran.
    pub wait_outcome: Option<WaitOutcome>,
}

/// Correlates attempt logs and test reports for a workspace.
#[derive(Clone, Debug)]
pub struct CorrelationEngine {
    latest_report: Utf8PathBuf,
    waiter: ReportStabilizationWaiter,
    ingestor: AttemptLogIngestor,
    parser: TestReportParser,
    aggregator: ResultAggregator,
}

impl CorrelationEngine {
    /// Creates a new `CorrelationEngine` from a config.
    pub fn new(config: &RunlensConfig) -> Self {
        Self {
            latest_report: config.store().latest_report_path(),
            waiter: ReportStabilizationWaiter::new(config.wait()),
            ingestor: AttemptLogIngestor::new(),
            parser: TestReportParser::new(config.store().clone(), config.attribution().clone()),
            aggregator: ResultAggregator::new(),
        }
    }

    /// Returns the path of the report the runner rewrites on every run.
    pub fn latest_report_path(&self) -> &Utf8Path {
        &self.latest_report
    }

    /// Captures the modification time of the report discovery currently
    /// picks: the latest report, or else the newest timestamped one. Call this
    /// before starting the runner.
    pub fn capture_baseline(&self) -> Option<SystemTime> {
        self.parser
            .locate()
            .and_then(|path| ReportStabilizationWaiter::capture_baseline(&path))
    }

    /// Runs the correlation for the given inputs, in order.
    ///
    /// Only cancellation produces an error. Every data problem is reflected
    /// in the returned summary instead.
    pub async fn run(
        &self,
        inputs: &[FileInput],
        directives: &dyn RequestDirectiveSource,
        options: RunOptions,
        cancel: impl Future<Output = ()>,
    ) -> Result<CorrelationRun, RunCancelledError> {
        let wait_outcome = if options.wait {
            // Runners that write timestamped reports produce a new file each
            // run, so discovery is repeated on every poll.
            let outcome = match &options.report_path {
                Some(path) => self.waiter.wait(path, options.baseline, cancel).await,
                None => {
                    self.waiter
                        .wait_for(|| self.parser.locate(), options.baseline, cancel)
                        .await
                }
            };
            if outcome == WaitOutcome::Cancelled {
                return Err(RunCancelledError);
            }
            Some(outcome)
        } else {
            None
        };

        let report_path = options.report_path.or_else(|| self.parser.locate());
        match &report_path {
            Some(path) => info!("reading test report {path}"),
            None => info!("no test report found, continuing without tests"),
        }

        let source_files: Vec<&Utf8Path> =
            inputs.iter().map(|input| input.source_file.as_path()).collect();
        let attributions = match &report_path {
            Some(path) => self.parser.parse_run(path, &source_files, directives),
            None => vec![TestAttribution::default(); inputs.len()],
        };

        let groups = inputs.iter().zip(attributions).map(|(input, attribution)| {
            let attempt_log = self.ingestor.ingest(&input.log_path, &input.source_file);
            self.aggregator
                .aggregate(&input.source_file, &attempt_log, &attribution)
        });
        let summary = RunSummary::new(groups);

        let request_count: usize = summary.groups.iter().map(|g| g.requests.len()).sum();
        info!(
            "correlated {request_count} {} across {} {}",
            plural::requests_str(request_count),
            summary.groups.len(),
            plural::files_str(summary.groups.len()),
        );

        Ok(CorrelationRun {
            summary,
            report_path,
            wait_outcome,
        })
    }
}
