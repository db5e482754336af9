// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Waiting for the runner to finish writing its test report.
//!
//! The runner writes its report asynchronously, after the process that
//! produced the attempt log may already have exited. The waiter observes the
//! report's modification time and resolves once it advances past a baseline
//! captured before the run started.

use crate::config::WaitConfig;
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    future::Future,
    time::{Duration, Instant, SystemTime},
};
use tracing::{debug, warn};

/// The result of [`ReportStabilizationWaiter::wait`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The report was updated. `elapsed` is the time until the update was
    /// observed, not counting the settle delay.
    Updated {
        /// Time spent polling.
        elapsed: Duration,
    },

    /// The report was not updated before the timeout.
    TimedOut {
        /// Time spent polling.
        elapsed: Duration,
    },

    /// The caller cancelled the wait.
    Cancelled,
}

impl WaitOutcome {
    /// Returns true if the report was updated.
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}

/// Polls a report file until it is rewritten.
#[derive(Clone, Copy, Debug)]
pub struct ReportStabilizationWaiter {
    config: WaitConfig,
}

impl ReportStabilizationWaiter {
    /// Creates a new `ReportStabilizationWaiter`.
    pub fn new(config: WaitConfig) -> Self {
        Self { config }
    }

    /// Returns the modification time of `path`, to be captured before the
    /// runner starts. Returns `None` if the file does not exist yet.
    pub fn capture_baseline(path: &Utf8Path) -> Option<SystemTime> {
        std::fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .ok()
    }

    /// Waits until the modification time of `path` advances past `baseline`.
    ///
    /// With no baseline, the file appearing at all counts as an update. A
    /// missing file means the report hasn't been written yet. Once an update
    /// is seen, the settle delay gives the runner time to finish flushing.
    ///
    /// Timing out is not an error: the caller goes on to read whatever report
    /// is present.
    pub async fn wait(
        &self,
        path: &Utf8Path,
        baseline: Option<SystemTime>,
        cancel: impl Future<Output = ()>,
    ) -> WaitOutcome {
        self.wait_for(|| Some(path.to_owned()), baseline, cancel)
            .await
    }

    /// Like [`Self::wait`], but calls `locate` on every poll to find the
    /// report to check.
    ///
    /// This handles runners that write each report under a new name: the
    /// wait resolves once the report `locate` returns is newer than
    /// `baseline`.
    pub async fn wait_for(
        &self,
        mut locate: impl FnMut() -> Option<Utf8PathBuf>,
        baseline: Option<SystemTime>,
        cancel: impl Future<Output = ()>,
    ) -> WaitOutcome {
        let start = Instant::now();
        let mut cancel = std::pin::pin!(cancel);

        let poll = async {
            loop {
                if let Some(path) = locate()
                    && is_updated(&path, baseline).await
                {
                    break path;
                }
                tokio::time::sleep(self.config.poll_interval).await;
            }
        };

        let (path, elapsed) = tokio::select! {
            () = &mut cancel => {
                debug!("wait for the test report cancelled");
                return WaitOutcome::Cancelled;
            }
            () = tokio::time::sleep(self.config.timeout) => {
                let elapsed = start.elapsed();
                warn!(
                    "test report was not updated within {:?}, reading the latest one anyway",
                    self.config.timeout,
                );
                return WaitOutcome::TimedOut { elapsed };
            }
            path = poll => (path, start.elapsed()),
        };

        debug!("test report {path} updated after {elapsed:?}");
        tokio::select! {
            () = &mut cancel => WaitOutcome::Cancelled,
            () = tokio::time::sleep(self.config.settle_delay) => WaitOutcome::Updated { elapsed },
        }
    }
}

async fn is_updated(path: &Utf8Path, baseline: Option<SystemTime>) -> bool {
    match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
        Ok(modified) => baseline.is_none_or(|baseline| modified > baseline),
        Err(_) => false,
    }
}
