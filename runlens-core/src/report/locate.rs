// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{config::StoreConfig, errors::ReportLocateError};
use camino::Utf8PathBuf;
use std::io;
use tracing::debug;

/// Finds the report to read for a run.
#[derive(Clone, Debug)]
pub struct ReportLocator {
    store: StoreConfig,
}

impl ReportLocator {
    /// Creates a new `ReportLocator`.
    pub fn new(store: StoreConfig) -> Self {
        Self { store }
    }

    /// Returns the report to read, if any.
    ///
    /// The well-known latest report is preferred. Otherwise the reports
    /// directory is scanned for timestamped reports and the one with the
    /// greatest timestamp is chosen. A missing reports directory is not an
    /// error.
    pub fn locate(&self) -> Result<Option<Utf8PathBuf>, ReportLocateError> {
        let latest = self.store.latest_report_path();
        if latest.is_file() {
            return Ok(Some(latest));
        }

        let dir = self.store.reports_dir();
        let entries = match dir.read_dir_utf8() {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("reports directory {dir} does not exist");
                return Ok(None);
            }
            Err(error) => {
                return Err(ReportLocateError::ReadDir {
                    dir: dir.to_owned(),
                    error,
                });
            }
        };

        let pattern = self.store.report_pattern();
        let mut best: Option<(u128, Utf8PathBuf)> = None;
        for entry in entries {
            let entry = entry.map_err(|error| ReportLocateError::ReadDir {
                dir: dir.to_owned(),
                error,
            })?;
            let Some(timestamp) = pattern
                .captures(entry.file_name())
                .and_then(|captures| captures.get(1))
                .and_then(|group| group.as_str().parse::<u128>().ok())
            else {
                continue;
            };

            // Ties are broken by path so the choice doesn't depend on
            // directory order.
            let candidate = (timestamp, entry.path().to_owned());
            if best.as_ref().is_none_or(|current| candidate > *current) {
                best = Some(candidate);
            }
        }

        Ok(best.map(|(_, path)| path))
    }
}
