// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::ConfigParseErrorKind;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;

/// Where the external runner stores its reports.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    reports_dir: Utf8PathBuf,
    latest_report: String,
    report_pattern: Regex,
}

impl StoreConfig {
    /// Creates a new `StoreConfig`.
    ///
    /// `report_pattern` must contain at least one capture group, the first of
    /// which matches the report's numeric timestamp.
    pub fn new(
        reports_dir: impl Into<Utf8PathBuf>,
        latest_report: impl Into<String>,
        report_pattern: &str,
    ) -> Result<Self, ConfigParseErrorKind> {
        let compiled = Regex::new(report_pattern).map_err(|error| {
            ConfigParseErrorKind::InvalidReportPattern {
                pattern: report_pattern.to_owned(),
                error,
            }
        })?;
        // captures_len includes the implicit whole-match group.
        if compiled.captures_len() < 2 {
            return Err(ConfigParseErrorKind::ReportPatternMissingGroup {
                pattern: report_pattern.to_owned(),
            });
        }

        Ok(Self {
            reports_dir: reports_dir.into(),
            latest_report: latest_report.into(),
            report_pattern: compiled,
        })
    }

    /// Returns the directory reports are written to.
    pub fn reports_dir(&self) -> &Utf8Path {
        &self.reports_dir
    }

    /// Returns the path to the well-known latest report.
    pub fn latest_report_path(&self) -> Utf8PathBuf {
        self.reports_dir.join(&self.latest_report)
    }

    /// Returns the pattern timestamped reports match.
    pub fn report_pattern(&self) -> &Regex {
        &self.report_pattern
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(super) struct StoreConfigDeserialize {
    pub(super) reports_dir: Utf8PathBuf,
    pub(super) latest_report: String,
    pub(super) report_pattern: String,
}

/// Timing for the report stabilization wait.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct WaitConfig {
    /// How often the report's modification time is checked.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// How long to wait after the report changes before reading it.
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,

    /// How long to wait for the report to change at all.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// Settings for attributing test cases to requests.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct AttributionConfig {
    /// Suites whose name contains this marker are always attributed to the
    /// custom test bucket.
    pub custom_suite_marker: String,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            custom_suite_marker: DEFAULT_CUSTOM_SUITE_MARKER.to_owned(),
        }
    }
}

/// The suite name marker used by the runner for custom (csx) test suites.
pub const DEFAULT_CUSTOM_SUITE_MARKER: &str = "Custom CSX Tests";
