// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reading test reports and attributing their test cases to requests.
//!
//! The main structure in this module is [`TestReportParser`].

mod assign;
mod attribution;
mod locate;
mod parse;

pub use attribution::*;
pub use locate::*;

use crate::{
    config::{AttributionConfig, StoreConfig},
    directives::RequestDirectiveSource,
    errors::{DisplayErrorChain, ReportParseError},
    helpers::plural,
};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

/// Parses the runner's test report into per-request attributed tests.
///
/// Nothing here fails outright: reports that are missing, unreadable or
/// malformed produce an empty [`TestAttribution`] along with a warning.
#[derive(Clone, Debug)]
pub struct TestReportParser {
    locator: ReportLocator,
    attribution: AttributionConfig,
}

impl TestReportParser {
    /// Creates a new `TestReportParser`.
    pub fn new(store: StoreConfig, attribution: AttributionConfig) -> Self {
        Self {
            locator: ReportLocator::new(store),
            attribution,
        }
    }

    /// Returns the report that [`Self::parse`] would read, if any.
    pub fn locate(&self) -> Option<Utf8PathBuf> {
        match self.locator.locate() {
            Ok(report) => report,
            Err(error) => {
                warn!("{}", DisplayErrorChain::new(&error));
                None
            }
        }
    }

    /// Locates the latest report and attributes its tests to the requests of
    /// `source_file`.
    pub fn parse(
        &self,
        source_file: &Utf8Path,
        directives: &dyn RequestDirectiveSource,
    ) -> TestAttribution {
        match self.locate() {
            Some(report_path) => self.parse_report(&report_path, source_file, directives),
            None => {
                debug!("no test report found for {source_file}");
                TestAttribution::default()
            }
        }
    }

    /// Attributes the tests in `report_path` to the requests of `source_file`.
    ///
    /// Every suite in the report is considered, as if `source_file` were the
    /// only file executed.
    pub fn parse_report(
        &self,
        report_path: &Utf8Path,
        source_file: &Utf8Path,
        directives: &dyn RequestDirectiveSource,
    ) -> TestAttribution {
        self.parse_run(report_path, &[source_file], directives)
            .pop()
            .unwrap_or_default()
    }

    /// Attributes the tests in `report_path` across all source files of a
    /// run, returning one attribution per source file, in order.
    ///
    /// Each suite is assigned to the source file its name refers to, so tests
    /// are never shared between files. Suites naming no executed file go to
    /// the first one.
    pub fn parse_run(
        &self,
        report_path: &Utf8Path,
        source_files: &[&Utf8Path],
        directives: &dyn RequestDirectiveSource,
    ) -> Vec<TestAttribution> {
        let suites = match read_report(report_path) {
            Ok(suites) => suites,
            Err(error) => {
                warn!("{}", DisplayErrorChain::new(&error));
                return vec![TestAttribution::default(); source_files.len()];
            }
        };

        assign::assign_suites(suites, source_files)
            .into_iter()
            .zip(source_files)
            .map(|(suites, source_file)| {
                self.attribute(report_path, source_file, suites, directives)
            })
            .collect()
    }

    fn attribute(
        &self,
        report_path: &Utf8Path,
        source_file: &Utf8Path,
        suites: Vec<parse::ParsedSuite>,
        directives: &dyn RequestDirectiveSource,
    ) -> TestAttribution {
        let directives = directives.requests(source_file).unwrap_or_else(|error| {
            warn!(
                "attributing all tests in {report_path} to custom tests: {}",
                DisplayErrorChain::new(&error)
            );
            Vec::new()
        });

        let attribution =
            attribute_suites(suites, &directives, &self.attribution.custom_suite_marker);
        debug!(
            "{source_file}: attributed {} inline {} and {} custom {} from {report_path}",
            attribution.inline_count(),
            plural::tests_str(attribution.inline_count()),
            attribution.global().len(),
            plural::tests_str(attribution.global().len()),
        );
        attribution
    }
}

fn read_report(report_path: &Utf8Path) -> Result<Vec<parse::ParsedSuite>, ReportParseError> {
    let contents =
        std::fs::read_to_string(report_path).map_err(|error| ReportParseError::Read {
            path: report_path.to_owned(),
            error,
        })?;
    parse::parse_report_str(&contents).map_err(|error| ReportParseError::Xml {
        path: report_path.to_owned(),
        position: error.position,
        error: error.error,
    })
}
