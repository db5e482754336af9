// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by runlens.
//!
//! Data-shape problems in the attempt log or test report never surface as
//! errors: they are skipped and logged. The errors here cover inputs the user
//! supplies directly (config files and directive manifests) and the internal
//! results of reading a report, which callers downgrade to warnings.

use camino::Utf8PathBuf;
use std::{error, fmt};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse runlens config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file that produced this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<config::ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<config::ConfigError>>),

    /// The report pattern is not a valid regular expression.
    #[error("invalid report-pattern `{pattern}`")]
    InvalidReportPattern {
        /// The pattern that failed to compile.
        pattern: String,

        /// The underlying regex error.
        #[source]
        error: regex::Error,
    },

    /// The report pattern has no capture group for the timestamp.
    #[error("report-pattern `{pattern}` must contain a capture group for the timestamp")]
    ReportPatternMissingGroup {
        /// The pattern without a capture group.
        pattern: String,
    },
}

/// An error returned by a [`RequestDirectiveSource`](crate::directives::RequestDirectiveSource).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DirectiveSourceError {
    /// The directive manifest could not be read.
    #[error("failed to read directive manifest at `{path}`")]
    ReadManifest {
        /// The path to the manifest.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The directive manifest is not valid JSON.
    #[error("failed to parse directive manifest at `{path}`")]
    ParseManifest {
        /// The path to the manifest.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },
}

/// An error that occurred while looking for a test report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportLocateError {
    /// The reports directory could not be listed.
    #[error("failed to read reports directory `{dir}`")]
    ReadDir {
        /// The reports directory.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },
}

/// An error that occurred while reading a test report.
///
/// [`TestReportParser`](crate::report::TestReportParser) logs these as
/// warnings and continues with an empty attribution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportParseError {
    /// The report file could not be read.
    #[error("failed to read test report `{path}`")]
    Read {
        /// The path to the report.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The report is not well-formed XML.
    #[error("failed to parse test report `{path}` at byte {position}")]
    Xml {
        /// The path to the report.
        path: Utf8PathBuf,

        /// The byte offset at which parsing failed.
        position: usize,

        /// The underlying error.
        #[source]
        error: quick_xml::Error,
    },
}

/// The caller cancelled a correlation run while it was waiting for the test
/// report.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("correlation run cancelled while waiting for the test report")]
pub struct RunCancelledError;

/// Displays an error along with its chain of causes.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: error::Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: error::Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut source = self.error.source();
        while let Some(cause) = source {
            write!(f, "\n  caused by: {cause}")?;
            source = cause.source();
        }

        Ok(())
    }
}
