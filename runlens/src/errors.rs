// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use owo_colors::OwoColorize;
use runlens_core::errors::{ConfigParseError, DirectiveSourceError, RunCancelledError};
use runlens_metadata::RunlensExitCode;
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An expected error, displayed without a backtrace.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the workspace root")]
    WorkspaceRootInvalid {
        #[source]
        error: std::io::Error,
    },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("directive manifest error")]
    DirectiveSourceError {
        #[from]
        err: DirectiveSourceError,
    },
    #[error("each source file needs exactly one execution log")]
    LogCountMismatch { sources: usize, logs: usize },
    #[error("invalid --since timestamp")]
    InvalidSince {
        input: String,
        #[source]
        err: chrono::ParseError,
    },
    #[error("failed to start the async runtime")]
    RuntimeBuildError {
        #[source]
        error: std::io::Error,
    },
    #[error("correlation run cancelled")]
    Cancelled {
        #[from]
        err: RunCancelledError,
    },
    #[error("correlated run failed")]
    RunFailed,
    #[error("failed to write output")]
    WriteOutputError {
        #[source]
        error: std::io::Error,
    },
    #[error("failed to serialize summary")]
    SerializeSummaryError {
        #[source]
        err: serde_json::Error,
    },
}

impl ExpectedError {
    pub(crate) fn workspace_root_invalid(error: std::io::Error) -> Self {
        Self::WorkspaceRootInvalid { error }
    }

    pub(crate) fn invalid_since(input: impl Into<String>, err: chrono::ParseError) -> Self {
        Self::InvalidSince {
            input: input.into(),
            err,
        }
    }

    pub(crate) fn write_output_error(error: std::io::Error) -> Self {
        Self::WriteOutputError { error }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::WorkspaceRootInvalid { .. }
            | Self::ConfigParseError { .. }
            | Self::DirectiveSourceError { .. }
            | Self::LogCountMismatch { .. }
            | Self::InvalidSince { .. }
            | Self::RuntimeBuildError { .. } => RunlensExitCode::SETUP_ERROR,
            Self::Cancelled { .. } | Self::RunFailed => RunlensExitCode::RUN_FAILED,
            Self::WriteOutputError { .. } | Self::SerializeSummaryError { .. } => {
                RunlensExitCode::WRITE_OUTPUT_ERROR
            }
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::WorkspaceRootInvalid { error } => {
                error!("could not determine the workspace root");
                Some(error as &dyn Error)
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse runlens config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::DirectiveSourceError { err } => {
                error!("{err}");
                err.source()
            }
            Self::LogCountMismatch { sources, logs } => {
                error!(
                    "{} source {} given with {} --log {}: pass one log per source file, in order",
                    sources.style(styles.bold),
                    if *sources == 1 { "file" } else { "files" },
                    logs.style(styles.bold),
                    if *logs == 1 { "path" } else { "paths" },
                );
                None
            }
            Self::InvalidSince { input, err } => {
                error!(
                    "--since value `{}` is not an RFC 3339 timestamp",
                    input.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::RuntimeBuildError { error } => {
                error!("failed to start the async runtime");
                Some(error as &dyn Error)
            }
            Self::Cancelled { err } => {
                error!("{err}");
                None
            }
            Self::RunFailed => {
                error!("correlated run failed");
                None
            }
            Self::WriteOutputError { error } => {
                error!("failed to write output");
                Some(error as &dyn Error)
            }
            Self::SerializeSummaryError { err } => {
                error!("failed to serialize run summary");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
