// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::RunlensExitCode;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// The root of `runlens correlate` JSON output: one group per request-source file.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
#[non_exhaustive]
pub struct RunSummary {
    /// Groups in the order their source files were correlated.
    pub groups: Vec<FileGroupSummary>,
}

impl RunSummary {
    /// Creates a new summary from the given groups.
    pub fn new(groups: impl IntoIterator<Item = FileGroupSummary>) -> Self {
        Self {
            groups: groups.into_iter().collect(),
        }
    }

    /// Parses JSON output from `runlens correlate --message-format json`.
    pub fn parse_json(json: impl AsRef<str>) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json.as_ref())
    }

    /// Returns true if every group passed.
    pub fn is_success(&self) -> bool {
        self.groups
            .iter()
            .all(|group| group.status == GroupStatus::Passed)
    }

    /// Returns the exit code `runlens` uses for this summary.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            RunlensExitCode::OK
        } else {
            RunlensExitCode::RUN_FAILED
        }
    }
}

/// Correlated results for a single request-source file.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct FileGroupSummary {
    /// The display name of the group, typically the file name.
    pub name: String,

    /// The path to the request-source file.
    pub file_path: Utf8PathBuf,

    /// The aggregate status of the group.
    pub status: GroupStatus,

    /// The sum of request durations, formatted as `<n>ms`.
    pub duration: String,

    /// Per-request results, in log order. A pseudo-request for custom tests, if
    /// any, comes last.
    pub requests: Vec<RequestResultSummary>,
}

/// The aggregate status of a [`FileGroupSummary`].
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum GroupStatus {
    /// Every request in the group passed.
    Passed,

    /// At least one request failed, either at the HTTP level or in its tests.
    Failed,
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "Passed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// The derived status of a single request.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    /// The response was successful and every inline test passed.
    Passed,

    /// The request did not produce a successful response.
    Failed,

    /// The response was successful, but at least one test failed.
    TestsFailed,
}

impl RequestStatus {
    /// Returns true if this status should fail the enclosing group.
    pub fn is_failure(self) -> bool {
        match self {
            Self::Passed => false,
            Self::Failed | Self::TestsFailed => true,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "Passed"),
            Self::Failed => write!(f, "Failed"),
            Self::TestsFailed => write!(f, "TestsFailed"),
        }
    }
}

/// The correlated result for one logical request.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct RequestResultSummary {
    /// The declared name of the request.
    pub name: String,

    /// The derived status.
    pub status: RequestStatus,

    /// The duration of the last attempt, formatted as `<n>ms`.
    pub duration: String,

    /// The request as sent on its first attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestSummary>,

    /// The response received on the last attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseSummary>,

    /// Tests attributed to this request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<Vec<TestResultSummary>>,

    /// Retry information for the attempt chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_info: Option<RetryInfoSummary>,

    /// Errors reported across all attempts, or a connection-level failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// The request half of a [`RequestResultSummary`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct RequestSummary {
    /// The HTTP method.
    pub method: String,

    /// The final URL.
    pub url: String,

    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// The request body, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// The response half of a [`RequestResultSummary`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseSummary {
    /// The HTTP status code.
    pub status_code: u16,

    /// The reason phrase.
    pub status_text: String,

    /// Response headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// The response body, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// The duration of the attempt that produced this response, formatted as `<n>ms`.
    pub duration: String,
}

/// A single test case attributed to a request or to the custom test bucket.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct TestResultSummary {
    /// The test case name.
    pub name: String,

    /// Whether the test passed.
    pub passed: bool,

    /// The failure message, if the test failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Where the test was attributed.
    pub source: TestSource,
}

/// Where a test case was attributed.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TestSource {
    /// The test belongs to exactly one request.
    Inline,

    /// A custom or global test, not attributable to any single request.
    Csx,
}

impl fmt::Display for TestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline => write!(f, "inline"),
            Self::Csx => write!(f, "csx"),
        }
    }
}

/// Retry information for one logical request.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct RetryInfoSummary {
    /// The resilience strategy name, if the chain ran under a resilience pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_name: Option<String>,

    /// The number of attempts in the chain.
    pub actual_attempts: usize,

    /// True if more than one attempt was made.
    pub was_retried: bool,

    /// Every attempt, in order.
    pub attempts: Vec<RetryAttemptSummary>,
}

/// A single attempt within a retry chain.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct RetryAttemptSummary {
    /// The 1-based attempt number.
    pub attempt_number: usize,

    /// When the attempt started, as written by the runner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// The status code, if a response was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// The reason phrase, if a response was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,

    /// The attempt duration, formatted as `<n>ms`.
    pub duration: String,

    /// True if the status code was in the 2xx range.
    pub success: bool,
}
