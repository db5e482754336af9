// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::format_execution_error;
use crate::{
    helpers::{format_duration_ms, parse_duration_ms, plural},
    ingest::{AttemptLog, CanonicalRequest, LogFailure, RetryAttempt, RetryInfo},
    report::{AttributedTest, GLOBAL_TESTS_KEY, TestAttribution},
};
use camino::Utf8Path;
use runlens_metadata::{
    FileGroupSummary, GroupStatus, RequestResultSummary, RequestStatus, RequestSummary,
    ResponseSummary, RetryAttemptSummary, RetryInfoSummary, TestResultSummary, TestSource,
};
use std::collections::HashSet;
use tracing::debug;

/// The name of the pseudo-request holding tests not attributed to any single
/// request.
pub const CUSTOM_TESTS_REQUEST: &str = "Custom CSX Tests";

/// The name of the synthetic request produced when nothing could be
/// correlated.
pub const NO_REQUESTS_FOUND: &str = "No requests found";

/// Merges an [`AttemptLog`] with a [`TestAttribution`] into a
/// [`FileGroupSummary`].
///
/// The aggregator holds no state and never fails: every input produces a
/// well-formed group.
#[derive(Clone, Debug, Default)]
pub struct ResultAggregator {
    _private: (),
}

impl ResultAggregator {
    /// Creates a new `ResultAggregator`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the result group for one executed source file.
    pub fn aggregate(
        &self,
        file_path: &Utf8Path,
        log: &AttemptLog,
        attribution: &TestAttribution,
    ) -> FileGroupSummary {
        // A request that never reached the server invalidates the whole run.
        if let Some(LogFailure::Connection { request, message }) = &log.failure {
            let canonical = log.requests.iter().find(|r| &r.name == request);
            let result = RequestResultSummary {
                name: request.clone(),
                status: RequestStatus::Failed,
                duration: format_duration_ms(canonical.map_or(0, |r| r.duration_ms)),
                request: canonical.map(request_summary),
                response: None,
                tests: None,
                retry_info: canonical.map(|r| retry_info_summary(&r.retry_info)),
                error_message: Some(format_execution_error(message)),
            };
            return make_group(file_path, vec![result]);
        }

        if log.requests.is_empty() {
            let mut message = format!("{NO_REQUESTS_FOUND} in the execution log for {file_path}");
            if let Some(LogFailure::MissingArtifact { reason, .. }) = &log.failure {
                message.push_str(": ");
                message.push_str(reason);
            }
            return make_group(file_path, vec![failed_result(NO_REQUESTS_FOUND, message)]);
        }

        let mut results: Vec<_> = log
            .requests
            .iter()
            .map(|request| request_result(request, attribution.for_request(&request.name)))
            .collect();

        let global = custom_tests(file_path, log, attribution);
        if !global.is_empty() {
            let status = if global.iter().all(|test| test.passed) {
                RequestStatus::Passed
            } else {
                RequestStatus::TestsFailed
            };
            results.push(RequestResultSummary {
                name: CUSTOM_TESTS_REQUEST.to_owned(),
                status,
                duration: format_duration_ms(0),
                request: None,
                response: None,
                tests: Some(global.iter().map(test_summary).collect()),
                retry_info: None,
                error_message: None,
            });
        }

        let test_count = attribution.inline_count() + attribution.global().len();
        debug!(
            "{file_path}: aggregated {} {} with {test_count} {}",
            log.requests.len(),
            plural::requests_str(log.requests.len()),
            plural::tests_str(test_count),
        );

        make_group(file_path, results)
    }

    /// Builds a failed group for a runner process that failed outright,
    /// before producing any usable artifacts.
    pub fn execution_failure(&self, file_path: &Utf8Path, raw: &str) -> FileGroupSummary {
        let name = file_name(file_path).to_owned();
        make_group(
            file_path,
            vec![failed_result(&name, format_execution_error(raw))],
        )
    }
}

/// Returns the tests shown under the custom tests pseudo-request: tests
/// attributed to a request the log never mentions, followed by the global
/// bucket.
fn custom_tests(
    file_path: &Utf8Path,
    log: &AttemptLog,
    attribution: &TestAttribution,
) -> Vec<AttributedTest> {
    let logged: HashSet<&str> = log.requests.iter().map(|r| r.name.as_str()).collect();
    let mut custom = Vec::new();
    for (key, tests) in attribution.iter() {
        if key == GLOBAL_TESTS_KEY || logged.contains(key) {
            continue;
        }
        debug!(
            "{file_path}: no logged request matches `{key}`, moving its {} {} to custom tests",
            tests.len(),
            plural::tests_str(tests.len()),
        );
        custom.extend(tests.iter().map(|test| AttributedTest {
            source: TestSource::Csx,
            ..test.clone()
        }));
    }
    custom.extend(attribution.global().iter().cloned());
    custom
}

fn make_group(file_path: &Utf8Path, requests: Vec<RequestResultSummary>) -> FileGroupSummary {
    let status = if requests.iter().any(|result| result.status.is_failure()) {
        GroupStatus::Failed
    } else {
        GroupStatus::Passed
    };
    let total: u64 = requests
        .iter()
        .map(|result| parse_duration_ms(&result.duration))
        .sum();

    FileGroupSummary {
        name: file_name(file_path).to_owned(),
        file_path: file_path.to_owned(),
        status,
        duration: format_duration_ms(total),
        requests,
    }
}

fn file_name(file_path: &Utf8Path) -> &str {
    file_path.file_name().unwrap_or(file_path.as_str())
}

fn failed_result(name: &str, message: String) -> RequestResultSummary {
    RequestResultSummary {
        name: name.to_owned(),
        status: RequestStatus::Failed,
        duration: format_duration_ms(0),
        request: None,
        response: None,
        tests: None,
        retry_info: None,
        error_message: Some(message),
    }
}

fn request_result(request: &CanonicalRequest, tests: &[AttributedTest]) -> RequestResultSummary {
    let status = if !request.is_http_success() {
        RequestStatus::Failed
    } else if tests
        .iter()
        .any(|test| test.source == TestSource::Inline && !test.passed)
    {
        RequestStatus::TestsFailed
    } else {
        RequestStatus::Passed
    };

    RequestResultSummary {
        name: request.name.clone(),
        status,
        duration: format_duration_ms(request.duration_ms),
        request: Some(request_summary(request)),
        response: request.response.as_ref().map(|response| ResponseSummary {
            status_code: response.status_code,
            status_text: response.status_text.clone(),
            headers: response.headers.clone(),
            body: response.body.clone(),
            duration: format_duration_ms(response.duration_ms),
        }),
        tests: (!tests.is_empty()).then(|| tests.iter().map(test_summary).collect()),
        retry_info: Some(retry_info_summary(&request.retry_info)),
        error_message: request.error_message.clone(),
    }
}

fn request_summary(request: &CanonicalRequest) -> RequestSummary {
    RequestSummary {
        method: request.method.clone(),
        url: request.url.clone(),
        headers: request.request_headers.clone(),
        body: request.request_body.clone(),
    }
}

fn test_summary(test: &AttributedTest) -> TestResultSummary {
    TestResultSummary {
        name: test.name.clone(),
        passed: test.passed,
        message: test.message.clone(),
        source: test.source,
    }
}

fn retry_info_summary(info: &RetryInfo) -> RetryInfoSummary {
    RetryInfoSummary {
        strategy_name: info.strategy_name.clone(),
        actual_attempts: info.actual_attempts,
        was_retried: info.was_retried,
        attempts: info.attempts.iter().map(retry_attempt_summary).collect(),
    }
}

fn retry_attempt_summary(attempt: &RetryAttempt) -> RetryAttemptSummary {
    RetryAttemptSummary {
        attempt_number: attempt.attempt_number,
        timestamp: attempt.timestamp.clone(),
        status_code: attempt.status_code,
        status_text: attempt.status_text.clone(),
        duration: format_duration_ms(attempt.duration_ms),
        success: attempt.success,
    }
}
