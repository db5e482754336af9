// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::entry::{RawLogEntry, StructuredLogEntry, flatten_headers};
use crate::helpers::{duration_ms_from_f64, is_success_status, plural};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use itertools::Itertools;
use std::{collections::BTreeMap, io};
use tracing::{debug, info, warn};

/// The strategy name used when an attempt chain ran under a resilience
/// pipeline that did not name its strategy.
pub const DEFAULT_STRATEGY_NAME: &str = "Resilience pipeline";

/// Reads the JSONL attempt log and groups attempts into logical requests.
///
/// The ingestor holds no state: every call builds its groups from scratch.
#[derive(Clone, Debug, Default)]
pub struct AttemptLogIngestor {
    _private: (),
}

impl AttemptLogIngestor {
    /// Creates a new `AttemptLogIngestor`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingests the attempt log at `log_path`.
    ///
    /// `source_path` is the request-source file that was executed, and is only
    /// used for diagnostics. This never fails: a missing or empty log is
    /// reported through [`AttemptLog::failure`].
    pub fn ingest(&self, log_path: &Utf8Path, source_path: &Utf8Path) -> AttemptLog {
        let contents = match std::fs::read(log_path) {
            Ok(bytes) => bytes,
            Err(error) => {
                let reason = if error.kind() == io::ErrorKind::NotFound {
                    "execution log does not exist".to_owned()
                } else {
                    format!("execution log could not be read: {error}")
                };
                warn!("for {source_path}, {reason} (path: {log_path})");
                return AttemptLog::missing(log_path, reason);
            }
        };

        // The log is written incrementally and may be read mid-write, so a
        // truncated multi-byte sequence must not lose the whole file.
        let contents = String::from_utf8_lossy(&contents);
        if contents.trim().is_empty() {
            warn!("for {source_path}, execution log {log_path} is empty");
            return AttemptLog::missing(log_path, "execution log is empty".to_owned());
        }

        self.ingest_str(&contents, source_path)
    }

    /// Ingests attempt log contents that have already been read.
    pub fn ingest_str(&self, contents: &str, source_path: &Utf8Path) -> AttemptLog {
        let mut groups: IndexMap<String, Vec<StructuredLogEntry>> = IndexMap::new();
        let mut attempt_count = 0;

        for (index, line) in contents.lines().enumerate() {
            let line_number = index + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let raw: RawLogEntry = match serde_json::from_str(trimmed) {
                Ok(raw) => raw,
                Err(error) => {
                    debug!("{source_path}: skipping attempt log line {line_number}: {error}");
                    continue;
                }
            };
            let Some(entry) = raw.request_log else {
                continue;
            };
            if entry.request.is_none() && entry.response.is_none() {
                debug!(
                    "{source_path}: skipping incomplete attempt on line {line_number} \
                     (no request or response)"
                );
                continue;
            }

            attempt_count += 1;
            groups.entry(entry.group_key()).or_default().push(entry);
        }

        let mut failure = None;
        let requests: Vec<_> = groups
            .into_iter()
            .map(|(name, chain)| {
                let request = CanonicalRequest::from_chain(name, &chain);
                if failure.is_none()
                    && let Some(message) = connection_failure(&chain)
                {
                    warn!(
                        "{source_path}: request `{}` failed before a response was received",
                        request.name
                    );
                    failure = Some(LogFailure::Connection {
                        request: request.name.clone(),
                        message,
                    });
                }
                request
            })
            .collect();

        info!(
            "{source_path}: ingested {} {} from {attempt_count} {}",
            requests.len(),
            plural::requests_str(requests.len()),
            plural::attempts_str(attempt_count),
        );

        AttemptLog {
            found_any_request: !requests.is_empty(),
            requests,
            failure,
        }
    }
}

/// Returns the joined errors of a chain whose last attempt never received a
/// response.
fn connection_failure(chain: &[StructuredLogEntry]) -> Option<String> {
    let last = chain.last()?;
    if last.status_code().is_some() {
        return None;
    }
    let message = last.non_empty_errors().join("; ");
    (!message.is_empty()).then_some(message)
}

/// The result of ingesting an attempt log.
#[derive(Clone, Debug, Default)]
pub struct AttemptLog {
    /// One canonical request per logical request, in first-seen order.
    pub requests: Vec<CanonicalRequest>,

    /// Set if the log was unusable or an attempt failed at the connection level.
    pub failure: Option<LogFailure>,

    /// False if no attempt could be correlated to a request.
    pub found_any_request: bool,
}

impl AttemptLog {
    fn missing(path: &Utf8Path, reason: String) -> Self {
        Self {
            requests: Vec::new(),
            failure: Some(LogFailure::MissingArtifact {
                path: path.to_owned(),
                reason,
            }),
            found_any_request: false,
        }
    }

    /// Returns the connection error, if an attempt failed before receiving a
    /// response.
    pub fn connection_error(&self) -> Option<&str> {
        match &self.failure {
            Some(LogFailure::Connection { message, .. }) => Some(message),
            Some(LogFailure::MissingArtifact { .. }) | None => None,
        }
    }
}

/// Why an attempt log produced no usable requests, or produced requests that
/// must not be trusted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogFailure {
    /// The log file was missing, unreadable or empty.
    MissingArtifact {
        /// The path to the log.
        path: Utf8PathBuf,

        /// A description of what was wrong.
        reason: String,
    },

    /// A request's last attempt failed without receiving a response.
    Connection {
        /// The request that failed.
        request: String,

        /// The errors reported for the request, joined with `; `.
        message: String,
    },
}

/// One logical request, derived from one or more attempts sharing a name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalRequest {
    /// The declared request name.
    pub name: String,

    /// The runner's id for the first attempt.
    pub request_id: Option<String>,

    /// The request-source file, as reported by the runner.
    pub source_file: Option<Utf8PathBuf>,

    /// The HTTP method.
    pub method: String,

    /// The URL of the last attempt.
    pub url: String,

    /// Headers sent on the first attempt.
    pub request_headers: BTreeMap<String, String>,

    /// Body sent on the first attempt.
    pub request_body: Option<String>,

    /// The response to the last attempt, if one was received.
    pub response: Option<CanonicalResponse>,

    /// The duration of the last attempt, in milliseconds.
    pub duration_ms: u64,

    /// Every non-empty error across the chain, joined with `; `.
    pub error_message: Option<String>,

    /// Retry information for the chain.
    pub retry_info: RetryInfo,
}

impl CanonicalRequest {
    /// Builds a canonical request from a non-empty attempt chain.
    fn from_chain(name: String, chain: &[StructuredLogEntry]) -> Self {
        let first = &chain[0];
        let last = &chain[chain.len() - 1];
        let first_request = first.request.as_ref();

        let url = last
            .request
            .as_ref()
            .and_then(|request| request.uri.clone())
            .or_else(|| first_request.and_then(|request| request.uri.clone()))
            .unwrap_or_default();

        let duration_ms = last.duration_ms.map_or(0, duration_ms_from_f64);
        let response = last.status_code().map(|status_code| {
            // status_code() implies the response exists.
            let logged = last.response.as_ref();
            CanonicalResponse {
                status_code,
                status_text: logged
                    .and_then(|response| response.reason_phrase.clone())
                    .unwrap_or_default(),
                headers: flatten_headers(logged.and_then(|response| response.headers.as_ref())),
                body: logged.and_then(|response| response.body.clone()),
                duration_ms,
            }
        });

        let error_message = chain
            .iter()
            .flat_map(StructuredLogEntry::non_empty_errors)
            .join("; ");

        Self {
            name,
            request_id: first.request_id.clone(),
            source_file: first_request.and_then(|request| request.file_path.clone()),
            method: first_request
                .and_then(|request| request.method.clone())
                .unwrap_or_default(),
            url,
            request_headers: flatten_headers(first_request.and_then(|r| r.headers.as_ref())),
            request_body: first_request.and_then(|request| request.body.clone()),
            response,
            duration_ms,
            error_message: (!error_message.is_empty()).then_some(error_message),
            retry_info: RetryInfo::from_chain(chain),
        }
    }

    /// Returns the status code of the last attempt, if a response was received.
    pub fn status_code(&self) -> Option<u16> {
        self.response.as_ref().map(|response| response.status_code)
    }

    /// Returns true if the last attempt received a 2xx response.
    pub fn is_http_success(&self) -> bool {
        self.status_code().is_some_and(is_success_status)
    }
}

/// The response to the last attempt of a [`CanonicalRequest`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalResponse {
    /// The HTTP status code.
    pub status_code: u16,

    /// The reason phrase.
    pub status_text: String,

    /// Response headers.
    pub headers: BTreeMap<String, String>,

    /// The response body.
    pub body: Option<String>,

    /// The duration of the attempt, in milliseconds.
    pub duration_ms: u64,
}

/// Retry information for one attempt chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryInfo {
    /// The retry strategy, if the chain ran under a resilience pipeline.
    pub strategy_name: Option<String>,

    /// The number of attempts in the chain.
    pub actual_attempts: usize,

    /// True if more than one attempt was made.
    pub was_retried: bool,

    /// Every attempt, in log order.
    pub attempts: Vec<RetryAttempt>,
}

impl RetryInfo {
    fn from_chain(chain: &[StructuredLogEntry]) -> Self {
        let attempts: Vec<_> = chain
            .iter()
            .enumerate()
            .map(|(index, entry)| RetryAttempt::new(index + 1, entry))
            .collect();

        // The first attempt decides whether the chain ran under a pipeline.
        let strategy_name = chain
            .first()
            .filter(|first| first.has_resilience_pipeline())
            .map(|first| {
                first
                    .metadata
                    .as_ref()
                    .and_then(|metadata| metadata.retry_strategy.clone())
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| DEFAULT_STRATEGY_NAME.to_owned())
            });

        Self {
            strategy_name,
            actual_attempts: attempts.len(),
            was_retried: attempts.len() > 1,
            attempts,
        }
    }
}

/// A single attempt within a retry chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryAttempt {
    /// The 1-based attempt number.
    pub attempt_number: usize,

    /// When the attempt started, as written by the runner.
    pub timestamp: Option<String>,

    /// The status code, if a response was received.
    pub status_code: Option<u16>,

    /// The reason phrase, if a response was received.
    pub status_text: Option<String>,

    /// The attempt duration, in milliseconds.
    pub duration_ms: u64,

    /// True if the status code was in the 2xx range.
    pub success: bool,
}

impl RetryAttempt {
    fn new(attempt_number: usize, entry: &StructuredLogEntry) -> Self {
        let status_code = entry.status_code();
        Self {
            attempt_number,
            timestamp: entry.start_time.clone(),
            status_code,
            status_text: entry
                .response
                .as_ref()
                .and_then(|response| response.reason_phrase.clone()),
            duration_ms: entry.duration_ms.map_or(0, duration_ms_from_f64),
            success: status_code.is_some_and(is_success_status),
        }
    }
}
