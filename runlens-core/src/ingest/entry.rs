// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record types for a single line of the attempt log.
//!
//! Every field the runner writes is optional here. Validation happens once, in
//! the ingestor, rather than through ad hoc lookups during aggregation.

use crate::helpers::method_url_key;
use camino::Utf8PathBuf;
use serde::Deserialize;
use std::collections::BTreeMap;

/// One line of the JSONL attempt log.
///
/// Lines that carry other log events have no `RequestLog` property and are
/// skipped.
#[derive(Clone, Debug, Deserialize)]
pub struct RawLogEntry {
    /// The structured HTTP attempt, if this line describes one.
    #[serde(rename = "RequestLog", alias = "requestLog", default)]
    pub request_log: Option<StructuredLogEntry>,
}

/// A single HTTP attempt as written by the runner.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StructuredLogEntry {
    /// The runner's identifier for this attempt.
    #[serde(default)]
    pub request_id: Option<String>,

    /// When the attempt started.
    #[serde(default)]
    pub start_time: Option<String>,

    /// When the attempt finished.
    #[serde(default)]
    pub end_time: Option<String>,

    /// How long the attempt took, in milliseconds.
    #[serde(default)]
    pub duration_ms: Option<f64>,

    /// The request that was sent.
    #[serde(default)]
    pub request: Option<LoggedRequest>,

    /// The response that was received.
    #[serde(default)]
    pub response: Option<LoggedResponse>,

    /// Errors raised while making the attempt.
    #[serde(default)]
    pub errors: Option<Vec<String>>,

    /// Extra information about how the attempt was made.
    #[serde(default)]
    pub metadata: Option<EntryMetadata>,
}

impl StructuredLogEntry {
    /// Returns the declared request name, if present and non-empty.
    pub fn declared_name(&self) -> Option<&str> {
        self.request
            .as_ref()
            .and_then(|request| request.name.as_deref())
            .filter(|name| !name.is_empty())
    }

    /// Returns the key this attempt is grouped by.
    ///
    /// Attempts are grouped by declared name. Unnamed requests fall back to
    /// `METHOD URI`, then to the request id.
    pub fn group_key(&self) -> String {
        if let Some(name) = self.declared_name() {
            return name.to_owned();
        }
        if let Some(request) = &self.request
            && let Some(uri) = request.uri.as_deref()
        {
            return method_url_key(request.method.as_deref().unwrap_or_default(), uri);
        }
        match &self.request_id {
            Some(id) => id.clone(),
            None => UNNAMED_REQUEST.to_owned(),
        }
    }

    /// Returns the non-empty errors for this attempt.
    pub fn non_empty_errors(&self) -> impl Iterator<Item = &str> {
        self.errors
            .iter()
            .flatten()
            .map(|error| error.trim())
            .filter(|error| !error.is_empty())
    }

    /// Returns the status code, treating a missing response or status code 0
    /// as no response at all.
    pub fn status_code(&self) -> Option<u16> {
        self.response
            .as_ref()
            .and_then(|response| response.status_code)
            .filter(|&code| code != 0)
    }

    /// Returns true if the attempt ran under a resilience pipeline.
    pub fn has_resilience_pipeline(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.has_resilience_pipeline)
            .unwrap_or(false)
    }
}

/// The name given to attempts that carry no name, uri or id.
pub const UNNAMED_REQUEST: &str = "Unnamed request";

/// The request half of a [`StructuredLogEntry`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoggedRequest {
    /// The declared request name.
    #[serde(default)]
    pub name: Option<String>,

    /// The HTTP method.
    #[serde(default)]
    pub method: Option<String>,

    /// The resolved request URI.
    #[serde(default)]
    pub uri: Option<String>,

    /// Request headers.
    #[serde(default)]
    pub headers: Option<BTreeMap<String, HeaderValue>>,

    /// The request-source file the request was declared in.
    #[serde(default)]
    pub file_path: Option<Utf8PathBuf>,

    /// The request body.
    #[serde(default)]
    pub body: Option<String>,
}

/// The response half of a [`StructuredLogEntry`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoggedResponse {
    /// The HTTP status code.
    #[serde(default)]
    pub status_code: Option<u16>,

    /// The reason phrase.
    #[serde(default)]
    pub reason_phrase: Option<String>,

    /// Response headers.
    #[serde(default)]
    pub headers: Option<BTreeMap<String, HeaderValue>>,

    /// The response body.
    #[serde(default)]
    pub body: Option<String>,
}

/// Metadata attached to an attempt.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EntryMetadata {
    /// Whether the attempt was made through a resilience (retry) pipeline.
    #[serde(
        rename = "hasResiliencePipeline",
        alias = "HasResiliencePipeline",
        default
    )]
    pub has_resilience_pipeline: Option<bool>,

    /// The name of the retry strategy, if the runner reports one.
    #[serde(rename = "retryStrategy", alias = "RetryStrategy", default)]
    pub retry_strategy: Option<String>,
}

/// A header value: runners write either a single string or a list.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum HeaderValue {
    /// A single value.
    Single(String),

    /// Multiple values for the same header.
    Multiple(Vec<String>),
}

impl HeaderValue {
    /// Returns the value, with multiple values joined by `, `.
    pub fn joined(&self) -> String {
        match self {
            Self::Single(value) => value.clone(),
            Self::Multiple(values) => values.join(", "),
        }
    }
}

/// Flattens an optional header map into a plain string map.
pub(crate) fn flatten_headers(
    headers: Option<&BTreeMap<String, HeaderValue>>,
) -> BTreeMap<String, String> {
    headers
        .into_iter()
        .flatten()
        .map(|(name, value)| (name.clone(), value.joined()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn lines_without_request_log_have_no_entry() {
        let raw: RawLogEntry =
            serde_json::from_value(json!({ "@t": "2024-05-01T10:00:00Z", "@mt": "Starting" }))
                .unwrap();
        assert!(raw.request_log.is_none());
    }

    #[test]
    fn header_values_flatten() {
        let raw: RawLogEntry = serde_json::from_value(json!({
            "RequestLog": {
                "Request": {
                    "Name": "get-user",
                    "Headers": { "Accept": ["application/json", "text/plain"], "X-Id": "1" }
                }
            }
        }))
        .unwrap();
        let entry = raw.request_log.unwrap();
        let headers = flatten_headers(entry.request.as_ref().unwrap().headers.as_ref());
        assert_eq!(headers["Accept"], "application/json, text/plain");
        assert_eq!(headers["X-Id"], "1");
    }

    #[test]
    fn group_key_fallbacks() {
        let named = StructuredLogEntry {
            request: Some(LoggedRequest {
                name: Some("create-user".to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(named.group_key(), "create-user");

        let unnamed = StructuredLogEntry {
            request: Some(LoggedRequest {
                method: Some("GET".to_owned()),
                uri: Some("https://example.test/users".to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(unnamed.group_key(), "GET https://example.test/users");

        let id_only = StructuredLogEntry {
            request_id: Some("req-7".to_owned()),
            ..Default::default()
        };
        assert_eq!(id_only.group_key(), "req-7");
        assert_eq!(StructuredLogEntry::default().group_key(), UNNAMED_REQUEST);
    }

    #[test]
    fn status_code_zero_is_no_response() {
        let entry = StructuredLogEntry {
            response: Some(LoggedResponse {
                status_code: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(entry.status_code(), None);
    }
}
