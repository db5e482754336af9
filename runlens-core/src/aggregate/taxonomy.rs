// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use swrite::{SWrite, swrite};

/// A user-facing classification of a raw execution failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecutionErrorKind {
    /// The server refused the connection.
    ConnectionRefused,

    /// The host name could not be resolved.
    HostNotFound,

    /// The connection or request timed out.
    Timeout,

    /// Any other failure.
    ExecutionFailed,
}

impl ExecutionErrorKind {
    /// Classifies a raw error message by case-insensitive substring matching.
    pub fn classify(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        let contains_any = |needles: &[&str]| needles.iter().any(|needle| lower.contains(needle));

        if contains_any(&["econnrefused", "connection refused", "actively refused"]) {
            Self::ConnectionRefused
        } else if contains_any(&[
            "enotfound",
            "getaddrinfo",
            "no such host",
            "name or service not known",
        ]) {
            Self::HostNotFound
        } else if contains_any(&["etimedout", "timed out", "timeout"]) {
            Self::Timeout
        } else {
            Self::ExecutionFailed
        }
    }

    /// Returns a short description of this kind.
    pub fn description(self) -> &'static str {
        match self {
            Self::ConnectionRefused => "Connection refused",
            Self::HostNotFound => "Host not found",
            Self::Timeout => "Request timed out",
            Self::ExecutionFailed => "Execution failed",
        }
    }
}

impl fmt::Display for ExecutionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Formats a raw execution failure as `Reason: <kind>\nDetails: <raw>`.
///
/// Messages that are already in that shape are returned unchanged.
pub fn format_execution_error(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains("Reason:") && raw.contains("Details:") {
        return raw.to_owned();
    }

    let mut out = String::new();
    swrite!(out, "Reason: {}", ExecutionErrorKind::classify(raw));
    if !raw.is_empty() {
        swrite!(out, "\nDetails: {raw}");
    }
    out
}
