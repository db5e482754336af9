// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for runlens-core.

/// Utilities for pluralizing various words based on count or plurality.
pub mod plural {
    /// Returns "request" if `count` is 1, otherwise "requests".
    pub fn requests_str(count: usize) -> &'static str {
        if count == 1 { "request" } else { "requests" }
    }

    /// Returns "test" if `count` is 1, otherwise "tests".
    pub fn tests_str(count: usize) -> &'static str {
        if count == 1 { "test" } else { "tests" }
    }

    /// Returns "file" if `count` is 1, otherwise "files".
    pub fn files_str(count: usize) -> &'static str {
        if count == 1 { "file" } else { "files" }
    }

    /// Returns "attempt" if `count` is 1, otherwise "attempts".
    pub fn attempts_str(count: usize) -> &'static str {
        if count == 1 { "attempt" } else { "attempts" }
    }
}

/// Returns the key an unnamed request is known by: `METHOD URL`, without
/// surrounding whitespace when either part is empty.
pub(crate) fn method_url_key(method: &str, url: &str) -> String {
    format!("{method} {url}").trim().to_owned()
}

/// The suffix used for all durations in the result model.
pub(crate) const DURATION_SUFFIX: &str = "ms";

/// Formats a millisecond count the way the result model expects: `<n>ms`.
pub(crate) fn format_duration_ms(millis: u64) -> String {
    format!("{millis}{DURATION_SUFFIX}")
}

/// Converts a possibly fractional, possibly negative duration from the attempt
/// log into whole milliseconds.
pub(crate) fn duration_ms_from_f64(millis: f64) -> u64 {
    if millis.is_finite() && millis > 0.0 {
        millis.round() as u64
    } else {
        0
    }
}

/// Parses a duration string as milliseconds.
///
/// Accepts `<n>ms` and bare numbers. Anything else counts as zero.
pub(crate) fn parse_duration_ms(input: &str) -> u64 {
    let trimmed = input.trim();
    let number = trimmed.strip_suffix(DURATION_SUFFIX).unwrap_or(trimmed).trim();
    if let Ok(millis) = number.parse::<u64>() {
        return millis;
    }
    number.parse::<f64>().map_or(0, duration_ms_from_f64)
}

/// Returns true if the status code is in the 2xx range.
pub(crate) fn is_success_status(status_code: u16) -> bool {
    (200..300).contains(&status_code)
}
