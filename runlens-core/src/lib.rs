// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for runlens.
//!
//! An external HTTP request runner produces two artifacts for each run: a
//! line-delimited JSON log of HTTP attempts (including retries), and a
//! JUnit-like XML test report written asynchronously after the run. This
//! crate correlates them into a single per-request result model,
//! [`runlens_metadata::RunSummary`].
//!
//! The flow for a run is:
//!
//! 1. [`wait::ReportStabilizationWaiter`] waits for the report to be
//!    rewritten.
//! 2. [`ingest::AttemptLogIngestor`] groups attempts into retry chains.
//! 3. [`report::TestReportParser`] attributes test cases to requests.
//! 4. [`aggregate::ResultAggregator`] merges both and derives statuses.
//!
//! [`engine::CorrelationEngine`] runs all four steps.

pub mod aggregate;
pub mod config;
pub mod directives;
pub mod engine;
pub mod errors;
mod helpers;
pub mod ingest;
pub mod report;
pub mod wait;
