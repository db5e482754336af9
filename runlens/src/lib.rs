// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Correlates the artifacts of an HTTP request runner into per-request
//! results.
//!
//! This crate is the `runlens` command-line tool. For the library, see
//! `runlens-core`; for parsing `--message-format json` output, see
//! `runlens-metadata`.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;
mod reporter;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
