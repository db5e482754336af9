// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured access to runlens machine-readable output.
//!
//! `runlens correlate --message-format json` prints a [`RunSummary`]: one
//! [`FileGroupSummary`] per request-source file, each listing the correlated
//! per-request results. This crate holds those types so that presentation
//! layers can consume them without depending on the engine.
//!
//! To run the command from Rust, see [`CorrelateCommand`].

mod command;
mod errors;
mod exit_codes;
mod summary;

pub use command::*;
pub use errors::*;
pub use exit_codes::*;
pub use summary::*;
