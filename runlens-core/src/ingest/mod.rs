// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry-aware ingestion of the JSONL attempt log.
//!
//! The runner writes one line per HTTP attempt. Attempts sharing a declared
//! request name form a retry chain, in log order, and become a single
//! [`CanonicalRequest`]. Lines that don't parse, or that don't describe an
//! attempt, are skipped: the log may be read while it is still being written.

mod entry;
mod imp;

pub use entry::*;
pub use imp::*;
