// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Merging attempt logs and attributed tests into per-request results.
//!
//! The main structure in this module is [`ResultAggregator`].

mod imp;
mod taxonomy;

pub use imp::*;
pub use taxonomy::*;
