// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runlens configuration.
//!
//! The default config is embedded in the binary and layered under an optional
//! workspace file at `.config/runlens.toml`.

mod elements;
mod imp;

pub use elements::*;
pub use imp::*;
