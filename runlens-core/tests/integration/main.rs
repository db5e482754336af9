// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod correlate;
mod fixtures;
mod reports;
