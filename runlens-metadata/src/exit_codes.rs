// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `runlens` failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum RunlensExitCode {}

impl RunlensExitCode {
    /// Every request in every group passed.
    pub const OK: i32 = 0;

    /// At least one group did not pass: a request failed at the HTTP level, an
    /// inline test failed, or a custom test failed.
    pub const RUN_FAILED: i32 = 100;

    /// A user issue happened while setting up a runlens invocation, for example an
    /// unreadable config file or directive manifest.
    pub const SETUP_ERROR: i32 = 96;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
