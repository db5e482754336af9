// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{CommandError, RunSummary, RunlensExitCode};
use camino::Utf8PathBuf;
use std::{ffi::OsString, process::Command};

/// Builder for `runlens correlate --message-format json` invocations.
///
/// The command is located through the `RUNLENS` environment variable if set,
/// otherwise `runlens` is looked up in `PATH`.
#[derive(Clone, Debug, Default)]
pub struct CorrelateCommand {
    runlens_path: Option<Utf8PathBuf>,
    current_dir: Option<Utf8PathBuf>,
    args: Vec<String>,
}

impl CorrelateCommand {
    /// Creates a new `CorrelateCommand`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the path to the `runlens` executable.
    pub fn runlens_path(&mut self, path: impl Into<Utf8PathBuf>) -> &mut Self {
        self.runlens_path = Some(path.into());
        self
    }

    /// Sets the directory the command runs in.
    pub fn current_dir(&mut self, path: impl Into<Utf8PathBuf>) -> &mut Self {
        self.current_dir = Some(path.into());
        self
    }

    /// Adds an argument to the end of `runlens correlate`.
    pub fn add_arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    /// Adds several arguments to the end of `runlens correlate`.
    pub fn add_args(&mut self, args: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        for arg in args {
            self.add_arg(arg.into());
        }
        self
    }

    /// Builds a command for `runlens correlate`.
    pub fn command(&self) -> Command {
        let program: OsString = match &self.runlens_path {
            Some(path) => path.as_std_path().into(),
            None => std::env::var_os("RUNLENS").unwrap_or_else(|| "runlens".into()),
        };
        let mut command = Command::new(program);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command.args(["correlate", "--message-format", "json"]);
        command.args(&self.args);
        command
    }

    /// Executes `runlens correlate` and parses its output.
    ///
    /// A run that fails still produces a summary: only exit codes other than
    /// [`RunlensExitCode::OK`] and [`RunlensExitCode::RUN_FAILED`] are errors.
    /// A failed run that printed no summary, such as one cancelled while
    /// waiting for the test report, is also an error.
    pub fn exec(&self) -> Result<RunSummary, CommandError> {
        let mut command = self.command();
        let output = command.output().map_err(CommandError::Exec)?;
        parse_output(output.status.code(), &output.stdout, output.stderr)
    }
}

fn parse_output(
    exit_code: Option<i32>,
    stdout: &[u8],
    stderr: Vec<u8>,
) -> Result<RunSummary, CommandError> {
    match exit_code {
        Some(RunlensExitCode::OK) => {}
        Some(RunlensExitCode::RUN_FAILED) if !stdout.trim_ascii().is_empty() => {}
        exit_code => return Err(CommandError::CommandFailed { exit_code, stderr }),
    }

    serde_json::from_slice(stdout).map_err(CommandError::Json)
}
