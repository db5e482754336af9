// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-readable output for a [`RunSummary`].

use itertools::Itertools;
use owo_colors::{OwoColorize, Style};
use runlens_metadata::{
    FileGroupSummary, GroupStatus, RequestResultSummary, RequestStatus, RunSummary,
};
use std::io::{self, Write};
use swrite::{SWrite, swrite};

#[derive(Debug, Default)]
struct Styles {
    count: Style,
    pass: Style,
    fail: Style,
    retry: Style,
    dim: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.retry = Style::new().magenta().bold();
        self.dim = Style::new().dimmed();
    }
}

/// Writes one line per request, with failing tests and errors underneath.
#[derive(Debug)]
pub(crate) struct HumanReporter {
    styles: Styles,
    verbose: bool,
}

impl HumanReporter {
    pub(crate) fn new(colorize: bool, verbose: bool) -> Self {
        let mut styles = Styles::default();
        if colorize {
            styles.colorize();
        }
        Self { styles, verbose }
    }

    pub(crate) fn write_summary(
        &self,
        summary: &RunSummary,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        for group in &summary.groups {
            self.write_group(group, writer)?;
        }
        writer.flush()
    }

    fn write_group(&self, group: &FileGroupSummary, writer: &mut dyn Write) -> io::Result<()> {
        writeln!(writer, "{:>12} {}", "FILE".style(self.styles.count), group.file_path)?;
        for request in &group.requests {
            self.write_request(request, writer)?;
        }

        let count = |status| {
            group
                .requests
                .iter()
                .filter(|request| request.status == status)
                .count()
        };
        let (label, style) = match group.status {
            GroupStatus::Passed => ("PASSED", self.styles.pass),
            GroupStatus::Failed => ("FAILED", self.styles.fail),
        };
        writeln!(writer, "------------")?;
        writeln!(
            writer,
            "{:>12} {} [{}]: {} {}, {} passed, {} failed, {} with failing tests",
            label.style(style),
            group.name,
            group.duration,
            group.requests.len().style(self.styles.count),
            if group.requests.len() == 1 { "request" } else { "requests" },
            count(RequestStatus::Passed).style(self.styles.count),
            count(RequestStatus::Failed).style(self.styles.count),
            count(RequestStatus::TestsFailed).style(self.styles.count),
        )
    }

    fn write_request(
        &self,
        request: &RequestResultSummary,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        let (label, style) = match request.status {
            RequestStatus::Passed => ("PASS", self.styles.pass),
            RequestStatus::Failed => ("FAIL", self.styles.fail),
            RequestStatus::TestsFailed => ("TESTS FAIL", self.styles.fail),
        };

        let mut line = request.name.clone();
        if let Some(sent) = &request.request {
            swrite!(line, " {} {}", sent.method, sent.url);
        }
        if let Some(response) = &request.response {
            swrite!(line, " -> {} {}", response.status_code, response.status_text);
        }
        writeln!(
            writer,
            "{:>12} [{:>7}] {line}{}",
            label.style(style),
            request.duration,
            self.retry_suffix(request),
        )?;

        for test in request.tests.iter().flatten() {
            if test.passed && !self.verbose {
                continue;
            }
            let marker = if test.passed { "+" } else { "-" };
            match &test.message {
                Some(message) => writeln!(writer, "{:>12}     {marker} {}: {message}", "", test.name)?,
                None => writeln!(writer, "{:>12}     {marker} {}", "", test.name)?,
            }
        }

        if request.status == RequestStatus::Failed || self.verbose {
            for line in request.error_message.iter().flat_map(|message| message.lines()) {
                writeln!(writer, "{:>12}     {}", "", line.style(self.styles.dim))?;
            }
        }

        if self.verbose
            && let Some(retry_info) = &request.retry_info
            && retry_info.was_retried
        {
            for attempt in &retry_info.attempts {
                let status = attempt
                    .status_code
                    .map_or_else(|| "no response".to_owned(), |code| code.to_string());
                writeln!(
                    writer,
                    "{:>12}     attempt {}: {status} [{}]",
                    "", attempt.attempt_number, attempt.duration,
                )?;
            }
        }

        Ok(())
    }

    fn retry_suffix(&self, request: &RequestResultSummary) -> String {
        let Some(retry_info) = request.retry_info.as_ref().filter(|info| info.was_retried) else {
            return String::new();
        };
        let parts = std::iter::once(format!("{} attempts", retry_info.actual_attempts))
            .chain(retry_info.strategy_name.clone())
            .join(", ");
        format!(" ({})", parts.style(self.styles.retry))
    }
}
