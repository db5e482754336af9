// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structural parsing of JUnit-like XML reports.

use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use std::borrow::Cow;
use tracing::debug;

/// A test suite read from the report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedSuite {
    /// The suite name.
    pub name: String,

    /// Test cases in report order.
    pub cases: Vec<ParsedCase>,
}

impl ParsedSuite {
    fn new(name: String) -> Self {
        Self {
            name,
            cases: Vec::new(),
        }
    }
}

/// A test case read from the report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCase {
    /// The test case name.
    pub name: String,

    /// True if the case has no `<failure>` or `<error>` element.
    pub passed: bool,

    /// The failure message, if the case failed and the report gave one.
    pub message: Option<String>,
}

impl ParsedCase {
    fn passed(name: String) -> Self {
        Self {
            name,
            passed: true,
            message: None,
        }
    }

    fn fail(&mut self, message: Option<String>) {
        self.passed = false;
        if self.message.is_none() {
            self.message = message.filter(|message| !message.is_empty());
        }
    }
}

/// An XML error along with the byte offset it occurred at.
#[derive(Debug)]
pub(super) struct XmlError {
    pub(super) position: usize,
    pub(super) error: quick_xml::Error,
}

/// Parses a report into its suites.
///
/// Test cases without a name and test cases outside any suite are skipped.
/// A report that ends early (for example, one still being flushed) yields the
/// suites and cases that were complete. Well-formedness errors abort the parse.
pub(super) fn parse_report_str(xml: &str) -> Result<Vec<ParsedSuite>, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut suites = Vec::new();
    let mut open_suites: Vec<ParsedSuite> = Vec::new();
    let mut current_case: Option<ParsedCase> = None;
    let mut failure_text: Option<String> = None;

    loop {
        let event = reader.read_event().map_err(|error| XmlError {
            position: reader.buffer_position(),
            error,
        })?;

        match event {
            Event::Eof => break,
            Event::Start(start) => match start.local_name().as_ref() {
                b"testsuite" => {
                    open_suites.push(ParsedSuite::new(attribute(&start, "name").unwrap_or_default()));
                }
                b"testcase" => {
                    current_case = start_case(&start);
                }
                b"failure" | b"error" => {
                    if let Some(case) = &mut current_case {
                        case.fail(attribute(&start, "message"));
                        failure_text = Some(String::new());
                    }
                }
                _ => {}
            },
            Event::Empty(start) => match start.local_name().as_ref() {
                b"testcase" => {
                    if let Some(case) = start_case(&start) {
                        push_case(&mut open_suites, case);
                    }
                }
                b"failure" | b"error" => {
                    if let Some(case) = &mut current_case {
                        case.fail(attribute(&start, "message"));
                    }
                }
                // A self-closing testsuite has no cases.
                _ => {}
            },
            Event::Text(text) => {
                if let Some(buf) = &mut failure_text {
                    let unescaped = text.unescape().map_err(|error| XmlError {
                        position: reader.buffer_position(),
                        error,
                    })?;
                    buf.push_str(&unescaped);
                }
            }
            Event::CData(data) => {
                if let Some(buf) = &mut failure_text {
                    buf.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(end) => match end.local_name().as_ref() {
                b"failure" | b"error" => {
                    if let (Some(case), Some(text)) = (&mut current_case, failure_text.take()) {
                        // The message attribute wins over element text.
                        case.fail(Some(text.trim().to_owned()));
                    }
                }
                b"testcase" => {
                    if let Some(case) = current_case.take() {
                        push_case(&mut open_suites, case);
                    }
                }
                b"testsuite" => {
                    if let Some(suite) = open_suites.pop() {
                        suites.push(suite);
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    // Anything still open belongs to a report that was cut off.
    if let Some(case) = current_case.take() {
        debug!("test report ended inside test case `{}`", case.name);
    }
    suites.extend(open_suites.drain(..).rev());

    Ok(suites)
}

fn start_case(start: &BytesStart<'_>) -> Option<ParsedCase> {
    match attribute(start, "name") {
        Some(name) => Some(ParsedCase::passed(name)),
        None => {
            debug!("skipping test case without a name");
            None
        }
    }
}

fn push_case(open_suites: &mut [ParsedSuite], case: ParsedCase) {
    match open_suites.last_mut() {
        Some(suite) => suite.cases.push(case),
        None => debug!("skipping test case `{}` outside a test suite", case.name),
    }
}

/// Returns the entity-decoded value of an attribute.
///
/// Malformed attributes are treated as missing.
fn attribute(start: &BytesStart<'_>, name: &str) -> Option<String> {
    let attr = start.try_get_attribute(name).ok().flatten()?;
    attr.unescape_value().ok().map(Cow::into_owned)
}
