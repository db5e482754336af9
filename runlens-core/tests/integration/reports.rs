// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino::Utf8Path;
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::Result;
use pretty_assertions::assert_eq;
use quick_junit::{NonSuccessKind, Report, TestCase, TestCaseStatus, TestSuite};
use runlens_core::{
    config::{AttributionConfig, StoreConfig},
    directives::{RequestDirective, StaticDirectiveSource},
    report::{GLOBAL_TESTS_KEY, TestReportParser},
};
use runlens_metadata::TestSource;

fn failure(message: &str) -> TestCaseStatus {
    let mut status = TestCaseStatus::non_success(NonSuccessKind::Failure);
    status.set_message(message);
    status
}

/// Builds a report the way the runner lays it out: inline tests in request
/// order, then custom tests in a separate suite.
fn runner_report() -> Report {
    let mut inline = TestSuite::new(USERS_SOURCE);
    inline.add_test_cases([
        TestCase::new("create: status is 201", TestCaseStatus::success()),
        TestCase::new("create: <id> assigned", failure("id was \"null\" & not a number")),
        TestCase::new("get: status is 200", TestCaseStatus::success()),
    ]);

    let mut custom = TestSuite::new("Custom CSX Tests");
    custom.add_test_case(TestCase::new("cleanup ran", TestCaseStatus::success()));

    let mut report = Report::new("runner");
    report.add_test_suites([inline, custom]);
    report
}

fn parser(reports_dir: &Utf8Path) -> Result<TestReportParser> {
    let store = StoreConfig::new(reports_dir, "last-run-report.xml", r"^report-(\d+)\.xml$")?;
    Ok(TestReportParser::new(store, AttributionConfig::default()))
}

#[test]
fn parses_generated_report() -> Result<()> {
    test_init();

    let dir = Utf8TempDir::new()?;
    std::fs::write(
        dir.path().join("report-20240501101500.xml"),
        runner_report().to_string()?,
    )?;
    // Older reports are ignored.
    std::fs::write(dir.path().join("report-20240501090000.xml"), "<testsuites/>")?;

    let directives = StaticDirectiveSource::new([
        RequestDirective::named("create-user", 2),
        RequestDirective::named("get-user", 1),
    ]);
    let parser = parser(dir.path())?;
    assert_eq!(
        parser.locate(),
        Some(dir.path().join("report-20240501101500.xml"))
    );

    let attribution = parser.parse(Utf8Path::new(USERS_SOURCE), &directives);
    let summary: Vec<_> = attribution
        .iter()
        .map(|(key, tests)| {
            let names: Vec<_> = tests
                .iter()
                .map(|test| (test.name.as_str(), test.passed, test.source))
                .collect();
            (key, names)
        })
        .collect();
    assert_eq!(
        summary,
        [
            (
                "create-user",
                vec![
                    ("create: status is 201", true, TestSource::Inline),
                    ("create: <id> assigned", false, TestSource::Inline),
                ]
            ),
            (
                "get-user",
                vec![("get: status is 200", true, TestSource::Inline)]
            ),
            (
                GLOBAL_TESTS_KEY,
                vec![("cleanup ran", true, TestSource::Csx)]
            ),
        ]
    );
    assert_eq!(
        attribution.for_request("create-user")[1].message.as_deref(),
        Some("id was \"null\" & not a number")
    );
    Ok(())
}

#[test]
fn excess_tests_become_custom() -> Result<()> {
    test_init();

    let dir = Utf8TempDir::new()?;
    let mut suite = TestSuite::new(USERS_SOURCE);
    suite.add_test_cases((1..=4).map(|n| TestCase::new(format!("t{n}"), TestCaseStatus::success())));
    let mut report = Report::new("runner");
    report.add_test_suite(suite);
    std::fs::write(dir.path().join("last-run-report.xml"), report.to_string()?)?;

    let directives = StaticDirectiveSource::new([
        RequestDirective::named("a", 2),
        RequestDirective::named("b", 1),
    ]);
    let attribution = parser(dir.path())?.parse(Utf8Path::new(USERS_SOURCE), &directives);

    assert_eq!(attribution.for_request("a").len(), 2);
    assert_eq!(attribution.for_request("b").len(), 1);
    assert_eq!(attribution.global().len(), 1);
    assert_eq!(attribution.global()[0].name, "t4");
    assert_eq!(attribution.inline_count(), 3);
    Ok(())
}
