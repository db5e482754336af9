// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Positional attribution of test cases to requests.
//!
//! The runner's report carries no link between a test case and the request it
//! checks. It does emit inline test cases in the order requests appear in the
//! source file, followed by any custom tests. Given the number of inline test
//! directives each request declares, the first `Σ count` cases of a suite are
//! handed out to requests in file order, and everything after that is custom.
//!
//! If the runner ever emits an explicit request-to-test link, this heuristic
//! should be retired in favour of it.

use super::parse::{ParsedCase, ParsedSuite};
use crate::{directives::RequestDirective, helpers::plural};
use indexmap::IndexMap;
use runlens_metadata::TestSource;
use tracing::debug;

/// The reserved key for tests that are not attributed to any single request.
pub const GLOBAL_TESTS_KEY: &str = "$custom";

/// A test case attributed to a request or to the custom bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributedTest {
    /// The test case name.
    pub name: String,

    /// Whether the test passed.
    pub passed: bool,

    /// The failure message, if any.
    pub message: Option<String>,

    /// Whether the test was attributed to a request or to the custom bucket.
    pub source: TestSource,
}

impl AttributedTest {
    fn new(case: ParsedCase, source: TestSource) -> Self {
        Self {
            name: case.name,
            passed: case.passed,
            message: case.message,
            source,
        }
    }
}

/// Attributed tests for one run, keyed by request name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestAttribution {
    by_request: IndexMap<String, Vec<AttributedTest>>,
    global: Vec<AttributedTest>,
}

impl TestAttribution {
    /// Returns the tests for a request name, or for [`GLOBAL_TESTS_KEY`].
    pub fn get(&self, key: &str) -> &[AttributedTest] {
        if key == GLOBAL_TESTS_KEY {
            return &self.global;
        }
        self.by_request.get(key).map_or(&[][..], Vec::as_slice)
    }

    /// Returns the tests attributed to the given request.
    pub fn for_request(&self, name: &str) -> &[AttributedTest] {
        self.by_request.get(name).map_or(&[][..], Vec::as_slice)
    }

    /// Returns the tests not attributed to any single request.
    pub fn global(&self) -> &[AttributedTest] {
        &self.global
    }

    /// Iterates over `(key, tests)` pairs, requests first in attribution order,
    /// then the global bucket under [`GLOBAL_TESTS_KEY`] if it is non-empty.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[AttributedTest])> {
        let global = (!self.global.is_empty()).then_some((GLOBAL_TESTS_KEY, self.global.as_slice()));
        self.by_request
            .iter()
            .map(|(key, tests)| (key.as_str(), tests.as_slice()))
            .chain(global)
    }

    /// Returns the number of inline (request-attributed) tests.
    pub fn inline_count(&self) -> usize {
        self.by_request.values().map(Vec::len).sum()
    }

    /// Returns true if no tests were attributed at all.
    pub fn is_empty(&self) -> bool {
        self.by_request.is_empty() && self.global.is_empty()
    }

    /// Adds a test under `key`, which is either a request name or
    /// [`GLOBAL_TESTS_KEY`].
    pub fn insert(&mut self, key: &str, test: AttributedTest) {
        if key == GLOBAL_TESTS_KEY {
            self.global.push(test);
        } else {
            self.by_request.entry(key.to_owned()).or_default().push(test);
        }
    }

    fn push_inline(&mut self, request: &str, case: ParsedCase) {
        self.by_request
            .entry(request.to_owned())
            .or_default()
            .push(AttributedTest::new(case, TestSource::Inline));
    }

    fn push_global(&mut self, case: ParsedCase) {
        self.global.push(AttributedTest::new(case, TestSource::Csx));
    }
}

/// Attributes the cases of every suite in a report.
///
/// `directives` lists the requests of the source file in file order.
pub(super) fn attribute_suites(
    suites: Vec<ParsedSuite>,
    directives: &[RequestDirective],
    custom_suite_marker: &str,
) -> TestAttribution {
    // One slot per inline test, naming the request that owns it: counts
    // [2, 1] for requests a and b become [a, a, b].
    let slots: Vec<String> = directives
        .iter()
        .flat_map(|directive| std::iter::repeat_n(directive.key(), directive.effective_count()))
        .collect();

    let mut attribution = TestAttribution::default();
    // Slots are shared across suites so a run never has more inline tests
    // than directives.
    let mut next_slot = 0;

    for suite in suites {
        if suite.cases.is_empty() {
            debug!("skipping test suite `{}` with no test cases", suite.name);
            continue;
        }

        if !custom_suite_marker.is_empty() && suite.name.contains(custom_suite_marker) {
            suite
                .cases
                .into_iter()
                .for_each(|case| attribution.push_global(case));
            continue;
        }

        if slots.is_empty() {
            debug!(
                "no request declares test directives: attributing {} {} in suite `{}` \
                 to custom tests",
                suite.cases.len(),
                plural::tests_str(suite.cases.len()),
                suite.name,
            );
            suite
                .cases
                .into_iter()
                .for_each(|case| attribution.push_global(case));
            continue;
        }

        for case in suite.cases {
            match slots.get(next_slot) {
                Some(owner) => {
                    next_slot += 1;
                    attribution.push_inline(owner, case);
                }
                None => attribution.push_global(case),
            }
        }
    }

    attribution
}
