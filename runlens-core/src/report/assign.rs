// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assigning the suites of a report to the source files of a run.
//!
//! A run may execute several source files but the runner writes one report.
//! Each suite is handed to exactly one source file, so a file's tests never
//! leak into another file's results.

use super::parse::ParsedSuite;
use camino::Utf8Path;
use tracing::debug;

/// How closely a suite name refers to a source file. Lower is closer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum MatchRank {
    Path,
    FileName,
    FileStem,
}

/// Splits `suites` between `sources`, returning one list per source, in
/// order.
///
/// With a single source, every suite belongs to it. Otherwise each suite goes
/// to the source its name refers to most closely: by full path, then by file
/// name, then by file stem (so `Custom CSX Tests (users.csx)` belongs to
/// `users.http`). Ties go to the earlier source. Suites that refer to no
/// source go to the first one.
pub(super) fn assign_suites(
    suites: Vec<ParsedSuite>,
    sources: &[&Utf8Path],
) -> Vec<Vec<ParsedSuite>> {
    let mut assigned: Vec<Vec<ParsedSuite>> = sources.iter().map(|_| Vec::new()).collect();
    let Some((first, rest)) = assigned.split_first_mut() else {
        return assigned;
    };
    if rest.is_empty() {
        first.extend(suites);
        return assigned;
    }

    for suite in suites {
        let best = sources
            .iter()
            .enumerate()
            .filter_map(|(index, source)| match_rank(&suite.name, source).map(|rank| (rank, index)))
            .min();
        match best {
            Some((_, index)) => assigned[index].push(suite),
            None => {
                debug!(
                    "test suite `{}` names no executed source file, assigning it to {}",
                    suite.name, sources[0],
                );
                assigned[0].push(suite);
            }
        }
    }

    assigned
}

fn match_rank(suite_name: &str, source: &Utf8Path) -> Option<MatchRank> {
    if Utf8Path::new(suite_name.trim()) == source {
        return Some(MatchRank::Path);
    }

    suite_name
        .split(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']'))
        .filter(|token| !token.is_empty())
        .map(Utf8Path::new)
        .filter_map(|token| {
            if token == source {
                Some(MatchRank::Path)
            } else if token.file_name().is_some() && token.file_name() == source.file_name() {
                Some(MatchRank::FileName)
            } else if token.extension().is_some()
                && token.file_stem().is_some()
                && token.file_stem() == source.file_stem()
            {
                Some(MatchRank::FileStem)
            } else {
                None
            }
        })
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn suite(name: &str) -> ParsedSuite {
        ParsedSuite {
            name: name.to_owned(),
            cases: Vec::new(),
        }
    }

    fn names(assigned: &[Vec<ParsedSuite>]) -> Vec<Vec<&str>> {
        assigned
            .iter()
            .map(|suites| suites.iter().map(|suite| suite.name.as_str()).collect())
            .collect()
    }

    #[test_case("requests/users.http", "requests/users.http", Some(MatchRank::Path) ; "full path")]
    #[test_case("users.http", "requests/users.http", Some(MatchRank::FileName) ; "file name")]
    #[test_case("Custom CSX Tests (users.csx)", "requests/users.http", Some(MatchRank::FileStem) ; "custom suite stem")]
    #[test_case("Custom CSX Tests", "requests/Tests.http", None ; "bare word is not a stem")]
    #[test_case("requests/health.http", "requests/users.http", None ; "other file")]
    fn suite_name_matching(suite_name: &str, source: &str, expected: Option<MatchRank>) {
        assert_eq!(match_rank(suite_name, Utf8Path::new(source)), expected);
    }

    #[test]
    fn single_source_takes_everything() {
        let assigned = assign_suites(
            vec![suite("requests/health.http"), suite("Custom CSX Tests")],
            &[Utf8Path::new("requests/users.http")],
        );
        assert_eq!(
            names(&assigned),
            [vec!["requests/health.http", "Custom CSX Tests"]]
        );
    }

    #[test]
    fn suites_follow_their_source() {
        let assigned = assign_suites(
            vec![
                suite("requests/users.http"),
                suite("Custom CSX Tests (users.csx)"),
                suite("requests/health.http"),
                suite("Custom CSX Tests"),
            ],
            &[
                Utf8Path::new("requests/health.http"),
                Utf8Path::new("requests/users.http"),
            ],
        );
        assert_eq!(
            names(&assigned),
            [
                vec!["requests/health.http", "Custom CSX Tests"],
                vec!["requests/users.http", "Custom CSX Tests (users.csx)"],
            ]
        );
    }

    #[test]
    fn closer_match_wins() {
        let assigned = assign_suites(
            vec![suite("b/users.http")],
            &[Utf8Path::new("a/users.http"), Utf8Path::new("b/users.http")],
        );
        assert_eq!(names(&assigned), [vec![], vec!["b/users.http"]]);
    }

    #[test]
    fn no_sources() {
        assert!(assign_suites(vec![suite("users.http")], &[]).is_empty());
    }
}
