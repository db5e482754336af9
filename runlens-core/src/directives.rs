// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test directive counts for request-source files.
//!
//! The runner does not link test cases to requests in its report. Instead,
//! runlens asks a [`RequestDirectiveSource`] how many inline test directives
//! each request in a source file declares, and attributes test cases by
//! position. Parsing request-source files is out of scope here: the CLI reads
//! counts from a JSON manifest through [`ManifestDirectiveSource`].

use crate::{errors::DirectiveSourceError, helpers::method_url_key};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::Deserialize;

/// A request declared in a source file, along with its test directive count.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequestDirective {
    /// The declared request name, if any.
    #[serde(default)]
    pub name: Option<String>,

    /// The request title, used when no name is declared.
    #[serde(default)]
    pub title: Option<String>,

    /// The HTTP method.
    #[serde(default)]
    pub method: String,

    /// The request URL as written in the source file.
    #[serde(default)]
    pub url: String,

    /// Whether the request declares any test directives.
    #[serde(default)]
    pub has_test_directives: bool,

    /// How many inline test directives the request declares.
    #[serde(default)]
    pub test_directive_count: usize,
}

impl RequestDirective {
    /// Creates a named request with the given directive count.
    pub fn named(name: impl Into<String>, test_directive_count: usize) -> Self {
        Self {
            name: Some(name.into()),
            has_test_directives: test_directive_count > 0,
            test_directive_count,
            ..Default::default()
        }
    }

    /// Returns the key under which this request's tests are attributed.
    ///
    /// This matches the key the attempt log groups retries by: the declared
    /// name, then the title, then `METHOD URL`. The log only knows the
    /// resolved URL, so tests for a request with neither a name nor a title
    /// match only if its URL has no variables. Tests that match no logged
    /// request end up with the custom tests.
    pub fn key(&self) -> String {
        let non_empty = |s: &&str| !s.is_empty();
        self.name
            .as_deref()
            .filter(non_empty)
            .or_else(|| self.title.as_deref().filter(non_empty))
            .map_or_else(|| method_url_key(&self.method, &self.url), ToOwned::to_owned)
    }

    /// Returns the number of inline test cases this request owns.
    ///
    /// A request that declares no test directives owns none, whatever its
    /// count says.
    pub fn effective_count(&self) -> usize {
        if self.has_test_directives {
            self.test_directive_count
        } else {
            0
        }
    }
}

/// A query returning the ordered requests of a request-source file.
///
/// Implementations must be pure: the same file must produce the same list, in
/// file order, for the duration of a run.
pub trait RequestDirectiveSource {
    /// Returns the requests declared in `source_file`, in file order.
    fn requests(&self, source_file: &Utf8Path)
    -> Result<Vec<RequestDirective>, DirectiveSourceError>;
}

/// A directive source that returns the same list for every file.
#[derive(Clone, Debug, Default)]
pub struct StaticDirectiveSource {
    requests: Vec<RequestDirective>,
}

impl StaticDirectiveSource {
    /// Creates a new `StaticDirectiveSource`.
    pub fn new(requests: impl IntoIterator<Item = RequestDirective>) -> Self {
        Self {
            requests: requests.into_iter().collect(),
        }
    }
}

impl RequestDirectiveSource for StaticDirectiveSource {
    fn requests(
        &self,
        _source_file: &Utf8Path,
    ) -> Result<Vec<RequestDirective>, DirectiveSourceError> {
        Ok(self.requests.clone())
    }
}

/// A directive source backed by a JSON manifest.
///
/// The manifest maps source file paths, as passed to runlens, to their
/// ordered request lists:
///
/// ```json
/// {
///   "requests/users.http": [
///     { "name": "create-user", "method": "POST", "url": "{{base}}/users",
///       "hasTestDirectives": true, "testDirectiveCount": 2 }
///   ]
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct ManifestDirectiveSource {
    files: IndexMap<Utf8PathBuf, Vec<RequestDirective>>,
}

impl ManifestDirectiveSource {
    /// Reads a manifest from disk.
    pub fn from_path(path: &Utf8Path) -> Result<Self, DirectiveSourceError> {
        let contents =
            std::fs::read_to_string(path).map_err(|error| DirectiveSourceError::ReadManifest {
                path: path.to_owned(),
                error,
            })?;
        Self::from_json(&contents).map_err(|error| DirectiveSourceError::ParseManifest {
            path: path.to_owned(),
            error,
        })
    }

    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let files = serde_json::from_str(json)?;
        Ok(Self { files })
    }
}

impl RequestDirectiveSource for ManifestDirectiveSource {
    fn requests(
        &self,
        source_file: &Utf8Path,
    ) -> Result<Vec<RequestDirective>, DirectiveSourceError> {
        // A file missing from the manifest declares no directives.
        Ok(self.files.get(source_file).cloned().unwrap_or_default())
    }
}
