// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    AttributionConfig, StoreConfig, WaitConfig, elements::StoreConfigDeserialize,
};
use crate::errors::{ConfigParseError, ConfigParseErrorKind};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::warn;

/// Trait for handling configuration warnings.
///
/// This allows for different warning handling strategies, such as logging
/// warnings (the default behavior) or collecting them for testing purposes.
pub trait ConfigWarnings {
    /// Handle unknown configuration keys found in a config file.
    fn unknown_config_keys(
        &mut self,
        config_file: &Utf8Path,
        workspace_root: &Utf8Path,
        unknown: &BTreeSet<String>,
    );
}

/// Default implementation of [`ConfigWarnings`] that logs warnings using the
/// tracing crate.
pub struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(
        &mut self,
        config_file: &Utf8Path,
        workspace_root: &Utf8Path,
        unknown: &BTreeSet<String>,
    ) {
        let mut unknown_str = String::new();
        if unknown.len() == 1 {
            // Print this on the same line.
            unknown_str.push_str("key: ");
            unknown_str.extend(unknown.iter().map(String::as_str));
        } else {
            unknown_str.push_str("keys:\n");
            for ignored_key in unknown {
                unknown_str.push('\n');
                unknown_str.push_str("  - ");
                unknown_str.push_str(ignored_key);
            }
        }

        warn!(
            "in config file {}, ignoring unknown configuration {unknown_str}",
            config_file
                .strip_prefix(workspace_root)
                .unwrap_or(config_file),
        )
    }
}

/// Overall runlens configuration for a workspace.
#[derive(Clone, Debug)]
pub struct RunlensConfig {
    workspace_root: Utf8PathBuf,
    store: StoreConfig,
    wait: WaitConfig,
    attribution: AttributionConfig,
}

impl RunlensConfig {
    /// The default location of the config within the workspace: `.config/runlens.toml`.
    pub const CONFIG_PATH: &'static str = ".config/runlens.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// Reads the runlens config from the given file, or if not specified from
    /// `.config/runlens.toml` in the workspace root.
    ///
    /// If the file isn't specified and the workspace doesn't have
    /// `.config/runlens.toml`, uses the default config options.
    pub fn from_sources(
        workspace_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigParseError> {
        let workspace_root = workspace_root.into();

        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (deserialized, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        if !unknown.is_empty() {
            warnings.unknown_config_keys(&config_file, &workspace_root, &unknown);
        }

        let RunlensConfigDeserialize {
            store,
            wait,
            attribution,
        } = deserialized;
        let store = StoreConfig::new(
            workspace_root.join(&store.reports_dir),
            store.latest_report,
            &store.report_pattern,
        )
        .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        Ok(Self {
            workspace_root,
            store,
            wait,
            attribution,
        })
    }

    /// Returns the default config for the given workspace root, ignoring any
    /// config file on disk.
    pub fn default_config(workspace_root: impl Into<Utf8PathBuf>) -> Result<Self, ConfigParseError> {
        let workspace_root = workspace_root.into();
        let builder = Self::make_default_config();
        let (deserialized, _unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new("<default config>", kind))?;
        let store = StoreConfig::new(
            workspace_root.join(&deserialized.store.reports_dir),
            deserialized.store.latest_report,
            &deserialized.store.report_pattern,
        )
        .map_err(|kind| ConfigParseError::new("<default config>", kind))?;

        Ok(Self {
            workspace_root,
            store,
            wait: deserialized.wait,
            attribution: deserialized.attribution,
        })
    }

    /// Returns the workspace root.
    pub fn workspace_root(&self) -> &Utf8Path {
        &self.workspace_root
    }

    /// Returns the report store settings.
    pub fn store(&self) -> &StoreConfig {
        &self.store
    }

    /// Returns the report stabilization timing.
    pub fn wait(&self) -> WaitConfig {
        self.wait
    }

    /// Returns the test attribution settings.
    pub fn attribution(&self) -> &AttributionConfig {
        &self.attribution
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(RunlensConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: RunlensConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // Both serde_path_to_error and the config crate report the key.
                // Drop the key from the config error for consistency.
                let path = error.path().clone();
                let config_error = error.into_inner();
                let error = match config_error {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RunlensConfigDeserialize {
    store: StoreConfigDeserialize,
    wait: WaitConfig,
    attribution: AttributionConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use test_case::test_case;

    #[derive(Default)]
    struct TestConfigWarnings {
        unknown: Vec<String>,
    }

    impl ConfigWarnings for TestConfigWarnings {
        fn unknown_config_keys(
            &mut self,
            _config_file: &Utf8Path,
            _workspace_root: &Utf8Path,
            unknown: &BTreeSet<String>,
        ) {
            self.unknown.extend(unknown.iter().cloned());
        }
    }

    fn temp_workspace(config_contents: &str) -> Utf8TempDir {
        let dir = Utf8TempDir::new().expect("created temp dir");
        std::fs::create_dir_all(dir.path().join(".config")).expect("created .config");
        std::fs::write(dir.path().join(RunlensConfig::CONFIG_PATH), config_contents)
            .expect("wrote config");
        dir
    }

    #[test]
    fn default_config_is_valid() {
        let config = RunlensConfig::default_config("/workspace").expect("default config is valid");
        assert_eq!(
            config.store().latest_report_path(),
            "/workspace/.runlens/reports/last-run-report.xml"
        );
        assert_eq!(
            config.wait(),
            WaitConfig {
                poll_interval: Duration::from_millis(100),
                settle_delay: Duration::from_millis(200),
                timeout: Duration::from_secs(10),
            }
        );
        assert_eq!(config.attribution(), &AttributionConfig::default());
    }

    #[test]
    fn missing_workspace_config_uses_defaults() {
        let dir = Utf8TempDir::new().unwrap();
        let mut warnings = TestConfigWarnings::default();
        let config = RunlensConfig::from_sources(dir.path(), None, &mut warnings)
            .expect("missing config file is not an error");
        assert_eq!(config.wait().timeout, Duration::from_secs(10));
        assert!(warnings.unknown.is_empty());
    }

    #[test_case(
        indoc! {r#"
            [wait]
            timeout = "30s"
        "#},
        Duration::from_secs(30),
        Duration::from_millis(100)

        ; "overrides timeout only"
    )]
    #[test_case(
        indoc! {r#"
            [wait]
            poll-interval = "50ms"
            timeout = "1m"
        "#},
        Duration::from_secs(60),
        Duration::from_millis(50)

        ; "overrides poll interval and timeout"
    )]
    fn wait_overrides(config_contents: &str, timeout: Duration, poll_interval: Duration) {
        let dir = temp_workspace(config_contents);
        let config =
            RunlensConfig::from_sources(dir.path(), None, &mut TestConfigWarnings::default())
                .expect("config parses");
        assert_eq!(config.wait().timeout, timeout);
        assert_eq!(config.wait().poll_interval, poll_interval);
        assert_eq!(config.wait().settle_delay, Duration::from_millis(200));
    }

    #[test]
    fn unknown_keys_are_reported() {
        let dir = temp_workspace(indoc! {r#"
            [store]
            reports-directory = "out"

            [attribution]
            custom-suite-marker = "Global Tests"
        "#});
        let mut warnings = TestConfigWarnings::default();
        let config = RunlensConfig::from_sources(dir.path(), None, &mut warnings)
            .expect("config parses");
        assert_eq!(warnings.unknown, vec!["store.reports-directory".to_owned()]);
        assert_eq!(config.attribution().custom_suite_marker, "Global Tests");
    }

    #[test_case(
        indoc! {r#"
            [store]
            report-pattern = '^report-\d+\.xml$'
        "#},
        "must contain a capture group"

        ; "pattern without capture group"
    )]
    #[test_case(
        indoc! {r#"
            [store]
            report-pattern = '^report-(\d+\.xml$'
        "#},
        "invalid report-pattern"

        ; "pattern that does not compile"
    )]
    #[test_case(
        indoc! {r#"
            [wait]
            timeout = "soon"
        "#},
        "wait.timeout"

        ; "invalid duration"
    )]
    fn invalid_config(config_contents: &str, expected: &str) {
        let dir = temp_workspace(config_contents);
        let error =
            RunlensConfig::from_sources(dir.path(), None, &mut TestConfigWarnings::default())
                .expect_err("config should fail to parse");
        let message = error.kind().to_string();
        assert!(
            message.contains(expected),
            "error `{message}` contains `{expected}`"
        );
    }
}
