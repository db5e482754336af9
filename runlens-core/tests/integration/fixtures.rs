// Copyright (c) The runlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::Result;
use runlens_core::config::{ConfigWarnings, RunlensConfig};
use std::sync::Once;

pub(crate) const USERS_SOURCE: &str = "requests/users.http";
pub(crate) const HEALTH_SOURCE: &str = "requests/health.http";

/// Timings short enough for tests, layered over the default config.
pub(crate) const FAST_WAIT_CONFIG: &str = r#"
[wait]
poll-interval = "20ms"
settle-delay = "20ms"
timeout = "2s"
"#;

pub(crate) fn test_init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        color_eyre::install().expect("color-eyre installed once");
    });
}

pub(crate) fn fixtures_dir() -> Utf8PathBuf {
    Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("runlens-core has a parent directory")
        .join("fixtures")
}

/// Copies a fixture into a fresh temporary workspace.
pub(crate) fn temp_workspace(fixture: &str) -> Result<Utf8TempDir> {
    let workspace = Utf8TempDir::with_prefix("runlens-")?;
    copy_dir(&fixtures_dir().join(fixture), workspace.path())?;
    Ok(workspace)
}

fn copy_dir(from: &Utf8Path, to: &Utf8Path) -> Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in from.read_dir_utf8()? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Records unknown config keys instead of logging them.
#[derive(Debug, Default)]
pub(crate) struct RecordingWarnings {
    pub(crate) unknown: Vec<String>,
}

impl ConfigWarnings for RecordingWarnings {
    fn unknown_config_keys(
        &mut self,
        _config_file: &Utf8Path,
        _workspace_root: &Utf8Path,
        unknown: &std::collections::BTreeSet<String>,
    ) {
        self.unknown.extend(unknown.iter().cloned());
    }
}

/// Loads the config for a workspace, with `extra` written to
/// `.config/runlens.toml` first.
pub(crate) fn load_config(workspace: &Utf8Path, extra: &str) -> Result<RunlensConfig> {
    let config_dir = workspace.join(".config");
    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(config_dir.join("runlens.toml"), extra)?;

    let mut warnings = RecordingWarnings::default();
    let config = RunlensConfig::from_sources(workspace, None, &mut warnings)?;
    assert!(warnings.unknown.is_empty(), "unknown keys: {:?}", warnings.unknown);
    Ok(config)
}
