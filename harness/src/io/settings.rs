//! Harness settings: a flat key/value table loaded from an optional TOML
//! file.
//!
//! Environment variables take precedence over the file: a key whose
//! `HARNESS_`-prefixed variable is set keeps the environment value and the
//! file entry is skipped. Settings are applied at startup and are not part
//! of the playback protocol.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Env var prefix that overrides file-provided settings.
const ENV_PREFIX: &str = "HARNESS_";

/// Flat string-valued settings table.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    values: BTreeMap<String, String>,
}

impl Settings {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Load settings from a TOML file, honoring environment overrides.
///
/// A missing file is not an error: it yields empty settings.
pub fn load_settings(path: &Path) -> Result<Settings> {
    load_settings_with(path, |name| env::var_os(name).is_some())
}

fn load_settings_with(path: &Path, overridden: impl Fn(&str) -> bool) -> Result<Settings> {
    if !path.exists() {
        debug!(path = %path.display(), "no settings file");
        return Ok(Settings::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let parsed: Settings =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    let values = parsed
        .values
        .into_iter()
        .filter(|(key, _)| {
            if overridden(&env_name(key)) {
                debug!(%key, "setting overridden by environment, skipping");
                false
            } else {
                true
            }
        })
        .collect();
    Ok(Settings { values })
}

/// `projects-dir` becomes `HARNESS_PROJECTS_DIR`.
fn env_name(key: &str) -> String {
    let mut name = String::from(ENV_PREFIX);
    for ch in key.chars() {
        match ch {
            '-' | '.' => name.push('_'),
            _ => name.push(ch.to_ascii_uppercase()),
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_empty_settings() {
        let temp = tempfile::tempdir().expect("tempdir");
        let settings = load_settings(&temp.path().join("absent.toml")).expect("load");
        assert!(settings.is_empty());
    }

    #[test]
    fn flat_table_loads_as_string_values() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("harness.toml");
        fs::write(&path, "projects-dir = \"demos\"\nvideo-renderer = \"soft\"\n")
            .expect("write");

        let settings = load_settings(&path).expect("load");
        assert_eq!(settings.len(), 2);
        assert_eq!(settings.get("projects-dir"), Some("demos"));
        assert_eq!(settings.get("missing"), None);
    }

    #[test]
    fn overridden_keys_are_skipped() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("harness.toml");
        fs::write(&path, "renderer = \"from-file\"\nkept = \"yes\"\n").expect("write");

        let settings =
            load_settings_with(&path, |name| name == "HARNESS_RENDERER").expect("load");
        assert_eq!(settings.get("renderer"), None);
        assert_eq!(settings.get("kept"), Some("yes"));
    }

    #[test]
    fn env_names_upcase_and_replace_separators() {
        assert_eq!(env_name("projects-dir"), "HARNESS_PROJECTS_DIR");
        assert_eq!(env_name("video.renderer"), "HARNESS_VIDEO_RENDERER");
    }
}
