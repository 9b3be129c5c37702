// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware configuration lookup.

use std::path::{Path, PathBuf};

use prunewerk_core::ShrinkConfig;
use prunewerk_core::error::Result;
use tracing::debug;

/// File name of the per-user shrink configuration.
pub const CONFIG_FILE: &str = "shrink.json";

/// Return the application configuration directory. Nothing is created.
pub fn config_dir() -> PathBuf {
    config_base(
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
    .join("prunewerk")
}

fn config_base(xdg: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    // XDG config dir, then ~/.config
    if let Some(xdg) = xdg.filter(|dir| dir.is_absolute()) {
        return xdg;
    }
    if let Some(home) = home {
        return home.join(".config");
    }
    // Last resort
    PathBuf::from(".")
}

/// The configuration to shrink with: `explicit` when given, else the
/// per-user file when it exists, else the defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ShrinkConfig> {
    resolve_from(explicit, &config_dir().join(CONFIG_FILE))
}

fn resolve_from(explicit: Option<&Path>, user_file: &Path) -> Result<ShrinkConfig> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading configuration");
        return ShrinkConfig::load(path);
    }
    if user_file.is_file() {
        debug!(path = %user_file.display(), "loading user configuration");
        return ShrinkConfig::load(user_file);
    }
    Ok(ShrinkConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prunewerk_core::PrunewerkError;

    #[test]
    fn xdg_wins_over_home() {
        let base = config_base(Some("/etc/xdg".into()), Some("/home/ada".into()));
        assert_eq!(base, PathBuf::from("/etc/xdg"));
    }

    #[test]
    fn relative_xdg_is_ignored() {
        let base = config_base(Some("relative".into()), Some("/home/ada".into()));
        assert_eq!(base, PathBuf::from("/home/ada/.config"));
    }

    #[test]
    fn missing_user_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = resolve_from(None, &dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, ShrinkConfig::default());
    }

    #[test]
    fn user_file_is_read_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{ "drop_metadata": false }"#).unwrap();
        let config = resolve_from(None, &path).unwrap();
        assert!(!config.drop_metadata);
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let user = dir.path().join(CONFIG_FILE);
        std::fs::write(&user, "{}").unwrap();
        assert!(matches!(
            resolve_from(Some(&missing), &user),
            Err(PrunewerkError::Config(_))
        ));
    }
}
