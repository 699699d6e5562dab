use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::migrate::DEFAULT_LXD_DIR;

/// Settings file read when `--config` is not given.
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/lxc-to-lxd.toml";
pub const DEFAULT_LXC_PATH: &str = "/var/lib/lxc";

/// Optional overrides loaded from a TOML settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub lxcpath: Option<PathBuf>,
    #[serde(default)]
    pub lxdpath: Option<PathBuf>,
    /// Directory whose includes are never expanded.
    #[serde(default)]
    pub builtin_config_dir: Option<PathBuf>,
    /// rsync binary used for copies.
    #[serde(default)]
    pub rsync: Option<String>,
    /// LXD client binary used for `lxc query`.
    #[serde(default)]
    pub lxc_client: Option<String>,
}

/// Effective settings after applying command-line overrides and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub lxcpath: PathBuf,
    pub lxdpath: PathBuf,
    pub builtin_config_dir: PathBuf,
    pub rsync: String,
    pub lxc_client: String,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

impl Settings {
    /// Fill unset values from the command line first, then built-in defaults.
    pub fn resolve(self, lxcpath: Option<PathBuf>, lxdpath: Option<PathBuf>) -> ResolvedSettings {
        ResolvedSettings {
            lxcpath: lxcpath
                .or(self.lxcpath)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LXC_PATH)),
            lxdpath: lxdpath
                .or(self.lxdpath)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LXD_DIR)),
            builtin_config_dir: self
                .builtin_config_dir
                .unwrap_or_else(|| PathBuf::from(lxc_config::DEFAULT_BUILTIN_CONFIG_DIR)),
            rsync: self.rsync.unwrap_or_else(|| "rsync".to_string()),
            lxc_client: self.lxc_client.unwrap_or_else(|| "lxc".to_string()),
        }
    }
}

/// Load settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_settings(&raw, path.display().to_string())
}

fn parse_settings(raw: &str, path: String) -> Result<Settings, SettingsError> {
    toml::from_str(raw).map_err(|source| SettingsError::Parse { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_resolves_to_defaults() {
        let settings = parse_settings("", "inline".to_string()).expect("parse");
        let resolved = settings.resolve(None, None);
        assert_eq!(resolved.lxcpath, PathBuf::from("/var/lib/lxc"));
        assert_eq!(resolved.lxdpath, PathBuf::from("/var/lib/lxd"));
        assert_eq!(
            resolved.builtin_config_dir,
            PathBuf::from("/usr/share/lxc/config")
        );
        assert_eq!(resolved.rsync, "rsync");
        assert_eq!(resolved.lxc_client, "lxc");
    }

    #[test]
    fn command_line_beats_file() {
        let settings = parse_settings(
            "lxcpath = \"/srv/lxc\"\nlxdpath = \"/srv/lxd\"\n",
            "inline".to_string(),
        )
        .expect("parse");
        let resolved = settings.resolve(Some(PathBuf::from("/opt/lxc")), None);
        assert_eq!(resolved.lxcpath, PathBuf::from("/opt/lxc"));
        assert_eq!(resolved.lxdpath, PathBuf::from("/srv/lxd"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_settings("lxc_path = \"/srv\"\n", "inline".to_string())
            .expect_err("should fail");
        assert!(err.to_string().contains("inline"));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("lxc-to-lxd.toml");
        fs::write(&path, "rsync = \"/usr/local/bin/rsync\"\n").expect("write");
        let settings = load_settings(&path).expect("load");
        assert_eq!(settings.rsync.as_deref(), Some("/usr/local/bin/rsync"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().expect("tempdir");
        let err = load_settings(&dir.path().join("absent.toml")).expect_err("should fail");
        assert!(matches!(err, SettingsError::Io { .. }));
    }
}
