use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{ConfigLine, LxcConfig};
use crate::key::{ConfigKey, InvalidKey};

/// Directory holding the distribution-provided LXC configs. Includes that
/// point inside it are left unexpanded.
pub const DEFAULT_BUILTIN_CONFIG_DIR: &str = "/usr/share/lxc/config";

/// File suffix picked up when an include points at a directory.
pub const CONFIG_SUFFIX: &str = ".conf";

/// Errors that can occur while loading an LXC config.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A config file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A non-comment line has no `=` separator.
    #[error("{}:{line}: expected 'key = value', got '{content}'", .path.display())]
    MalformedLine {
        path: PathBuf,
        line: usize,
        content: String,
    },
    /// The left-hand side of a line is not a usable key.
    #[error("{}:{line}: {source}", .path.display())]
    InvalidKey {
        path: PathBuf,
        line: usize,
        source: InvalidKey,
    },
    /// `lxc.mount` references a file that does not exist.
    #[error("mount table {} not found", .0.display())]
    MountTableNotFound(PathBuf),
    /// Includes nest deeper than [`ParseOptions::max_depth`], usually a cycle.
    #[error("include nesting exceeds {max} levels at {}", .path.display())]
    IncludeDepth { path: PathBuf, max: usize },
}

/// Knobs for config loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub builtin_config_dir: PathBuf,
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            builtin_config_dir: PathBuf::from(DEFAULT_BUILTIN_CONFIG_DIR),
            max_depth: 16,
        }
    }
}

/// Load a container config and everything it includes.
pub fn parse_file(path: &Path) -> Result<LxcConfig, ParseError> {
    parse_file_with_options(path, &ParseOptions::default())
}

/// Load a container config with explicit [`ParseOptions`].
pub fn parse_file_with_options(path: &Path, opts: &ParseOptions) -> Result<LxcConfig, ParseError> {
    let mut lines = Vec::new();
    parse_path(path, 0, opts, &mut lines)?;
    Ok(LxcConfig::from_lines(lines))
}

/// Parse config text held in memory. Includes and mount tables it references
/// are still read from disk.
pub fn parse_str(raw: &str, opts: &ParseOptions) -> Result<LxcConfig, ParseError> {
    let mut lines = Vec::new();
    parse_text(raw, Path::new("<memory>"), 0, opts, &mut lines)?;
    Ok(LxcConfig::from_lines(lines))
}

fn parse_path(
    path: &Path,
    depth: usize,
    opts: &ParseOptions,
    out: &mut Vec<ConfigLine>,
) -> Result<(), ParseError> {
    if depth > opts.max_depth {
        return Err(ParseError::IncludeDepth {
            path: path.to_path_buf(),
            max: opts.max_depth,
        });
    }
    let raw = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_text(&raw, path, depth, opts, out)
}

fn parse_text(
    raw: &str,
    origin: &Path,
    depth: usize,
    opts: &ParseOptions,
    out: &mut Vec<ConfigLine>,
) -> Result<(), ParseError> {
    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ParseError::MalformedLine {
                path: origin.to_path_buf(),
                line: idx + 1,
                content: line.to_string(),
            });
        };
        let key: ConfigKey = key.trim().parse().map_err(|source| ParseError::InvalidKey {
            path: origin.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        let value = value.trim();

        match key {
            ConfigKey::Include => expand_include(Path::new(value), depth, opts, out)?,
            ConfigKey::MountTable => inline_mount_table(Path::new(value), out)?,
            key => out.push(ConfigLine::new(key, value)),
        }
    }
    Ok(())
}

fn expand_include(
    path: &Path,
    depth: usize,
    opts: &ParseOptions,
    out: &mut Vec<ConfigLine>,
) -> Result<(), ParseError> {
    if path.starts_with(&opts.builtin_config_dir) {
        tracing::debug!(path = %path.display(), "skipping built-in include");
        return Ok(());
    }

    if path.is_file() {
        return parse_path(path, depth + 1, opts, out);
    }

    if path.is_dir() {
        let entries = fs::read_dir(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ParseError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let file = entry.path();
            let is_conf = file
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(CONFIG_SUFFIX));
            if is_conf && file.is_file() {
                files.push(file);
            }
        }
        files.sort();
        for file in files {
            parse_path(&file, depth + 1, opts, out)?;
        }
        return Ok(());
    }

    tracing::warn!(path = %path.display(), "included config not found; skipping");
    Ok(())
}

fn inline_mount_table(path: &Path, out: &mut Vec<ConfigLine>) -> Result<(), ParseError> {
    // An empty `lxc.mount =` resets the setting and names no file.
    if path.as_os_str().is_empty() {
        tracing::debug!("empty lxc.mount value; no mount table to inline");
        return Ok(());
    }
    if !path.exists() {
        return Err(ParseError::MountTableNotFound(path.to_path_buf()));
    }

    let raw = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        out.push(ConfigLine::new(ConfigKey::MountEntry, line));
    }
    Ok(())
}
