use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use crate::key::ConfigKey;
use crate::mount::MountEntry;
use crate::network::{collect_network_devices, NetworkDevice};

/// A single `key = value` line of an effective LXC configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigLine {
    pub key: ConfigKey,
    pub value: String,
}

impl ConfigLine {
    pub fn new(key: ConfigKey, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

impl Display for ConfigLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.key, self.value)
    }
}

/// Effective configuration of one container after include and mount-table
/// expansion.
///
/// Lines keep the order they were encountered in. Repeated keys are all kept;
/// whether a later line overrides an earlier one is up to the reader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LxcConfig {
    lines: Vec<ConfigLine>,
}

impl LxcConfig {
    pub fn from_lines(lines: Vec<ConfigLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[ConfigLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Return every value recorded for `key`, in config order.
    ///
    /// Returns `None` when the key never appears so callers can supply their
    /// own default.
    pub fn get(&self, key: &ConfigKey) -> Option<Vec<&str>> {
        let values: Vec<&str> = self
            .lines
            .iter()
            .filter(|line| &line.key == key)
            .map(|line| line.value.as_str())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    }

    /// Return the first value recorded for `key`.
    pub fn first(&self, key: &ConfigKey) -> Option<&str> {
        self.lines
            .iter()
            .find(|line| &line.key == key)
            .map(|line| line.value.as_str())
    }

    pub fn contains(&self, key: &ConfigKey) -> bool {
        self.lines.iter().any(|line| &line.key == key)
    }

    /// Return the first line whose key satisfies `pred`.
    pub fn any_key(&self, pred: impl Fn(&ConfigKey) -> bool) -> Option<&ConfigLine> {
        self.lines.iter().find(|line| pred(&line.key))
    }

    /// Network entries declared by this config, in declaration order.
    pub fn network_devices(&self) -> Vec<NetworkDevice> {
        collect_network_devices(&self.lines)
    }

    /// Raw `lxc.mount.entry` values, including those inlined from mount tables.
    pub fn mount_entries(&self) -> Vec<&str> {
        self.get(&ConfigKey::MountEntry).unwrap_or_default()
    }

    /// Parse every `lxc.mount.entry` value. Entries with fewer than four fields
    /// come back as `None` so the caller decides how to treat them.
    pub fn parsed_mount_entries(&self) -> Vec<(&str, Option<MountEntry>)> {
        self.mount_entries()
            .into_iter()
            .map(|raw| (raw, MountEntry::parse(raw)))
            .collect()
    }
}

impl Display for LxcConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
