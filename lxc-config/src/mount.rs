use std::collections::BTreeSet;

use serde::Serialize;

/// One fstab-style mount line (`source target type options [dump [pass]]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountEntry {
    pub source: String,
    pub target: String,
    pub fs_type: String,
    pub options: BTreeSet<String>,
}

impl MountEntry {
    /// Parse a mount line. Returns `None` when fewer than four whitespace
    /// separated fields are present.
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return None;
        }

        let options = fields[3]
            .split(',')
            .map(str::trim)
            .filter(|opt| !opt.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        Some(Self {
            source: fields[0].to_string(),
            target: fields[1].to_string(),
            fs_type: fields[2].to_string(),
            options,
        })
    }

    pub fn read_only(&self) -> bool {
        self.options.contains("ro")
    }

    pub fn optional(&self) -> bool {
        self.options.contains("optional")
    }
}
