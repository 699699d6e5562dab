use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Prefix shared by every lifecycle hook key (`lxc.hook.pre-start`, ...).
pub const HOOK_PREFIX: &str = "lxc.hook.";

/// Recognized LXC configuration keys.
///
/// Legacy and current spellings of the same setting normalize to a single
/// variant, so consumers never have to care which LXC release wrote the file.
/// Keys this crate has no opinion about are kept verbatim in [`ConfigKey::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    /// `lxc.include`
    Include,
    /// `lxc.mount` / `lxc.mount.fstab`: external fstab-style mount table.
    MountTable,
    /// `lxc.mount.entry`
    MountEntry,
    /// `lxc.utsname` / `lxc.uts.name`
    Hostname,
    /// `lxc.id_map` / `lxc.idmap`
    IdMap,
    /// `lxc.rootfs` / `lxc.rootfs.path`
    Rootfs,
    /// `lxc.aa_profile` / `lxc.apparmor.profile`
    AppArmorProfile,
    /// `lxc.seccomp` / `lxc.seccomp.profile`
    Seccomp,
    /// `lxc.se_context` / `lxc.selinux.context`
    SelinuxContext,
    /// `lxc.cap.drop`
    CapDrop,
    /// `lxc.cap.keep`
    CapKeep,
    /// `lxc.environment`
    Environment,
    /// `lxc.start.auto`
    StartAuto,
    /// `lxc.start.delay`
    StartDelay,
    /// `lxc.start.order`
    StartOrder,
    /// `lxc.arch`
    Arch,
    /// `lxd.migrated`: sentinel written after a successful migration.
    Migrated,
    /// `lxc.network.<field>`, `lxc.network.<n>.<field>` or `lxc.net.<n>.<field>`.
    ///
    /// The bare `lxc.network` key (used by some tools to reset the list) has an
    /// empty field.
    Network { index: Option<usize>, field: String },
    /// `lxc.hook.<name>`
    Hook(String),
    /// Any other key, kept as written.
    Other(String),
}

/// A key that cannot appear on the left-hand side of a config line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid config key '{0}'")]
pub struct InvalidKey(pub String);

impl ConfigKey {
    /// Network entry type key for legacy (unindexed) config files.
    pub fn network_type() -> Self {
        ConfigKey::Network {
            index: None,
            field: "type".to_string(),
        }
    }

    /// Returns true for any `lxc.hook.*` key.
    pub fn is_hook(&self) -> bool {
        matches!(self, ConfigKey::Hook(_))
    }
}

impl FromStr for ConfigKey {
    type Err = InvalidKey;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.is_empty() || raw.chars().any(char::is_whitespace) {
            return Err(InvalidKey(raw.to_string()));
        }

        let key = match raw {
            "lxc.include" => ConfigKey::Include,
            "lxc.mount" | "lxc.mount.fstab" => ConfigKey::MountTable,
            "lxc.mount.entry" => ConfigKey::MountEntry,
            "lxc.utsname" | "lxc.uts.name" => ConfigKey::Hostname,
            "lxc.id_map" | "lxc.idmap" => ConfigKey::IdMap,
            "lxc.rootfs" | "lxc.rootfs.path" => ConfigKey::Rootfs,
            "lxc.aa_profile" | "lxc.apparmor.profile" => ConfigKey::AppArmorProfile,
            "lxc.seccomp" | "lxc.seccomp.profile" => ConfigKey::Seccomp,
            "lxc.se_context" | "lxc.selinux.context" => ConfigKey::SelinuxContext,
            "lxc.cap.drop" => ConfigKey::CapDrop,
            "lxc.cap.keep" => ConfigKey::CapKeep,
            "lxc.environment" => ConfigKey::Environment,
            "lxc.start.auto" => ConfigKey::StartAuto,
            "lxc.start.delay" => ConfigKey::StartDelay,
            "lxc.start.order" => ConfigKey::StartOrder,
            "lxc.arch" => ConfigKey::Arch,
            "lxd.migrated" => ConfigKey::Migrated,
            "lxc.network" | "lxc.net" => ConfigKey::Network {
                index: None,
                field: String::new(),
            },
            _ => {
                if let Some(hook) = raw.strip_prefix(HOOK_PREFIX) {
                    return Ok(ConfigKey::Hook(hook.to_string()));
                }
                if let Some(rest) = raw
                    .strip_prefix("lxc.network.")
                    .or_else(|| raw.strip_prefix("lxc.net."))
                {
                    return parse_network_key(raw, rest);
                }
                ConfigKey::Other(raw.to_string())
            }
        };
        Ok(key)
    }
}

fn parse_network_key(raw: &str, rest: &str) -> Result<ConfigKey, InvalidKey> {
    let (head, tail) = match rest.split_once('.') {
        Some((head, tail)) => (head, Some(tail)),
        None => (rest, None),
    };

    if let Ok(index) = head.parse::<usize>() {
        // `lxc.net.0` on its own resets entry 0; treat it like the bare key.
        let field = tail.unwrap_or_default();
        return Ok(ConfigKey::Network {
            index: Some(index),
            field: field.to_string(),
        });
    }

    if rest.is_empty() || rest.ends_with('.') {
        return Err(InvalidKey(raw.to_string()));
    }

    Ok(ConfigKey::Network {
        index: None,
        field: rest.to_string(),
    })
}

impl Display for ConfigKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigKey::Include => f.write_str("lxc.include"),
            ConfigKey::MountTable => f.write_str("lxc.mount"),
            ConfigKey::MountEntry => f.write_str("lxc.mount.entry"),
            ConfigKey::Hostname => f.write_str("lxc.utsname"),
            ConfigKey::IdMap => f.write_str("lxc.id_map"),
            ConfigKey::Rootfs => f.write_str("lxc.rootfs"),
            ConfigKey::AppArmorProfile => f.write_str("lxc.aa_profile"),
            ConfigKey::Seccomp => f.write_str("lxc.seccomp"),
            ConfigKey::SelinuxContext => f.write_str("lxc.se_context"),
            ConfigKey::CapDrop => f.write_str("lxc.cap.drop"),
            ConfigKey::CapKeep => f.write_str("lxc.cap.keep"),
            ConfigKey::Environment => f.write_str("lxc.environment"),
            ConfigKey::StartAuto => f.write_str("lxc.start.auto"),
            ConfigKey::StartDelay => f.write_str("lxc.start.delay"),
            ConfigKey::StartOrder => f.write_str("lxc.start.order"),
            ConfigKey::Arch => f.write_str("lxc.arch"),
            ConfigKey::Migrated => f.write_str("lxd.migrated"),
            ConfigKey::Network { index, field } => {
                f.write_str("lxc.network")?;
                if let Some(index) = index {
                    write!(f, ".{index}")?;
                }
                if !field.is_empty() {
                    write!(f, ".{field}")?;
                }
                Ok(())
            }
            ConfigKey::Hook(name) => write!(f, "{HOOK_PREFIX}{name}"),
            ConfigKey::Other(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for ConfigKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
