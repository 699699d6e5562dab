//! LXD-side description of a migrated container.
//!
//! [`TargetSpec`] serializes to the JSON body LXD expects on
//! `POST /1.0/containers`. Device attributes are always emitted as strings
//! since LXD stores them as a flat string map.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Name of the profile every migrated container is attached to.
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetSpec {
    pub name: String,
    pub source: Source,
    pub config: BTreeMap<String, String>,
    pub devices: BTreeMap<String, Device>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<Architecture>,
    pub profiles: Vec<String>,
}

impl TargetSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: Source::default(),
            config: BTreeMap::new(),
            devices: BTreeMap::new(),
            architecture: None,
            profiles: vec![DEFAULT_PROFILE.to_string()],
        }
    }
}

/// Image source of the new container. Migrated containers have their
/// filesystem copied in separately, so this is always `none`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for Source {
    fn default() -> Self {
        Self {
            kind: "none".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Device {
    Nic(NicDevice),
    Disk(DiskDevice),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicDevice {
    pub nictype: NicType,
    pub hwaddr: Option<String>,
    pub parent: Option<String>,
    pub mtu: Option<u32>,
    pub name: Option<String>,
    pub host_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskDevice {
    pub source: String,
    pub path: String,
    pub readonly: bool,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NicType {
    Bridged,
    P2p,
    Physical,
    /// Types LXD spells the same way as LXC (`macvlan`, ...).
    Other(String),
}

impl NicType {
    pub fn as_str(&self) -> &str {
        match self {
            NicType::Bridged => "bridged",
            NicType::P2p => "p2p",
            NicType::Physical => "physical",
            NicType::Other(raw) => raw,
        }
    }
}

impl Display for NicType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Device {
    /// Flatten into the string map LXD stores per device.
    pub fn attributes(&self) -> BTreeMap<&'static str, String> {
        let mut out = BTreeMap::new();
        match self {
            Device::Nic(nic) => {
                out.insert("type", "nic".to_string());
                out.insert("nictype", nic.nictype.to_string());
                let optional = [
                    ("hwaddr", nic.hwaddr.clone()),
                    ("parent", nic.parent.clone()),
                    ("mtu", nic.mtu.map(|mtu| mtu.to_string())),
                    ("name", nic.name.clone()),
                    ("host_name", nic.host_name.clone()),
                ];
                for (key, value) in optional {
                    if let Some(value) = value {
                        out.insert(key, value);
                    }
                }
            }
            Device::Disk(disk) => {
                out.insert("type", "disk".to_string());
                out.insert("source", disk.source.clone());
                out.insert("path", disk.path.clone());
                if disk.readonly {
                    out.insert("readonly", "true".to_string());
                }
                if disk.optional {
                    out.insert("optional", "true".to_string());
                }
            }
        }
        out
    }
}

impl Serialize for Device {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let attrs = self.attributes();
        let mut map = serializer.serialize_map(Some(attrs.len()))?;
        for (key, value) in &attrs {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Architectures LXD accepts, by their LXD names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Architecture {
    #[serde(rename = "i686")]
    I686,
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "armv7l")]
    Armv7l,
    #[serde(rename = "aarch64")]
    Aarch64,
    #[serde(rename = "ppc")]
    Ppc,
    #[serde(rename = "ppc64")]
    Ppc64,
    #[serde(rename = "ppc64le")]
    Ppc64le,
    #[serde(rename = "s390x")]
    S390x,
}

impl Architecture {
    pub fn as_str(self) -> &'static str {
        match self {
            Architecture::I686 => "i686",
            Architecture::X86_64 => "x86_64",
            Architecture::Armv7l => "armv7l",
            Architecture::Aarch64 => "aarch64",
            Architecture::Ppc => "ppc",
            Architecture::Ppc64 => "ppc64",
            Architecture::Ppc64le => "ppc64le",
            Architecture::S390x => "s390x",
        }
    }
}

impl Display for Architecture {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
