use std::path::{Path, PathBuf};

use lxc_config::{ConfigKey, LxcConfig, MountEntry};

use super::TranslationError;
use crate::target::DiskDevice;

/// Storage backend prefix LXC accepts in front of a directory rootfs.
const DIR_BACKEND_PREFIX: &str = "dir:";

/// Host path of the container's root filesystem, if configured.
pub fn rootfs_path(config: &LxcConfig) -> Option<PathBuf> {
    let raw = config.first(&ConfigKey::Rootfs)?.trim();
    let raw = raw.strip_prefix(DIR_BACKEND_PREFIX).unwrap_or(raw);
    if raw.is_empty() {
        return None;
    }
    Some(PathBuf::from(raw))
}

/// Build one disk device per `lxc.mount.entry`, named `convert_mount{i}`.
pub fn disk_devices(
    config: &LxcConfig,
    rootfs: Option<&Path>,
) -> Result<Vec<(String, DiskDevice)>, TranslationError> {
    let mut out = Vec::new();
    for (index, (raw, entry)) in config.parsed_mount_entries().into_iter().enumerate() {
        let entry = entry.ok_or_else(|| TranslationError::MalformedMount {
            index,
            line: raw.to_string(),
        })?;
        out.push((format!("convert_mount{index}"), disk_device(&entry, rootfs)));
    }
    Ok(out)
}

fn disk_device(entry: &MountEntry, rootfs: Option<&Path>) -> DiskDevice {
    DiskDevice {
        source: entry.source.clone(),
        path: container_path(&entry.target, rootfs),
        readonly: entry.read_only(),
        optional: entry.optional(),
    }
}

/// Rewrite a mount target so it is relative to the container root.
///
/// LXC accepts targets relative to the rootfs (`srv/data`) and host-absolute
/// ones under the rootfs (`/var/lib/lxc/web/rootfs/srv/data`). LXD wants
/// `/srv/data` for both.
pub fn container_path(target: &str, rootfs: Option<&Path>) -> String {
    if !target.starts_with('/') {
        return format!("/{target}");
    }

    let stripped = rootfs.and_then(|root| Path::new(target).strip_prefix(root).ok());
    match stripped {
        Some(rel) => format!("/{}", rel.display()),
        None => target.to_string(),
    }
}
