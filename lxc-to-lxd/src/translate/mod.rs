//! Mapping from a validated LXC config to an LXD [`TargetSpec`].
//!
//! Translation is pure: it only reads the parsed config and the resolved
//! network entries. The one hard failure is a mount line LXD can't express.

pub mod arch;
pub mod network;
pub mod storage;

use lxc_config::{ConfigKey, LxcConfig, NetworkDevice};
use thiserror::Error;

use crate::target::{Device, TargetSpec};
use crate::validate::NESTING_APPARMOR_PROFILE;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("invalid mount entry {index} '{line}': expected at least 4 fields")]
    MalformedMount { index: usize, line: String },
}

/// Translate one container.
pub fn translate(
    name: &str,
    config: &LxcConfig,
    network: &[NetworkDevice],
) -> Result<TargetSpec, TranslationError> {
    let mut spec = TargetSpec::new(name);

    // LXD has no way to express LXC's unprivileged setup, so everything that
    // reaches this point is privileged.
    spec.config
        .insert("security.privileged".to_string(), "true".to_string());

    for (dev_name, nic) in network::nic_devices(network) {
        spec.devices.insert(dev_name, Device::Nic(nic));
    }

    let rootfs = storage::rootfs_path(config);
    for (dev_name, disk) in storage::disk_devices(config, rootfs.as_deref())? {
        spec.devices.insert(dev_name, Device::Disk(disk));
    }

    apply_environment(&mut spec, config);
    apply_autostart(&mut spec, config);

    if config.first(&ConfigKey::AppArmorProfile) == Some(NESTING_APPARMOR_PROFILE) {
        spec.config
            .insert("security.nesting".to_string(), "true".to_string());
    }

    spec.architecture = match config.first(&ConfigKey::Arch) {
        Some(raw) => {
            let arch = arch::lookup(raw);
            if arch.is_none() {
                tracing::info!(
                    container = name,
                    arch = raw,
                    "unknown architecture; using the host's native architecture"
                );
            }
            arch
        }
        None => {
            tracing::info!(
                container = name,
                "no architecture set; using the host's native architecture"
            );
            None
        }
    };

    Ok(spec)
}

fn apply_environment(spec: &mut TargetSpec, config: &LxcConfig) {
    for raw in config.get(&ConfigKey::Environment).unwrap_or_default() {
        let Some((key, value)) = raw.split_once('=') else {
            tracing::warn!(entry = raw, "ignoring lxc.environment entry without '='");
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            tracing::warn!(entry = raw, "ignoring lxc.environment entry without a name");
            continue;
        }
        spec.config
            .insert(format!("environment.{key}"), value.trim().to_string());
    }
}

fn apply_autostart(spec: &mut TargetSpec, config: &LxcConfig) {
    if positive(config, &ConfigKey::StartAuto).is_some() {
        spec.config
            .insert("boot.autostart".to_string(), "true".to_string());
    }
    if let Some(delay) = positive(config, &ConfigKey::StartDelay) {
        spec.config
            .insert("boot.autostart.delay".to_string(), delay.to_string());
    }
    if let Some(order) = positive(config, &ConfigKey::StartOrder) {
        spec.config
            .insert("boot.autostart.priority".to_string(), order.to_string());
    }
}

/// First value of `key` as an integer, when it is greater than zero.
fn positive(config: &LxcConfig, key: &ConfigKey) -> Option<i64> {
    let raw = config.first(key)?.trim();
    match raw.parse::<i64>() {
        Ok(value) if value > 0 => Some(value),
        Ok(_) => None,
        Err(_) => {
            tracing::warn!(key = %key, value = raw, "ignoring non-numeric value");
            None
        }
    }
}
