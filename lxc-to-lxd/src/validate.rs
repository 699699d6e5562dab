//! Pre-migration checks.
//!
//! Every container goes through the same fixed list of checks before it is
//! translated. The first failing check aborts that container; the reason is
//! reported and the batch moves on.

use lxc_config::{ConfigKey, LxcConfig, NetworkDevice};
use thiserror::Error;

use crate::translate::storage::rootfs_path;

/// AppArmor profiles LXD can reproduce.
pub const DEFAULT_APPARMOR_PROFILE: &str = "lxc-container-default";
pub const NESTING_APPARMOR_PROFILE: &str = "lxc-container-default-with-nesting";

/// Everything the checks look at for one container.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub name: &'a str,
    pub config: &'a LxcConfig,
    pub running: bool,
    pub exists_in_target: bool,
    pub network: &'a [NetworkDevice],
}

/// Why a container cannot be migrated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("container is running; stop it before migrating")]
    ContainerRunning,
    #[error("container has already been migrated (lxd.migrated is set)")]
    AlreadyMigrated,
    #[error("a container named '{name}' already exists in LXD")]
    NameTaken { name: String },
    #[error("container name '{name}' doesn't match lxc.utsname '{hostname}'")]
    HostnameMismatch { name: String, hostname: String },
    #[error("unprivileged containers (lxc.id_map) aren't supported")]
    Unprivileged,
    #[error("hook scripts aren't supported ({key})")]
    HookPresent { key: String },
    #[error("lxc.rootfs is not set")]
    MissingRootfs,
    #[error("rootfs path {path} doesn't exist")]
    RootfsNotFound { path: String },
    #[error("network {index}: static IPv4 configuration isn't supported")]
    StaticIpv4 { index: usize },
    #[error("network {index}: static IPv6 configuration isn't supported")]
    StaticIpv6 { index: usize },
    #[error("network {index}: network up/down scripts aren't supported")]
    NetworkScript { index: usize },
    #[error("network {index}: network mode '{nic_type}' isn't supported")]
    UnsupportedNicType { index: usize, nic_type: String },
    #[error("custom AppArmor profile '{profile}' isn't supported")]
    CustomAppArmorProfile { profile: String },
    #[error("custom seccomp policies aren't supported")]
    SeccompPolicy,
    #[error("custom SELinux contexts aren't supported")]
    SelinuxContext,
    #[error("custom capability sets ({key}) aren't supported")]
    CapabilityOverride { key: String },
}

impl ValidationFailure {
    /// Stable short identifier for reports.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationFailure::ContainerRunning => "container_running",
            ValidationFailure::AlreadyMigrated => "already_migrated",
            ValidationFailure::NameTaken { .. } => "name_taken",
            ValidationFailure::HostnameMismatch { .. } => "hostname_mismatch",
            ValidationFailure::Unprivileged => "unprivileged",
            ValidationFailure::HookPresent { .. } => "hook_present",
            ValidationFailure::MissingRootfs => "missing_rootfs",
            ValidationFailure::RootfsNotFound { .. } => "rootfs_not_found",
            ValidationFailure::StaticIpv4 { .. } => "static_ipv4",
            ValidationFailure::StaticIpv6 { .. } => "static_ipv6",
            ValidationFailure::NetworkScript { .. } => "network_script",
            ValidationFailure::UnsupportedNicType { .. } => "unsupported_nic_type",
            ValidationFailure::CustomAppArmorProfile { .. } => "custom_apparmor_profile",
            ValidationFailure::SeccompPolicy => "seccomp_policy",
            ValidationFailure::SelinuxContext => "selinux_context",
            ValidationFailure::CapabilityOverride { .. } => "capability_override",
        }
    }
}

type Check = fn(&ValidationContext<'_>) -> Result<(), ValidationFailure>;

// Order matters: the first failure is the one reported.
const CHECKS: &[(&str, Check)] = &[
    ("stopped", check_stopped),
    ("not_migrated", check_not_migrated),
    ("name_unique", check_name_unique),
    ("hostname", check_hostname),
    ("privileged", check_privileged),
    ("hooks", check_hooks),
    ("rootfs", check_rootfs),
    ("network", check_network),
    ("apparmor", check_apparmor),
    ("seccomp", check_seccomp),
    ("selinux", check_selinux),
    ("capabilities", check_capabilities),
];

/// Run every check in order, stopping at the first failure.
pub fn validate(ctx: &ValidationContext<'_>) -> Result<(), ValidationFailure> {
    for (id, check) in CHECKS {
        tracing::debug!(container = ctx.name, check = *id, "validating");
        check(ctx)?;
    }
    Ok(())
}

/// True when the migration marker is present with a truthy value.
pub fn is_migrated(config: &LxcConfig) -> bool {
    config
        .get(&ConfigKey::Migrated)
        .unwrap_or_default()
        .into_iter()
        .any(is_truthy)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

fn check_stopped(ctx: &ValidationContext<'_>) -> Result<(), ValidationFailure> {
    if ctx.running {
        return Err(ValidationFailure::ContainerRunning);
    }
    Ok(())
}

fn check_not_migrated(ctx: &ValidationContext<'_>) -> Result<(), ValidationFailure> {
    if is_migrated(ctx.config) {
        return Err(ValidationFailure::AlreadyMigrated);
    }
    Ok(())
}

fn check_name_unique(ctx: &ValidationContext<'_>) -> Result<(), ValidationFailure> {
    if ctx.exists_in_target {
        return Err(ValidationFailure::NameTaken {
            name: ctx.name.to_string(),
        });
    }
    Ok(())
}

fn check_hostname(ctx: &ValidationContext<'_>) -> Result<(), ValidationFailure> {
    match ctx.config.first(&ConfigKey::Hostname) {
        Some(hostname) if hostname != ctx.name => Err(ValidationFailure::HostnameMismatch {
            name: ctx.name.to_string(),
            hostname: hostname.to_string(),
        }),
        _ => Ok(()),
    }
}

fn check_privileged(ctx: &ValidationContext<'_>) -> Result<(), ValidationFailure> {
    if ctx.config.contains(&ConfigKey::IdMap) {
        return Err(ValidationFailure::Unprivileged);
    }
    Ok(())
}

fn check_hooks(ctx: &ValidationContext<'_>) -> Result<(), ValidationFailure> {
    if let Some(line) = ctx.config.any_key(ConfigKey::is_hook) {
        return Err(ValidationFailure::HookPresent {
            key: line.key.to_string(),
        });
    }
    Ok(())
}

fn check_rootfs(ctx: &ValidationContext<'_>) -> Result<(), ValidationFailure> {
    let path = rootfs_path(ctx.config).ok_or(ValidationFailure::MissingRootfs)?;
    if !path.exists() {
        return Err(ValidationFailure::RootfsNotFound {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

fn check_network(ctx: &ValidationContext<'_>) -> Result<(), ValidationFailure> {
    for (index, dev) in ctx.network.iter().enumerate() {
        if !dev.ipv4.is_empty() || dev.ipv4_gateway.is_some() {
            return Err(ValidationFailure::StaticIpv4 { index });
        }
        if !dev.ipv6.is_empty() || dev.ipv6_gateway.is_some() {
            return Err(ValidationFailure::StaticIpv6 { index });
        }
        if dev.script_up.is_some() || dev.script_down.is_some() {
            return Err(ValidationFailure::NetworkScript { index });
        }
        if matches!(dev.nic_type.trim(), "" | "none" | "vlan") {
            return Err(ValidationFailure::UnsupportedNicType {
                index,
                nic_type: dev.nic_type.clone(),
            });
        }
    }
    Ok(())
}

fn check_apparmor(ctx: &ValidationContext<'_>) -> Result<(), ValidationFailure> {
    match ctx.config.first(&ConfigKey::AppArmorProfile) {
        Some(profile)
            if profile != DEFAULT_APPARMOR_PROFILE && profile != NESTING_APPARMOR_PROFILE =>
        {
            Err(ValidationFailure::CustomAppArmorProfile {
                profile: profile.to_string(),
            })
        }
        _ => Ok(()),
    }
}

fn check_seccomp(ctx: &ValidationContext<'_>) -> Result<(), ValidationFailure> {
    if ctx.config.contains(&ConfigKey::Seccomp) {
        return Err(ValidationFailure::SeccompPolicy);
    }
    Ok(())
}

fn check_selinux(ctx: &ValidationContext<'_>) -> Result<(), ValidationFailure> {
    if ctx.config.contains(&ConfigKey::SelinuxContext) {
        return Err(ValidationFailure::SelinuxContext);
    }
    Ok(())
}

fn check_capabilities(ctx: &ValidationContext<'_>) -> Result<(), ValidationFailure> {
    if let Some(line) = ctx
        .config
        .any_key(|key| matches!(key, ConfigKey::CapDrop | ConfigKey::CapKeep))
    {
        return Err(ValidationFailure::CapabilityOverride {
            key: line.key.to_string(),
        });
    }
    Ok(())
}
