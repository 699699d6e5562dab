//! Interfaces to the systems around the migration engine.
//!
//! The orchestrator only talks to LXC, LXD and the filesystem through these
//! traits. The default implementations drive the stock command-line tools
//! (`lxc-*`, `lxc query`, `rsync`); tests substitute in-memory fakes.

mod lxc;
mod lxd;
mod rsync;

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{bail, Context, Result};
use lxc_config::NetworkDevice;

use crate::target::TargetSpec;

pub use lxc::LxcTools;
pub use lxd::LxdQuery;
pub use rsync::Rsync;

/// Read and housekeeping access to the source LXC installation.
pub trait ContainerSource {
    /// Container names in the order LXC reports them.
    fn list(&self) -> Result<Vec<String>>;
    fn is_running(&self, name: &str) -> Result<bool>;
    fn config_path(&self, name: &str) -> PathBuf;
    /// Network entries of the container, one per declared interface.
    fn network_devices(&self, name: &str) -> Result<Vec<NetworkDevice>>;
    fn delete(&self, name: &str) -> Result<()>;
}

/// The LXD daemon receiving migrated containers.
pub trait TargetClient {
    fn exists(&self, name: &str) -> Result<bool>;
    /// Create the container and wait for the operation to finish.
    fn create(&self, spec: &TargetSpec) -> Result<()>;
}

/// Bulk root filesystem transfer.
///
/// Implementations must preserve ACLs, sparse files, numeric ownership and
/// hard links.
pub trait FsTransfer {
    fn copy_tree(&self, src: &Path, dst: &Path) -> Result<()>;
    /// Move `src` to `dst`, leaving an empty directory at `src`.
    fn move_tree(&self, src: &Path, dst: &Path) -> Result<()>;
}

impl<C: ContainerSource + ?Sized> ContainerSource for &C {
    fn list(&self) -> Result<Vec<String>> {
        (**self).list()
    }

    fn is_running(&self, name: &str) -> Result<bool> {
        (**self).is_running(name)
    }

    fn config_path(&self, name: &str) -> PathBuf {
        (**self).config_path(name)
    }

    fn network_devices(&self, name: &str) -> Result<Vec<NetworkDevice>> {
        (**self).network_devices(name)
    }

    fn delete(&self, name: &str) -> Result<()> {
        (**self).delete(name)
    }
}

impl<C: TargetClient + ?Sized> TargetClient for &C {
    fn exists(&self, name: &str) -> Result<bool> {
        (**self).exists(name)
    }

    fn create(&self, spec: &TargetSpec) -> Result<()> {
        (**self).create(spec)
    }
}

impl<C: FsTransfer + ?Sized> FsTransfer for &C {
    fn copy_tree(&self, src: &Path, dst: &Path) -> Result<()> {
        (**self).copy_tree(src, dst)
    }

    fn move_tree(&self, src: &Path, dst: &Path) -> Result<()> {
        (**self).move_tree(src, dst)
    }
}

/// Run a command to completion, failing on a non-zero exit.
pub(crate) fn run_checked(cmd: &mut Command) -> Result<Output> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    tracing::debug!(command = ?cmd, "running");
    let output = cmd
        .output()
        .with_context(|| format!("failed to run {program}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{program} exited with {}: {}", output.status, stderr.trim());
    }
    Ok(output)
}
