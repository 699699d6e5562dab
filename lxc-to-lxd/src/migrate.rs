//! Per-container migration workflow.
//!
//! ## Pipeline
//!
//! 1. **Inspect** the source container; running containers are refused
//!    before their config is even read
//! 2. **Load** the effective config (includes and mount tables expanded) and
//!    stop if it already carries the migration marker
//! 3. **Validate** against the fixed check list (name clash,
//!    unsupported features)
//! 4. **Translate** into a [`TargetSpec`]; dry runs stop here
//! 5. **Create** the LXD container and wait for it
//! 6. **Transfer** the root filesystem (copy or move)
//! 7. **Delete** the source container if requested
//! 8. **Mark** the source config with `lxd.migrated=true`
//!
//! Nothing is rolled back. A failure after step 5 can leave an LXD container
//! behind that needs manual cleanup before the next run.

use std::fmt::{self, Display, Formatter};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use lxc_config::{parse_file_with_options, ParseError, ParseOptions};
use serde::Serialize;
use thiserror::Error;

use crate::backend::{ContainerSource, FsTransfer, TargetClient};
use crate::target::TargetSpec;
use crate::translate::storage::rootfs_path;
use crate::translate::{translate, TranslationError};
use crate::validate::{is_migrated, validate, ValidationContext, ValidationFailure};

/// Line appended to a source config once its container has been migrated.
pub const MIGRATION_MARKER: &str = "lxd.migrated=true";

/// Default LXD state directory.
pub const DEFAULT_LXD_DIR: &str = "/var/lib/lxd";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    /// Copy the rootfs, leaving the source untouched.
    #[default]
    Copy,
    /// Move the rootfs and leave an empty directory behind.
    Move,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOptions {
    pub dry_run: bool,
    pub delete_source: bool,
    pub transfer: TransferMode,
    pub lxd_dir: PathBuf,
    pub parse: ParseOptions,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            delete_source: false,
            transfer: TransferMode::Copy,
            lxd_dir: PathBuf::from(DEFAULT_LXD_DIR),
            parse: ParseOptions::default(),
        }
    }
}

/// External step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Inspect,
    Create,
    Transfer,
    Delete,
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Inspect => "inspect",
            Step::Create => "create",
            Step::Transfer => "transfer",
            Step::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to load config: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    #[error(transparent)]
    Translation(#[from] TranslationError),
    #[error("{step} failed: {source:#}")]
    External {
        step: Step,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to write migration marker to {}: {source}", .path.display())]
    Marker { path: PathBuf, source: io::Error },
}

impl MigrationError {
    /// Stable short identifier for reports.
    pub fn code(&self) -> &'static str {
        match self {
            MigrationError::Parse(_) => "parse_error",
            MigrationError::Validation(failure) => failure.code(),
            MigrationError::Translation(_) => "malformed_mount",
            MigrationError::External { step, .. } => match step {
                Step::Inspect => "inspect_failed",
                Step::Create => "create_failed",
                Step::Transfer => "transfer_failed",
                Step::Delete => "delete_failed",
            },
            MigrationError::Marker { .. } => "marker_failed",
        }
    }
}

fn external(step: Step) -> impl FnOnce(anyhow::Error) -> MigrationError {
    move |source| MigrationError::External { step, source }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Dry run: the spec that would have been submitted.
    DryRun(TargetSpec),
    Migrated(TargetSpec),
}

impl MigrationOutcome {
    pub fn spec(&self) -> &TargetSpec {
        match self {
            MigrationOutcome::DryRun(spec) | MigrationOutcome::Migrated(spec) => spec,
        }
    }
}

/// Drives the migration of containers from one LXC path into one LXD daemon.
pub struct Migrator<S, T, F> {
    source: S,
    target: T,
    transfer: F,
    options: MigrationOptions,
}

impl<S, T, F> Migrator<S, T, F>
where
    S: ContainerSource,
    T: TargetClient,
    F: FsTransfer,
{
    pub fn new(source: S, target: T, transfer: F, options: MigrationOptions) -> Self {
        Self {
            source,
            target,
            transfer,
            options,
        }
    }

    pub fn options(&self) -> &MigrationOptions {
        &self.options
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Where LXD keeps the root filesystem of container `name`.
    pub fn target_rootfs(&self, name: &str) -> PathBuf {
        self.options
            .lxd_dir
            .join("containers")
            .join(name)
            .join("rootfs")
    }

    /// Migrate a single container.
    pub fn migrate(&self, name: &str) -> Result<MigrationOutcome, MigrationError> {
        let _span = tracing::info_span!("container", name).entered();

        let running = self.source.is_running(name).map_err(external(Step::Inspect))?;
        if running {
            return Err(ValidationFailure::ContainerRunning.into());
        }

        let config_path = self.source.config_path(name);
        tracing::debug!(path = %config_path.display(), "loading config");
        let config = parse_file_with_options(&config_path, &self.options.parse)?;

        // The marker settles the container without asking LXD anything.
        if is_migrated(&config) {
            return Err(ValidationFailure::AlreadyMigrated.into());
        }

        let exists_in_target = self.target.exists(name).map_err(external(Step::Inspect))?;
        let network = self
            .source
            .network_devices(name)
            .map_err(external(Step::Inspect))?;

        validate(&ValidationContext {
            name,
            config: &config,
            running,
            exists_in_target,
            network: &network,
        })?;

        let spec = translate(name, &config, &network)?;
        if self.options.dry_run {
            tracing::info!("dry run; not creating container");
            return Ok(MigrationOutcome::DryRun(spec));
        }

        tracing::info!("creating LXD container");
        self.target.create(&spec).map_err(external(Step::Create))?;

        // Validation guarantees a rootfs; keep the error path anyway.
        let rootfs = rootfs_path(&config).ok_or(ValidationFailure::MissingRootfs)?;
        let dst = self.target_rootfs(name);
        tracing::info!(
            src = %rootfs.display(),
            dst = %dst.display(),
            mode = ?self.options.transfer,
            "transferring root filesystem"
        );
        match self.options.transfer {
            TransferMode::Copy => self.transfer.copy_tree(&rootfs, &dst),
            TransferMode::Move => self.transfer.move_tree(&rootfs, &dst),
        }
        .map_err(external(Step::Transfer))?;

        if self.options.delete_source {
            tracing::info!("deleting source container");
            self.source.delete(name).map_err(external(Step::Delete))?;
            // The config went with the container; there is nothing left to mark.
            return Ok(MigrationOutcome::Migrated(spec));
        }

        write_marker(&config_path)?;
        Ok(MigrationOutcome::Migrated(spec))
    }

    /// Migrate `names` in order. A failure only affects its own container.
    pub fn migrate_batch<I>(&self, names: I) -> BatchReport
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut report = BatchReport::default();
        for name in names {
            let name = name.as_ref();
            tracing::info!(container = name, "processing container");
            let status = match self.migrate(name) {
                Ok(MigrationOutcome::DryRun(spec)) => ContainerStatus::DryRun { spec },
                Ok(MigrationOutcome::Migrated(spec)) => ContainerStatus::Migrated { spec },
                Err(err) => {
                    tracing::warn!(container = name, "skipping: {err}");
                    ContainerStatus::Failed {
                        code: err.code().to_string(),
                        reason: err.to_string(),
                    }
                }
            };
            report.containers.push(ContainerReport {
                name: name.to_string(),
                status,
            });
        }
        report
    }
}

/// Append the migration marker, starting a new line if needed.
pub fn write_marker(path: &Path) -> Result<(), MigrationError> {
    let marker_err = |source| MigrationError::Marker {
        path: path.to_path_buf(),
        source,
    };
    let existing = fs::read(path).map_err(marker_err)?;
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(marker_err)?;
    let prefix = if existing.is_empty() || existing.ends_with(b"\n") {
        ""
    } else {
        "\n"
    };
    writeln!(file, "{prefix}{MIGRATION_MARKER}").map_err(marker_err)?;
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub containers: Vec<ContainerReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.containers
            .iter()
            .filter(|c| !matches!(c.status, ContainerStatus::Failed { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.containers.len() - self.succeeded()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerReport {
    pub name: String,
    #[serde(flatten)]
    pub status: ContainerStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContainerStatus {
    Migrated { spec: TargetSpec },
    DryRun { spec: TargetSpec },
    Failed { code: String, reason: String },
}
