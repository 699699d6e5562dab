//! Migration of stopped LXC containers into LXD.
//!
//! LXC describes a container with a flat, line-oriented config file; LXD
//! wants a structured object with config keys, named devices and profiles.
//! This library decides whether a container can be carried over and, if so,
//! what the LXD side should look like. Talking to LXC, LXD and the filesystem
//! goes through the traits in [`backend`].
//!
//! # Architecture
//!
//! - [`validate`]: Fixed list of checks that reject unsupported containers
//! - [`translate`]: Pure mapping from LXC config to [`target::TargetSpec`]
//!   - network devices, disk mounts, environment, autostart, architecture
//! - [`target`]: The LXD container model sent to the daemon
//! - [`migrate`]: Per-container workflow and fault-isolated batches
//! - [`backend`]: Source, target and filesystem collaborators
//! - [`report`]: Terminal rendering of batch results
//! - [`settings`]: Optional TOML settings file
//!
//! # Workflow
//!
//! 1. **Inspect** the container; running containers are refused
//! 2. **Parse** its config with `lxc-config`
//! 3. **Validate** the config and the LXD namespace
//! 4. **Translate** into a target spec (dry runs stop here)
//! 5. **Create** the container in LXD and **transfer** its rootfs
//! 6. **Mark** the source config so the container is never migrated twice
//!
//! # Examples
//!
//! ```ignore
//! use lxc_to_lxd::backend::{LxcTools, LxdQuery, Rsync};
//! use lxc_to_lxd::migrate::{MigrationOptions, Migrator};
//!
//! let options = MigrationOptions { dry_run: true, ..MigrationOptions::default() };
//! let migrator = Migrator::new(
//!     LxcTools::new("/var/lib/lxc", options.parse.clone()),
//!     LxdQuery::new("lxc", "/var/lib/lxd"),
//!     Rsync::default(),
//!     options,
//! );
//! let report = migrator.migrate_batch(["web", "db"]);
//! println!("failed: {}", report.failed());
//! ```

pub mod backend;
pub mod migrate;
pub mod report;
pub mod settings;
pub mod target;
pub mod translate;
pub mod validate;
