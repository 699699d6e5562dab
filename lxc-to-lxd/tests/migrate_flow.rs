use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use lxc_config::{parse_file_with_options, NetworkDevice, ParseOptions};
use lxc_to_lxd::backend::{ContainerSource, FsTransfer, TargetClient};
use lxc_to_lxd::migrate::{
    ContainerStatus, MigrationError, MigrationOptions, MigrationOutcome, Migrator, Step,
    TransferMode,
};
use lxc_to_lxd::target::TargetSpec;
use lxc_to_lxd::validate::ValidationFailure;
use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};

struct FakeLxc {
    lxcpath: PathBuf,
    running: BTreeSet<String>,
    deleted: RefCell<Vec<String>>,
}

impl ContainerSource for FakeLxc {
    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.lxcpath)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn is_running(&self, name: &str) -> Result<bool> {
        Ok(self.running.contains(name))
    }

    fn config_path(&self, name: &str) -> PathBuf {
        self.lxcpath.join(name).join("config")
    }

    fn network_devices(&self, name: &str) -> Result<Vec<NetworkDevice>> {
        let config = parse_file_with_options(&self.config_path(name), &ParseOptions::default())?;
        Ok(config.network_devices())
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.deleted.borrow_mut().push(name.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct FakeLxd {
    existing: RefCell<BTreeSet<String>>,
    created: RefCell<Vec<TargetSpec>>,
    fail_create: bool,
}

impl TargetClient for FakeLxd {
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.existing.borrow().contains(name))
    }

    fn create(&self, spec: &TargetSpec) -> Result<()> {
        if self.fail_create {
            bail!("operation failed: storage pool is full");
        }
        self.existing.borrow_mut().insert(spec.name.clone());
        self.created.borrow_mut().push(spec.clone());
        Ok(())
    }
}

/// LXD daemon that cannot be reached.
struct UnreachableLxd;

impl TargetClient for UnreachableLxd {
    fn exists(&self, _name: &str) -> Result<bool> {
        bail!("LXD daemon unreachable")
    }

    fn create(&self, _spec: &TargetSpec) -> Result<()> {
        bail!("LXD daemon unreachable")
    }
}

#[derive(Default)]
struct FakeTransfer {
    copies: RefCell<Vec<(PathBuf, PathBuf)>>,
    moves: RefCell<Vec<(PathBuf, PathBuf)>>,
}

impl FsTransfer for FakeTransfer {
    fn copy_tree(&self, src: &Path, dst: &Path) -> Result<()> {
        self.copies
            .borrow_mut()
            .push((src.to_path_buf(), dst.to_path_buf()));
        Ok(())
    }

    fn move_tree(&self, src: &Path, dst: &Path) -> Result<()> {
        self.moves
            .borrow_mut()
            .push((src.to_path_buf(), dst.to_path_buf()));
        Ok(())
    }
}

struct Host {
    dir: TempDir,
    lxc: FakeLxc,
}

impl Host {
    fn new() -> Self {
        let dir = tempdir().expect("tempdir");
        let lxcpath = dir.path().join("lxc");
        fs::create_dir_all(&lxcpath).expect("mkdir lxc");
        Self {
            lxc: FakeLxc {
                lxcpath,
                running: BTreeSet::new(),
                deleted: RefCell::new(Vec::new()),
            },
            dir,
        }
    }

    fn lxd_dir(&self) -> PathBuf {
        self.dir.path().join("lxd")
    }

    fn rootfs(&self, name: &str) -> PathBuf {
        self.lxc.lxcpath.join(name).join("rootfs")
    }

    /// Create a container with a rootfs and `extra` config lines.
    fn add(&self, name: &str, extra: &str) -> PathBuf {
        let rootfs = self.rootfs(name);
        fs::create_dir_all(&rootfs).expect("mkdir rootfs");
        let config = self.lxc.config_path(name);
        fs::write(
            &config,
            format!(
                "lxc.rootfs = {}\nlxc.utsname = {name}\n{extra}",
                rootfs.display()
            ),
        )
        .expect("write config");
        config
    }

    fn options(&self) -> MigrationOptions {
        MigrationOptions {
            lxd_dir: self.lxd_dir(),
            ..MigrationOptions::default()
        }
    }
}

const WEB_EXTRA: &str = "lxc.network.type = veth\n\
lxc.network.link = lxcbr0\n\
lxc.network.hwaddr = 00:16:3e:aa:bb:cc\n\
lxc.start.auto = 1\n\
lxc.arch = amd64\n";

#[test]
fn copies_rootfs_and_marks_source() {
    let host = Host::new();
    let config = host.add("web", WEB_EXTRA);
    let lxd = FakeLxd::default();
    let transfer = FakeTransfer::default();

    let migrator = Migrator::new(&host.lxc, &lxd, &transfer, host.options());
    let outcome = migrator.migrate("web").expect("migrate");

    assert!(matches!(outcome, MigrationOutcome::Migrated(_)));
    assert_eq!(lxd.created.borrow().len(), 1);
    assert_eq!(lxd.created.borrow()[0].name, "web");
    assert_eq!(
        transfer.copies.borrow().as_slice(),
        &[(
            host.rootfs("web"),
            host.lxd_dir().join("containers").join("web").join("rootfs")
        )]
    );
    assert!(transfer.moves.borrow().is_empty());

    let written = fs::read_to_string(&config).expect("read config");
    assert!(written.ends_with("lxd.migrated=true\n"), "{written}");
}

#[test]
fn second_run_stops_at_marker() {
    let host = Host::new();
    host.add("web", WEB_EXTRA);
    let lxd = FakeLxd::default();
    let transfer = FakeTransfer::default();
    let migrator = Migrator::new(&host.lxc, &lxd, &transfer, host.options());

    migrator.migrate("web").expect("first run");
    let err = migrator.migrate("web").expect_err("second run must abort");

    assert!(matches!(
        err,
        MigrationError::Validation(ValidationFailure::AlreadyMigrated)
    ));
    assert_eq!(lxd.created.borrow().len(), 1);
    assert_eq!(transfer.copies.borrow().len(), 1);
}

#[test]
fn marker_is_honored_without_contacting_lxd() {
    let host = Host::new();
    host.add("web", "lxd.migrated=true\n");
    let transfer = FakeTransfer::default();

    let err = Migrator::new(&host.lxc, UnreachableLxd, &transfer, host.options())
        .migrate("web")
        .expect_err("already migrated");
    assert!(matches!(
        err,
        MigrationError::Validation(ValidationFailure::AlreadyMigrated)
    ));
    assert_eq!(err.code(), "already_migrated");
}

#[test]
fn unreachable_lxd_fails_inspection_for_unmigrated_container() {
    let host = Host::new();
    host.add("web", "");
    let transfer = FakeTransfer::default();

    let err = Migrator::new(&host.lxc, UnreachableLxd, &transfer, host.options())
        .migrate("web")
        .expect_err("lxd unreachable");
    assert_eq!(err.code(), "inspect_failed");
    assert!(err.to_string().contains("LXD daemon unreachable"));
}

#[test]
fn dry_run_matches_real_spec_and_touches_nothing() {
    let host = Host::new();
    let config = host.add("web", WEB_EXTRA);
    let before = fs::read_to_string(&config).expect("read");

    let lxd = FakeLxd::default();
    let transfer = FakeTransfer::default();
    let options = MigrationOptions {
        dry_run: true,
        delete_source: true,
        transfer: TransferMode::Move,
        ..host.options()
    };
    let dry = Migrator::new(&host.lxc, &lxd, &transfer, options)
        .migrate("web")
        .expect("dry run");

    assert!(lxd.created.borrow().is_empty());
    assert!(transfer.copies.borrow().is_empty());
    assert!(transfer.moves.borrow().is_empty());
    assert!(host.lxc.deleted.borrow().is_empty());
    assert_eq!(fs::read_to_string(&config).expect("read"), before);

    let real = Migrator::new(&host.lxc, &lxd, &transfer, host.options())
        .migrate("web")
        .expect("real run");
    assert!(matches!(dry, MigrationOutcome::DryRun(_)));
    assert_eq!(dry.spec(), real.spec());
    assert_eq!(&lxd.created.borrow()[0], real.spec());
}

#[test]
fn running_container_is_refused_before_parsing() {
    let mut host = Host::new();
    let config = host.add("web", "");
    fs::write(&config, "this is not a config\n").expect("corrupt config");
    host.lxc.running.insert("web".to_string());

    let lxd = FakeLxd::default();
    let transfer = FakeTransfer::default();
    let err = Migrator::new(&host.lxc, &lxd, &transfer, host.options())
        .migrate("web")
        .expect_err("running container");
    assert!(matches!(
        err,
        MigrationError::Validation(ValidationFailure::ContainerRunning)
    ));
}

#[test]
fn existing_lxd_container_blocks_migration() {
    let host = Host::new();
    host.add("web", "");
    let lxd = FakeLxd::default();
    lxd.existing.borrow_mut().insert("web".to_string());
    let transfer = FakeTransfer::default();

    let err = Migrator::new(&host.lxc, &lxd, &transfer, host.options())
        .migrate("web")
        .expect_err("name clash");
    assert_eq!(err.code(), "name_taken");
    assert!(lxd.created.borrow().is_empty());
}

#[test]
fn failed_create_leaves_source_unmarked() {
    let host = Host::new();
    let config = host.add("web", "");
    let lxd = FakeLxd {
        fail_create: true,
        ..FakeLxd::default()
    };
    let transfer = FakeTransfer::default();

    let err = Migrator::new(&host.lxc, &lxd, &transfer, host.options())
        .migrate("web")
        .expect_err("create fails");
    assert!(matches!(
        err,
        MigrationError::External {
            step: Step::Create,
            ..
        }
    ));
    assert!(err.to_string().contains("storage pool is full"));
    assert!(transfer.copies.borrow().is_empty());
    assert!(!fs::read_to_string(&config)
        .expect("read")
        .contains("lxd.migrated"));
}

#[test]
fn move_mode_and_delete_source() {
    let host = Host::new();
    host.add("web", "");
    let lxd = FakeLxd::default();
    let transfer = FakeTransfer::default();
    let options = MigrationOptions {
        transfer: TransferMode::Move,
        delete_source: true,
        ..host.options()
    };

    Migrator::new(&host.lxc, &lxd, &transfer, options)
        .migrate("web")
        .expect("migrate");

    assert!(transfer.copies.borrow().is_empty());
    assert_eq!(transfer.moves.borrow().len(), 1);
    assert_eq!(host.lxc.deleted.borrow().as_slice(), &["web".to_string()]);
}

#[test]
fn malformed_mount_aborts_before_create() {
    let host = Host::new();
    host.add("web", "lxc.mount.entry = /srv/data srv/data\n");
    let lxd = FakeLxd::default();
    let transfer = FakeTransfer::default();

    let err = Migrator::new(&host.lxc, &lxd, &transfer, host.options())
        .migrate("web")
        .expect_err("malformed mount");
    assert_eq!(err.code(), "malformed_mount");
    assert!(lxd.created.borrow().is_empty());
}

#[test]
fn batch_continues_past_failures() {
    let mut host = Host::new();
    host.add("alpha", "lxc.hook.pre-start = /usr/local/bin/setup\n");
    host.add("bravo", WEB_EXTRA);
    host.add("charlie", "");
    host.lxc.running.insert("charlie".to_string());
    host.add("delta", "lxc.network.type = vlan\n");

    let lxd = FakeLxd::default();
    let transfer = FakeTransfer::default();
    let migrator = Migrator::new(&host.lxc, &lxd, &transfer, host.options());
    let names = host.lxc.list().expect("list");
    let report = migrator.migrate_batch(&names);

    let summary: Vec<(&str, &str)> = report
        .containers
        .iter()
        .map(|c| {
            let status = match &c.status {
                ContainerStatus::Migrated { .. } => "migrated",
                ContainerStatus::DryRun { .. } => "dry_run",
                ContainerStatus::Failed { code, .. } => code.as_str(),
            };
            (c.name.as_str(), status)
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("alpha", "hook_present"),
            ("bravo", "migrated"),
            ("charlie", "container_running"),
            ("delta", "unsupported_nic_type"),
        ]
    );
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 3);
}

#[test]
fn batch_report_serializes_with_status_tags() {
    let host = Host::new();
    host.add("web", WEB_EXTRA);
    let lxd = FakeLxd::default();
    let transfer = FakeTransfer::default();
    let options = MigrationOptions {
        dry_run: true,
        ..host.options()
    };
    let report = Migrator::new(&host.lxc, &lxd, &transfer, options).migrate_batch(["web", "ghost"]);

    let value = serde_json::to_value(&report).expect("serialize");
    let containers = value["containers"].as_array().expect("array");
    assert_eq!(containers[0]["name"], "web");
    assert_eq!(containers[0]["status"], "dry_run");
    assert_eq!(containers[0]["spec"]["devices"]["convert_net0"]["nictype"], "bridged");
    assert_eq!(containers[0]["spec"]["architecture"], "x86_64");
    assert_eq!(containers[1]["status"], "failed");
    assert_eq!(containers[1]["code"], "parse_error");
}
