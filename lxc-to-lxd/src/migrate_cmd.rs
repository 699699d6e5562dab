use std::path::Path;

use anyhow::{bail, Context, Result};
use lxc_config::ParseOptions;
use lxc_to_lxd::backend::{ContainerSource, LxcTools, LxdQuery, Rsync};
use lxc_to_lxd::migrate::{MigrationOptions, Migrator, TransferMode};
use lxc_to_lxd::report::render_batch_text;
use lxc_to_lxd::settings::{load_settings, Settings, DEFAULT_SETTINGS_PATH};

use crate::cli::{Cli, OutputFormat};

pub fn run_migrate(args: Cli) -> Result<()> {
    let settings = resolve_settings(args.config.as_deref(), Path::new(DEFAULT_SETTINGS_PATH))?
        .resolve(args.lxcpath.clone(), args.lxdpath.clone());
    tracing::debug!(?settings, "resolved settings");

    let parse = ParseOptions {
        builtin_config_dir: settings.builtin_config_dir.clone(),
        ..ParseOptions::default()
    };
    let options = MigrationOptions {
        dry_run: args.dry_run,
        delete_source: args.delete,
        transfer: if args.move_rootfs {
            TransferMode::Move
        } else {
            TransferMode::Copy
        },
        lxd_dir: settings.lxdpath.clone(),
        parse: parse.clone(),
    };

    let migrator = Migrator::new(
        LxcTools::new(settings.lxcpath.clone(), parse),
        LxdQuery::new(settings.lxc_client.clone(), settings.lxdpath.clone()),
        Rsync::new(settings.rsync.clone()),
        options,
    );

    let names = if args.all {
        migrator.source().list().with_context(|| {
            format!("failed to list containers in {}", settings.lxcpath.display())
        })?
    } else {
        args.containers.clone()
    };

    let report = migrator.migrate_batch(&names);

    match args.format {
        OutputFormat::Text => println!("{}", render_batch_text(&report, args.debug)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if report.failed() > 0 {
        bail!(
            "migration failed for {} of {} containers",
            report.failed(),
            report.containers.len()
        );
    }
    Ok(())
}

/// An explicit settings file must load. The default one is optional and a
/// broken copy only warns.
fn resolve_settings(explicit: Option<&Path>, default_path: &Path) -> Result<Settings> {
    if let Some(path) = explicit {
        return load_settings(path)
            .with_context(|| format!("failed to load settings {}", path.display()));
    }

    if !default_path.exists() {
        return Ok(Settings::default());
    }
    match load_settings(default_path) {
        Ok(settings) => Ok(settings),
        Err(err) => {
            tracing::warn!("{err}; using built-in defaults");
            Ok(Settings::default())
        }
    }
}
