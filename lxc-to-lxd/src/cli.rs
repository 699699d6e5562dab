use std::path::PathBuf;

use clap::{ArgGroup, Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "lxc-to-lxd")]
#[command(about = "Migrate stopped LXC containers into LXD")]
#[command(group(
    ArgGroup::new("selection")
        .required(true)
        .args(["containers", "all"])
))]
pub struct Cli {
    /// Containers to migrate.
    #[arg(long, num_args = 1.., value_name = "NAME")]
    pub containers: Vec<String>,
    /// Migrate every container found in the LXC path.
    #[arg(long)]
    pub all: bool,
    /// Alternate LXC path.
    #[arg(long)]
    pub lxcpath: Option<PathBuf>,
    /// Alternate LXD path.
    #[arg(long)]
    pub lxdpath: Option<PathBuf>,
    /// Settings file (defaults to /etc/lxc-to-lxd.toml when present).
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Translate and report without creating anything.
    #[arg(long)]
    pub dry_run: bool,
    /// Print debugging output.
    #[arg(long)]
    pub debug: bool,
    /// Delete the source container after a successful migration.
    #[arg(long)]
    pub delete: bool,
    /// Move the rootfs instead of copying it.
    #[arg(long)]
    pub move_rootfs: bool,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
