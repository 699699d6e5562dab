use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use lxc_config::{parse_file_with_options, NetworkDevice, ParseOptions};

use super::{run_checked, ContainerSource};

/// [`ContainerSource`] backed by the `lxc-ls`, `lxc-info` and `lxc-destroy`
/// tools, scoped to one LXC path.
#[derive(Debug, Clone)]
pub struct LxcTools {
    lxcpath: PathBuf,
    parse_opts: ParseOptions,
}

impl LxcTools {
    pub fn new(lxcpath: impl Into<PathBuf>, parse_opts: ParseOptions) -> Self {
        Self {
            lxcpath: lxcpath.into(),
            parse_opts,
        }
    }

    fn tool(&self, program: &str) -> Command {
        let mut cmd = Command::new(program);
        cmd.arg("-P").arg(&self.lxcpath);
        cmd
    }
}

impl ContainerSource for LxcTools {
    fn list(&self) -> Result<Vec<String>> {
        let output = run_checked(self.tool("lxc-ls").arg("-1"))?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToOwned::to_owned)
            .collect())
    }

    fn is_running(&self, name: &str) -> Result<bool> {
        let output = run_checked(self.tool("lxc-info").args(["-n", name, "-s", "-H"]))?;
        let state = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::debug!(container = name, state = %state, "lxc state");
        Ok(state != "STOPPED")
    }

    fn config_path(&self, name: &str) -> PathBuf {
        self.lxcpath.join(name).join("config")
    }

    fn network_devices(&self, name: &str) -> Result<Vec<NetworkDevice>> {
        let path = self.config_path(name);
        let config = parse_file_with_options(&path, &self.parse_opts)
            .with_context(|| format!("failed to load {}", path.display()))?;
        Ok(config.network_devices())
    }

    fn delete(&self, name: &str) -> Result<()> {
        run_checked(self.tool("lxc-destroy").args(["-n", name]))?;
        Ok(())
    }
}
