use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};

use super::{run_checked, TargetClient};
use crate::target::TargetSpec;

const CONTAINERS_ENDPOINT: &str = "/1.0/containers";

/// [`TargetClient`] that talks to LXD through `lxc query`.
///
/// The daemon is selected with `LXD_DIR`, so pointing at a non-default LXD
/// installation only needs a different `lxd_dir`.
#[derive(Debug, Clone)]
pub struct LxdQuery {
    client: String,
    lxd_dir: PathBuf,
}

impl LxdQuery {
    pub fn new(client: impl Into<String>, lxd_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: client.into(),
            lxd_dir: lxd_dir.into(),
        }
    }

    fn query(&self) -> Command {
        let mut cmd = Command::new(&self.client);
        cmd.env("LXD_DIR", &self.lxd_dir).arg("query");
        cmd
    }
}

impl TargetClient for LxdQuery {
    fn exists(&self, name: &str) -> Result<bool> {
        let output = run_checked(self.query().arg(CONTAINERS_ENDPOINT))?;
        let urls: Vec<String> = serde_json::from_slice(&output.stdout)
            .context("unexpected response listing LXD containers")?;
        Ok(contains_container(&urls, name))
    }

    fn create(&self, spec: &TargetSpec) -> Result<()> {
        let body = serde_json::to_string(spec).context("failed to encode container spec")?;
        run_checked(self.query().args([
            "--wait",
            "-X",
            "POST",
            "-d",
            body.as_str(),
            CONTAINERS_ENDPOINT,
        ]))
        .with_context(|| format!("failed to create LXD container {}", spec.name))?;
        Ok(())
    }
}

fn contains_container(urls: &[String], name: &str) -> bool {
    urls.iter().any(|url| {
        url.strip_prefix(CONTAINERS_ENDPOINT)
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|rest| rest.split('?').next() == Some(name))
    })
}
