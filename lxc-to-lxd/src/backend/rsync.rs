use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

use super::{run_checked, FsTransfer};

/// [`FsTransfer`] that copies with rsync and moves with a rename.
#[derive(Debug, Clone)]
pub struct Rsync {
    program: String,
}

impl Rsync {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Rsync {
    fn default() -> Self {
        Self::new("rsync")
    }
}

impl FsTransfer for Rsync {
    fn copy_tree(&self, src: &Path, dst: &Path) -> Result<()> {
        fs::create_dir_all(dst).with_context(|| format!("failed to create {}", dst.display()))?;
        run_checked(
            Command::new(&self.program)
                .args(["-a", "--acls", "--sparse", "--numeric-ids", "--hard-links"])
                .arg(with_trailing_slash(src))
                .arg(with_trailing_slash(dst)),
        )
        .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()))?;
        Ok(())
    }

    fn move_tree(&self, src: &Path, dst: &Path) -> Result<()> {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::rename(src, dst)
            .with_context(|| format!("failed to move {} to {}", src.display(), dst.display()))?;
        fs::create_dir(src).with_context(|| format!("failed to recreate {}", src.display()))?;
        Ok(())
    }
}

// rsync copies directory contents only when the source ends in '/'.
fn with_trailing_slash(path: &Path) -> OsString {
    let mut raw = path.as_os_str().to_os_string();
    if !path.as_os_str().to_string_lossy().ends_with('/') {
        raw.push("/");
    }
    raw
}
