//! IDE launcher capability.
//!
//! The engine only needs "open path P in editor E". The system launcher
//! resolves known editor names on PATH and spawns them detached; arbor
//! does not manage editor lifetimes. The special name `dummy` records the
//! request instead of launching anything, which makes the launcher
//! observable from tests.

use std::path::Path;
use std::process::Command;

use crate::errors::Error;
use crate::exec;

/// Environment variable read by the `dummy` editor: when set, each open
/// request is appended to the file it names.
pub const DUMMY_IDE_LOG_ENV: &str = "ARBOR_DUMMY_IDE_LOG";

/// Editors the system launcher knows how to start.
const KNOWN_EDITORS: &[&str] = &[
    "code",
    "code-insiders",
    "codium",
    "cursor",
    "emacs",
    "idea",
    "nvim",
    "subl",
    "vim",
    "zed",
];

pub trait IdeLauncher: Send + Sync {
    /// Open `path` in the editor named `ide`.
    fn open(&self, ide: &str, path: &Path) -> anyhow::Result<()>;
}

/// Launcher backed by editors installed on this machine.
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl IdeLauncher for SystemLauncher {
    fn open(&self, ide: &str, path: &Path) -> anyhow::Result<()> {
        if ide == "dummy" {
            log::info!("dummy IDE: open {}", path.display());
            if let Ok(log_path) = std::env::var(DUMMY_IDE_LOG_ENV) {
                use std::io::Write;
                let mut file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(log_path)?;
                writeln!(file, "{}", path.display())?;
            }
            return Ok(());
        }

        if !KNOWN_EDITORS.contains(&ide) {
            return Err(Error::UnsupportedIde {
                name: ide.to_string(),
            }
            .into());
        }
        let executable = which::which(ide).map_err(|_| Error::UnsupportedIde {
            name: ide.to_string(),
        })?;

        let mut cmd = Command::new(executable);
        cmd.arg(path);
        exec::spawn_detached(&mut cmd, None)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_ide_rejected() {
        let launcher = SystemLauncher::new();
        let err = launcher.open("not-an-editor", Path::new("/tmp")).unwrap_err();
        let err = err.downcast_ref::<Error>().expect("domain error");
        assert!(matches!(err, Error::UnsupportedIde { .. }));
    }

    #[test]
    fn test_dummy_ide_succeeds() {
        let launcher = SystemLauncher::new();
        launcher.open("dummy", Path::new("/tmp")).unwrap();
    }
}
