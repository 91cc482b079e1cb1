//! Operating-mode resolution.
//!
//! Commands that are not explicitly workspace-scoped classify their working
//! directory: inside a git repository they address that repository's status
//! entry; a directory holding exactly one `*.code-workspace` file acts as
//! that workspace; anything else is an error. The directory is always an
//! explicit parameter; nothing here reads or changes process CWD.

use std::path::Path;

use crate::errors::Error;
use crate::git::{GitDriver, RepoUrl};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Inside a managed (or adoptable) repository.
    Repository {
        url: RepoUrl,
        root: std::path::PathBuf,
    },
    /// Addressing a named workspace.
    Workspace { name: String },
}

/// Classify `cwd`, honoring an explicit workspace argument first.
pub fn resolve(
    cwd: &Path,
    workspace_arg: Option<&str>,
    git: &dyn GitDriver,
) -> anyhow::Result<Mode> {
    if let Some(name) = workspace_arg {
        return Ok(Mode::Workspace {
            name: name.to_string(),
        });
    }

    if let Some(root) = find_repository_root(cwd) {
        let origin = git.remote_url(&root, "origin")?;
        let url = RepoUrl::normalize(&origin)?;
        return Ok(Mode::Repository { url, root });
    }

    if let Some(name) = single_workspace_file(cwd)? {
        return Ok(Mode::Workspace { name });
    }

    Err(Error::NoGitRepositoryOrWorkspaceFound {
        path: cwd.to_path_buf(),
    }
    .into())
}

/// Walk upward from `start` looking for a `.git` entry (directory for
/// normal clones, file for linked worktrees).
pub fn find_repository_root(start: &Path) -> Option<std::path::PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// When `dir` holds exactly one `*.code-workspace` file, treat it as an
/// ephemeral workspace named after the file's stem.
fn single_workspace_file(dir: &Path) -> anyhow::Result<Option<String>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    let mut found: Option<String> = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if let Some(stem) = name.strip_suffix(".code-workspace") {
            if found.is_some() {
                return Ok(None);
            }
            found = Some(stem.to_string());
        }
    }
    Ok(found)
}
