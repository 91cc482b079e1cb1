//! Repository & worktree engine.
//!
//! Owns the on-disk layout, the create/delete state machines, and the
//! adoption of existing checkouts. All mutations go through the status
//! store's exclusive lock; any failure after the first filesystem step is
//! rolled back through an explicit [`UndoStack`].

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::config::Config;
use crate::errors::Error;
use crate::git::{GitDriver, RepoUrl};
use crate::status::{RemoteEntry, RepositoryEntry, StatusStore};

pub mod layout;

mod clone;
mod create;
mod delete;
mod doctor;
mod open;
mod undo;

pub use clone::ClonedRepository;
pub use create::CreatedWorktree;
pub use doctor::PruneReport;
pub(crate) use undo::UndoStack;

/// Engine over one config + store + git backend.
///
/// Cheap to construct; the façade builds one per operation.
pub struct RepoEngine<'a> {
    pub(crate) config: &'a Config,
    pub(crate) store: &'a StatusStore,
    pub(crate) git: &'a dyn GitDriver,
}

impl<'a> RepoEngine<'a> {
    pub fn new(config: &'a Config, store: &'a StatusStore, git: &'a dyn GitDriver) -> Self {
        Self { config, store, git }
    }

    /// Register an existing checkout in the status document.
    ///
    /// Called when an operation runs inside a git repository that is not yet
    /// managed. The entry is flagged `adopted` when the checkout lives
    /// outside `repositories-dir`, which keeps delete from touching it.
    pub fn adopt_repository(&self, repo_root: &Path) -> anyhow::Result<RepoUrl> {
        let root = dunce::canonicalize(repo_root)?;
        let origin_url = self.git.remote_url(&root, "origin")?;
        let url = RepoUrl::normalize(&origin_url)?;

        let default_branch = match self.git.default_branch(&root, "origin")? {
            Some(branch) => branch,
            None => self.git.current_branch(&root)?,
        };

        let adopted = !root.starts_with(&self.config.repositories_dir);
        self.store.mutate(|doc| {
            if doc.repositories.contains_key(url.as_str()) {
                return Ok(());
            }
            let mut remotes = IndexMap::new();
            remotes.insert(
                "origin".to_string(),
                RemoteEntry {
                    default_branch: default_branch.clone(),
                    extra: toml::Table::new(),
                },
            );
            doc.add_repository(
                &url,
                RepositoryEntry {
                    path: root.clone(),
                    adopted,
                    remotes,
                    worktrees: IndexMap::new(),
                    extra: toml::Table::new(),
                },
            )?;
            log::info!("registered repository {url} at {}", root.display());
            Ok(())
        })?;

        Ok(url)
    }

    /// Remote that operations act through: `origin` when known, else the
    /// first recorded remote.
    pub(crate) fn primary_remote(repo: &RepositoryEntry) -> String {
        if repo.remotes.contains_key("origin") {
            return "origin".to_string();
        }
        repo.remotes
            .keys()
            .next()
            .cloned()
            .unwrap_or_else(|| "origin".to_string())
    }

    pub(crate) fn validate_branch(branch: &str) -> Result<(), Error> {
        if branch.contains(':') {
            return Err(Error::BranchNameContainsColon {
                branch: branch.to_string(),
            });
        }
        Ok(())
    }

    /// Devcontainer repositories get standalone clones instead of linked
    /// worktrees: the container mounts the worktree directory and expects a
    /// real `.git` directory there, not a pointer file.
    pub(crate) fn devcontainer_present(repo_path: &Path) -> bool {
        repo_path.join(".devcontainer/devcontainer.json").is_file()
            || repo_path.join(".devcontainer.json").is_file()
    }

    pub(crate) fn worktree_dir(&self, url: &RepoUrl, remote: &str, branch: &str) -> PathBuf {
        layout::worktree_path(&self.config.repositories_dir, url, remote, branch)
    }
}
