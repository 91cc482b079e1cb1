//! Worktree and repository deletion.

use std::path::PathBuf;

use crate::errors::Error;
use crate::git::RepoUrl;
use crate::status::RepositoryEntry;

use super::{RepoEngine, layout};

impl RepoEngine<'_> {
    /// Delete the `(url, branch)` worktree and drop its status entry.
    ///
    /// A missing directory is tolerated: the entry is removed and the
    /// operation succeeds, which is how interrupted deletions are recovered.
    /// `force` is passed through to `git worktree remove`, allowing removal
    /// of trees with uncommitted changes.
    pub fn delete_worktree(&self, url: &RepoUrl, branch: &str, force: bool) -> anyhow::Result<PathBuf> {
        self.store.mutate(|doc| {
            let repo = doc
                .get_repository(url)
                .cloned()
                .ok_or_else(|| Error::RepositoryNotFound {
                    url: url.as_str().to_string(),
                })?;
            let remote = Self::primary_remote(&repo);
            let info = doc
                .find_worktree(url, &remote, branch)
                .cloned()
                .ok_or_else(|| Error::WorktreeNotInStatus {
                    url: url.as_str().to_string(),
                    branch: branch.to_string(),
                })?;

            let path = self.worktree_dir(url, &remote, branch);
            self.remove_worktree_files(&repo, info.detached, &path, force)?;
            doc.remove_worktree(url, &remote, branch)?;

            log::info!("deleted worktree for {branch} of {url}");
            Ok(path)
        })
    }

    /// Delete a repository: all of its worktrees, the primary clone (unless
    /// adopted), and the status entry. Refused while any workspace lists the
    /// repository as a member.
    pub fn delete_repository(&self, url: &RepoUrl, force: bool) -> anyhow::Result<()> {
        self.store.mutate(|doc| {
            if let Some(workspace) = doc.workspace_containing(url) {
                return Err(Error::RepositoryPartOfWorkspace {
                    url: url.as_str().to_string(),
                    workspace: workspace.to_string(),
                }
                .into());
            }
            let repo = doc
                .get_repository(url)
                .cloned()
                .ok_or_else(|| Error::RepositoryNotFound {
                    url: url.as_str().to_string(),
                })?;

            for info in repo.worktrees.values() {
                let path = self.worktree_dir(url, &info.remote, &info.branch);
                self.remove_worktree_files(&repo, info.detached, &path, force)?;
            }

            if !repo.adopted && repo.path.exists() {
                std::fs::remove_dir_all(&repo.path)?;
                if let Some(parent) = repo.path.parent() {
                    layout::prune_empty_parents(parent, &self.config.repositories_dir);
                }
            }

            doc.remove_repository(url)?;
            log::info!("deleted repository {url}");
            Ok(())
        })
    }

    fn remove_worktree_files(
        &self,
        repo: &RepositoryEntry,
        detached: bool,
        path: &std::path::Path,
        force: bool,
    ) -> anyhow::Result<()> {
        if path.exists() {
            if detached {
                std::fs::remove_dir_all(path)?;
            } else {
                self.git.worktree_remove(&repo.path, path, force)?;
                if path.exists() {
                    std::fs::remove_dir_all(path)?;
                }
            }
        } else if !detached && repo.path.exists() {
            // Directory vanished externally; drop git's stale record too.
            if let Err(e) = self.git.worktree_prune(&repo.path) {
                log::debug!("worktree prune failed: {e:#}");
            }
        }
        if let Some(parent) = path.parent() {
            layout::prune_empty_parents(parent, &self.config.repositories_dir);
        }
        Ok(())
    }
}
