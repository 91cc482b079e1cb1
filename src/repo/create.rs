//! Worktree creation.
//!
//! The whole operation runs under the status store's exclusive lock:
//!
//! ```text
//! validate → lock → resolve source → create dirs → worktree add (or
//! standalone clone) → set upstream → persist status → unlock
//! ```
//!
//! Any failure after the first filesystem step unwinds the [`UndoStack`];
//! the status addition itself is discarded by the store when the mutation
//! closure returns an error.

use std::path::{Path, PathBuf};

use crate::errors::Error;
use crate::git::RepoUrl;
use crate::status::{IssueRef, RepositoryEntry, StatusDocument, WorktreeInfo};

use super::{RepoEngine, UndoStack, layout};

/// A successfully created worktree.
#[derive(Debug, Clone)]
pub struct CreatedWorktree {
    pub path: PathBuf,
    pub branch: String,
    pub detached: bool,
}

/// Where a new worktree's branch comes from.
///
/// Selection order: an existing local branch wins, then a remote branch of
/// the same name, then the remote's recorded default branch. The default is
/// taken from the remote-tracking ref, not the local checkout, so new
/// branches are insulated from local drift.
enum BranchSource {
    Local,
    RemoteTracking(String),
    DefaultBranch(String),
}

impl BranchSource {
    fn start_point(&self) -> Option<&str> {
        match self {
            BranchSource::Local => None,
            BranchSource::RemoteTracking(start) | BranchSource::DefaultBranch(start) => {
                Some(start)
            }
        }
    }
}

impl RepoEngine<'_> {
    /// Create the `(url, branch)` worktree and record it in the status
    /// document.
    pub fn create_worktree(
        &self,
        url: &RepoUrl,
        branch: &str,
        issue: Option<IssueRef>,
    ) -> anyhow::Result<CreatedWorktree> {
        Self::validate_branch(branch)?;
        self.store.mutate(|doc| {
            let mut undo = UndoStack::new();
            match self.create_locked(doc, url, branch, issue, &mut undo) {
                Ok(created) => Ok(created),
                Err(e) => {
                    undo.unwind();
                    Err(e)
                }
            }
        })
    }

    fn create_locked<'u>(
        &'u self,
        doc: &mut StatusDocument,
        url: &RepoUrl,
        branch: &str,
        issue: Option<IssueRef>,
        undo: &mut UndoStack<'u>,
    ) -> anyhow::Result<CreatedWorktree> {
        let repo = doc
            .get_repository(url)
            .cloned()
            .ok_or_else(|| Error::RepositoryNotFound {
                url: url.as_str().to_string(),
            })?;
        let remote = Self::primary_remote(&repo);

        let target = self.worktree_dir(url, &remote, branch);
        if doc.find_worktree(url, &remote, branch).is_some() || target.exists() {
            return Err(Error::WorktreeExists {
                url: url.as_str().to_string(),
                branch: branch.to_string(),
            }
            .into());
        }

        let source = self.resolve_source(&repo, &remote, branch)?;
        let detached = Self::devcontainer_present(&repo.path);

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
            let parent = parent.to_path_buf();
            let base = self.config.repositories_dir.clone();
            undo.push("prune layout directories", move || {
                layout::prune_empty_parents(&parent, &base);
                Ok(())
            });
        }

        if detached {
            self.create_detached(&repo, &remote, branch, &target, &source, undo)?;
        } else {
            self.create_linked(&repo, &remote, branch, &target, &source, undo)?;
        }

        doc.add_worktree(
            url,
            WorktreeInfo {
                remote: remote.clone(),
                branch: branch.to_string(),
                detached,
                issue,
                extra: toml::Table::new(),
            },
        )?;

        log::info!("created worktree for {branch} of {url} at {}", target.display());
        Ok(CreatedWorktree {
            path: target,
            branch: branch.to_string(),
            detached,
        })
    }

    fn resolve_source(
        &self,
        repo: &RepositoryEntry,
        remote: &str,
        branch: &str,
    ) -> anyhow::Result<BranchSource> {
        if self.git.local_branch_exists(&repo.path, branch)? {
            return Ok(BranchSource::Local);
        }

        // Refresh remote-tracking refs so "exists on the remote" means now,
        // not whenever the last fetch happened.
        if let Err(e) = self.git.fetch(&repo.path, remote) {
            log::debug!("fetch {remote} failed, using cached refs: {e:#}");
        }
        if self.git.remote_branch_exists(&repo.path, remote, branch)? {
            return Ok(BranchSource::RemoteTracking(format!("{remote}/{branch}")));
        }

        let default_branch = match repo.remotes.get(remote) {
            Some(entry) => entry.default_branch.clone(),
            None => self.git.current_branch(&repo.path)?,
        };
        if self
            .git
            .remote_branch_exists(&repo.path, remote, &default_branch)?
        {
            Ok(BranchSource::DefaultBranch(format!(
                "{remote}/{default_branch}"
            )))
        } else {
            Ok(BranchSource::DefaultBranch(default_branch))
        }
    }

    fn create_linked<'u>(
        &'u self,
        repo: &RepositoryEntry,
        remote: &str,
        branch: &str,
        target: &Path,
        source: &BranchSource,
        undo: &mut UndoStack<'u>,
    ) -> anyhow::Result<()> {
        let primary = repo.path.clone();

        if let Some(start) = source.start_point() {
            let git = self.git;
            let primary_for_undo = primary.clone();
            let branch_for_undo = branch.to_string();
            undo.push("delete created branch", move || {
                if git.local_branch_exists(&primary_for_undo, &branch_for_undo)? {
                    git.delete_branch(&primary_for_undo, &branch_for_undo, true)?;
                }
                Ok(())
            });
            {
                let git = self.git;
                let primary_for_undo = primary.clone();
                let target_for_undo = target.to_path_buf();
                undo.push("remove worktree directory", move || {
                    if target_for_undo.exists() {
                        std::fs::remove_dir_all(&target_for_undo)?;
                    }
                    git.worktree_prune(&primary_for_undo)?;
                    Ok(())
                });
            }
            self.git.worktree_add_new(&primary, target, branch, start)?;
        } else {
            let git = self.git;
            let primary_for_undo = primary.clone();
            let target_for_undo = target.to_path_buf();
            undo.push("remove worktree directory", move || {
                if target_for_undo.exists() {
                    std::fs::remove_dir_all(&target_for_undo)?;
                }
                git.worktree_prune(&primary_for_undo)?;
                Ok(())
            });
            self.git.worktree_add(&primary, target, branch)?;
        }

        {
            let git = self.git;
            let primary_for_undo = primary.clone();
            let target_for_undo = target.to_path_buf();
            undo.push("unregister worktree", move || {
                if target_for_undo.exists() {
                    git.worktree_remove(&primary_for_undo, &target_for_undo, true)?;
                }
                Ok(())
            });
        }

        // Upstream is best-effort: the remote branch may not exist yet.
        if self.git.remote_branch_exists(&primary, remote, branch)? {
            if let Err(e) = self.git.set_upstream(target, remote, branch) {
                log::debug!("not setting upstream for {branch}: {e:#}");
            }
        }

        Ok(())
    }

    fn create_detached<'u>(
        &'u self,
        repo: &RepositoryEntry,
        remote: &str,
        branch: &str,
        target: &Path,
        source: &BranchSource,
        undo: &mut UndoStack<'u>,
    ) -> anyhow::Result<()> {
        let primary = repo.path.clone();

        // The standalone clone checks the branch out by name, so it must
        // exist in the primary first.
        if let Some(start) = source.start_point() {
            self.git.create_branch(&primary, branch, start)?;
            let git = self.git;
            let primary_for_undo = primary.clone();
            let branch_for_undo = branch.to_string();
            undo.push("delete created branch", move || {
                if git.local_branch_exists(&primary_for_undo, &branch_for_undo)? {
                    git.delete_branch(&primary_for_undo, &branch_for_undo, true)?;
                }
                Ok(())
            });
        }

        {
            let target_for_undo = target.to_path_buf();
            undo.push("remove standalone clone", move || {
                if target_for_undo.exists() {
                    std::fs::remove_dir_all(&target_for_undo)?;
                }
                Ok(())
            });
        }
        self.git.clone_branch(&primary, target, branch)?;

        // The fresh clone's origin points at the primary; repoint it at the
        // real remote when the primary has one.
        match self.git.remote_url(&primary, remote) {
            Ok(real_url) => self.git.set_remote_url(target, "origin", &real_url)?,
            Err(e) => log::debug!("keeping local origin for {}: {e:#}", target.display()),
        }

        Ok(())
    }
}
