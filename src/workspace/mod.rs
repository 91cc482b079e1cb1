//! Workspace expander.
//!
//! A workspace is an ordered group of repositories. Branch-scoped commands
//! fan out across every member and keep one invariant: every branch in the
//! workspace has a descriptor file listing all members' worktrees for that
//! branch, in member order.
//!
//! Member fan-out runs on rayon and is joined before anything else happens;
//! status mutations serialize through the store's own lock.

use std::path::PathBuf;

use rayon::prelude::*;

use crate::config::Config;
use crate::errors::Error;
use crate::git::{GitDriver, RepoUrl};
use crate::repo::{RepoEngine, layout};
use crate::status::{IssueRef, StatusDocument, StatusStore, WorkspaceEntry};

pub mod descriptor;

use descriptor::{FolderEntry, WorkspaceDescriptor};

/// Workspace names are path components: letters, digits, `.`, `_`, `-`,
/// with the dot-only names rejected.
pub fn validate_name(name: &str) -> Result<(), Error> {
    let valid_chars = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !valid_chars || name == "." || name == ".." {
        return Err(Error::InvalidWorkspaceName {
            name: name.to_string(),
        });
    }
    Ok(())
}

pub struct WorkspaceEngine<'a> {
    config: &'a Config,
    store: &'a StatusStore,
    git: &'a dyn GitDriver,
}

impl<'a> WorkspaceEngine<'a> {
    pub fn new(config: &'a Config, store: &'a StatusStore, git: &'a dyn GitDriver) -> Self {
        Self { config, store, git }
    }

    fn repo_engine(&self) -> RepoEngine<'a> {
        RepoEngine::new(self.config, self.store, self.git)
    }

    /// Create a workspace from already-managed repositories.
    pub fn create_workspace(&self, name: &str, urls: &[String]) -> anyhow::Result<()> {
        validate_name(name)?;
        let members = urls
            .iter()
            .map(|raw| RepoUrl::normalize(raw))
            .collect::<Result<Vec<_>, _>>()?;

        self.store.mutate(|doc| {
            doc.add_workspace(name, WorkspaceEntry::default())?;
            for url in &members {
                doc.add_repository_to_workspace(name, url)?;
            }
            log::info!("created workspace {name} with {} members", members.len());
            Ok(())
        })
    }

    /// Create the `branch` worktree in every member repository.
    ///
    /// Transactional: if any member fails, every successful member is rolled
    /// back and the first failure is returned. On success the branch's
    /// descriptor file is written and the branch recorded in the workspace.
    pub fn create_worktrees(
        &self,
        name: &str,
        branch: &str,
        issue: Option<IssueRef>,
    ) -> anyhow::Result<Vec<PathBuf>> {
        validate_name(name)?;
        RepoEngine::validate_branch(branch)?;

        let doc = self.store.load()?;
        let workspace = doc
            .get_workspace(name)
            .cloned()
            .ok_or_else(|| Error::WorkspaceNotFound {
                name: name.to_string(),
            })?;
        let members = member_urls(&workspace)?;

        let engine = self.repo_engine();
        let results: Vec<(RepoUrl, anyhow::Result<_>)> = members
            .par_iter()
            .map(|url| {
                let result = engine.create_worktree(url, branch, issue.clone());
                (url.clone(), result)
            })
            .collect();

        let mut created = Vec::new();
        let mut first_error = None;
        for (url, result) in results {
            match result {
                Ok(outcome) => created.push((url, outcome.path)),
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => log::debug!("additional member failure: {e:#}"),
            }
        }

        if let Some(error) = first_error {
            self.rollback_created(&created, branch);
            return Err(error);
        }

        let desc = self.build_descriptor(&doc, name, branch, &workspace.repositories)?;
        let desc_path = descriptor::descriptor_path(&self.config.workspaces_dir, name, branch);
        if let Err(e) = descriptor::write_descriptor(&desc_path, &desc) {
            self.rollback_created(&created, branch);
            return Err(e);
        }

        if let Err(e) = self
            .store
            .mutate(|doc| Ok(doc.add_branch_to_workspace(name, branch)?))
        {
            let _ = std::fs::remove_file(&desc_path);
            self.rollback_created(&created, branch);
            return Err(e);
        }

        log::info!("created {branch} across workspace {name}");
        Ok(created.into_iter().map(|(_, path)| path).collect())
    }

    /// Delete the `branch` worktree from every member, then the branch's
    /// descriptor file, then the workspace's record of the branch.
    ///
    /// Worktrees also referenced by another workspace are left alone.
    pub fn delete_worktrees(&self, name: &str, branch: &str, force: bool) -> anyhow::Result<()> {
        validate_name(name)?;
        let doc = self.store.load()?;
        let workspace = doc
            .get_workspace(name)
            .cloned()
            .ok_or_else(|| Error::WorkspaceNotFound {
                name: name.to_string(),
            })?;
        let members = member_urls(&workspace)?;

        let branch_known = workspace.worktrees.iter().any(|b| b == branch)
            || members
                .iter()
                .any(|url| doc.find_worktree(url, &member_remote(&doc, url), branch).is_some());
        if !branch_known {
            return Err(Error::WorktreeNotInStatus {
                url: name.to_string(),
                branch: branch.to_string(),
            }
            .into());
        }

        let engine = self.repo_engine();
        let mut deleted = Vec::new();
        for url in &members {
            if doc.other_workspaces_using(name, url, branch) {
                log::debug!("keeping {branch} of {url}: referenced by another workspace");
                continue;
            }
            match engine.delete_worktree(url, branch, force) {
                Ok(_) => deleted.push(url.as_str().to_string()),
                Err(e) => {
                    if let Some(Error::WorktreeNotInStatus { .. }) = e.downcast_ref::<Error>() {
                        continue;
                    }
                    return Err(Error::BatchDeleteFailed {
                        deleted,
                        failed: format!("{branch} of {url}"),
                        error: format!("{e:#}"),
                    }
                    .into());
                }
            }
        }

        let desc_path = descriptor::descriptor_path(&self.config.workspaces_dir, name, branch);
        if desc_path.exists() {
            std::fs::remove_file(&desc_path)?;
        }

        self.store
            .mutate(|doc| Ok(doc.remove_branch_from_workspace(name, branch)?))
    }

    /// Append a repository to the workspace, backfill every existing branch
    /// into it, and rewrite every descriptor to include the new member.
    pub fn add_repository(&self, name: &str, raw_url: &str) -> anyhow::Result<()> {
        validate_name(name)?;
        let url = RepoUrl::normalize(raw_url)?;

        let doc = self.store.load()?;
        let workspace = doc
            .get_workspace(name)
            .cloned()
            .ok_or_else(|| Error::WorkspaceNotFound {
                name: name.to_string(),
            })?;
        if doc.get_repository(&url).is_none() {
            return Err(Error::RepositoryNotFound {
                url: url.as_str().to_string(),
            }
            .into());
        }
        if workspace.repositories.iter().any(|r| r == url.as_str()) {
            return Err(Error::DuplicateRepository {
                url: url.as_str().to_string(),
                workspace: name.to_string(),
            }
            .into());
        }

        // Backfill existing branches into the new member. Missing branches
        // fall back to the member's default branch inside the engine.
        let engine = self.repo_engine();
        let mut created = Vec::new();
        for branch in &workspace.worktrees {
            let existing = doc.find_worktree(&url, &member_remote(&doc, &url), branch);
            if existing.is_some() {
                continue;
            }
            match engine.create_worktree(&url, branch, None) {
                Ok(outcome) => created.push((url.clone(), outcome.path, branch.clone())),
                Err(e) => {
                    self.rollback_backfill(&created);
                    return Err(e);
                }
            }
        }

        // Every descriptor gains the new member's folder entry, whether or
        // not any worktree was just created.
        let mut new_members = workspace.repositories.clone();
        new_members.push(url.as_str().to_string());
        for branch in &workspace.worktrees {
            let desc = match self.build_descriptor(&doc, name, branch, &new_members) {
                Ok(desc) => desc,
                Err(e) => {
                    self.restore_descriptors(&doc, name, &workspace);
                    self.rollback_backfill(&created);
                    return Err(e);
                }
            };
            let desc_path = descriptor::descriptor_path(&self.config.workspaces_dir, name, branch);
            if let Err(e) = descriptor::write_descriptor_preserving(&desc_path, &desc) {
                self.restore_descriptors(&doc, name, &workspace);
                self.rollback_backfill(&created);
                return Err(e);
            }
        }

        if let Err(e) = self
            .store
            .mutate(|doc| Ok(doc.add_repository_to_workspace(name, &url)?))
        {
            self.restore_descriptors(&doc, name, &workspace);
            self.rollback_backfill(&created);
            return Err(e);
        }

        log::info!("added {url} to workspace {name}");
        Ok(())
    }

    /// Tear down the whole workspace: each branch's worktrees in each
    /// member, the descriptor files, then the workspace entry.
    pub fn delete_workspace(&self, name: &str, force: bool) -> anyhow::Result<()> {
        validate_name(name)?;
        let doc = self.store.load()?;
        let workspace = doc
            .get_workspace(name)
            .cloned()
            .ok_or_else(|| Error::WorkspaceNotFound {
                name: name.to_string(),
            })?;

        for branch in &workspace.worktrees {
            self.delete_worktrees(name, branch, force)?;
        }

        let dir = self.config.workspaces_dir.join(name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }

        self.store.mutate(|doc| {
            doc.remove_workspace(name)?;
            log::info!("deleted workspace {name}");
            Ok(())
        })
    }

    /// Rewrite any workspace descriptor that is missing or no longer agrees
    /// with the store. Returns the `(workspace, branch)` pairs rewritten.
    pub fn reconcile_descriptors(&self) -> anyhow::Result<Vec<(String, String)>> {
        let doc = self.store.load()?;
        let mut rewritten = Vec::new();

        for (name, workspace) in &doc.workspaces {
            for branch in &workspace.worktrees {
                let desc_path =
                    descriptor::descriptor_path(&self.config.workspaces_dir, name, branch);
                let expected = self.build_descriptor(&doc, name, branch, &workspace.repositories)?;
                let current = descriptor::read_descriptor(&desc_path).ok();
                if current
                    .as_ref()
                    .is_some_and(|c| c.same_generated_content(&expected))
                {
                    continue;
                }
                descriptor::write_descriptor_preserving(&desc_path, &expected)?;
                rewritten.push((name.clone(), branch.clone()));
            }
        }

        if !rewritten.is_empty() {
            log::info!("rewrote {} workspace descriptors", rewritten.len());
        }
        Ok(rewritten)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn build_descriptor(
        &self,
        doc: &StatusDocument,
        name: &str,
        branch: &str,
        members: &[String],
    ) -> anyhow::Result<WorkspaceDescriptor> {
        let mut folders = Vec::with_capacity(members.len());
        for member in members {
            let url = RepoUrl::normalize(member)?;
            let repo = doc
                .get_repository(&url)
                .ok_or_else(|| Error::RepositoryNotFound {
                    url: url.as_str().to_string(),
                })?;
            let remote = RepoEngine::primary_remote(repo);
            let path = layout::worktree_path(&self.config.repositories_dir, &url, &remote, branch);
            folders.push(FolderEntry {
                name: url.name().to_string(),
                path: path.to_string_lossy().into_owned(),
            });
        }
        Ok(WorkspaceDescriptor {
            name: format!("{name} [{branch}]"),
            folders,
            extra: serde_json::Map::new(),
        })
    }

    fn rollback_created(&self, created: &[(RepoUrl, PathBuf)], branch: &str) {
        let engine = self.repo_engine();
        for (url, _) in created {
            if let Err(e) = engine.delete_worktree(url, branch, true) {
                log::warn!("rollback of {branch} in {url} failed: {e:#}");
            }
        }
    }

    fn rollback_backfill(&self, created: &[(RepoUrl, PathBuf, String)]) {
        let engine = self.repo_engine();
        for (url, _, branch) in created {
            if let Err(e) = engine.delete_worktree(url, branch, true) {
                log::warn!("rollback of {branch} in {url} failed: {e:#}");
            }
        }
    }

    fn restore_descriptors(&self, doc: &StatusDocument, name: &str, workspace: &WorkspaceEntry) {
        for branch in &workspace.worktrees {
            let desc_path = descriptor::descriptor_path(&self.config.workspaces_dir, name, branch);
            match self.build_descriptor(doc, name, branch, &workspace.repositories) {
                Ok(desc) => {
                    if let Err(e) = descriptor::write_descriptor_preserving(&desc_path, &desc) {
                        log::warn!("restoring descriptor {} failed: {e:#}", desc_path.display());
                    }
                }
                Err(e) => log::warn!("restoring descriptor for {branch} failed: {e:#}"),
            }
        }
    }
}

fn member_urls(workspace: &WorkspaceEntry) -> anyhow::Result<Vec<RepoUrl>> {
    workspace
        .repositories
        .iter()
        .map(|raw| Ok(RepoUrl::normalize(raw)?))
        .collect()
}

fn member_remote(doc: &StatusDocument, url: &RepoUrl) -> String {
    doc.get_repository(url)
        .map(RepoEngine::primary_remote)
        .unwrap_or_else(|| "origin".to_string())
}
