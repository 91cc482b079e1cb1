//! Orchestrator façade.
//!
//! [`Manager`] is the public surface: it resolves the operating mode,
//! dispatches to the repository engine or the workspace expander, and is
//! the only component that notifies the hook dispatcher. Capabilities (git,
//! IDE launcher, issue tracker, hooks) are injected so the whole core runs
//! against fakes in tests.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::errors::Error;
use crate::forge::{GhForge, IssueTracker, branch_name_for_issue};
use crate::git::{GitDriver, RepoUrl, SystemGit};
use crate::hooks::{HookDispatcher, NullHooks, Operation, OperationEvent};
use crate::ide::{IdeLauncher, SystemLauncher};
use crate::mode::{self, Mode};
use crate::repo::{ClonedRepository, RepoEngine};
use crate::status::{IssueRef, RepositoryEntry, StatusStore, WorkspaceEntry, WorktreeInfo};
use crate::workspace::{WorkspaceEngine, descriptor};

/// Options for [`Manager::create_worktree`].
#[derive(Debug, Default)]
pub struct CreateOptions {
    /// Issue reference to derive the branch (and its metadata) from.
    pub from_issue: Option<String>,
    /// Editor to open the result in once created.
    pub ide: Option<String>,
}

/// One row of `list worktrees` output.
#[derive(Debug, Clone)]
pub struct WorktreeRow {
    pub url: String,
    pub info: WorktreeInfo,
    pub path: PathBuf,
}

/// What [`Manager::prune`] changed or noticed.
#[derive(Debug, Clone, Default)]
pub struct PruneOutcome {
    /// `(url, branch)` worktree entries dropped.
    pub dropped_worktrees: Vec<(String, String)>,
    /// `(url, path)` git worktrees with no status entry (report only).
    pub unknown_worktrees: Vec<(String, PathBuf)>,
    /// `(workspace, branch)` descriptors rewritten.
    pub rewritten_descriptors: Vec<(String, String)>,
}

pub struct Manager {
    config: Config,
    store: StatusStore,
    git: Box<dyn GitDriver>,
    ide: Box<dyn IdeLauncher>,
    forge: Box<dyn IssueTracker>,
    hooks: Box<dyn HookDispatcher>,
}

impl Manager {
    /// Build a manager with the system capabilities.
    pub fn new(config: Config) -> Self {
        let store = StatusStore::open(&config.status_file);
        Self {
            config,
            store,
            git: Box::new(SystemGit::new()),
            ide: Box::new(SystemLauncher::new()),
            forge: Box::new(GhForge::new()),
            hooks: Box::new(NullHooks),
        }
    }

    pub fn with_git(mut self, git: impl GitDriver + 'static) -> Self {
        self.git = Box::new(git);
        self
    }

    pub fn with_ide(mut self, ide: impl IdeLauncher + 'static) -> Self {
        self.ide = Box::new(ide);
        self
    }

    pub fn with_forge(mut self, forge: impl IssueTracker + 'static) -> Self {
        self.forge = Box::new(forge);
        self
    }

    pub fn with_hooks(mut self, hooks: impl HookDispatcher + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &StatusStore {
        &self.store
    }

    fn repo_engine(&self) -> RepoEngine<'_> {
        RepoEngine::new(&self.config, &self.store, self.git.as_ref())
    }

    fn workspace_engine(&self) -> WorkspaceEngine<'_> {
        WorkspaceEngine::new(&self.config, &self.store, self.git.as_ref())
    }

    /// Create the managed directories and an empty status document.
    pub fn initialize(&self) -> anyhow::Result<()> {
        self.config.ensure_directories()?;
        self.store.mutate(|_| Ok(()))
    }

    // =========================================================================
    // Repository operations
    // =========================================================================

    /// Clone a repository into the managed layout and register it.
    pub fn clone(&self, url: &str) -> anyhow::Result<ClonedRepository> {
        let event = OperationEvent::new(Operation::Clone, url);
        self.hooks.pre(&event)?;
        let cloned = self.repo_engine().clone_repository(url)?;
        self.run_post(&event);
        Ok(cloned)
    }

    /// Delete a repository, its worktrees, and its status entry.
    pub fn delete_repository(&self, url: &str, force: bool) -> anyhow::Result<()> {
        let url = RepoUrl::normalize(url)?;
        let event = OperationEvent::new(Operation::DeleteRepository, url.as_str());
        self.hooks.pre(&event)?;
        self.repo_engine().delete_repository(&url, force)?;
        self.run_post(&event);
        Ok(())
    }

    pub fn list_repositories(&self) -> anyhow::Result<Vec<(String, RepositoryEntry)>> {
        self.store.list_repositories()
    }

    /// Register an existing checkout without cloning.
    pub fn register_repository(&self, path: &Path) -> anyhow::Result<RepoUrl> {
        let root = mode::find_repository_root(path).ok_or_else(|| {
            Error::NoGitRepositoryOrWorkspaceFound {
                path: path.to_path_buf(),
            }
        })?;
        let event = OperationEvent::new(Operation::AddRepository, root.display().to_string());
        self.hooks.pre(&event)?;
        let url = self.repo_engine().adopt_repository(&root)?;
        self.run_post(&event);
        Ok(url)
    }

    /// Reconcile the status document with the filesystem: drop entries for
    /// missing worktrees and rewrite stale workspace descriptors.
    pub fn prune(&self) -> anyhow::Result<PruneOutcome> {
        let event = OperationEvent::new(Operation::Prune, "status");
        self.hooks.pre(&event)?;
        let report = self.repo_engine().prune()?;
        let rewritten_descriptors = self.workspace_engine().reconcile_descriptors()?;
        self.run_post(&event);
        Ok(PruneOutcome {
            dropped_worktrees: report.dropped_worktrees,
            unknown_worktrees: report.unknown_worktrees,
            rewritten_descriptors,
        })
    }

    // =========================================================================
    // Worktree operations
    // =========================================================================

    /// Create a worktree for `branch` in the current repository or across a
    /// workspace. Returns the created paths.
    pub fn create_worktree(
        &self,
        cwd: &Path,
        workspace: Option<&str>,
        branch: Option<&str>,
        opts: CreateOptions,
    ) -> anyhow::Result<Vec<PathBuf>> {
        let mode = mode::resolve(cwd, workspace, self.git.as_ref())?;

        let issue = match &opts.from_issue {
            Some(reference) => {
                let context = match &mode {
                    Mode::Repository { root, .. } => root.clone(),
                    Mode::Workspace { .. } => cwd.to_path_buf(),
                };
                Some(self.forge.resolve(&context, reference)?)
            }
            None => None,
        };
        let branch = resolve_branch_name(branch, issue.as_ref())?;

        let event = OperationEvent::new(Operation::CreateWorktree, &branch);
        self.hooks.pre(&event)?;

        let paths = match &mode {
            Mode::Repository { url, root } => {
                self.ensure_registered(url, root)?;
                let created = self.repo_engine().create_worktree(url, &branch, issue)?;
                vec![created.path]
            }
            Mode::Workspace { name } => {
                self.workspace_engine().create_worktrees(name, &branch, issue)?
            }
        };

        self.run_post(&event);

        if let Some(ide) = &opts.ide {
            self.open_created(&mode, &branch, &paths, ide)?;
        }
        Ok(paths)
    }

    /// Delete worktrees for each of `branches`. Partial failures report
    /// which branches did get deleted.
    pub fn delete_worktrees(
        &self,
        cwd: &Path,
        workspace: Option<&str>,
        branches: &[String],
        force: bool,
    ) -> anyhow::Result<()> {
        let mode = mode::resolve(cwd, workspace, self.git.as_ref())?;
        let event = OperationEvent::new(Operation::DeleteWorktree, branches.join(", "));
        self.hooks.pre(&event)?;

        let mut deleted: Vec<String> = Vec::new();
        for branch in branches {
            let result = match &mode {
                Mode::Repository { url, .. } => self
                    .repo_engine()
                    .delete_worktree(url, branch, force)
                    .map(|_| ()),
                Mode::Workspace { name } => {
                    self.workspace_engine().delete_worktrees(name, branch, force)
                }
            };
            match result {
                Ok(()) => deleted.push(branch.clone()),
                Err(e) => {
                    if deleted.is_empty() {
                        return Err(e);
                    }
                    return Err(Error::BatchDeleteFailed {
                        deleted,
                        failed: branch.clone(),
                        error: format!("{e:#}"),
                    }
                    .into());
                }
            }
        }

        self.run_post(&event);
        Ok(())
    }

    /// Open an existing worktree (or a workspace's descriptor) in an editor.
    pub fn open_worktree(
        &self,
        cwd: &Path,
        workspace: Option<&str>,
        branch: &str,
        ide: &str,
    ) -> anyhow::Result<PathBuf> {
        let mode = mode::resolve(cwd, workspace, self.git.as_ref())?;
        let event = OperationEvent::new(Operation::OpenWorktree, branch);
        self.hooks.pre(&event)?;

        let path = match &mode {
            Mode::Repository { url, .. } => {
                self.repo_engine()
                    .open_worktree(url, branch, self.ide.as_ref(), ide)?
            }
            Mode::Workspace { name } => {
                let doc = self.store.load()?;
                let known = doc
                    .get_workspace(name)
                    .is_some_and(|ws| ws.worktrees.iter().any(|b| b == branch));
                if !known {
                    return Err(Error::WorktreeNotInStatus {
                        url: name.clone(),
                        branch: branch.to_string(),
                    }
                    .into());
                }
                let path = descriptor::descriptor_path(&self.config.workspaces_dir, name, branch);
                self.ide.open(ide, &path)?;
                path
            }
        };

        self.run_post(&event);
        Ok(path)
    }

    /// All worktrees known to the status document, with their derived paths.
    pub fn list_worktrees(&self) -> anyhow::Result<Vec<WorktreeRow>> {
        let doc = self.store.load()?;
        let mut rows = Vec::new();
        for (url_str, info) in doc.all_worktrees() {
            let url = RepoUrl::normalize(&url_str)?;
            let path = crate::repo::layout::worktree_path(
                &self.config.repositories_dir,
                &url,
                &info.remote,
                &info.branch,
            );
            rows.push(WorktreeRow {
                url: url_str,
                info,
                path,
            });
        }
        Ok(rows)
    }

    // =========================================================================
    // Workspace operations
    // =========================================================================

    pub fn create_workspace(&self, name: &str, urls: &[String]) -> anyhow::Result<()> {
        let event = OperationEvent::new(Operation::CreateWorkspace, name);
        self.hooks.pre(&event)?;
        self.workspace_engine().create_workspace(name, urls)?;
        self.run_post(&event);
        Ok(())
    }

    pub fn delete_workspace(&self, name: &str, force: bool) -> anyhow::Result<()> {
        let event = OperationEvent::new(Operation::DeleteWorkspace, name);
        self.hooks.pre(&event)?;
        self.workspace_engine().delete_workspace(name, force)?;
        self.run_post(&event);
        Ok(())
    }

    pub fn add_repository_to_workspace(&self, name: &str, url: &str) -> anyhow::Result<()> {
        let event = OperationEvent::new(Operation::AddRepositoryToWorkspace, name);
        self.hooks.pre(&event)?;
        self.workspace_engine().add_repository(name, url)?;
        self.run_post(&event);
        Ok(())
    }

    pub fn list_workspaces(&self) -> anyhow::Result<Vec<(String, WorkspaceEntry)>> {
        self.store.list_workspaces()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Repository-mode operations work from any checkout: an unknown
    /// repository is registered on first use.
    fn ensure_registered(&self, url: &RepoUrl, root: &Path) -> anyhow::Result<()> {
        if self.store.get_repository(url)?.is_none() {
            self.repo_engine().adopt_repository(root)?;
        }
        Ok(())
    }

    fn open_created(
        &self,
        mode: &Mode,
        branch: &str,
        paths: &[PathBuf],
        ide: &str,
    ) -> anyhow::Result<()> {
        match mode {
            Mode::Repository { .. } => {
                if let Some(path) = paths.first() {
                    self.ide.open(ide, path)?;
                }
            }
            Mode::Workspace { name } => {
                let path = descriptor::descriptor_path(&self.config.workspaces_dir, name, branch);
                self.ide.open(ide, &path)?;
            }
        }
        Ok(())
    }

    /// Post-hooks never fail the operation; it already happened.
    fn run_post(&self, event: &OperationEvent) {
        if let Err(e) = self.hooks.post(event) {
            log::warn!("post hook for '{event}' failed: {e:#}");
        }
    }
}

fn resolve_branch_name(branch: Option<&str>, issue: Option<&IssueRef>) -> anyhow::Result<String> {
    if let Some(branch) = branch {
        return Ok(branch.to_string());
    }
    match issue {
        Some(issue) => Ok(branch_name_for_issue(issue)),
        None => Err(anyhow::anyhow!("a branch name or --from-issue is required")),
    }
}
