//! In-memory [`GitDriver`] for engine tests.
//!
//! Tracks branches and remote refs in plain sets, materializes worktree
//! directories the way git would, records every call, and can be told to
//! fail any operation by name. This drives the engine's rollback paths
//! without a git binary.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use arbor::git::{GitDriver, GitWorktree};

#[derive(Debug, Default)]
pub struct FakeGit {
    /// Local branches of the primary repository.
    pub branches: Mutex<HashSet<String>>,
    /// Remote-tracking refs, as `remote/branch`.
    pub remote_refs: Mutex<HashSet<String>>,
    /// Operation names that fail when invoked.
    pub fail: Mutex<HashSet<&'static str>>,
    /// Every operation invoked, in order, as `name detail`.
    pub calls: Mutex<Vec<String>>,
}

impl FakeGit {
    pub fn new(branches: &[&str], remote_refs: &[&str]) -> Self {
        Self {
            branches: Mutex::new(branches.iter().map(|s| s.to_string()).collect()),
            remote_refs: Mutex::new(remote_refs.iter().map(|s| s.to_string()).collect()),
            fail: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_on(&self, op: &'static str) {
        self.fail.lock().unwrap().insert(op);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| c.split(' ').next().unwrap_or_default().to_string())
            .collect()
    }

    fn record(&self, op: &'static str, detail: impl std::fmt::Display) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(format!("{op} {detail}"));
        if self.fail.lock().unwrap().contains(op) {
            anyhow::bail!("{op} failed (injected)");
        }
        Ok(())
    }
}

impl GitDriver for FakeGit {
    fn clone_repository(&self, url: &str, dest: &Path) -> anyhow::Result<()> {
        self.record("clone_repository", url)?;
        std::fs::create_dir_all(dest.join(".git"))?;
        Ok(())
    }

    fn clone_branch(&self, _src: &Path, dest: &Path, branch: &str) -> anyhow::Result<()> {
        self.record("clone_branch", branch)?;
        std::fs::create_dir_all(dest.join(".git"))?;
        Ok(())
    }

    fn top_level(&self, _path: &Path) -> anyhow::Result<Option<PathBuf>> {
        Ok(None)
    }

    fn current_branch(&self, _repo: &Path) -> anyhow::Result<String> {
        Ok("master".to_string())
    }

    fn default_branch(&self, _repo: &Path, _remote: &str) -> anyhow::Result<Option<String>> {
        Ok(Some("master".to_string()))
    }

    fn remote_url(&self, _repo: &Path, remote: &str) -> anyhow::Result<String> {
        self.record("remote_url", remote)?;
        Ok("https://github.com/octocat/Hello-World.git".to_string())
    }

    fn set_remote_url(&self, _repo: &Path, remote: &str, url: &str) -> anyhow::Result<()> {
        self.record("set_remote_url", format!("{remote} {url}"))
    }

    fn local_branch_exists(&self, _repo: &Path, branch: &str) -> anyhow::Result<bool> {
        Ok(self.branches.lock().unwrap().contains(branch))
    }

    fn remote_branch_exists(
        &self,
        _repo: &Path,
        remote: &str,
        branch: &str,
    ) -> anyhow::Result<bool> {
        Ok(self
            .remote_refs
            .lock()
            .unwrap()
            .contains(&format!("{remote}/{branch}")))
    }

    fn fetch(&self, _repo: &Path, remote: &str) -> anyhow::Result<()> {
        self.record("fetch", remote)
    }

    fn create_branch(&self, _repo: &Path, branch: &str, start_point: &str) -> anyhow::Result<()> {
        self.record("create_branch", format!("{branch} {start_point}"))?;
        self.branches.lock().unwrap().insert(branch.to_string());
        Ok(())
    }

    fn delete_branch(&self, _repo: &Path, branch: &str, _force: bool) -> anyhow::Result<()> {
        self.record("delete_branch", branch)?;
        self.branches.lock().unwrap().remove(branch);
        Ok(())
    }

    fn worktree_add(&self, _repo: &Path, path: &Path, branch: &str) -> anyhow::Result<()> {
        self.record("worktree_add", branch)?;
        std::fs::create_dir_all(path)?;
        std::fs::write(path.join(".git"), "gitdir: fake\n")?;
        Ok(())
    }

    fn worktree_add_new(
        &self,
        _repo: &Path,
        path: &Path,
        branch: &str,
        start_point: &str,
    ) -> anyhow::Result<()> {
        self.record("worktree_add_new", format!("{branch} {start_point}"))?;
        self.branches.lock().unwrap().insert(branch.to_string());
        std::fs::create_dir_all(path)?;
        std::fs::write(path.join(".git"), "gitdir: fake\n")?;
        Ok(())
    }

    fn worktree_remove(&self, _repo: &Path, path: &Path, _force: bool) -> anyhow::Result<()> {
        self.record("worktree_remove", path.display())?;
        if path.exists() {
            std::fs::remove_dir_all(path)?;
        }
        Ok(())
    }

    fn worktree_prune(&self, _repo: &Path) -> anyhow::Result<()> {
        self.record("worktree_prune", "")
    }

    fn worktree_list(&self, _repo: &Path) -> anyhow::Result<Vec<GitWorktree>> {
        Ok(Vec::new())
    }

    fn set_upstream(&self, _worktree: &Path, remote: &str, branch: &str) -> anyhow::Result<()> {
        self.record("set_upstream", format!("{remote}/{branch}"))
    }
}
