//! Git driver capability.
//!
//! The engine drives a local `git` binary through the [`GitDriver`] trait so
//! the whole core stays testable against fakes and every invocation receives
//! its working directory explicitly. Library code never changes the process
//! CWD.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::errors::Error;
use crate::exec;

mod parse;
mod url;

pub use parse::GitWorktree;
pub use url::RepoUrl;

/// Operations the core needs from a Git backend.
///
/// All paths are explicit; implementations must not rely on process CWD.
pub trait GitDriver: Send + Sync {
    /// Clone `url` into `dest` (parent directories must exist).
    fn clone_repository(&self, url: &str, dest: &Path) -> anyhow::Result<()>;

    /// Clone `src` into `dest` with `branch` checked out.
    ///
    /// Used for detached worktrees, where `src` is the primary clone.
    fn clone_branch(&self, src: &Path, dest: &Path, branch: &str) -> anyhow::Result<()>;

    /// Toplevel working-tree directory containing `path`, if inside a repository.
    fn top_level(&self, path: &Path) -> anyhow::Result<Option<PathBuf>>;

    /// Name of the currently checked-out branch (`git branch --show-current`).
    fn current_branch(&self, repo: &Path) -> anyhow::Result<String>;

    /// Default branch of `remote` from its symbolic HEAD, if recorded.
    fn default_branch(&self, repo: &Path, remote: &str) -> anyhow::Result<Option<String>>;

    /// URL configured for `remote`.
    fn remote_url(&self, repo: &Path, remote: &str) -> anyhow::Result<String>;

    /// Point `remote` at a new URL.
    fn set_remote_url(&self, repo: &Path, remote: &str, url: &str) -> anyhow::Result<()>;

    /// Whether `refs/heads/<branch>` exists.
    fn local_branch_exists(&self, repo: &Path, branch: &str) -> anyhow::Result<bool>;

    /// Whether `refs/remotes/<remote>/<branch>` exists.
    fn remote_branch_exists(&self, repo: &Path, remote: &str, branch: &str)
    -> anyhow::Result<bool>;

    /// Fetch `remote`.
    fn fetch(&self, repo: &Path, remote: &str) -> anyhow::Result<()>;

    /// Create `branch` at `start_point` without checking it out.
    fn create_branch(&self, repo: &Path, branch: &str, start_point: &str) -> anyhow::Result<()>;

    /// Delete a local branch (`-D` when `force`).
    fn delete_branch(&self, repo: &Path, branch: &str, force: bool) -> anyhow::Result<()>;

    /// Register a worktree at `path` for an existing local `branch`.
    fn worktree_add(&self, repo: &Path, path: &Path, branch: &str) -> anyhow::Result<()>;

    /// Register a worktree at `path`, creating `branch` from `start_point`.
    fn worktree_add_new(
        &self,
        repo: &Path,
        path: &Path,
        branch: &str,
        start_point: &str,
    ) -> anyhow::Result<()>;

    /// Unregister the worktree at `path` (`--force` when `force`).
    fn worktree_remove(&self, repo: &Path, path: &Path, force: bool) -> anyhow::Result<()>;

    /// Drop worktree records whose directories no longer exist.
    fn worktree_prune(&self, repo: &Path) -> anyhow::Result<()>;

    /// All registered worktrees, main worktree first.
    fn worktree_list(&self, repo: &Path) -> anyhow::Result<Vec<GitWorktree>>;

    /// Set the upstream of `branch` to `remote/branch`, running inside `worktree`.
    fn set_upstream(&self, worktree: &Path, remote: &str, branch: &str) -> anyhow::Result<()>;
}

/// [`GitDriver`] backed by the local `git` binary.
///
/// Extra environment entries are applied to every invocation; tests use this
/// to pin committer identity and isolate global config.
#[derive(Debug, Clone, Default)]
pub struct SystemGit {
    extra_env: Vec<(String, String)>,
}

impl SystemGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add environment entries applied to every git invocation.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.extra_env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    fn command(&self, dir: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(dir);
        for (key, value) in &self.extra_env {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run git and return trimmed stdout, failing on non-zero exit.
    fn git(&self, dir: &Path, args: &[&str]) -> anyhow::Result<String> {
        let mut cmd = self.command(dir, args);
        let context = dir.to_string_lossy();
        let output = exec::run(&mut cmd, Some(&context))?;
        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout);
            if combined.is_empty() {
                combined = stdout.trim().to_string();
            }
            return Err(Error::GitCommandFailed {
                command: exec::render(&cmd),
                output: combined,
            }
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run git where a non-zero exit means "no", not an error.
    fn git_check(&self, dir: &Path, args: &[&str]) -> anyhow::Result<bool> {
        let mut cmd = self.command(dir, args);
        let context = dir.to_string_lossy();
        let output = exec::run(&mut cmd, Some(&context))?;
        Ok(output.status.success())
    }
}

impl GitDriver for SystemGit {
    fn clone_repository(&self, url: &str, dest: &Path) -> anyhow::Result<()> {
        // Run from the destination's parent so relative file paths still work
        let parent = dest.parent().unwrap_or(Path::new("."));
        let dest_str = dest.to_string_lossy();
        self.git(parent, &["clone", url, &dest_str])?;
        Ok(())
    }

    fn clone_branch(&self, src: &Path, dest: &Path, branch: &str) -> anyhow::Result<()> {
        let parent = dest.parent().unwrap_or(Path::new("."));
        let src_str = src.to_string_lossy();
        let dest_str = dest.to_string_lossy();
        self.git(parent, &["clone", "--branch", branch, &src_str, &dest_str])?;
        Ok(())
    }

    fn top_level(&self, path: &Path) -> anyhow::Result<Option<PathBuf>> {
        if !path.is_dir() {
            return Ok(None);
        }
        let mut cmd = self.command(path, &["rev-parse", "--show-toplevel"]);
        let context = path.to_string_lossy();
        let output = exec::run(&mut cmd, Some(&context))?;
        if !output.status.success() {
            return Ok(None);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(Some(PathBuf::from(stdout.trim())))
    }

    fn current_branch(&self, repo: &Path) -> anyhow::Result<String> {
        self.git(repo, &["branch", "--show-current"])
    }

    fn default_branch(&self, repo: &Path, remote: &str) -> anyhow::Result<Option<String>> {
        let refname = format!("refs/remotes/{remote}/HEAD");
        let mut cmd = self.command(repo, &["symbolic-ref", "--quiet", &refname]);
        let context = repo.to_string_lossy();
        let output = exec::run(&mut cmd, Some(&context))?;
        if !output.status.success() {
            return Ok(None);
        }
        let target = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let prefix = format!("refs/remotes/{remote}/");
        Ok(target.strip_prefix(&prefix).map(str::to_string))
    }

    fn remote_url(&self, repo: &Path, remote: &str) -> anyhow::Result<String> {
        self.git(repo, &["remote", "get-url", remote])
    }

    fn set_remote_url(&self, repo: &Path, remote: &str, url: &str) -> anyhow::Result<()> {
        self.git(repo, &["remote", "set-url", remote, url])?;
        Ok(())
    }

    fn local_branch_exists(&self, repo: &Path, branch: &str) -> anyhow::Result<bool> {
        let refname = format!("refs/heads/{branch}");
        self.git_check(repo, &["rev-parse", "--verify", "--quiet", &refname])
    }

    fn remote_branch_exists(
        &self,
        repo: &Path,
        remote: &str,
        branch: &str,
    ) -> anyhow::Result<bool> {
        let refname = format!("refs/remotes/{remote}/{branch}");
        self.git_check(repo, &["rev-parse", "--verify", "--quiet", &refname])
    }

    fn fetch(&self, repo: &Path, remote: &str) -> anyhow::Result<()> {
        self.git(repo, &["fetch", remote])?;
        Ok(())
    }

    fn create_branch(&self, repo: &Path, branch: &str, start_point: &str) -> anyhow::Result<()> {
        self.git(repo, &["branch", branch, start_point])?;
        Ok(())
    }

    fn delete_branch(&self, repo: &Path, branch: &str, force: bool) -> anyhow::Result<()> {
        let flag = if force { "-D" } else { "-d" };
        self.git(repo, &["branch", flag, branch])?;
        Ok(())
    }

    fn worktree_add(&self, repo: &Path, path: &Path, branch: &str) -> anyhow::Result<()> {
        let path_str = path.to_string_lossy();
        self.git(repo, &["worktree", "add", &path_str, branch])?;
        Ok(())
    }

    fn worktree_add_new(
        &self,
        repo: &Path,
        path: &Path,
        branch: &str,
        start_point: &str,
    ) -> anyhow::Result<()> {
        let path_str = path.to_string_lossy();
        self.git(
            repo,
            &["worktree", "add", &path_str, "-b", branch, start_point],
        )?;
        Ok(())
    }

    fn worktree_remove(&self, repo: &Path, path: &Path, force: bool) -> anyhow::Result<()> {
        let path_str = path.to_string_lossy();
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(&path_str);
        self.git(repo, &args)?;
        Ok(())
    }

    fn worktree_prune(&self, repo: &Path) -> anyhow::Result<()> {
        self.git(repo, &["worktree", "prune"])?;
        Ok(())
    }

    fn worktree_list(&self, repo: &Path) -> anyhow::Result<Vec<GitWorktree>> {
        let stdout = self.git(repo, &["worktree", "list", "--porcelain"])?;
        GitWorktree::parse_porcelain_list(&stdout)
    }

    fn set_upstream(&self, worktree: &Path, remote: &str, branch: &str) -> anyhow::Result<()> {
        let upstream = format!("{remote}/{branch}");
        self.git(
            worktree,
            &["branch", &format!("--set-upstream-to={upstream}"), branch],
        )?;
        Ok(())
    }
}
