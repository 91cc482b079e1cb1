//! Test harness for driving the arbor core against real git repositories.
//!
//! Each test gets an isolated temp directory holding:
//! - `origins/`: source repositories standing in for remote hosts
//! - `base/`: the managed layout (repositories, workspaces, status.toml)
//!
//! Git runs with a pinned identity and isolated config so tests are
//! deterministic and never touch the developer's global state.

#![allow(dead_code)]

pub mod fake;

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use arbor::config::Config;
use arbor::git::{RepoUrl, SystemGit};
use arbor::hooks::{HookDispatcher, OperationEvent};
use arbor::ide::IdeLauncher;
use arbor::manager::Manager;

pub fn git_test_env() -> Vec<(String, String)> {
    [
        ("GIT_AUTHOR_NAME", "Arbor Test"),
        ("GIT_AUTHOR_EMAIL", "arbor@test.invalid"),
        ("GIT_COMMITTER_NAME", "Arbor Test"),
        ("GIT_COMMITTER_EMAIL", "arbor@test.invalid"),
        ("GIT_CONFIG_GLOBAL", "/dev/null"),
        ("GIT_CONFIG_SYSTEM", "/dev/null"),
        ("GIT_CONFIG_NOSYSTEM", "1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Run git in `dir`, asserting success.
pub fn run_git(dir: &Path, args: &[&str]) {
    let output = git_command(dir, args)
        .output()
        .expect("failed to spawn git");
    assert!(
        output.status.success(),
        "git {:?} in {} failed: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Run git in `dir` and return trimmed stdout.
pub fn git_stdout(dir: &Path, args: &[&str]) -> String {
    let output = git_command(dir, args)
        .output()
        .expect("failed to spawn git");
    assert!(
        output.status.success(),
        "git {:?} in {} failed: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn git_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new("git");
    cmd.args(args).current_dir(dir);
    for (key, value) in git_test_env() {
        cmd.env(key, value);
    }
    cmd
}

/// IDE launcher that records requested paths instead of spawning editors.
#[derive(Debug, Clone, Default)]
pub struct RecordingIde {
    pub opened: Arc<Mutex<Vec<(String, PathBuf)>>>,
}

impl IdeLauncher for RecordingIde {
    fn open(&self, ide: &str, path: &Path) -> anyhow::Result<()> {
        self.opened
            .lock()
            .unwrap()
            .push((ide.to_string(), path.to_path_buf()));
        Ok(())
    }
}

/// Hook dispatcher that records events and can be told to fail its pre hook.
#[derive(Debug, Clone, Default)]
pub struct RecordingHooks {
    pub events: Arc<Mutex<Vec<String>>>,
    pub fail_pre: bool,
}

impl HookDispatcher for RecordingHooks {
    fn pre(&self, event: &OperationEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(format!("pre: {event}"));
        if self.fail_pre {
            anyhow::bail!("pre hook rejected {event}");
        }
        Ok(())
    }

    fn post(&self, event: &OperationEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(format!("post: {event}"));
        Ok(())
    }
}

pub struct TestEnv {
    root: TempDir,
    pub base: PathBuf,
    pub origins: PathBuf,
    pub manager: Manager,
    pub opened: Arc<Mutex<Vec<(String, PathBuf)>>>,
}

impl TestEnv {
    pub fn new() -> Self {
        let root = TempDir::new().expect("temp dir");
        let base = root.path().join("base");
        let origins = root.path().join("origins");
        std::fs::create_dir_all(&origins).unwrap();

        let config = Config::with_base_dir(&base);
        config.ensure_directories().unwrap();

        let ide = RecordingIde::default();
        let opened = ide.opened.clone();
        let manager = Manager::new(config)
            .with_git(SystemGit::new().with_env(git_test_env()))
            .with_ide(ide);

        Self {
            root,
            base,
            origins,
            manager,
            opened,
        }
    }

    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    pub fn repositories_dir(&self) -> PathBuf {
        self.base.join("repositories")
    }

    pub fn workspaces_dir(&self) -> PathBuf {
        self.base.join("workspaces")
    }

    pub fn status_file(&self) -> PathBuf {
        self.base.join("status.toml")
    }

    pub fn status_content(&self) -> String {
        std::fs::read_to_string(self.status_file()).unwrap_or_default()
    }

    /// Create a source repository with one commit on `master`.
    pub fn make_origin(&self, name: &str) -> PathBuf {
        let path = self.origins.join(name);
        std::fs::create_dir_all(&path).unwrap();
        run_git(&path, &["init", "--initial-branch=master"]);
        std::fs::write(path.join("README.md"), format!("# {name}\n")).unwrap();
        run_git(&path, &["add", "."]);
        run_git(&path, &["commit", "-m", "initial commit"]);
        path
    }

    /// Create a source repository whose checkouts carry a devcontainer.
    pub fn make_devcontainer_origin(&self, name: &str) -> PathBuf {
        let path = self.make_origin(name);
        std::fs::create_dir_all(path.join(".devcontainer")).unwrap();
        std::fs::write(
            path.join(".devcontainer/devcontainer.json"),
            "{ \"image\": \"mcr.microsoft.com/devcontainers/base\" }\n",
        )
        .unwrap();
        run_git(&path, &["add", "."]);
        run_git(&path, &["commit", "-m", "add devcontainer"]);
        path
    }

    /// The normalized status key for an origin path.
    pub fn key_for(&self, origin: &Path) -> String {
        RepoUrl::normalize(origin.to_str().expect("utf-8 path"))
            .unwrap()
            .as_str()
            .to_string()
    }

    /// The managed path of `(origin, remote, branch)`.
    pub fn worktree_path(&self, origin: &Path, remote: &str, branch: &str) -> PathBuf {
        self.repositories_dir()
            .join(self.key_for(origin))
            .join(remote)
            .join(branch)
    }

    pub fn primary_path(&self, origin: &Path) -> PathBuf {
        self.worktree_path(origin, "origin", "master")
    }
}

/// Issue tracker returning a canned issue.
#[derive(Debug, Clone)]
pub struct FakeForge {
    pub issue: arbor::status::IssueRef,
}

impl arbor::forge::IssueTracker for FakeForge {
    fn resolve(&self, _repo: &Path, _reference: &str) -> anyhow::Result<arbor::status::IssueRef> {
        Ok(self.issue.clone())
    }
}
