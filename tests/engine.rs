//! Engine behavior against the in-memory git driver: branch-source
//! selection, rollback ordering, and best-effort steps, without a git
//! binary in the loop.

mod common;

use std::path::PathBuf;

use indexmap::IndexMap;
use tempfile::TempDir;

use arbor::Error;
use arbor::config::Config;
use arbor::git::RepoUrl;
use arbor::repo::RepoEngine;
use arbor::status::{RemoteEntry, RepositoryEntry, StatusStore};

use common::fake::FakeGit;

struct Fixture {
    _tmp: TempDir,
    config: Config,
    store: StatusStore,
    url: RepoUrl,
    primary: PathBuf,
}

fn fixture() -> Fixture {
    let tmp = TempDir::new().unwrap();
    let config = Config::with_base_dir(&tmp.path().join("base"));
    config.ensure_directories().unwrap();

    let url = RepoUrl::normalize("github.com/octocat/Hello-World").unwrap();
    let primary = config
        .repositories_dir
        .join(url.as_str())
        .join("origin/master");
    std::fs::create_dir_all(&primary).unwrap();

    let store = StatusStore::open(&config.status_file);
    let mut remotes = IndexMap::new();
    remotes.insert(
        "origin".to_string(),
        RemoteEntry {
            default_branch: "master".to_string(),
            extra: toml::Table::new(),
        },
    );
    let entry = RepositoryEntry {
        path: primary.clone(),
        adopted: false,
        remotes,
        worktrees: IndexMap::new(),
        extra: toml::Table::new(),
    };
    store
        .mutate(|doc| Ok(doc.add_repository(&url, entry)?))
        .unwrap();

    Fixture {
        _tmp: tmp,
        config,
        store,
        url,
        primary,
    }
}

#[test]
fn test_new_branch_is_cut_from_remote_default() {
    let fx = fixture();
    let git = FakeGit::new(&["master"], &["origin/master"]);
    let engine = RepoEngine::new(&fx.config, &fx.store, &git);

    let created = engine.create_worktree(&fx.url, "feature/x", None).unwrap();
    assert!(created.path.is_dir());
    assert!(!created.detached);

    let calls = git.calls();
    assert!(calls.contains(&"fetch origin".to_string()));
    assert!(calls.contains(&"worktree_add_new feature/x origin/master".to_string()));

    let doc = fx.store.load().unwrap();
    assert!(doc.find_worktree(&fx.url, "origin", "feature/x").is_some());
}

#[test]
fn test_existing_local_branch_skips_fetch() {
    let fx = fixture();
    let git = FakeGit::new(&["master", "topic"], &["origin/master"]);
    let engine = RepoEngine::new(&fx.config, &fx.store, &git);

    engine.create_worktree(&fx.url, "topic", None).unwrap();

    let names = git.call_names();
    assert!(names.contains(&"worktree_add".to_string()));
    assert!(!names.contains(&"fetch".to_string()));
}

#[test]
fn test_remote_branch_is_tracked() {
    let fx = fixture();
    let git = FakeGit::new(&["master"], &["origin/master", "origin/shared"]);
    let engine = RepoEngine::new(&fx.config, &fx.store, &git);

    engine.create_worktree(&fx.url, "shared", None).unwrap();

    let calls = git.calls();
    assert!(calls.contains(&"worktree_add_new shared origin/shared".to_string()));
    assert!(calls.contains(&"set_upstream origin/shared".to_string()));
}

#[test]
fn test_create_failure_leaves_no_state() {
    let fx = fixture();
    let git = FakeGit::new(&["master"], &["origin/master"]);
    git.fail_on("worktree_add_new");
    let engine = RepoEngine::new(&fx.config, &fx.store, &git);

    let before = fx.store.load().unwrap();
    let err = engine.create_worktree(&fx.url, "doomed", None).unwrap_err();
    assert!(err.to_string().contains("injected"));

    assert_eq!(fx.store.load().unwrap(), before);
    assert!(
        !fx.config
            .repositories_dir
            .join(fx.url.as_str())
            .join("origin/doomed")
            .exists()
    );
    // The primary clone's directory chain is untouched
    assert!(fx.primary.is_dir());
}

#[test]
fn test_upstream_failure_is_nonfatal() {
    let fx = fixture();
    let git = FakeGit::new(&["master"], &["origin/master", "origin/feature"]);
    git.fail_on("set_upstream");
    let engine = RepoEngine::new(&fx.config, &fx.store, &git);

    engine.create_worktree(&fx.url, "feature", None).unwrap();
    assert!(
        fx.store
            .load()
            .unwrap()
            .find_worktree(&fx.url, "origin", "feature")
            .is_some()
    );
}

#[test]
fn test_second_create_conflicts_without_touching_git() {
    let fx = fixture();
    let git = FakeGit::new(&["master"], &["origin/master"]);
    let engine = RepoEngine::new(&fx.config, &fx.store, &git);

    engine.create_worktree(&fx.url, "feature", None).unwrap();
    let calls_after_first = git.calls().len();

    let err = engine.create_worktree(&fx.url, "feature", None).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::WorktreeExists { .. })
    ));
    // The conflict is detected from the status document alone
    assert_eq!(git.calls().len(), calls_after_first);
}

#[test]
fn test_devcontainer_create_is_detached() {
    let fx = fixture();
    std::fs::write(fx.primary.join(".devcontainer.json"), "{}\n").unwrap();
    let git = FakeGit::new(&["master"], &["origin/master"]);
    let engine = RepoEngine::new(&fx.config, &fx.store, &git);

    let created = engine.create_worktree(&fx.url, "feature/dc", None).unwrap();
    assert!(created.detached);

    let names = git.call_names();
    assert!(names.contains(&"create_branch".to_string()));
    assert!(names.contains(&"clone_branch".to_string()));
    assert!(names.contains(&"set_remote_url".to_string()));

    let doc = fx.store.load().unwrap();
    let info = doc.find_worktree(&fx.url, "origin", "feature/dc").unwrap();
    assert!(info.detached);
}

#[test]
fn test_detached_rollback_unwinds_in_reverse_order() {
    let fx = fixture();
    std::fs::write(fx.primary.join(".devcontainer.json"), "{}\n").unwrap();
    let git = FakeGit::new(&["master"], &["origin/master"]);
    git.fail_on("set_remote_url");
    let engine = RepoEngine::new(&fx.config, &fx.store, &git);

    let before = fx.store.load().unwrap();
    engine
        .create_worktree(&fx.url, "feature/dc", None)
        .unwrap_err();

    // The branch created in the primary was deleted again, after the
    // failing step
    assert!(!git.branches.lock().unwrap().contains("feature/dc"));
    let names = git.call_names();
    let failed_at = names.iter().position(|n| n == "set_remote_url").unwrap();
    let cleanup = names.iter().position(|n| n == "delete_branch").unwrap();
    assert!(cleanup > failed_at);

    // No directory, no status entry
    assert!(
        !fx.config
            .repositories_dir
            .join(fx.url.as_str())
            .join("origin/feature/dc")
            .exists()
    );
    assert_eq!(fx.store.load().unwrap(), before);
}
