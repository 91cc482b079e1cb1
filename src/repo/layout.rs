//! On-disk layout rules.
//!
//! Every managed path is a pure function of `(repositories-dir, normalized
//! URL, remote, branch)`:
//!
//! ```text
//! <repositories-dir>/<host/owner/repo>/<remote>/<branch>
//! ```
//!
//! Branch names may contain `/`, which nests directories; the primary clone
//! sits at the default branch's path.

use std::path::{Path, PathBuf};

use crate::git::RepoUrl;

/// Root directory for one repository's clones and worktrees.
pub fn repository_root(repositories_dir: &Path, url: &RepoUrl) -> PathBuf {
    repositories_dir.join(url.as_str())
}

/// Directory of the `(url, remote, branch)` worktree.
pub fn worktree_path(
    repositories_dir: &Path,
    url: &RepoUrl,
    remote: &str,
    branch: &str,
) -> PathBuf {
    repository_root(repositories_dir, url).join(remote).join(branch)
}

/// Remove empty directories from `start` upward, stopping at `base`.
///
/// Never removes `base` itself or anything outside it. Non-empty directories
/// end the walk; missing directories are skipped.
pub fn prune_empty_parents(start: &Path, base: &Path) {
    let mut current = start.to_path_buf();
    while current != base && current.starts_with(base) {
        if current.exists() && std::fs::remove_dir(&current).is_err() {
            break;
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> RepoUrl {
        RepoUrl::normalize(s).unwrap()
    }

    #[test]
    fn test_worktree_path_is_deterministic() {
        let base = Path::new("/code/repositories");
        let u = url("github.com/octocat/Hello-World");
        let a = worktree_path(base, &u, "origin", "feature/test-branch");
        let b = worktree_path(base, &u, "origin", "feature/test-branch");
        assert_eq!(a, b);
        assert_eq!(
            a,
            Path::new(
                "/code/repositories/github.com/octocat/Hello-World/origin/feature/test-branch"
            )
        );
    }

    #[test]
    fn test_prune_stops_at_base() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("repositories");
        let leaf = base.join("github.com/o/r/origin/feature");
        std::fs::create_dir_all(&leaf).unwrap();

        prune_empty_parents(&leaf, &base);

        assert!(base.exists());
        assert!(!base.join("github.com").exists());
    }

    #[test]
    fn test_prune_keeps_nonempty_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("repositories");
        let keep = base.join("github.com/o/r/origin/main");
        let prune = base.join("github.com/o/r/origin/feature");
        std::fs::create_dir_all(&keep).unwrap();
        std::fs::create_dir_all(&prune).unwrap();

        prune_empty_parents(&prune, &base);

        assert!(keep.exists());
        assert!(!prune.exists());
    }

    #[test]
    fn test_prune_ignores_paths_outside_base() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("repositories");
        let outside = dir.path().join("elsewhere/sub");
        std::fs::create_dir_all(&base).unwrap();
        std::fs::create_dir_all(&outside).unwrap();

        prune_empty_parents(&outside, &base);

        assert!(outside.exists());
    }
}
