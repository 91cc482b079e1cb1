//! Status/filesystem reconciliation.
//!
//! The catalog can drift from disk when a deletion is interrupted or a
//! worktree is created or removed behind arbor's back. Pruning restores
//! the invariant that every worktree entry has a directory, lets git drop
//! its own stale records, and reports git worktrees the catalog does not
//! know about.

use std::path::{Path, PathBuf};

use crate::git::RepoUrl;
use crate::status::RepositoryEntry;

use super::{RepoEngine, layout};

/// What a prune pass changed or noticed.
#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    /// `(url, branch)` entries dropped because their directory was missing.
    pub dropped_worktrees: Vec<(String, String)>,
    /// `(url, path)` git worktrees with no status entry. Reported, never
    /// deleted: they may be hand-managed.
    pub unknown_worktrees: Vec<(String, PathBuf)>,
}

impl PruneReport {
    pub fn is_empty(&self) -> bool {
        self.dropped_worktrees.is_empty() && self.unknown_worktrees.is_empty()
    }
}

impl RepoEngine<'_> {
    /// Drop status entries for worktrees whose directories no longer exist,
    /// let git prune its matching records, and report unknown worktrees.
    pub fn prune(&self) -> anyhow::Result<PruneReport> {
        self.store.mutate(|doc| {
            let mut report = PruneReport::default();

            let repo_urls: Vec<String> = doc.repositories.keys().cloned().collect();
            for url_str in repo_urls {
                let url = RepoUrl::normalize(&url_str)?;
                let repo = doc.repositories[&url_str].clone();

                for info in repo.worktrees.values() {
                    let path = layout::worktree_path(
                        &self.config.repositories_dir,
                        &url,
                        &info.remote,
                        &info.branch,
                    );
                    if path.exists() {
                        continue;
                    }
                    doc.remove_worktree(&url, &info.remote, &info.branch)?;
                    if let Some(parent) = path.parent() {
                        layout::prune_empty_parents(parent, &self.config.repositories_dir);
                    }
                    report
                        .dropped_worktrees
                        .push((url_str.clone(), info.branch.clone()));
                }

                if repo.path.exists() {
                    if let Err(e) = self.git.worktree_prune(&repo.path) {
                        log::debug!("worktree prune in {url_str} failed: {e:#}");
                    }
                    let still_known = doc.repositories[&url_str].clone();
                    self.collect_unknown_worktrees(&url, &url_str, &still_known, &mut report);
                }
            }

            if !report.is_empty() {
                log::info!(
                    "pruned {} stale entries, {} unknown worktrees",
                    report.dropped_worktrees.len(),
                    report.unknown_worktrees.len()
                );
            }
            Ok(report)
        })
    }

    /// Compare git's worktree registry against the status entries. The main
    /// worktree and bare entries are expected; anything else unlisted is
    /// reported.
    fn collect_unknown_worktrees(
        &self,
        url: &RepoUrl,
        url_str: &str,
        repo: &RepositoryEntry,
        report: &mut PruneReport,
    ) {
        let registered = match self.git.worktree_list(&repo.path) {
            Ok(worktrees) => worktrees,
            Err(e) => {
                log::debug!("worktree list in {url_str} failed: {e:#}");
                return;
            }
        };

        for wt in registered.iter().filter(|wt| !wt.bare) {
            if same_path(&wt.path, &repo.path) {
                continue;
            }
            let known = repo.worktrees.values().any(|info| {
                let expected = layout::worktree_path(
                    &self.config.repositories_dir,
                    url,
                    &info.remote,
                    &info.branch,
                );
                same_path(&wt.path, &expected)
            });
            if !known {
                report
                    .unknown_worktrees
                    .push((url_str.to_string(), wt.path.clone()));
            }
        }
    }
}

/// Path equality through symlinks, falling back to the raw comparison when
/// either side cannot be canonicalized.
fn same_path(a: &Path, b: &Path) -> bool {
    match (dunce::canonicalize(a), dunce::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
