//! Opening worktrees in an editor.

use std::path::PathBuf;

use crate::errors::Error;
use crate::git::RepoUrl;
use crate::ide::IdeLauncher;

use super::RepoEngine;

impl RepoEngine<'_> {
    /// Look up the `(url, branch)` worktree and hand its path to the IDE
    /// launcher.
    pub fn open_worktree(
        &self,
        url: &RepoUrl,
        branch: &str,
        launcher: &dyn IdeLauncher,
        ide: &str,
    ) -> anyhow::Result<PathBuf> {
        let doc = self.store.load()?;
        let repo = doc
            .get_repository(url)
            .ok_or_else(|| Error::RepositoryNotFound {
                url: url.as_str().to_string(),
            })?;
        let remote = Self::primary_remote(repo);
        doc.find_worktree(url, &remote, branch)
            .ok_or_else(|| Error::WorktreeNotInStatus {
                url: url.as_str().to_string(),
                branch: branch.to_string(),
            })?;

        let path = self.worktree_dir(url, &remote, branch);
        launcher.open(ide, &path)?;
        Ok(path)
    }
}
