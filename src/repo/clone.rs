//! Cloning and registering repositories.

use std::path::PathBuf;

use indexmap::IndexMap;

use crate::errors::Error;
use crate::git::RepoUrl;
use crate::status::{RemoteEntry, RepositoryEntry, StatusDocument};

use super::{RepoEngine, UndoStack, layout};

/// A freshly cloned, registered repository.
#[derive(Debug, Clone)]
pub struct ClonedRepository {
    pub url: RepoUrl,
    pub path: PathBuf,
    pub default_branch: String,
}

impl RepoEngine<'_> {
    /// Clone `raw_url` into the managed layout and register it.
    ///
    /// The clone lands at `<repositories-dir>/<url>/origin/<default-branch>`;
    /// the default branch is whatever the clone checks out. The raw URL is
    /// passed to git untouched, so anything git can clone is accepted.
    pub fn clone_repository(&self, raw_url: &str) -> anyhow::Result<ClonedRepository> {
        let url = RepoUrl::normalize(raw_url)?;
        let raw_url = raw_url.trim().to_string();
        self.store.mutate(|doc| {
            let mut undo = UndoStack::new();
            match self.clone_locked(doc, &url, &raw_url, &mut undo) {
                Ok(cloned) => Ok(cloned),
                Err(e) => {
                    undo.unwind();
                    Err(e)
                }
            }
        })
    }

    fn clone_locked<'u>(
        &'u self,
        doc: &mut StatusDocument,
        url: &RepoUrl,
        raw_url: &str,
        undo: &mut UndoStack<'u>,
    ) -> anyhow::Result<ClonedRepository> {
        if doc.repositories.contains_key(url.as_str()) {
            return Err(Error::RepositoryExists {
                url: url.as_str().to_string(),
            }
            .into());
        }

        let remote_dir = layout::repository_root(&self.config.repositories_dir, url).join("origin");
        std::fs::create_dir_all(&remote_dir)?;
        {
            let remote_dir = remote_dir.clone();
            let base = self.config.repositories_dir.clone();
            undo.push("prune layout directories", move || {
                layout::prune_empty_parents(&remote_dir, &base);
                Ok(())
            });
        }

        // Clone to a staging name first: the final directory is named after
        // the default branch, which is only known once the clone exists.
        let staging = remote_dir.join(".arbor-clone");
        if staging.exists() {
            std::fs::remove_dir_all(&staging)?;
        }
        {
            let staging = staging.clone();
            undo.push("remove staging clone", move || {
                if staging.exists() {
                    std::fs::remove_dir_all(&staging)?;
                }
                Ok(())
            });
        }
        self.git.clone_repository(raw_url, &staging)?;

        let default_branch = self.git.current_branch(&staging)?;
        if default_branch.is_empty() {
            return Err(Error::GitCommandFailed {
                command: format!("git clone {raw_url}"),
                output: "clone checked out a detached HEAD; cannot determine default branch"
                    .to_string(),
            }
            .into());
        }

        let path = remote_dir.join(&default_branch);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(&staging, &path)?;
        {
            let path = path.clone();
            undo.push("remove primary clone", move || {
                if path.exists() {
                    std::fs::remove_dir_all(&path)?;
                }
                Ok(())
            });
        }

        let mut remotes = IndexMap::new();
        remotes.insert(
            "origin".to_string(),
            RemoteEntry {
                default_branch: default_branch.clone(),
                extra: toml::Table::new(),
            },
        );
        doc.add_repository(
            url,
            RepositoryEntry {
                path: path.clone(),
                adopted: false,
                remotes,
                worktrees: IndexMap::new(),
                extra: toml::Table::new(),
            },
        )?;

        log::info!("cloned {url} to {}", path.display());
        Ok(ClonedRepository {
            url: url.clone(),
            path,
            default_branch,
        })
    }
}
