//! The status document: arbor's catalog of repositories, worktrees, and
//! workspaces.
//!
//! The document is one TOML file. Maps are order-preserving so diffs stay
//! meaningful, and unknown keys survive a round-trip via flattened extras,
//! so a newer arbor can edit a document without destroying fields it doesn't
//! know about.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::git::RepoUrl;

mod store;

pub use store::StatusStore;

/// In-memory snapshot of the whole status document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StatusDocument {
    /// Managed repositories, keyed by normalized URL.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub repositories: IndexMap<String, RepositoryEntry>,

    /// Workspaces, keyed by user-chosen name.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub workspaces: IndexMap<String, WorkspaceEntry>,

    #[serde(flatten)]
    pub extra: toml::Table,
}

/// One managed repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepositoryEntry {
    /// Absolute path of the primary clone.
    pub path: PathBuf,

    /// True when the repository was registered from an existing checkout
    /// outside `repositories-dir`; delete leaves the directory alone.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub adopted: bool,

    /// Known remotes, keyed by remote name.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub remotes: IndexMap<String, RemoteEntry>,

    /// Worktrees, keyed by `remote:branch`.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub worktrees: IndexMap<String, WorktreeInfo>,

    #[serde(flatten)]
    pub extra: toml::Table,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RemoteEntry {
    pub default_branch: String,

    #[serde(flatten)]
    pub extra: toml::Table,
}

/// One worktree of a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorktreeInfo {
    /// Remote the worktree was cut from.
    pub remote: String,

    /// Branch name. May contain `/`; never contains `:`.
    pub branch: String,

    /// True for standalone clones (devcontainer repositories).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub detached: bool,

    /// Issue the branch was created from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<IssueRef>,

    #[serde(flatten)]
    pub extra: toml::Table,
}

impl WorktreeInfo {
    /// Composite key used in [`RepositoryEntry::worktrees`].
    pub fn key(remote: &str, branch: &str) -> String {
        format!("{remote}:{branch}")
    }
}

/// Issue-tracker reference recorded on a worktree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IssueRef {
    pub number: u64,
    pub title: String,
    pub url: String,
}

/// One workspace: an ordered set of member repositories plus the branches
/// currently expanded across them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorkspaceEntry {
    /// Normalized URLs of member repositories, in member order.
    #[serde(default)]
    pub repositories: Vec<String>,

    /// Branch names present in the workspace.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub worktrees: Vec<String>,

    #[serde(flatten)]
    pub extra: toml::Table,
}

impl StatusDocument {
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn render(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn get_repository(&self, url: &RepoUrl) -> Option<&RepositoryEntry> {
        self.repositories.get(url.as_str())
    }

    pub fn find_worktree(&self, url: &RepoUrl, remote: &str, branch: &str) -> Option<&WorktreeInfo> {
        self.repositories
            .get(url.as_str())?
            .worktrees
            .get(&WorktreeInfo::key(remote, branch))
    }

    /// All worktrees across all repositories, in document order.
    pub fn all_worktrees(&self) -> Vec<(String, WorktreeInfo)> {
        self.repositories
            .iter()
            .flat_map(|(url, repo)| {
                repo.worktrees
                    .values()
                    .map(move |wt| (url.clone(), wt.clone()))
            })
            .collect()
    }

    /// First workspace that lists `url` as a member.
    pub fn workspace_containing(&self, url: &RepoUrl) -> Option<&str> {
        self.workspaces
            .iter()
            .find(|(_, ws)| ws.repositories.iter().any(|r| r == url.as_str()))
            .map(|(name, _)| name.as_str())
    }

    /// Workspaces other than `except` that reference the `(url, branch)` worktree.
    pub fn other_workspaces_using(&self, except: &str, url: &RepoUrl, branch: &str) -> bool {
        self.workspaces.iter().any(|(name, ws)| {
            name != except
                && ws.repositories.iter().any(|r| r == url.as_str())
                && ws.worktrees.iter().any(|b| b == branch)
        })
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn add_repository(&mut self, url: &RepoUrl, entry: RepositoryEntry) -> Result<(), Error> {
        if self.repositories.contains_key(url.as_str()) {
            return Err(Error::RepositoryExists {
                url: url.as_str().to_string(),
            });
        }
        self.repositories.insert(url.as_str().to_string(), entry);
        Ok(())
    }

    pub fn remove_repository(&mut self, url: &RepoUrl) -> Result<RepositoryEntry, Error> {
        if let Some(workspace) = self.workspace_containing(url) {
            return Err(Error::RepositoryPartOfWorkspace {
                url: url.as_str().to_string(),
                workspace: workspace.to_string(),
            });
        }
        self.repositories
            .shift_remove(url.as_str())
            .ok_or_else(|| Error::RepositoryNotFound {
                url: url.as_str().to_string(),
            })
    }

    pub fn add_worktree(&mut self, url: &RepoUrl, info: WorktreeInfo) -> Result<(), Error> {
        let repo = self
            .repositories
            .get_mut(url.as_str())
            .ok_or_else(|| Error::RepositoryNotFound {
                url: url.as_str().to_string(),
            })?;
        let key = WorktreeInfo::key(&info.remote, &info.branch);
        if repo.worktrees.contains_key(&key) {
            return Err(Error::WorktreeExists {
                url: url.as_str().to_string(),
                branch: info.branch,
            });
        }
        repo.worktrees.insert(key, info);
        Ok(())
    }

    pub fn remove_worktree(
        &mut self,
        url: &RepoUrl,
        remote: &str,
        branch: &str,
    ) -> Result<WorktreeInfo, Error> {
        let repo = self
            .repositories
            .get_mut(url.as_str())
            .ok_or_else(|| Error::RepositoryNotFound {
                url: url.as_str().to_string(),
            })?;
        repo.worktrees
            .shift_remove(&WorktreeInfo::key(remote, branch))
            .ok_or_else(|| Error::WorktreeNotInStatus {
                url: url.as_str().to_string(),
                branch: branch.to_string(),
            })
    }

    pub fn add_workspace(&mut self, name: &str, entry: WorkspaceEntry) -> Result<(), Error> {
        if self.workspaces.contains_key(name) {
            return Err(Error::WorkspaceExists {
                name: name.to_string(),
            });
        }
        self.workspaces.insert(name.to_string(), entry);
        Ok(())
    }

    pub fn remove_workspace(&mut self, name: &str) -> Result<WorkspaceEntry, Error> {
        self.workspaces
            .shift_remove(name)
            .ok_or_else(|| Error::WorkspaceNotFound {
                name: name.to_string(),
            })
    }

    pub fn get_workspace(&self, name: &str) -> Option<&WorkspaceEntry> {
        self.workspaces.get(name)
    }

    pub fn add_repository_to_workspace(
        &mut self,
        name: &str,
        url: &RepoUrl,
    ) -> Result<(), Error> {
        if !self.repositories.contains_key(url.as_str()) {
            return Err(Error::RepositoryNotFound {
                url: url.as_str().to_string(),
            });
        }
        let ws = self
            .workspaces
            .get_mut(name)
            .ok_or_else(|| Error::WorkspaceNotFound {
                name: name.to_string(),
            })?;
        if ws.repositories.iter().any(|r| r == url.as_str()) {
            return Err(Error::DuplicateRepository {
                url: url.as_str().to_string(),
                workspace: name.to_string(),
            });
        }
        ws.repositories.push(url.as_str().to_string());
        Ok(())
    }

    pub fn add_branch_to_workspace(&mut self, name: &str, branch: &str) -> Result<(), Error> {
        let ws = self
            .workspaces
            .get_mut(name)
            .ok_or_else(|| Error::WorkspaceNotFound {
                name: name.to_string(),
            })?;
        if !ws.worktrees.iter().any(|b| b == branch) {
            ws.worktrees.push(branch.to_string());
        }
        Ok(())
    }

    pub fn remove_branch_from_workspace(&mut self, name: &str, branch: &str) -> Result<(), Error> {
        let ws = self
            .workspaces
            .get_mut(name)
            .ok_or_else(|| Error::WorkspaceNotFound {
                name: name.to_string(),
            })?;
        ws.worktrees.retain(|b| b != branch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> RepoUrl {
        RepoUrl::normalize(s).unwrap()
    }

    fn sample_repository(path: &str) -> RepositoryEntry {
        let mut remotes = IndexMap::new();
        remotes.insert(
            "origin".to_string(),
            RemoteEntry {
                default_branch: "master".to_string(),
                extra: toml::Table::new(),
            },
        );
        RepositoryEntry {
            path: PathBuf::from(path),
            adopted: false,
            remotes,
            worktrees: IndexMap::new(),
            extra: toml::Table::new(),
        }
    }

    fn sample_worktree(branch: &str) -> WorktreeInfo {
        WorktreeInfo {
            remote: "origin".to_string(),
            branch: branch.to_string(),
            detached: false,
            issue: None,
            extra: toml::Table::new(),
        }
    }

    #[test]
    fn test_round_trip_identity() {
        let mut doc = StatusDocument::default();
        let repo_url = url("github.com/octocat/Hello-World");
        doc.add_repository(&repo_url, sample_repository("/code/hw")).unwrap();
        doc.add_worktree(&repo_url, sample_worktree("feature/x")).unwrap();
        doc.add_workspace("api", WorkspaceEntry::default()).unwrap();
        doc.add_repository_to_workspace("api", &repo_url).unwrap();
        doc.add_branch_to_workspace("api", "feature/x").unwrap();

        let rendered = doc.render().unwrap();
        let parsed = StatusDocument::parse(&rendered).unwrap();
        assert_eq!(doc, parsed);
    }

    #[test]
    fn test_empty_document_round_trips() {
        let doc = StatusDocument::default();
        let rendered = doc.render().unwrap();
        assert_eq!(StatusDocument::parse(&rendered).unwrap(), doc);
    }

    #[test]
    fn test_unknown_keys_are_preserved() {
        let content = r#"
schema-version = 3

[repositories."github.com/o/r"]
path = "/code/r"
pinned = true

[repositories."github.com/o/r".remotes.origin]
default-branch = "main"

[workspaces.api]
repositories = ["github.com/o/r"]
color = "green"
"#;
        let doc = StatusDocument::parse(content).unwrap();
        assert!(doc.extra.contains_key("schema-version"));
        assert!(doc.repositories["github.com/o/r"].extra.contains_key("pinned"));
        assert!(doc.workspaces["api"].extra.contains_key("color"));

        let rendered = doc.render().unwrap();
        let again = StatusDocument::parse(&rendered).unwrap();
        assert_eq!(doc, again);
        assert!(rendered.contains("schema-version"));
        assert!(rendered.contains("pinned"));
        assert!(rendered.contains("color"));
    }

    #[test]
    fn test_duplicate_worktree_rejected() {
        let mut doc = StatusDocument::default();
        let repo_url = url("github.com/o/r");
        doc.add_repository(&repo_url, sample_repository("/code/r")).unwrap();
        doc.add_worktree(&repo_url, sample_worktree("main")).unwrap();
        let err = doc.add_worktree(&repo_url, sample_worktree("main")).unwrap_err();
        assert!(matches!(err, Error::WorktreeExists { .. }));
    }

    #[test]
    fn test_remove_repository_blocked_by_workspace() {
        let mut doc = StatusDocument::default();
        let repo_url = url("github.com/o/r");
        doc.add_repository(&repo_url, sample_repository("/code/r")).unwrap();
        doc.add_workspace("api", WorkspaceEntry::default()).unwrap();
        doc.add_repository_to_workspace("api", &repo_url).unwrap();

        let err = doc.remove_repository(&repo_url).unwrap_err();
        assert!(matches!(err, Error::RepositoryPartOfWorkspace { .. }));

        doc.remove_workspace("api").unwrap();
        assert!(doc.remove_repository(&repo_url).is_ok());
    }

    #[test]
    fn test_duplicate_member_rejected() {
        let mut doc = StatusDocument::default();
        let repo_url = url("github.com/o/r");
        doc.add_repository(&repo_url, sample_repository("/code/r")).unwrap();
        doc.add_workspace("api", WorkspaceEntry::default()).unwrap();
        doc.add_repository_to_workspace("api", &repo_url).unwrap();
        let err = doc.add_repository_to_workspace("api", &repo_url).unwrap_err();
        assert!(matches!(err, Error::DuplicateRepository { .. }));
    }

    #[test]
    fn test_other_workspaces_using() {
        let mut doc = StatusDocument::default();
        let repo_url = url("github.com/o/r");
        doc.add_repository(&repo_url, sample_repository("/code/r")).unwrap();
        for name in ["a", "b"] {
            doc.add_workspace(name, WorkspaceEntry::default()).unwrap();
            doc.add_repository_to_workspace(name, &repo_url).unwrap();
            doc.add_branch_to_workspace(name, "feature").unwrap();
        }
        assert!(doc.other_workspaces_using("a", &repo_url, "feature"));
        doc.remove_branch_from_workspace("b", "feature").unwrap();
        assert!(!doc.other_workspaces_using("a", &repo_url, "feature"));
    }

    #[test]
    fn test_worktree_key() {
        assert_eq!(WorktreeInfo::key("origin", "feature/x"), "origin:feature/x");
    }
}
