//! Workspace descriptor files.
//!
//! One JSON `*.code-workspace` file per `(workspace, branch)` pair, listing
//! every member repository's worktree for that branch. Key order is fixed
//! by the struct and output is two-space indented so descriptor diffs stay
//! readable.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceDescriptor {
    pub name: String,
    pub folders: Vec<FolderEntry>,

    /// Keys the user added by hand (`settings`, `extensions`, ...) survive
    /// rewrites.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderEntry {
    /// Repository leaf name, e.g. `Hello-World`.
    pub name: String,
    /// Absolute worktree path.
    pub path: String,
}

impl WorkspaceDescriptor {
    pub fn render(&self) -> serde_json::Result<String> {
        let mut rendered = serde_json::to_string_pretty(self)?;
        rendered.push('\n');
        Ok(rendered)
    }

    pub fn parse(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Whether the generated content (name and folders) matches, ignoring
    /// hand-added keys.
    pub fn same_generated_content(&self, other: &Self) -> bool {
        self.name == other.name && self.folders == other.folders
    }
}

/// Replace path separators so a branch name yields a flat file name:
/// `feature/x` becomes `feature-x`. The worktree directory itself keeps the
/// slash; only the descriptor file name is flattened.
pub fn sanitize_branch(branch: &str) -> String {
    branch.replace(['/', '\\'], "-")
}

pub fn descriptor_file_name(branch: &str) -> String {
    format!("{}.code-workspace", sanitize_branch(branch))
}

/// `<workspaces-dir>/<workspace>/<sanitized-branch>.code-workspace`
pub fn descriptor_path(workspaces_dir: &Path, workspace: &str, branch: &str) -> PathBuf {
    workspaces_dir
        .join(workspace)
        .join(descriptor_file_name(branch))
}

/// Write a descriptor atomically (temp file + rename).
pub fn write_descriptor(path: &Path, descriptor: &WorkspaceDescriptor) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(descriptor.render()?.as_bytes())?;
    temp.persist(path).map_err(|e| std::io::Error::from(e.error))?;
    Ok(())
}

pub fn read_descriptor(path: &Path) -> anyhow::Result<WorkspaceDescriptor> {
    let content = std::fs::read_to_string(path)?;
    Ok(WorkspaceDescriptor::parse(&content)?)
}

/// Write a descriptor, carrying over any hand-added keys from the file
/// being replaced.
pub fn write_descriptor_preserving(
    path: &Path,
    descriptor: &WorkspaceDescriptor,
) -> anyhow::Result<()> {
    let mut descriptor = descriptor.clone();
    if let Ok(existing) = read_descriptor(path) {
        descriptor.extra = existing.extra;
    }
    write_descriptor(path, &descriptor)
}
