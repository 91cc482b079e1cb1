//! Durable, single-writer persistence for the status document.
//!
//! Writes are whole-file: serialize to a sibling temp file, fsync, rename
//! into place. Readers therefore never observe a torn document. Writers are
//! serialized by an in-process mutex layered over an advisory file lock, so
//! two arbor processes sharing a status file cannot interleave mutations.
//!
//! The advisory lock lives on a sidecar `<status-file>.lock` rather than the
//! document itself: the rename on commit would otherwise swap the locked
//! inode out from under a waiting writer.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use tempfile::NamedTempFile;

use crate::errors::Error;
use crate::status::StatusDocument;

pub struct StatusStore {
    path: PathBuf,
    mutex: Mutex<()>,
}

impl StatusStore {
    /// Open a store at `path`. No I/O happens until the first load or
    /// mutate; a missing file reads as the empty document.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mutex: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a consistent snapshot.
    pub fn load(&self) -> anyhow::Result<StatusDocument> {
        let _lock = self.acquire_file_lock(false)?;
        self.read_document()
    }

    /// Apply `f` to the current document under the exclusive lock and
    /// persist the result atomically.
    ///
    /// If `f` returns an error the document on disk is untouched and the
    /// in-memory changes are discarded.
    pub fn mutate<T>(
        &self,
        f: impl FnOnce(&mut StatusDocument) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        let _guard = self
            .mutex
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let _lock = self.acquire_file_lock(true)?;

        let mut document = self.read_document()?;
        let result = f(&mut document)?;
        self.write_document(&document)?;
        Ok(result)
    }

    // =========================================================================
    // Queries (thin snapshot wrappers)
    // =========================================================================

    pub fn list_repositories(&self) -> anyhow::Result<Vec<(String, super::RepositoryEntry)>> {
        Ok(self.load()?.repositories.into_iter().collect())
    }

    pub fn get_repository(
        &self,
        url: &crate::git::RepoUrl,
    ) -> anyhow::Result<Option<super::RepositoryEntry>> {
        Ok(self.load()?.get_repository(url).cloned())
    }

    pub fn list_workspaces(&self) -> anyhow::Result<Vec<(String, super::WorkspaceEntry)>> {
        Ok(self.load()?.workspaces.into_iter().collect())
    }

    pub fn list_all_worktrees(&self) -> anyhow::Result<Vec<(String, super::WorktreeInfo)>> {
        Ok(self.load()?.all_worktrees())
    }

    pub fn find_worktree(
        &self,
        url: &crate::git::RepoUrl,
        remote: &str,
        branch: &str,
    ) -> anyhow::Result<Option<super::WorktreeInfo>> {
        Ok(self.load()?.find_worktree(url, remote, branch).cloned())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "status".to_string());
        name.push_str(".lock");
        self.path.with_file_name(name)
    }

    fn acquire_file_lock(&self, exclusive: bool) -> anyhow::Result<std::fs::File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())?;
        if exclusive {
            file.lock_exclusive()?;
        } else {
            file.lock_shared()?;
        }
        Ok(file)
    }

    fn read_document(&self) -> anyhow::Result<StatusDocument> {
        if !self.path.exists() {
            return Ok(StatusDocument::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        StatusDocument::parse(&content).map_err(|e| {
            Error::StatusFileCorrupt {
                path: self.path.clone(),
                error: e.to_string(),
            }
            .into()
        })
    }

    fn write_document(&self, document: &StatusDocument) -> anyhow::Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let rendered = document.render()?;

        let mut temp = NamedTempFile::new_in(parent)?;
        std::io::Write::write_all(&mut temp, rendered.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path)
            .map_err(|e| std::io::Error::from(e.error))?;
        Ok(())
    }
}
