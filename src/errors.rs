//! Domain error types and formatting.
//!
//! Every fallible operation surfaces one of these variants through
//! `anyhow::Error`; callers that need to branch on the kind downcast with
//! `err.downcast_ref::<Error>()`. Each `Display` is a single styled sentence
//! naming the affected entity; external failures append the underlying
//! tool's message as an indented block.

use std::path::PathBuf;

use crate::styling::{ERROR, ERROR_BOLD, ERROR_EMOJI, HINT, HINT_EMOJI, indent_block};

#[derive(Debug)]
pub enum Error {
    /// Repository URL argument was empty
    RepositoryUrlEmpty,
    /// Repository URL did not normalize to at least host/segment
    UnsupportedRepositoryUrlFormat { url: String },
    /// Branch names cannot contain ':' (it separates remote from branch in worktree keys)
    BranchNameContainsColon { branch: String },
    /// Workspace name failed validation
    InvalidWorkspaceName { name: String },
    /// Repository is not registered in the status document
    RepositoryNotFound { url: String },
    /// No worktree entry in the status document for this branch
    WorktreeNotInStatus { url: String, branch: String },
    /// Workspace is not registered in the status document
    WorkspaceNotFound { name: String },
    /// Current directory is neither inside a git repository nor a workspace
    NoGitRepositoryOrWorkspaceFound { path: PathBuf },
    /// Repository is already registered
    RepositoryExists { url: String },
    /// A worktree for this remote:branch already exists
    WorktreeExists { url: String, branch: String },
    /// Repository is already a member of the workspace
    DuplicateRepository { url: String, workspace: String },
    /// Workspace is already registered
    WorkspaceExists { name: String },
    /// Repository cannot be deleted while a workspace references it
    RepositoryPartOfWorkspace { url: String, workspace: String },
    /// A git invocation exited non-zero
    GitCommandFailed { command: String, output: String },
    /// IDE name not recognized by the launcher
    UnsupportedIde { name: String },
    /// Status document failed to deserialize; never auto-repaired
    StatusFileCorrupt { path: PathBuf, error: String },
    /// A batch delete stopped partway; reports what did succeed
    BatchDeleteFailed {
        deleted: Vec<String>,
        failed: String,
        error: String,
    },
    /// Filesystem operation failed
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::RepositoryUrlEmpty => {
                write!(f, "{ERROR_EMOJI} {ERROR}Repository URL is empty{ERROR:#}")
            }

            Error::UnsupportedRepositoryUrlFormat { url } => {
                write!(
                    f,
                    "{ERROR_EMOJI} {ERROR}Unsupported repository URL format: {ERROR_BOLD}{url}{ERROR_BOLD:#}{ERROR:#}\n\n{HINT_EMOJI} {HINT}Expected something like https://github.com/owner/repo or git@github.com:owner/repo{HINT:#}"
                )
            }

            Error::BranchNameContainsColon { branch } => {
                write!(
                    f,
                    "{ERROR_EMOJI} {ERROR}Branch name {ERROR_BOLD}{branch}{ERROR_BOLD:#}{ERROR} contains ':'{ERROR:#}"
                )
            }

            Error::InvalidWorkspaceName { name } => {
                write!(
                    f,
                    "{ERROR_EMOJI} {ERROR}Invalid workspace name: {ERROR_BOLD}{name}{ERROR_BOLD:#}{ERROR:#}\n\n{HINT_EMOJI} {HINT}Names may contain letters, digits, '.', '_' and '-'{HINT:#}"
                )
            }

            Error::RepositoryNotFound { url } => {
                write!(
                    f,
                    "{ERROR_EMOJI} {ERROR}Repository {ERROR_BOLD}{url}{ERROR_BOLD:#}{ERROR} not found in status{ERROR:#}\n\n{HINT_EMOJI} {HINT}Clone it first with 'arbor clone'{HINT:#}"
                )
            }

            Error::WorktreeNotInStatus { url, branch } => {
                write!(
                    f,
                    "{ERROR_EMOJI} {ERROR}No worktree for branch {ERROR_BOLD}{branch}{ERROR_BOLD:#}{ERROR} of {ERROR_BOLD}{url}{ERROR_BOLD:#}{ERROR} in status{ERROR:#}"
                )
            }

            Error::WorkspaceNotFound { name } => {
                write!(
                    f,
                    "{ERROR_EMOJI} {ERROR}Workspace {ERROR_BOLD}{name}{ERROR_BOLD:#}{ERROR} not found in status{ERROR:#}"
                )
            }

            Error::NoGitRepositoryOrWorkspaceFound { path } => {
                write!(
                    f,
                    "{ERROR_EMOJI} {ERROR}No git repository or workspace found from {ERROR_BOLD}{}{ERROR_BOLD:#}{ERROR:#}\n\n{HINT_EMOJI} {HINT}Run inside a managed repository or pass --workspace{HINT:#}",
                    path.display()
                )
            }

            Error::RepositoryExists { url } => {
                write!(
                    f,
                    "{ERROR_EMOJI} {ERROR}Repository {ERROR_BOLD}{url}{ERROR_BOLD:#}{ERROR} already exists{ERROR:#}"
                )
            }

            Error::WorktreeExists { url, branch } => {
                write!(
                    f,
                    "{ERROR_EMOJI} {ERROR}Worktree for branch {ERROR_BOLD}{branch}{ERROR_BOLD:#}{ERROR} of {ERROR_BOLD}{url}{ERROR_BOLD:#}{ERROR} already exists{ERROR:#}"
                )
            }

            Error::DuplicateRepository { url, workspace } => {
                write!(
                    f,
                    "{ERROR_EMOJI} {ERROR}Repository {ERROR_BOLD}{url}{ERROR_BOLD:#}{ERROR} is already a member of workspace {ERROR_BOLD}{workspace}{ERROR_BOLD:#}{ERROR:#}"
                )
            }

            Error::WorkspaceExists { name } => {
                write!(
                    f,
                    "{ERROR_EMOJI} {ERROR}Workspace {ERROR_BOLD}{name}{ERROR_BOLD:#}{ERROR} already exists{ERROR:#}"
                )
            }

            Error::RepositoryPartOfWorkspace { url, workspace } => {
                write!(
                    f,
                    "{ERROR_EMOJI} {ERROR}Repository {ERROR_BOLD}{url}{ERROR_BOLD:#}{ERROR} is part of workspace {ERROR_BOLD}{workspace}{ERROR_BOLD:#}{ERROR:#}\n\n{HINT_EMOJI} {HINT}Remove it from the workspace first{HINT:#}"
                )
            }

            Error::GitCommandFailed { command, output } => {
                let header = format!(
                    "{ERROR_EMOJI} {ERROR}git command failed: {ERROR_BOLD}{command}{ERROR_BOLD:#}{ERROR:#}"
                );
                write_with_output(f, &header, output)
            }

            Error::UnsupportedIde { name } => {
                write!(
                    f,
                    "{ERROR_EMOJI} {ERROR}Unsupported IDE: {ERROR_BOLD}{name}{ERROR_BOLD:#}{ERROR:#}"
                )
            }

            Error::StatusFileCorrupt { path, error } => {
                let header = format!(
                    "{ERROR_EMOJI} {ERROR}Status file {ERROR_BOLD}{}{ERROR_BOLD:#}{ERROR} is corrupt{ERROR:#}",
                    path.display()
                );
                write_with_output(f, &header, error)
            }

            Error::BatchDeleteFailed {
                deleted,
                failed,
                error,
            } => {
                write!(
                    f,
                    "{ERROR_EMOJI} {ERROR}Failed to delete {ERROR_BOLD}{failed}{ERROR_BOLD:#}{ERROR}: {error}{ERROR:#}"
                )?;
                if !deleted.is_empty() {
                    write!(
                        f,
                        "\n\n{HINT_EMOJI} {HINT}Already deleted: {}{HINT:#}",
                        deleted.join(", ")
                    )?;
                }
                Ok(())
            }

            Error::Io(e) => {
                write!(f, "{ERROR_EMOJI} {ERROR}{e}{ERROR:#}")
            }
        }
    }
}

fn write_with_output(
    f: &mut std::fmt::Formatter<'_>,
    header: &str,
    output: &str,
) -> std::fmt::Result {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        write!(f, "{header}")
    } else {
        write!(f, "{header}\n{}", indent_block(trimmed))
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
