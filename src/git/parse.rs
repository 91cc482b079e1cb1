//! Git output parsing.

use std::path::PathBuf;

/// One entry of `git worktree list --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitWorktree {
    pub path: PathBuf,
    pub head: String,
    pub branch: Option<String>,
    pub bare: bool,
    pub detached: bool,
}

impl GitWorktree {
    /// Parse the `--porcelain` output: blank-line separated stanzas of
    /// `key [value]` lines, each starting with a `worktree <path>` line.
    pub(crate) fn parse_porcelain_list(output: &str) -> anyhow::Result<Vec<Self>> {
        let mut worktrees = Vec::new();
        let mut current: Option<GitWorktree> = None;

        for line in output.lines() {
            if line.is_empty() {
                if let Some(wt) = current.take() {
                    worktrees.push(wt);
                }
                continue;
            }

            let (key, value) = match line.split_once(' ') {
                Some((k, v)) => (k, Some(v)),
                None => (line, None),
            };

            match (key, current.as_mut()) {
                ("worktree", _) => {
                    let path = value
                        .ok_or_else(|| anyhow::anyhow!("worktree line missing path: {line:?}"))?;
                    if let Some(wt) = current.take() {
                        worktrees.push(wt);
                    }
                    current = Some(GitWorktree {
                        path: PathBuf::from(path),
                        head: String::new(),
                        branch: None,
                        bare: false,
                        detached: false,
                    });
                }
                ("HEAD", Some(wt)) => {
                    wt.head = value
                        .ok_or_else(|| anyhow::anyhow!("HEAD line missing SHA"))?
                        .to_string();
                }
                ("branch", Some(wt)) => {
                    let branch_ref =
                        value.ok_or_else(|| anyhow::anyhow!("branch line missing ref"))?;
                    wt.branch = Some(
                        branch_ref
                            .strip_prefix("refs/heads/")
                            .unwrap_or(branch_ref)
                            .to_string(),
                    );
                }
                ("bare", Some(wt)) => wt.bare = true,
                ("detached", Some(wt)) => wt.detached = true,
                // Unknown attributes (locked, prunable, ...) are skipped
                _ => {}
            }
        }

        if let Some(wt) = current {
            worktrees.push(wt);
        }

        Ok(worktrees)
    }
}
