//! Issue-tracker capability.
//!
//! The engine consumes one operation: resolve an issue reference to
//! `(number, title, url)`. The default implementation shells out to the
//! `gh` CLI, which handles authentication and host selection on its own.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use crate::exec;
use crate::status::IssueRef;

pub trait IssueTracker: Send + Sync {
    /// Resolve `reference` ("123", "#123", or an issue URL) against the
    /// repository checked out at `repo`.
    fn resolve(&self, repo: &Path, reference: &str) -> anyhow::Result<IssueRef>;
}

/// [`IssueTracker`] backed by the `gh` CLI.
#[derive(Debug, Clone, Default)]
pub struct GhForge;

impl GhForge {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Deserialize)]
struct GhIssue {
    number: u64,
    title: String,
    url: String,
}

impl IssueTracker for GhForge {
    fn resolve(&self, repo: &Path, reference: &str) -> anyhow::Result<IssueRef> {
        let reference = reference.trim_start_matches('#');
        let mut cmd = Command::new("gh");
        cmd.args(["issue", "view", reference, "--json", "number,title,url"])
            .current_dir(repo);
        let output = exec::run(&mut cmd, None)?;
        if !output.status.success() {
            anyhow::bail!(
                "gh issue view {reference} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let issue: GhIssue = serde_json::from_slice(&output.stdout)?;
        Ok(IssueRef {
            number: issue.number,
            title: issue.title,
            url: issue.url,
        })
    }
}

/// Derive a branch name from an issue: `<number>-<slugified-title>`.
///
/// The slug keeps alphanumerics, lowercased, with runs of anything else
/// collapsed to single dashes.
pub fn branch_name_for_issue(issue: &IssueRef) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for c in issue.title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        issue.number.to_string()
    } else {
        format!("{}-{}", issue.number, slug)
    }
}
