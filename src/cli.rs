//! Command-line definitions.

use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Color, Styles};
use clap::{Parser, Subcommand};

/// Custom styles for help output.
fn help_styles() -> Styles {
    Styles::styled()
        .header(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .usage(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .literal(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .placeholder(anstyle::Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
        .error(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
}

#[derive(Parser)]
#[command(
    name = "arbor",
    version,
    about = "Manage Git clones, worktrees, and multi-repository workspaces",
    styles = help_styles()
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter config and create the managed directories
    Init,

    /// Clone a repository into the managed layout and register it
    Clone {
        /// Repository URL (https, ssh, git@, or host/owner/repo)
        url: String,
    },

    /// Create a worktree, in the current repository or across a workspace
    Create {
        /// Branch to create (may be omitted with --from-issue)
        branch: Option<String>,

        /// Create across this workspace instead of the current repository
        #[arg(short = 'w', long, value_name = "NAME")]
        workspace: Option<String>,

        /// Derive the branch from an issue reference (number or URL)
        #[arg(long, value_name = "REF")]
        from_issue: Option<String>,

        /// Open the result in this editor once created
        #[arg(long, value_name = "EDITOR")]
        ide: Option<String>,
    },

    /// Delete worktrees and their status entries
    Delete {
        /// Branches to delete
        #[arg(required = true)]
        branches: Vec<String>,

        /// Delete across this workspace instead of the current repository
        #[arg(short = 'w', long, value_name = "NAME")]
        workspace: Option<String>,

        /// Skip confirmation and remove trees with uncommitted changes
        #[arg(short, long)]
        force: bool,
    },

    /// Open a worktree (or a workspace descriptor) in an editor
    Open {
        /// Branch to open
        branch: String,

        /// Editor to open with
        #[arg(long, value_name = "EDITOR")]
        ide: String,

        /// Open this workspace's descriptor instead of a repository worktree
        #[arg(short = 'w', long, value_name = "NAME")]
        workspace: Option<String>,
    },

    /// List worktrees (default), repositories, or workspaces
    List {
        /// List registered repositories
        #[arg(long, conflicts_with = "workspaces")]
        repositories: bool,

        /// List workspaces
        #[arg(long)]
        workspaces: bool,
    },

    /// Drop status entries for deleted worktrees and repair descriptors
    Prune,

    /// Print the resolved configuration
    Config,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },

    /// Repository maintenance
    #[command(subcommand)]
    Repository(RepositoryCommand),

    /// Workspace management
    #[command(subcommand)]
    Workspace(WorkspaceCommand),
}

#[derive(Subcommand)]
pub enum RepositoryCommand {
    /// Register an existing checkout without cloning
    Add {
        /// Path inside the checkout (defaults to the current directory)
        path: Option<PathBuf>,
    },

    /// Delete a repository, all of its worktrees, and its status entry
    Delete {
        /// Repository URL or normalized key
        url: String,

        /// Skip confirmation and remove trees with uncommitted changes
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum WorkspaceCommand {
    /// Create a workspace from already-managed repositories
    Create {
        name: String,

        /// Member repository URLs, in workspace order
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Delete a workspace, its descriptors, and its branches' worktrees
    Delete {
        name: String,

        /// Skip confirmation and remove trees with uncommitted changes
        #[arg(short, long)]
        force: bool,
    },

    /// Add a repository to a workspace, expanding its existing branches
    AddRepository {
        name: String,

        /// Repository URL or normalized key
        url: String,
    },
}
