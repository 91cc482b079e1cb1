use std::io::Write as _;
use std::path::PathBuf;

use clap::Parser;

use arbor::config::{Config, default_config_path};
use arbor::styling::{
    BOLD, ERROR, ERROR_EMOJI, HINT, SUCCESS, SUCCESS_EMOJI, println,
};
use arbor::{CreateOptions, Manager};

mod cli;

use cli::{Cli, Commands, RepositoryCommand, WorkspaceCommand};

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        // Domain errors carry their own styling; anything else gets the
        // generic treatment.
        match e.downcast_ref::<arbor::Error>() {
            Some(domain) => println!("{domain}"),
            None => println!("{ERROR_EMOJI} {ERROR}{e:#}{ERROR:#}"),
        }
        std::process::exit(1);
    }
}

/// Verbosity flags control logging only, never behavior.
fn init_logger(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.clone();
    let (config, hook_commands) = Config::load_full(config_path.as_deref())?;
    let mut manager = Manager::new(config);
    if !hook_commands_empty(&hook_commands) {
        manager = manager.with_hooks(arbor::hooks::CommandHooks {
            pre_command: hook_commands.pre,
            post_command: hook_commands.post,
        });
    }
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init => handle_init(&manager, config_path),

        Commands::Clone { url } => {
            let cloned = manager.clone(&url)?;
            println!(
                "{SUCCESS_EMOJI} {SUCCESS}Cloned {BOLD}{}{BOLD:#}{SUCCESS} to {}{SUCCESS:#}",
                cloned.url,
                cloned.path.display()
            );
            Ok(())
        }

        Commands::Create {
            branch,
            workspace,
            from_issue,
            ide,
        } => {
            let paths = manager.create_worktree(
                &cwd,
                workspace.as_deref(),
                branch.as_deref(),
                CreateOptions {
                    from_issue,
                    ide,
                },
            )?;
            for path in paths {
                println!(
                    "{SUCCESS_EMOJI} {SUCCESS}Created worktree at {}{SUCCESS:#}",
                    path.display()
                );
            }
            Ok(())
        }

        Commands::Delete {
            branches,
            workspace,
            force,
        } => {
            if !force && !confirm(&format!("Delete worktrees for {}?", branches.join(", "))) {
                println!("{HINT}Aborted.{HINT:#}");
                return Ok(());
            }
            manager.delete_worktrees(&cwd, workspace.as_deref(), &branches, force)?;
            println!(
                "{SUCCESS_EMOJI} {SUCCESS}Deleted {BOLD}{}{BOLD:#}{SUCCESS:#}",
                branches.join(", ")
            );
            Ok(())
        }

        Commands::Open {
            branch,
            ide,
            workspace,
        } => {
            let path = manager.open_worktree(&cwd, workspace.as_deref(), &branch, &ide)?;
            println!(
                "{SUCCESS_EMOJI} {SUCCESS}Opened {} in {BOLD}{ide}{BOLD:#}{SUCCESS:#}",
                path.display()
            );
            Ok(())
        }

        Commands::List {
            repositories,
            workspaces,
        } => handle_list(&manager, repositories, workspaces),

        Commands::Prune => {
            let outcome = manager.prune()?;
            for (url, branch) in &outcome.dropped_worktrees {
                println!("{HINT}dropped stale worktree {branch} of {url}{HINT:#}");
            }
            for (workspace, branch) in &outcome.rewritten_descriptors {
                println!("{HINT}rewrote descriptor for {branch} in {workspace}{HINT:#}");
            }
            for (url, path) in &outcome.unknown_worktrees {
                println!(
                    "{HINT}unmanaged worktree of {url} at {} (left alone){HINT:#}",
                    path.display()
                );
            }
            if outcome.dropped_worktrees.is_empty()
                && outcome.rewritten_descriptors.is_empty()
                && outcome.unknown_worktrees.is_empty()
            {
                println!("{SUCCESS_EMOJI} {SUCCESS}Status and filesystem agree{SUCCESS:#}");
            }
            Ok(())
        }

        Commands::Config => {
            let config = manager.config();
            println!("repositories-dir: {}", config.repositories_dir.display());
            println!("workspaces-dir:   {}", config.workspaces_dir.display());
            println!("status-file:      {}", config.status_file.display());
            Ok(())
        }

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "arbor", &mut std::io::stdout());
            Ok(())
        }

        Commands::Repository(RepositoryCommand::Add { path }) => {
            let target = path.unwrap_or_else(|| cwd.clone());
            let url = manager.register_repository(&target)?;
            println!(
                "{SUCCESS_EMOJI} {SUCCESS}Registered repository {BOLD}{url}{BOLD:#}{SUCCESS:#}"
            );
            Ok(())
        }

        Commands::Repository(RepositoryCommand::Delete { url, force }) => {
            if !force && !confirm(&format!("Delete repository {url} and all of its worktrees?")) {
                println!("{HINT}Aborted.{HINT:#}");
                return Ok(());
            }
            manager.delete_repository(&url, force)?;
            println!("{SUCCESS_EMOJI} {SUCCESS}Deleted repository {BOLD}{url}{BOLD:#}{SUCCESS:#}");
            Ok(())
        }

        Commands::Workspace(command) => handle_workspace(&manager, command),
    }
}

fn handle_init(manager: &Manager, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(default_config_path);
    if Config::write_starter_file(&path)? {
        println!(
            "{SUCCESS_EMOJI} {SUCCESS}Wrote starter config to {}{SUCCESS:#}",
            path.display()
        );
    } else {
        println!("{HINT}Config already exists at {}{HINT:#}", path.display());
    }
    manager.initialize()?;
    println!(
        "{SUCCESS_EMOJI} {SUCCESS}Initialized {}{SUCCESS:#}",
        manager.config().status_file.display()
    );
    Ok(())
}

fn handle_list(manager: &Manager, repositories: bool, workspaces: bool) -> anyhow::Result<()> {
    if repositories {
        for (url, repo) in manager.list_repositories()? {
            let marker = if repo.adopted { " (adopted)" } else { "" };
            println!("{BOLD}{url}{BOLD:#}  {}{marker}", repo.path.display());
        }
        return Ok(());
    }
    if workspaces {
        for (name, ws) in manager.list_workspaces()? {
            println!(
                "{BOLD}{name}{BOLD:#}  {} repositories, {} branches",
                ws.repositories.len(),
                ws.worktrees.len()
            );
        }
        return Ok(());
    }
    for row in manager.list_worktrees()? {
        let marker = if row.info.detached { " (detached)" } else { "" };
        println!(
            "{BOLD}{}{BOLD:#}  {}  {}{marker}",
            row.info.branch,
            row.url,
            row.path.display()
        );
    }
    Ok(())
}

fn handle_workspace(manager: &Manager, command: WorkspaceCommand) -> anyhow::Result<()> {
    match command {
        WorkspaceCommand::Create { name, urls } => {
            manager.create_workspace(&name, &urls)?;
            println!(
                "{SUCCESS_EMOJI} {SUCCESS}Created workspace {BOLD}{name}{BOLD:#}{SUCCESS} with {} repositories{SUCCESS:#}",
                urls.len()
            );
            Ok(())
        }
        WorkspaceCommand::Delete { name, force } => {
            if !force && !confirm(&format!("Delete workspace {name} and its worktrees?")) {
                println!("{HINT}Aborted.{HINT:#}");
                return Ok(());
            }
            manager.delete_workspace(&name, force)?;
            println!("{SUCCESS_EMOJI} {SUCCESS}Deleted workspace {BOLD}{name}{BOLD:#}{SUCCESS:#}");
            Ok(())
        }
        WorkspaceCommand::AddRepository { name, url } => {
            manager.add_repository_to_workspace(&name, &url)?;
            println!(
                "{SUCCESS_EMOJI} {SUCCESS}Added {BOLD}{url}{BOLD:#}{SUCCESS} to workspace {BOLD}{name}{BOLD:#}{SUCCESS:#}"
            );
            Ok(())
        }
    }
}

fn hook_commands_empty(hooks: &arbor::config::HookCommandsConfig) -> bool {
    hooks.pre.is_none() && hooks.post.is_none()
}

/// Interactive yes/no prompt on stderr, so it shows even with stdout
/// redirected.
fn confirm(prompt: &str) -> bool {
    eprint!("{prompt} [y/N] ");
    let _ = std::io::stderr().flush();
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim(), "y" | "Y" | "yes" | "YES")
}
