//! Pre/post operation notification contract.
//!
//! The orchestrator notifies a [`HookDispatcher`] before and after every
//! public operation, and is the only component that does so. A pre-hook
//! error aborts the operation before any mutation; post-hook errors are
//! logged and swallowed, since the operation itself already succeeded.

/// Public operations, in their user-facing kebab-case names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Operation {
    Clone,
    AddRepository,
    CreateWorktree,
    DeleteWorktree,
    DeleteRepository,
    OpenWorktree,
    CreateWorkspace,
    DeleteWorkspace,
    AddRepositoryToWorkspace,
    Prune,
}

/// Context handed to hooks: the operation plus the entity it targets
/// (a URL, a branch, or a workspace name).
#[derive(Debug, Clone)]
pub struct OperationEvent {
    pub operation: Operation,
    pub target: String,
}

impl OperationEvent {
    pub fn new(operation: Operation, target: impl Into<String>) -> Self {
        Self {
            operation,
            target: target.into(),
        }
    }
}

impl std::fmt::Display for OperationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.operation, self.target)
    }
}

pub trait HookDispatcher: Send + Sync {
    fn pre(&self, event: &OperationEvent) -> anyhow::Result<()>;
    fn post(&self, event: &OperationEvent) -> anyhow::Result<()>;
}

/// Dispatcher that does nothing; the default when the host installs no hooks.
#[derive(Debug, Clone, Default)]
pub struct NullHooks;

impl HookDispatcher for NullHooks {
    fn pre(&self, _event: &OperationEvent) -> anyhow::Result<()> {
        Ok(())
    }

    fn post(&self, _event: &OperationEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Hook dispatcher that runs user-configured shell commands.
///
/// Commands come from the `[hooks]` section of the config file and receive
/// the operation context through `ARBOR_OPERATION` and `ARBOR_TARGET`
/// environment variables. A non-zero pre command aborts the operation.
#[derive(Debug, Clone, Default)]
pub struct CommandHooks {
    pub pre_command: Option<String>,
    pub post_command: Option<String>,
}

impl CommandHooks {
    pub fn is_empty(&self) -> bool {
        self.pre_command.is_none() && self.post_command.is_none()
    }

    fn run(&self, command: &str, event: &OperationEvent) -> anyhow::Result<()> {
        let mut cmd = shell_command(command);
        cmd.env("ARBOR_OPERATION", event.operation.to_string())
            .env("ARBOR_TARGET", &event.target);
        let output = crate::exec::run(&mut cmd, None)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "hook command {command:?} failed ({}): {}",
                output.status,
                stderr.trim()
            );
        }
        Ok(())
    }
}

impl HookDispatcher for CommandHooks {
    fn pre(&self, event: &OperationEvent) -> anyhow::Result<()> {
        match &self.pre_command {
            Some(command) => self.run(command, event),
            None => Ok(()),
        }
    }

    fn post(&self, event: &OperationEvent) -> anyhow::Result<()> {
        match &self.post_command {
            Some(command) => self.run(command, event),
            None => Ok(()),
        }
    }
}

fn shell_command(command: &str) -> std::process::Command {
    #[cfg(unix)]
    {
        let mut cmd = std::process::Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
    #[cfg(windows)]
    {
        let mut cmd = std::process::Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    }
}
