//! External process execution.
//!
//! Every external command arbor runs goes through [`run`] so that command
//! lines, timing, and outcomes show up uniformly under `-v`:
//!
//! ```text
//! $ git worktree add /path feature [github.com/owner/repo]
//! [arbor-trace] context=github.com/owner/repo cmd="git ..." dur=12.3ms ok=true
//! ```
//!
//! The `context` parameter is typically the normalized repository URL for git
//! commands, or `None` for standalone tools like `gh`.

use std::process::Command;
use std::time::Instant;

/// Execute a command, capturing output, with timing and debug logging.
pub fn run(cmd: &mut Command, context: Option<&str>) -> std::io::Result<std::process::Output> {
    let cmd_str = render(cmd);

    match context {
        Some(ctx) => log::debug!("$ {} [{}]", cmd_str, ctx),
        None => log::debug!("$ {}", cmd_str),
    }

    let t0 = Instant::now();
    let result = cmd.output();
    let duration_ms = t0.elapsed().as_secs_f64() * 1000.0;

    match (&result, context) {
        (Ok(output), Some(ctx)) => {
            log::debug!(
                "[arbor-trace] context={} cmd=\"{}\" dur={:.1}ms ok={}",
                ctx,
                cmd_str,
                duration_ms,
                output.status.success()
            );
        }
        (Ok(output), None) => {
            log::debug!(
                "[arbor-trace] cmd=\"{}\" dur={:.1}ms ok={}",
                cmd_str,
                duration_ms,
                output.status.success()
            );
        }
        (Err(e), Some(ctx)) => {
            log::debug!(
                "[arbor-trace] context={} cmd=\"{}\" dur={:.1}ms err=\"{}\"",
                ctx,
                cmd_str,
                duration_ms,
                e
            );
        }
        (Err(e), None) => {
            log::debug!(
                "[arbor-trace] cmd=\"{}\" dur={:.1}ms err=\"{}\"",
                cmd_str,
                duration_ms,
                e
            );
        }
    }

    result
}

/// Spawn a command detached, without waiting for it to finish.
///
/// Used by the IDE launcher; arbor does not manage the lifetime of editors
/// it starts.
pub fn spawn_detached(cmd: &mut Command, context: Option<&str>) -> std::io::Result<()> {
    let cmd_str = render(cmd);
    match context {
        Some(ctx) => log::debug!("$ {} & [{}]", cmd_str, ctx),
        None => log::debug!("$ {} &", cmd_str),
    }
    cmd.stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()?;
    Ok(())
}

/// Render a command line for logging and error messages.
pub fn render(cmd: &Command) -> String {
    let program = cmd.get_program().to_string_lossy();
    let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy()).collect();
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}
