//! Terminal styling for user-facing messages.
//!
//! Built on the anstyle ecosystem: anstream for auto-detecting color support
//! (NO_COLOR, CLICOLOR_FORCE, terminal capabilities), anstyle for the style
//! constants themselves. Styles are used inline as `{ERROR}text{ERROR:#}`;
//! the `:#` form renders the style reset.
//!
//! All arbor messages go to stdout; child process output stays on stderr.

use anstyle::{AnsiColor, Color, Style};

pub use anstream::{eprint, eprintln, print, println};

/// Error style (red) - use as `{ERROR}text{ERROR:#}`
pub const ERROR: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red)));

/// Bold error style for entity names inside error messages
pub const ERROR_BOLD: Style = Style::new()
    .bold()
    .fg_color(Some(Color::Ansi(AnsiColor::Red)));

/// Success style (green)
pub const SUCCESS: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));

/// Progress style (cyan)
pub const PROGRESS: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));

/// Hint style (dimmed) - use as `{HINT}text{HINT:#}`
pub const HINT: Style = Style::new().dimmed();

/// Bold style for entity names in neutral messages
pub const BOLD: Style = Style::new().bold();

/// Error emoji - use with ERROR style: `println!("{ERROR_EMOJI} {ERROR}message{ERROR:#}");`
pub const ERROR_EMOJI: &str = "❌";

/// Success emoji
pub const SUCCESS_EMOJI: &str = "✅";

/// Progress emoji
pub const PROGRESS_EMOJI: &str = "🔄";

/// Hint emoji
pub const HINT_EMOJI: &str = "💡";

/// Indent multi-line tool output so it reads as a quoted block under a header.
///
/// Empty lines are preserved without trailing whitespace.
pub fn indent_block(text: &str) -> String {
    let mut out = String::new();
    for line in text.trim_end().lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}
