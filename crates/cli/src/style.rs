//! Shared styling utilities for terminal output.

use console::Style;

use profilesync_core::sync_engine::Outcome;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create a header-styled string (bold, white).
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Side label for a local value (blue).
pub fn local() -> String {
    Style::new().blue().bold().apply_to("local").to_string()
}

/// Side label for a remote value (magenta).
pub fn remote() -> String {
    Style::new().magenta().bold().apply_to("remote").to_string()
}

/// One-line colored summary of a reconciliation outcome.
pub fn outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::InSync => success("Already in sync"),
        Outcome::Published => success("Remote had no copy; local profile published"),
        Outcome::Merged {
            applied,
            local_written,
            remote_written,
        } => {
            let targets = match (local_written, remote_written) {
                (true, true) => "local and remote updated",
                (true, false) => "local updated",
                (false, true) => "remote updated",
                (false, false) => "nothing to write",
            };
            success(&format!("Merged {applied} conflict(s), {targets}"))
        }
        Outcome::Aborted { reason } => warn(&format!("Aborted: {reason}. Nothing was written.")),
    }
}
