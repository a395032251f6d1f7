// src/exec/output.rs

//! Severity classification for lines read from a child process.

use tracing::{debug, error, info, warn};

/// Severity assigned to one line of process output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSeverity {
    Critical,
    Error,
    Warning,
    Debug,
    Info,
}

/// Classify a line by case-insensitive prefix, first match wins:
/// `critical`/`fatal`, `error`, `warning`, then restic's
/// `unchanged <path>` notices, everything else is informational.
pub fn classify_line(line: &str) -> LineSeverity {
    let lower = line.to_lowercase();

    if lower.starts_with("critical") || lower.starts_with("fatal") {
        LineSeverity::Critical
    } else if lower.starts_with("error") {
        LineSeverity::Error
    } else if lower.starts_with("warning") {
        LineSeverity::Warning
    } else if is_unchanged_notice(&lower) {
        LineSeverity::Debug
    } else {
        LineSeverity::Info
    }
}

/// `unchanged`, at least one whitespace, then an absolute path.
fn is_unchanged_notice(lower: &str) -> bool {
    match lower.strip_prefix("unchanged") {
        Some(rest) => {
            let trimmed = rest.trim_start();
            trimmed.len() < rest.len() && trimmed.starts_with('/')
        }
        None => false,
    }
}

/// Emit one output line through `tracing`, tagged with the command name.
///
/// `tracing` has no level above ERROR, so critical lines go out at ERROR
/// with `severity = "critical"`.
pub fn log_line(cmd: &str, line: &str) {
    let text = line.trim();
    match classify_line(line) {
        LineSeverity::Critical => error!(cmd = %cmd, severity = "critical", "{text}"),
        LineSeverity::Error => error!(cmd = %cmd, "{text}"),
        LineSeverity::Warning => warn!(cmd = %cmd, "{text}"),
        LineSeverity::Debug => debug!(cmd = %cmd, "{text}"),
        LineSeverity::Info => info!(cmd = %cmd, "{text}"),
    }
}
