// src/exec/result.rs

use serde::Serialize;

use crate::errors::Result;

/// Outcome of one spawn-and-wait cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub exit_code: i32,
    pub output: String,
}

impl AttemptRecord {
    pub fn new(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Everything recorded while driving one command to a terminal state.
///
/// `attempts` is chronological and never empty once returned by
/// [`RetryExecutor::run`](super::RetryExecutor::run); it stops at the first
/// success, the first abort-reason match, or when `tries_total` is reached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResult {
    pub attempts: Vec<AttemptRecord>,
    pub current_try: u32,
    pub tries_total: u32,
    pub elapsed_seconds: f64,
}

impl CommandResult {
    pub fn last_attempt(&self) -> Option<&AttemptRecord> {
        self.attempts.last()
    }

    /// Exit code of the final attempt (`-1` if nothing ran).
    pub fn exit_code(&self) -> i32 {
        self.last_attempt().map_or(-1, |a| a.exit_code)
    }

    /// Captured output of the final attempt.
    pub fn output(&self) -> &str {
        self.last_attempt().map_or("", |a| a.output.as_str())
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code() == 0
    }
}

/// Per-command results of a batch, index-aligned with the submitted commands.
///
/// A slot holds an error only when the command could not be driven at all
/// (e.g. the executable is missing); ordinary non-zero exits are `Ok`.
pub type BatchResult = Vec<Result<CommandResult>>;
