// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] defines the [`Command`] value (argv list or shell string).
//! - [`process`] spawns one child with `tokio::process`, merges its output
//!   and tags every line with a severity via [`output`].
//! - [`retry`] wraps a [`ProcessRunner`] with bounded retries, abort
//!   reasons and [`backoff`] delays.
//! - [`batch`] runs a list of commands in parallel or in sequence and
//!   returns their results in submission order.

pub mod backoff;
pub mod batch;
pub mod command;
pub mod output;
pub mod process;
pub mod result;
pub mod retry;

pub use backoff::{Backoff, BackoffStrategy};
pub use batch::CommandBatch;
pub use command::Command;
pub use output::{LineSeverity, classify_line};
pub use process::{ChildEnvironment, ProcessRunner, SystemProcessRunner};
pub use result::{AttemptRecord, BatchResult, CommandResult};
pub use retry::RetryExecutor;

/// How a batch of commands is executed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Run the commands of a batch concurrently instead of one at a time.
    pub parallel: bool,
    /// Interpret commands through `sh -c`.
    pub shell: bool,
    /// Additional attempts after the first failure.
    pub retry_count: u32,
    /// Delay between attempts; retries follow immediately when `None`.
    pub retry_backoff: Option<Backoff>,
}

impl ExecutionConfig {
    /// Hooks always run one at a time through a shell, keeping the retry
    /// settings of the surrounding config.
    pub fn for_hooks(&self) -> ExecutionConfig {
        ExecutionConfig {
            parallel: false,
            shell: true,
            ..self.clone()
        }
    }
}
