// src/exec/batch.rs

//! Fan-out / fan-in of several commands through the [`RetryExecutor`].

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::errors::{Result, RunnerError};
use crate::exec::ExecutionConfig;
use crate::exec::command::Command;
use crate::exec::result::{BatchResult, CommandResult};
use crate::exec::retry::RetryExecutor;

#[derive(Clone)]
pub struct CommandBatch {
    executor: RetryExecutor,
}

impl CommandBatch {
    pub fn new(executor: RetryExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &RetryExecutor {
        &self.executor
    }

    /// Run every command and return one result per command, in input order.
    ///
    /// - `parallel = true`: one Tokio task per command, all spawned before
    ///   any is awaited; handles are resolved by submission index.
    /// - `parallel = false`: strictly one after another, each including all
    ///   of its retries.
    ///
    /// A slot that fails to run (spawn error, panicked worker) holds an
    /// `Err` without affecting the other slots.
    pub async fn run(
        &self,
        commands: &[Command],
        config: &ExecutionConfig,
        abort_reasons: &[&str],
    ) -> BatchResult {
        let abort_reasons: Arc<[String]> =
            abort_reasons.iter().map(|r| r.to_string()).collect();

        if config.parallel {
            self.run_parallel(commands, config, abort_reasons).await
        } else {
            self.run_serial(commands, config, &abort_reasons).await
        }
    }

    async fn run_parallel(
        &self,
        commands: &[Command],
        config: &ExecutionConfig,
        abort_reasons: Arc<[String]>,
    ) -> BatchResult {
        let handles: Vec<JoinHandle<Result<CommandResult>>> = commands
            .iter()
            .map(|command| {
                debug!(command = %command, "spawning worker");
                let executor = self.executor.clone();
                let command = command.clone();
                let config = config.clone();
                let abort_reasons = Arc::clone(&abort_reasons);
                tokio::spawn(async move { executor.run(&command, &config, &abort_reasons).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (index, handle) in handles.into_iter().enumerate() {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => {
                    error!(index, error = %join_err, "command worker did not complete");
                    Err(RunnerError::Worker {
                        index,
                        message: join_err.to_string(),
                    })
                }
            };
            results.push(result);
        }
        results
    }

    async fn run_serial(
        &self,
        commands: &[Command],
        config: &ExecutionConfig,
        abort_reasons: &[String],
    ) -> BatchResult {
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            debug!(command = %command, "running command");
            results.push(self.executor.run(command, config, abort_reasons).await);
        }
        results
    }
}
