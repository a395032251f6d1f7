// src/exec/retry.rs

//! Bounded retry around a [`ProcessRunner`].

use std::sync::Arc;

use tokio::time::{Instant, sleep};
use tracing::{info, warn};

use crate::errors::Result;
use crate::exec::ExecutionConfig;
use crate::exec::command::Command;
use crate::exec::process::{ChildEnvironment, ProcessRunner};
use crate::exec::result::{AttemptRecord, CommandResult};

/// Drives one command through up to `retry_count + 1` attempts.
///
/// Cheap to clone: the process runner and the child environment are shared.
#[derive(Clone)]
pub struct RetryExecutor {
    runner: Arc<dyn ProcessRunner>,
    env: Arc<ChildEnvironment>,
}

impl RetryExecutor {
    pub fn new(runner: Arc<dyn ProcessRunner>, env: ChildEnvironment) -> Self {
        Self {
            runner,
            env: Arc::new(env),
        }
    }

    pub fn env(&self) -> &ChildEnvironment {
        &self.env
    }

    /// Run `command` until it succeeds, its output contains one of
    /// `abort_reasons`, or the attempt budget is spent.
    ///
    /// A non-zero final exit code is a normal outcome recorded in the result.
    /// `Err` is returned only when an attempt could not be spawned at all.
    pub async fn run(
        &self,
        command: &Command,
        config: &ExecutionConfig,
        abort_reasons: &[String],
    ) -> Result<CommandResult> {
        let tries_total = config.retry_count.saturating_add(1);
        let name = command.short_name();
        let started = Instant::now();
        let mut attempts: Vec<AttemptRecord> = Vec::new();

        for attempt_index in 0..tries_total {
            let attempt = match self.runner.run(command, config.shell, &self.env).await {
                Ok(attempt) => attempt,
                Err(e) => {
                    if let Some(last) = attempts.last() {
                        warn!(
                            cmd = %name,
                            completed_attempts = attempts.len(),
                            last_exit_code = last.exit_code,
                            last_output = %last.output,
                            "attempt could not be spawned after earlier failures"
                        );
                    }
                    return Err(e);
                }
            };
            let succeeded = attempt.succeeded();
            let matched = matched_abort_reasons(&attempt.output, abort_reasons);
            attempts.push(attempt);

            if succeeded {
                break;
            }

            if !matched.is_empty() {
                warn!(cmd = %name, reasons = ?matched, "aborting retries");
                break;
            }

            let try_number = attempt_index + 1;
            if try_number == tries_total {
                break;
            }

            match &config.retry_backoff {
                Some(backoff) => {
                    let delay = backoff.delay_for(attempt_index);
                    info!(
                        cmd = %name,
                        try_number,
                        tries_total,
                        strategy = %backoff.strategy,
                        delay_seconds = delay.as_secs_f64(),
                        "retrying command after backoff"
                    );
                    sleep(delay).await;
                }
                None => {
                    info!(cmd = %name, try_number, tries_total, "retrying command");
                }
            }
        }

        let elapsed_seconds = started.elapsed().as_secs_f64();
        let current_try = u32::try_from(attempts.len()).unwrap_or(u32::MAX);

        Ok(CommandResult {
            attempts,
            current_try,
            tries_total,
            elapsed_seconds,
        })
    }
}

/// Abort reasons that occur as substrings of `output`, in configured order.
pub fn matched_abort_reasons<'a>(output: &str, abort_reasons: &'a [String]) -> Vec<&'a str> {
    abort_reasons
        .iter()
        .filter(|reason| output.contains(reason.as_str()))
        .map(String::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_reasons_match_as_substrings() {
        let reasons = vec![
            "Fatal: unable to open config file".to_string(),
            "Fatal: wrong password".to_string(),
        ];
        let output = "repository opened\nFatal: wrong password or no key found\n";

        assert_eq!(
            matched_abort_reasons(output, &reasons),
            vec!["Fatal: wrong password"]
        );
        assert!(matched_abort_reasons("all good", &reasons).is_empty());
        assert!(matched_abort_reasons(output, &[]).is_empty());
    }
}
