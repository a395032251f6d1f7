// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod metrics;
pub mod parse;
pub mod runner;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

use crate::cli::CliArgs;
use crate::config::{Config, configuration_file_paths, load_and_validate, possible_config_paths};
use crate::exec::{ProcessRunner, SystemProcessRunner};
use crate::runner::{ResticRunner, RunOptions};

/// High-level entry point used by `main.rs`.
///
/// Loads every config, runs them one after another and returns the total
/// number of errors. A termination signal stops the run; children are killed
/// when their futures are dropped.
pub async fn run(args: CliArgs) -> Result<u32> {
    let configs = load_configs(&args)?;
    let (actions, extra_args) = args.actions_and_restic_args();
    let options = RunOptions {
        actions,
        dry_run: args.dry_run,
        extra_args,
        show_progress: args.show_progress,
    };
    let runner: Arc<dyn ProcessRunner> = Arc::new(SystemProcessRunner::new());

    run_until_shutdown(run_configs(configs, options, runner), shutdown_signal()).await
}

/// Drive `work` until it completes or `shutdown` resolves.
///
/// On shutdown `work` is dropped, which kills every child process it still
/// owns, and the signal name is returned as an error.
pub async fn run_until_shutdown<W, S>(work: W, shutdown: S) -> Result<u32>
where
    W: Future<Output = Result<u32>>,
    S: Future<Output = Result<&'static str>>,
{
    tokio::select! {
        result = work => result,
        signal = shutdown => {
            let signal = signal?;
            warn!(signal, "received termination signal, stopping");
            bail!("interrupted by {signal}")
        }
    }
}

/// Resolves with the name of the first termination signal received.
#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    let mut hangup = signal(SignalKind::hangup()).context("installing SIGHUP handler")?;
    let mut user1 = signal(SignalKind::user_defined1()).context("installing SIGUSR1 handler")?;
    let mut user2 = signal(SignalKind::user_defined2()).context("installing SIGUSR2 handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("listening for Ctrl+C")?;
            Ok("SIGINT")
        }
        _ = terminate.recv() => Ok("SIGTERM"),
        _ = hangup.recv() => Ok("SIGHUP"),
        _ = user1.recv() => Ok("SIGUSR1"),
        _ = user2.recv() => Ok("SIGUSR2"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await.context("listening for Ctrl+C")?;
    Ok("Ctrl+C")
}

/// Run `configs` in order with a shared process runner.
pub async fn run_configs(
    configs: Vec<Config>,
    options: RunOptions,
    runner: Arc<dyn ProcessRunner>,
) -> Result<u32> {
    let mut errors = 0u32;
    for config in configs {
        let name = config.name.clone();
        let summary = ResticRunner::new(config, options.clone(), Arc::clone(&runner))
            .run()
            .await
            .with_context(|| format!("running config '{name}'"))?;
        errors = errors.saturating_add(summary.errors);
    }
    Ok(errors)
}

fn load_configs(args: &CliArgs) -> Result<Vec<Config>> {
    let paths: Vec<PathBuf> = match &args.config {
        Some(path) => vec![path.clone()],
        None => {
            let found = configuration_file_paths();
            if found.is_empty() {
                bail!(
                    "no configuration files found in {:?}",
                    possible_config_paths()
                );
            }
            found
        }
    };

    paths
        .iter()
        .map(|path| {
            debug!(path = %path.display(), "loading config");
            load_and_validate(path).with_context(|| format!("loading config {}", path.display()))
        })
        .collect()
}
