// src/runner/orchestrator.rs

//! Runs the requested actions of one config against all of its repositories
//! and collects the results into a [`MetricsTree`].

use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{CheckMode, Config};
use crate::errors::Result;
use crate::exec::{BatchResult, Command, CommandBatch, ProcessRunner, RetryExecutor};
use crate::exec::retry::matched_abort_reasons;
use crate::metrics::{
    BackupReport, CheckMetrics, HookMetrics, MetricsTree, PerRepository, RepoOutcome, write_metrics,
};
use crate::parse::{parse_backup, parse_forget, parse_prune, parse_stats};
use crate::runner::actions::{Action, default_actions};
use crate::runner::commands::{
    INIT_ABORT_REASONS, REPOSITORY_ABORT_REASONS, backup_command, check_command, check_flags,
    forget_command, init_command, prune_command, stats_command, unlock_command,
};
use crate::runner::environment::child_environment;
use crate::runner::redact::redact_password;

/// Per-invocation options coming from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Empty means the default sequence.
    pub actions: Vec<Action>,
    pub dry_run: bool,
    /// Passed verbatim to every restic invocation.
    pub extra_args: Vec<String>,
    /// Progress update interval in seconds.
    pub show_progress: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub errors: u32,
    pub metrics: MetricsTree,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }
}

pub struct ResticRunner {
    config: Config,
    options: RunOptions,
    batch: CommandBatch,
    metrics: MetricsTree,
    log_metrics: bool,
}

impl ResticRunner {
    pub fn new(config: Config, options: RunOptions, runner: Arc<dyn ProcessRunner>) -> Self {
        let env = child_environment(&config.environment, options.show_progress);
        let batch = CommandBatch::new(RetryExecutor::new(runner, env));
        let log_metrics = config.metrics.is_some() && !options.dry_run;

        Self {
            config,
            options,
            batch,
            metrics: MetricsTree::default(),
            log_metrics,
        }
    }

    /// The actions this run will execute, in order.
    pub fn actions(&self) -> Vec<Action> {
        if self.options.actions.is_empty() {
            default_actions(self.log_metrics)
        } else {
            self.options.actions.clone()
        }
    }

    /// Run every action, then write metrics if configured.
    ///
    /// Failing restic commands are counted, not returned as `Err`.
    pub async fn run(mut self) -> Result<RunSummary> {
        let started = Instant::now();
        let actions = self.actions();
        info!(config = %self.config.name, actions = ?actions, "starting");

        for (index, action) in actions.iter().enumerate() {
            if self.config.exit_on_error && self.metrics.errors > 0 {
                let skipped: Vec<&str> = actions[index..].iter().map(|a| a.as_str()).collect();
                warn!(
                    config = %self.config.name,
                    errors = self.metrics.errors,
                    skipped = ?skipped,
                    "stopping after errors (exit_on_error)"
                );
                break;
            }

            debug!(action = %action, "running action");
            match action {
                Action::Init => self.init().await,
                Action::Backup => self.backup().await,
                Action::Prune => {
                    self.forget().await;
                    self.prune().await;
                }
                Action::Check => self.check().await,
                Action::Stats => self.stats().await,
                Action::Unlock => self.unlock().await,
            }
        }

        self.metrics.last_run = Utc::now().timestamp_millis() as f64 / 1000.0;
        self.metrics.total_duration_seconds = started.elapsed().as_secs_f64();

        if let Ok(json) = serde_json::to_string_pretty(&self.metrics) {
            debug!(metrics = %json, "run finished");
        }

        if self.log_metrics {
            if let Some(section) = &self.config.metrics {
                if let Err(e) = write_metrics(&self.metrics, &self.config.name, section) {
                    error!(error = %e, "failed to write metrics");
                    self.metrics.errors += 1;
                }
            }
        }

        info!(
            config = %self.config.name,
            errors = self.metrics.errors,
            duration_seconds = self.metrics.total_duration_seconds,
            "finished"
        );

        Ok(RunSummary {
            errors: self.metrics.errors,
            metrics: self.metrics,
        })
    }

    fn repository_keys(&self) -> Vec<String> {
        let replacement = self.config.password_replacement();
        self.config
            .repositories
            .iter()
            .map(|repo| redact_password(repo, replacement))
            .collect()
    }

    fn per_repository(&self, build: impl Fn(&str) -> Command) -> Vec<Command> {
        self.config.repositories.iter().map(|r| build(r.as_str())).collect()
    }

    async fn run_batch(&self, commands: &[Command], abort_reasons: &[&str]) -> BatchResult {
        self.batch
            .run(commands, &self.config.execution, abort_reasons)
            .await
    }

    /// Turn a batch into per-repository outcomes, counting failures.
    fn record<T>(
        &mut self,
        operation: &'static str,
        results: BatchResult,
        parse: impl Fn(&str) -> Result<T>,
    ) -> PerRepository<RepoOutcome<T>> {
        let keys = self.repository_keys();
        let mut recorded = Vec::with_capacity(keys.len());

        for (repository, slot) in keys.into_iter().zip(results) {
            let outcome = match slot {
                Err(e) => {
                    error!(operation, repository = %repository, error = %e, "command could not run");
                    self.metrics.errors += 1;
                    RepoOutcome::Failed { rc: -1 }
                }
                Ok(result) if !result.succeeded() => {
                    warn!(
                        operation,
                        repository = %repository,
                        rc = result.exit_code(),
                        tries = result.current_try,
                        output = %result.output(),
                        "restic command failed"
                    );
                    self.metrics.errors += 1;
                    RepoOutcome::Failed {
                        rc: result.exit_code(),
                    }
                }
                Ok(result) => match parse(result.output()) {
                    Ok(metrics) => RepoOutcome::Parsed {
                        metrics,
                        duration_seconds: result.elapsed_seconds,
                    },
                    Err(e) => {
                        error!(operation, repository = %repository, error = %e, "could not parse output");
                        self.metrics.errors += 1;
                        RepoOutcome::Unparsed {
                            duration_seconds: result.elapsed_seconds,
                        }
                    }
                },
            };
            recorded.push((repository, outcome));
        }

        recorded
    }

    async fn init(&mut self) {
        let extra = self.options.extra_args.clone();
        let commands = self.per_repository(|repo| init_command(repo, &extra));
        let results = self.run_batch(&commands, INIT_ABORT_REASONS).await;
        let abort_reasons: Vec<String> = INIT_ABORT_REASONS.iter().map(|r| r.to_string()).collect();

        for (repository, slot) in self.repository_keys().into_iter().zip(results) {
            match slot {
                Err(e) => {
                    error!(repository = %repository, error = %e, "init could not run");
                    self.metrics.errors += 1;
                }
                Ok(result) if result.succeeded() => {
                    info!(repository = %repository, output = %result.output(), "repository initialized");
                }
                Ok(result) if !matched_abort_reasons(result.output(), &abort_reasons).is_empty() => {
                    if self.config.policy.init_already_initialized_is_error {
                        warn!(repository = %repository, rc = result.exit_code(), "repository already initialized");
                        self.metrics.errors += 1;
                    } else {
                        info!(repository = %repository, "repository already initialized");
                    }
                }
                Ok(result) => {
                    warn!(
                        repository = %repository,
                        rc = result.exit_code(),
                        output = %result.output(),
                        "init failed"
                    );
                    self.metrics.errors += 1;
                }
            }
        }
    }

    async fn run_hooks(&self, hooks: &[String], stage: &str) -> Option<HookMetrics> {
        if hooks.is_empty() {
            return None;
        }

        let commands: Vec<Command> = hooks.iter().map(Command::shell).collect();
        let config = self.config.execution.for_hooks();
        let results = self.batch.run(&commands, &config, &[]).await;

        let mut duration_seconds = 0.0;
        let mut failed = false;
        for (hook, slot) in hooks.iter().zip(results) {
            match slot {
                Ok(result) => {
                    duration_seconds += result.elapsed_seconds;
                    if !result.succeeded() {
                        warn!(stage, hook = %hook, rc = result.exit_code(), "hook failed");
                        failed = true;
                    }
                }
                Err(e) => {
                    error!(stage, hook = %hook, error = %e, "hook could not run");
                    failed = true;
                }
            }
        }

        Some(HookMetrics {
            duration_seconds,
            rc: i32::from(failed),
        })
    }

    async fn backup(&mut self) {
        let pre_hooks = self.run_hooks(&self.config.backup.pre_hooks, "pre").await;

        let extra = self.options.extra_args.clone();
        let section = self.config.backup.clone();
        let commands = self.per_repository(|repo| backup_command(repo, &section, &extra));
        let results = self.run_batch(&commands, REPOSITORY_ABORT_REASONS).await;
        let repositories = self.record("backup", results, parse_backup);

        let post_hooks = self.run_hooks(&self.config.backup.post_hooks, "post").await;

        self.metrics.backup = Some(BackupReport {
            pre_hooks,
            post_hooks,
            repositories,
        });
    }

    async fn forget(&mut self) {
        let extra = self.options.extra_args.clone();
        let dry_run = self.options.dry_run;
        let retention = self.config.prune.clone();
        let commands = self.per_repository(|repo| forget_command(repo, &retention, dry_run, &extra));
        let results = self.run_batch(&commands, REPOSITORY_ABORT_REASONS).await;
        self.metrics.forget = Some(self.record("forget", results, |output| Ok(parse_forget(output))));
    }

    async fn prune(&mut self) {
        let extra = self.options.extra_args.clone();
        let commands = self.per_repository(|repo| prune_command(repo, &extra));
        let results = self.run_batch(&commands, REPOSITORY_ABORT_REASONS).await;
        self.metrics.prune = Some(self.record("prune", results, parse_prune));
    }

    async fn check(&mut self) {
        let extra = self.options.extra_args.clone();
        let section = self.config.check.clone();
        let commands = self.per_repository(|repo| check_command(repo, &section, &extra));
        let results = self.run_batch(&commands, REPOSITORY_ABORT_REASONS).await;

        let flags = check_flags(&section);
        let read_data = u8::from(section.has(CheckMode::ReadData));
        let check_unused = u8::from(section.has(CheckMode::CheckUnused));
        debug!(flags = ?flags, "check flags");

        let mut recorded = Vec::with_capacity(results.len());
        for (repository, slot) in self.repository_keys().into_iter().zip(results) {
            let mut metrics = CheckMetrics {
                errors: 0,
                errors_data: 0,
                errors_snapshots: 0,
                read_data,
                check_unused,
                duration_seconds: 0.0,
                rc: 0,
            };

            match slot {
                Err(e) => {
                    error!(repository = %repository, error = %e, "check could not run");
                    self.metrics.errors += 1;
                    metrics.rc = -1;
                }
                Ok(result) => {
                    let output = result.output();
                    metrics.rc = result.exit_code();
                    metrics.duration_seconds = result.elapsed_seconds;

                    if !result.succeeded() {
                        warn!(
                            repository = %repository,
                            rc = metrics.rc,
                            output = %output,
                            "restic check failed"
                        );
                        self.metrics.errors += 1;
                    }
                    if output.contains("error: load <snapshot/") {
                        metrics.errors_snapshots = 1;
                        metrics.errors = 1;
                    }
                    if output.contains("Pack ID does not match,") {
                        metrics.errors_data = 1;
                        metrics.errors = 1;
                    }
                }
            }

            recorded.push((repository, metrics));
        }

        self.metrics.check = Some(recorded);
    }

    async fn stats(&mut self) {
        let extra = self.options.extra_args.clone();
        let commands = self.per_repository(|repo| stats_command(repo, &extra));
        let results = self.run_batch(&commands, REPOSITORY_ABORT_REASONS).await;
        self.metrics.stats = Some(self.record("stats", results, parse_stats));
    }

    async fn unlock(&mut self) {
        let extra = self.options.extra_args.clone();
        let commands = self.per_repository(|repo| unlock_command(repo, &extra));
        let results = self.run_batch(&commands, REPOSITORY_ABORT_REASONS).await;

        for (repository, slot) in self.repository_keys().into_iter().zip(results) {
            match slot {
                Ok(result) if result.succeeded() => {
                    info!(repository = %repository, output = %result.output(), "repository unlocked");
                }
                Ok(result) => {
                    warn!(
                        repository = %repository,
                        rc = result.exit_code(),
                        output = %result.output(),
                        "unlock failed"
                    );
                    self.metrics.errors += 1;
                }
                Err(e) => {
                    error!(repository = %repository, error = %e, "unlock could not run");
                    self.metrics.errors += 1;
                }
            }
        }
    }
}
