// src/config/validate.rs

use crate::config::model::{Config, RawConfigFile};
use crate::errors::{Result, RunnerError};
use crate::exec::{Backoff, ExecutionConfig};

const PASSWORD_KEYS: [&str; 3] = [
    "RESTIC_PASSWORD",
    "RESTIC_PASSWORD_FILE",
    "RESTIC_PASSWORD_COMMAND",
];

impl TryFrom<RawConfigFile> for Config {
    type Error = RunnerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let name = validate_name(&raw)?;
        ensure_has_repositories(&raw)?;
        ensure_has_password(&raw)?;
        validate_prune_keys(&raw)?;
        let retry_backoff = parse_backoff(&raw)?;

        Ok(Config {
            name,
            repositories: raw.repositories,
            environment: raw.environment,
            execution: ExecutionConfig {
                parallel: raw.execution.parallel,
                shell: false,
                retry_count: raw.execution.retry_count,
                retry_backoff,
            },
            exit_on_error: raw.execution.exit_on_error,
            backup: raw.backup,
            prune: raw.prune,
            check: raw.check,
            metrics: raw.metrics,
            policy: raw.policy,
        })
    }
}

fn validate_name(cfg: &RawConfigFile) -> Result<String> {
    match cfg.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(RunnerError::ConfigError(
            "config must have a non-empty `name`".to_string(),
        )),
    }
}

fn ensure_has_repositories(cfg: &RawConfigFile) -> Result<()> {
    if cfg.repositories.is_empty() {
        return Err(RunnerError::ConfigError(
            "config must list at least one entry in `repositories`".to_string(),
        ));
    }
    if let Some(index) = cfg.repositories.iter().position(|r| r.trim().is_empty()) {
        return Err(RunnerError::ConfigError(format!(
            "repositories[{index}] is empty"
        )));
    }
    Ok(())
}

fn ensure_has_password(cfg: &RawConfigFile) -> Result<()> {
    let has_password = PASSWORD_KEYS
        .iter()
        .any(|key| cfg.environment.get(*key).is_some_and(|v| !v.is_empty()));

    if !has_password {
        return Err(RunnerError::ConfigError(format!(
            "[environment] must set one of {}",
            PASSWORD_KEYS.join(", ")
        )));
    }
    Ok(())
}

fn validate_prune_keys(cfg: &RawConfigFile) -> Result<()> {
    for key in cfg.prune.keys() {
        if key != "group-by" && !key.starts_with("keep-") {
            return Err(RunnerError::ConfigError(format!(
                "[prune] has unknown key '{key}' (expected `keep-*` or `group-by`)"
            )));
        }
    }
    Ok(())
}

fn parse_backoff(cfg: &RawConfigFile) -> Result<Option<Backoff>> {
    cfg.execution
        .retry_backoff
        .as_deref()
        .map(str::parse::<Backoff>)
        .transpose()
}
