#![allow(dead_code)]

use std::path::Path;

use restic_runner::config::{
    CheckMode, Config, MetricsSection, PrometheusSection, PruneValue, RawConfigFile,
};

/// Builder for `Config` to simplify test setup.
///
/// Starts from a config named `test` with `RESTIC_PASSWORD` set and no
/// repositories.
pub struct ConfigBuilder {
    config: RawConfigFile,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile {
            name: Some("test".to_string()),
            ..Default::default()
        };
        config
            .environment
            .insert("RESTIC_PASSWORD".to_string(), "secret".to_string());
        Self { config }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.config.name = Some(name.to_string());
        self
    }

    pub fn repository(mut self, repo: &str) -> Self {
        self.config.repositories.push(repo.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.config
            .environment
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn parallel(mut self, val: bool) -> Self {
        self.config.execution.parallel = val;
        self
    }

    pub fn exit_on_error(mut self, val: bool) -> Self {
        self.config.execution.exit_on_error = val;
        self
    }

    pub fn retry_count(mut self, n: u32) -> Self {
        self.config.execution.retry_count = n;
        self
    }

    pub fn retry_backoff(mut self, text: &str) -> Self {
        self.config.execution.retry_backoff = Some(text.to_string());
        self
    }

    pub fn source(mut self, path: &str) -> Self {
        self.config.backup.sources.push(path.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.config.backup.exclude_patterns.push(pattern.to_string());
        self
    }

    pub fn pre_hook(mut self, script: &str) -> Self {
        self.config.backup.pre_hooks.push(script.to_string());
        self
    }

    pub fn post_hook(mut self, script: &str) -> Self {
        self.config.backup.post_hooks.push(script.to_string());
        self
    }

    pub fn keep(mut self, key: &str, value: i64) -> Self {
        self.config
            .prune
            .insert(format!("keep-{key}"), PruneValue::Number(value));
        self
    }

    pub fn check(mut self, mode: CheckMode) -> Self {
        self.config.check.checks.push(mode);
        self
    }

    pub fn prometheus(mut self, path: &Path, password_replacement: &str) -> Self {
        self.config.metrics = Some(MetricsSection {
            prometheus: Some(PrometheusSection {
                path: path.to_path_buf(),
                password_replacement: password_replacement.to_string(),
            }),
        });
        self
    }

    pub fn init_already_initialized_is_error(mut self, val: bool) -> Self {
        self.config.policy.init_already_initialized_is_error = val;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> Config {
        Config::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
