// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::runner::{Action, split_actions};

/// Command-line arguments for `restic-runner`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "restic-runner",
    version,
    about = "Run restic based on config files and export Prometheus metrics.",
    long_about = "Run restic based on config files and export Prometheus metrics.\n\n\
        To initialize the repositories, run `restic-runner init`. Without actions it runs \
        `backup prune check`, plus `stats` when metrics are configured."
)]
pub struct CliArgs {
    /// Actions (init, backup, prune, check, stats, unlock). Other words are
    /// passed to restic.
    #[arg(value_name = "ACTION")]
    pub words: Vec<String>,

    /// Arguments after `--`, passed to restic verbatim.
    #[arg(last = true, value_name = "RESTIC_ARGS")]
    pub restic_args: Vec<String>,

    /// Apply --dry-run where applicable (forget) and skip writing metrics.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Logging level.
    ///
    /// If omitted, `RESTIC_RUNNER_LOG` or `info` is used.
    #[arg(short = 'l', long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Use this configuration file instead of searching the default locations.
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Interval in seconds between restic progress updates.
    #[arg(long, value_name = "SECONDS")]
    pub show_progress: Option<f64>,
}

impl CliArgs {
    /// Requested actions and the arguments to pass through to restic.
    pub fn actions_and_restic_args(&self) -> (Vec<Action>, Vec<String>) {
        let (actions, mut extra) = split_actions(&self.words);
        extra.extend(self.restic_args.iter().cloned());
        (actions, extra)
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Critical,
    Error,
    #[value(alias = "warn")]
    Warning,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_words_and_passthrough() {
        let args = CliArgs::try_parse_from([
            "restic-runner",
            "-n",
            "backup",
            "stats",
            "--",
            "--verbose",
            "init",
        ])
        .unwrap();

        let (actions, extra) = args.actions_and_restic_args();

        assert!(args.dry_run);
        assert_eq!(actions, vec![Action::Backup, Action::Stats]);
        assert_eq!(extra, vec!["--verbose", "init"]);
    }

    #[test]
    fn options_parse() {
        let args = CliArgs::try_parse_from([
            "restic-runner",
            "-c",
            "/etc/runrestic/home.toml",
            "--log-level",
            "warn",
            "--show-progress",
            "2",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("/etc/runrestic/home.toml")));
        assert_eq!(args.log_level, Some(LogLevel::Warning));
        assert_eq!(args.show_progress, Some(2.0));
        assert!(args.words.is_empty());
    }
}
