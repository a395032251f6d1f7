// src/runner/commands.rs

//! restic command lines, one builder per verb.
//!
//! Every line starts with `restic -r <repository> <verb>`, followed by the
//! pass-through arguments and then the verb's own flags.

use std::collections::BTreeMap;

use crate::config::{BackupSection, CheckMode, CheckSection, PruneValue};
use crate::exec::Command;

pub const RESTIC_BIN: &str = "restic";

/// Abort reasons for `restic init`.
pub const INIT_ABORT_REASONS: &[&str] = &["config file already exists"];

/// Abort reasons for every verb that opens an existing repository.
pub const REPOSITORY_ABORT_REASONS: &[&str] =
    &["Fatal: unable to open config file", "Fatal: wrong password"];

fn restic(repository: &str, verb: &str, extra_args: &[String]) -> Vec<String> {
    let mut argv = vec![
        RESTIC_BIN.to_string(),
        "-r".to_string(),
        repository.to_string(),
        verb.to_string(),
    ];
    argv.extend(extra_args.iter().cloned());
    argv
}

fn push_each(argv: &mut Vec<String>, flag: &str, values: &[String]) {
    for value in values {
        argv.push(flag.to_string());
        argv.push(value.clone());
    }
}

pub fn init_command(repository: &str, extra_args: &[String]) -> Command {
    Command::argv(restic(repository, "init", extra_args))
}

pub fn backup_command(repository: &str, backup: &BackupSection, extra_args: &[String]) -> Command {
    let mut argv = restic(repository, "backup", extra_args);
    push_each(&mut argv, "--files-from", &backup.files_from);
    push_each(&mut argv, "--exclude", &backup.exclude_patterns);
    push_each(&mut argv, "--exclude-file", &backup.exclude_files);
    push_each(&mut argv, "--exclude-if-present", &backup.exclude_if_present);
    argv.extend(backup.sources.iter().cloned());
    Command::argv(argv)
}

pub fn forget_command(
    repository: &str,
    retention: &BTreeMap<String, PruneValue>,
    dry_run: bool,
    extra_args: &[String],
) -> Command {
    let mut argv = restic(repository, "forget", extra_args);
    if dry_run {
        argv.push("--dry-run".to_string());
    }
    for (key, value) in retention {
        if key.starts_with("keep-") || key == "group-by" {
            argv.push(format!("--{key}"));
            argv.push(value.to_string());
        }
    }
    Command::argv(argv)
}

pub fn prune_command(repository: &str, extra_args: &[String]) -> Command {
    Command::argv(restic(repository, "prune", extra_args))
}

/// Check flags in a fixed order, whatever the order in the config.
pub fn check_flags(check: &CheckSection) -> Vec<String> {
    let mut flags = Vec::new();
    if check.has(CheckMode::CheckUnused) {
        flags.push("--check-unused".to_string());
    }
    if check.has(CheckMode::ReadData) {
        flags.push("--read-data".to_string());
    }
    flags
}

pub fn check_command(repository: &str, check: &CheckSection, extra_args: &[String]) -> Command {
    let mut argv = restic(repository, "check", extra_args);
    argv.extend(check_flags(check));
    Command::argv(argv)
}

/// `restic stats --json`, quiet unless a `--verbose*` flag is passed through
/// (restic rejects both together).
pub fn stats_command(repository: &str, extra_args: &[String]) -> Command {
    let mut argv = restic(repository, "stats", &[]);
    argv.push("--json".to_string());
    if !extra_args.iter().any(|a| a.starts_with("--verbose")) {
        argv.push("-q".to_string());
    }
    argv.extend(extra_args.iter().cloned());
    Command::argv(argv)
}

pub fn unlock_command(repository: &str, extra_args: &[String]) -> Command {
    Command::argv(restic(repository, "unlock", extra_args))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(cmd: &Command) -> Vec<String> {
        cmd.tokens()
    }

    #[test]
    fn backup_flags_precede_sources() {
        let backup = BackupSection {
            sources: vec!["/home".into(), "/etc".into()],
            files_from: vec!["/etc/restic.list".into()],
            exclude_patterns: vec!["*.tmp".into()],
            exclude_files: vec!["/etc/restic.exclude".into()],
            exclude_if_present: vec![".nobackup".into()],
            ..Default::default()
        };

        let cmd = backup_command("/srv/repo", &backup, &["--one-file-system".to_string()]);

        assert_eq!(
            tokens(&cmd),
            vec![
                "restic", "-r", "/srv/repo", "backup", "--one-file-system",
                "--files-from", "/etc/restic.list",
                "--exclude", "*.tmp",
                "--exclude-file", "/etc/restic.exclude",
                "--exclude-if-present", ".nobackup",
                "/home", "/etc",
            ]
        );
    }

    #[test]
    fn forget_passes_retention_and_dry_run() {
        let retention = BTreeMap::from([
            ("group-by".to_string(), PruneValue::Text("host".into())),
            ("keep-daily".to_string(), PruneValue::Number(7)),
        ]);

        let cmd = forget_command("repo", &retention, true, &[]);

        assert_eq!(
            tokens(&cmd),
            vec![
                "restic", "-r", "repo", "forget", "--dry-run",
                "--group-by", "host", "--keep-daily", "7",
            ]
        );
    }

    #[test]
    fn check_flags_have_fixed_order() {
        let check = CheckSection {
            checks: vec![CheckMode::ReadData, CheckMode::CheckUnused],
        };
        assert_eq!(
            tokens(&check_command("repo", &check, &[])),
            vec!["restic", "-r", "repo", "check", "--check-unused", "--read-data"]
        );
    }

    #[test]
    fn stats_is_quiet_unless_verbose() {
        assert_eq!(
            tokens(&stats_command("repo", &[])),
            vec!["restic", "-r", "repo", "stats", "--json", "-q"]
        );
        assert_eq!(
            tokens(&stats_command("repo", &["--verbose=2".to_string()])),
            vec!["restic", "-r", "repo", "stats", "--json", "--verbose=2"]
        );
    }

    #[test]
    fn simple_verbs() {
        assert_eq!(
            tokens(&init_command("repo", &[])),
            vec!["restic", "-r", "repo", "init"]
        );
        assert_eq!(
            tokens(&unlock_command("repo", &["--remove-all".to_string()])),
            vec!["restic", "-r", "repo", "unlock", "--remove-all"]
        );
        assert_eq!(
            tokens(&prune_command("repo", &[])),
            vec!["restic", "-r", "repo", "prune"]
        );
    }
}
