// src/metrics/prometheus.rs

//! Rendering of a [`MetricsTree`] in the Prometheus text exposition format,
//! suitable for the node-exporter textfile collector.

use std::fmt::Write as _;

use crate::metrics::model::{
    BackupMetrics, CheckMetrics, ForgetMetrics, HookMetrics, MetricsTree, PerRepository,
    PruneMetrics, RepoOutcome, StatsMetrics,
};

type Help = &'static [(&'static str, &'static str)];

const GENERAL_HELP: Help = &[
    ("last_run", "Epoch timestamp of the last run"),
    ("total_duration_seconds", "Total duration in seconds"),
    ("total_errors", "Total amount of errors within the last run"),
];

const PRE_HOOKS_HELP: Help = &[
    ("duration_seconds", "Pre hooks duration in seconds"),
    ("rc", "Pre hooks return code"),
];

const POST_HOOKS_HELP: Help = &[
    ("duration_seconds", "Post hooks duration in seconds"),
    ("rc", "Post hooks return code"),
];

const BACKUP_HELP: Help = &[
    ("files_new", "Number of new files"),
    ("files_changed", "Number of changed files"),
    ("files_unmodified", "Number of unmodified files"),
    ("dirs_new", "Number of new dirs"),
    ("dirs_changed", "Number of changed dirs"),
    ("dirs_unmodified", "Number of unmodified dirs"),
    ("processed_files", "Number of processed files"),
    ("processed_size_bytes", "Processed size bytes"),
    ("processed_duration_seconds", "Backup processed duration in seconds"),
    ("added_to_repo", "Number of added to repo"),
    ("duration_seconds", "Backup duration in seconds"),
    ("rc", "Return code of the restic backup command"),
];

const FORGET_HELP: Help = &[
    ("removed_snapshots", "Number of forgotten snapshots"),
    ("duration_seconds", "Forget duration in seconds"),
    ("rc", "Return code of the restic forget command"),
];

const PRUNE_HELP: Help = &[
    ("containing_packs_before", "Number of packs contained in repository before pruning"),
    ("containing_blobs", "Number of blobs contained in repository before pruning"),
    ("containing_size_bytes", "Size in bytes contained in repository before pruning"),
    ("duplicate_blobs", "Number of duplicates found in the processed blobs"),
    ("duplicate_size_bytes", "Size in bytes of the duplicates found in the processed blobs"),
    ("in_use_blobs", "Number of blobs that are still in use (won't be removed)"),
    ("removed_blobs", "Number of blobs to remove"),
    ("invalid_files", "Number of invalid files to remove"),
    ("deleted_packs", "Number of packs to delete"),
    ("rewritten_packs", "Number of packs to rewrite"),
    ("size_freed_bytes", "Size in bytes freed after pack deletion"),
    ("removed_index_files", "Number of old index files removed"),
    ("to_repack_blobs", "Number of blobs to repack"),
    ("to_repack_bytes", "Size in bytes of the blobs to repack"),
    ("removed_bytes", "Size in bytes of the blobs to remove"),
    ("to_delete_blobs", "Number of unused blobs to delete"),
    ("to_delete_bytes", "Size in bytes of the unused blobs to delete"),
    ("total_prune_blobs", "Total number of blobs pruned"),
    ("total_prune_bytes", "Total size in bytes pruned"),
    ("remaining_blobs", "Number of blobs remaining after pruning"),
    ("remaining_bytes", "Size in bytes remaining after pruning"),
    ("remaining_unused_size", "Unused size in bytes remaining after pruning"),
    ("duration_seconds", "Duration in seconds"),
    ("rc", "Return code of the restic prune command"),
];

const CHECK_HELP: Help = &[
    ("errors", "Boolean to tell if any error occurred"),
    ("errors_data", "Boolean to tell if the pack ID does not match"),
    ("errors_snapshots", "Boolean to tell if any of the snapshots can not be loaded"),
    ("read_data", "Boolean that indicates whether or not `--read-data` was passed to restic"),
    ("check_unused", "Boolean that indicates whether or not `--check-unused` was passed to restic"),
    ("duration_seconds", "Duration in seconds"),
    ("rc", "Return code of the restic check command"),
];

const STATS_HELP: Help = &[
    ("total_file_count", "Stats for all snapshots in restore size mode - Total file count"),
    ("total_size_bytes", "Stats for all snapshots in restore size mode - Total file size in bytes"),
    ("duration_seconds", "Stats for all snapshots in restore size mode - Duration in seconds"),
    ("rc", "Stats for all snapshots in restore size mode - Return code of the restic stats command"),
];

/// Field name/value pairs a record contributes to the exposition.
pub trait Samples {
    fn samples(&self) -> Vec<(&'static str, String)>;
}

impl Samples for BackupMetrics {
    fn samples(&self) -> Vec<(&'static str, String)> {
        vec![
            ("files_new", self.files_new.to_string()),
            ("files_changed", self.files_changed.to_string()),
            ("files_unmodified", self.files_unmodified.to_string()),
            ("dirs_new", self.dirs_new.to_string()),
            ("dirs_changed", self.dirs_changed.to_string()),
            ("dirs_unmodified", self.dirs_unmodified.to_string()),
            ("processed_files", self.processed_files.to_string()),
            ("processed_size_bytes", self.processed_size_bytes.to_string()),
            ("processed_duration_seconds", self.processed_duration_seconds.to_string()),
            ("added_to_repo", self.added_to_repo.to_string()),
        ]
    }
}

impl Samples for ForgetMetrics {
    fn samples(&self) -> Vec<(&'static str, String)> {
        vec![("removed_snapshots", self.removed_snapshots.to_string())]
    }
}

impl Samples for PruneMetrics {
    fn samples(&self) -> Vec<(&'static str, String)> {
        match self {
            PruneMetrics::Current(m) => vec![
                ("to_repack_blobs", m.to_repack_blobs.to_string()),
                ("to_repack_bytes", m.to_repack_bytes.to_string()),
                ("removed_blobs", m.removed_blobs.to_string()),
                ("removed_bytes", m.removed_bytes.to_string()),
                ("to_delete_blobs", m.to_delete_blobs.to_string()),
                ("to_delete_bytes", m.to_delete_bytes.to_string()),
                ("total_prune_blobs", m.total_prune_blobs.to_string()),
                ("total_prune_bytes", m.total_prune_bytes.to_string()),
                ("remaining_blobs", m.remaining_blobs.to_string()),
                ("remaining_bytes", m.remaining_bytes.to_string()),
                ("remaining_unused_size", m.remaining_unused_size.to_string()),
            ],
            PruneMetrics::Legacy(m) => vec![
                ("containing_packs_before", m.containing_packs_before.to_string()),
                ("containing_blobs", m.containing_blobs.to_string()),
                ("containing_size_bytes", m.containing_size_bytes.to_string()),
                ("duplicate_blobs", m.duplicate_blobs.to_string()),
                ("duplicate_size_bytes", m.duplicate_size_bytes.to_string()),
                ("in_use_blobs", m.in_use_blobs.to_string()),
                ("removed_blobs", m.removed_blobs.to_string()),
                ("invalid_files", m.invalid_files.to_string()),
                ("deleted_packs", m.deleted_packs.to_string()),
                ("rewritten_packs", m.rewritten_packs.to_string()),
                ("size_freed_bytes", m.size_freed_bytes.to_string()),
                ("removed_index_files", m.removed_index_files.to_string()),
            ],
        }
    }
}

impl Samples for StatsMetrics {
    fn samples(&self) -> Vec<(&'static str, String)> {
        vec![
            ("total_file_count", self.total_file_count.to_string()),
            ("total_size_bytes", self.total_size_bytes.to_string()),
        ]
    }
}

impl Samples for CheckMetrics {
    fn samples(&self) -> Vec<(&'static str, String)> {
        if self.rc != 0 {
            return vec![("rc", self.rc.to_string())];
        }
        vec![
            ("errors", self.errors.to_string()),
            ("errors_data", self.errors_data.to_string()),
            ("errors_snapshots", self.errors_snapshots.to_string()),
            ("read_data", self.read_data.to_string()),
            ("check_unused", self.check_unused.to_string()),
            ("duration_seconds", self.duration_seconds.to_string()),
            ("rc", self.rc.to_string()),
        ]
    }
}

impl Samples for HookMetrics {
    fn samples(&self) -> Vec<(&'static str, String)> {
        vec![
            ("duration_seconds", self.duration_seconds.to_string()),
            ("rc", self.rc.to_string()),
        ]
    }
}

impl<T: Samples> Samples for RepoOutcome<T> {
    fn samples(&self) -> Vec<(&'static str, String)> {
        match self {
            RepoOutcome::Parsed {
                metrics,
                duration_seconds,
            } => {
                let mut samples = metrics.samples();
                samples.push(("duration_seconds", duration_seconds.to_string()));
                samples.push(("rc", "0".to_string()));
                samples
            }
            RepoOutcome::Unparsed { duration_seconds } => vec![
                ("duration_seconds", duration_seconds.to_string()),
                ("rc", "0".to_string()),
            ],
            RepoOutcome::Failed { rc } => vec![("rc", rc.to_string())],
        }
    }
}

/// Escape a label value (`\`, `"` and newlines).
pub fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn write_help(out: &mut String, prefix: &str, help: Help) {
    for (field, text) in help {
        let _ = writeln!(out, "# HELP {prefix}_{field} {text}");
        let _ = writeln!(out, "# TYPE {prefix}_{field} gauge");
    }
}

fn write_samples(out: &mut String, prefix: &str, labels: &str, record: &impl Samples) {
    for (field, value) in record.samples() {
        let _ = writeln!(out, "{prefix}_{field}{{{labels}}} {value}");
    }
}

fn write_repositories<T: Samples>(
    out: &mut String,
    prefix: &str,
    config_label: &str,
    entries: &PerRepository<T>,
) {
    for (repository, record) in entries {
        let labels = format!("{config_label},repository=\"{}\"", escape_label(repository));
        write_samples(out, prefix, &labels, record);
    }
}

/// Render the whole tree for config `name`.
pub fn render(metrics: &MetricsTree, name: &str) -> String {
    let config_label = format!("config=\"{}\"", escape_label(name));
    let mut out = String::new();

    write_help(&mut out, "restic", GENERAL_HELP);
    let _ = writeln!(out, "restic_last_run{{{config_label}}} {}", metrics.last_run);
    let _ = writeln!(
        out,
        "restic_total_duration_seconds{{{config_label}}} {}",
        metrics.total_duration_seconds
    );
    let _ = writeln!(out, "restic_total_errors{{{config_label}}} {}", metrics.errors);

    if let Some(backup) = &metrics.backup {
        write_help(&mut out, "restic_backup", BACKUP_HELP);
        if let Some(pre) = &backup.pre_hooks {
            write_help(&mut out, "restic_pre_hooks", PRE_HOOKS_HELP);
            write_samples(&mut out, "restic_pre_hooks", &config_label, pre);
        }
        write_repositories(&mut out, "restic_backup", &config_label, &backup.repositories);
        if let Some(post) = &backup.post_hooks {
            write_help(&mut out, "restic_post_hooks", POST_HOOKS_HELP);
            write_samples(&mut out, "restic_post_hooks", &config_label, post);
        }
    }

    if let Some(forget) = &metrics.forget {
        write_help(&mut out, "restic_forget", FORGET_HELP);
        write_repositories(&mut out, "restic_forget", &config_label, forget);
    }

    if let Some(prune) = &metrics.prune {
        write_help(&mut out, "restic_prune", PRUNE_HELP);
        write_repositories(&mut out, "restic_prune", &config_label, prune);
    }

    if let Some(check) = &metrics.check {
        write_help(&mut out, "restic_check", CHECK_HELP);
        write_repositories(&mut out, "restic_check", &config_label, check);
    }

    if let Some(stats) = &metrics.stats {
        write_help(&mut out, "restic_stats", STATS_HELP);
        write_repositories(&mut out, "restic_stats", &config_label, stats);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::model::{BackupReport, CurrentPruneMetrics};

    fn sample_lines(text: &str) -> Vec<&str> {
        text.lines().filter(|l| !l.starts_with('#')).collect()
    }

    #[test]
    fn general_block_is_always_rendered() {
        let tree = MetricsTree {
            errors: 2,
            last_run: 1700000000.5,
            total_duration_seconds: 12.25,
            ..Default::default()
        };

        let text = render(&tree, "nightly");

        assert!(text.contains("# TYPE restic_last_run gauge"));
        assert_eq!(
            sample_lines(&text),
            vec![
                "restic_last_run{config=\"nightly\"} 1700000000.5",
                "restic_total_duration_seconds{config=\"nightly\"} 12.25",
                "restic_total_errors{config=\"nightly\"} 2",
            ]
        );
    }

    #[test]
    fn failed_repository_only_renders_rc() {
        let tree = MetricsTree {
            forget: Some(vec![
                (
                    "/srv/a".to_string(),
                    RepoOutcome::Parsed {
                        metrics: ForgetMetrics { removed_snapshots: 3 },
                        duration_seconds: 1.5,
                    },
                ),
                ("/srv/b".to_string(), RepoOutcome::Failed { rc: 1 }),
            ]),
            ..Default::default()
        };

        let text = render(&tree, "cfg");
        let forget: Vec<_> = sample_lines(&text)
            .into_iter()
            .filter(|l| l.starts_with("restic_forget"))
            .collect();

        assert_eq!(
            forget,
            vec![
                "restic_forget_removed_snapshots{config=\"cfg\",repository=\"/srv/a\"} 3",
                "restic_forget_duration_seconds{config=\"cfg\",repository=\"/srv/a\"} 1.5",
                "restic_forget_rc{config=\"cfg\",repository=\"/srv/a\"} 0",
                "restic_forget_rc{config=\"cfg\",repository=\"/srv/b\"} 1",
            ]
        );
    }

    #[test]
    fn hooks_use_only_the_config_label() {
        let tree = MetricsTree {
            backup: Some(BackupReport {
                pre_hooks: Some(HookMetrics {
                    duration_seconds: 0.5,
                    rc: 1,
                }),
                post_hooks: None,
                repositories: vec![],
            }),
            ..Default::default()
        };

        let text = render(&tree, "cfg");

        assert!(text.contains("restic_pre_hooks_duration_seconds{config=\"cfg\"} 0.5\n"));
        assert!(text.contains("restic_pre_hooks_rc{config=\"cfg\"} 1\n"));
        assert!(!text.contains("restic_post_hooks"));
    }

    #[test]
    fn current_prune_shape_renders_its_own_fields() {
        let tree = MetricsTree {
            prune: Some(vec![(
                "repo".to_string(),
                RepoOutcome::Parsed {
                    metrics: PruneMetrics::Current(CurrentPruneMetrics {
                        to_repack_blobs: 1,
                        to_repack_bytes: 1234.0,
                        removed_blobs: 2,
                        removed_bytes: 5678.0,
                        to_delete_blobs: 32,
                        to_delete_bytes: 162641.92,
                        total_prune_blobs: 35,
                        total_prune_bytes: 162641.92,
                        remaining_blobs: 19154,
                        remaining_bytes: 1.0,
                        remaining_unused_size: 0.0,
                    }),
                    duration_seconds: 8.47,
                },
            )]),
            ..Default::default()
        };

        let text = render(&tree, "cfg");

        assert!(text.contains("restic_prune_to_repack_bytes{config=\"cfg\",repository=\"repo\"} 1234\n"));
        assert!(text.contains("restic_prune_to_delete_bytes{config=\"cfg\",repository=\"repo\"} 162641.92\n"));
        assert!(!text.contains("restic_prune_containing_packs_before{"));
    }

    #[test]
    fn check_flags_render_when_rc_is_zero() {
        let tree = MetricsTree {
            check: Some(vec![(
                "repo".to_string(),
                CheckMetrics {
                    errors: 1,
                    errors_data: 1,
                    errors_snapshots: 0,
                    read_data: 1,
                    check_unused: 0,
                    duration_seconds: 2.0,
                    rc: 0,
                },
            )]),
            ..Default::default()
        };

        let text = render(&tree, "cfg");

        assert!(text.contains("restic_check_errors_data{config=\"cfg\",repository=\"repo\"} 1\n"));
        assert!(text.contains("restic_check_read_data{config=\"cfg\",repository=\"repo\"} 1\n"));
    }

    #[test]
    fn label_values_are_escaped() {
        assert_eq!(escape_label(r#"a"b\c"#), r#"a\"b\\c"#);
    }
}
