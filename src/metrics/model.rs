// src/metrics/model.rs

//! Typed metric records, one per restic operation.

use serde::Serialize;

/// Result of one operation against one repository.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepoOutcome<T> {
    /// Exit code 0 and the output parsed.
    Parsed { metrics: T, duration_seconds: f64 },
    /// Exit code 0 but the expected summary was missing from the output.
    Unparsed { duration_seconds: f64 },
    /// Non-zero final exit code (`-1` when the command could not run).
    Failed { rc: i32 },
}

impl<T> RepoOutcome<T> {
    pub fn rc(&self) -> i32 {
        match self {
            RepoOutcome::Failed { rc } => *rc,
            _ => 0,
        }
    }
}

/// Per-repository entries, kept in configuration order.
pub type PerRepository<T> = Vec<(String, T)>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupMetrics {
    pub files_new: u64,
    pub files_changed: u64,
    pub files_unmodified: u64,
    pub dirs_new: u64,
    pub dirs_changed: u64,
    pub dirs_unmodified: u64,
    pub processed_files: u64,
    pub processed_size_bytes: f64,
    pub processed_duration_seconds: u64,
    pub added_to_repo: f64,
}

/// Summary of pre- or post-backup hooks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HookMetrics {
    /// Sum of the hooks' own durations.
    pub duration_seconds: f64,
    /// 1 if any hook failed, else 0.
    pub rc: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForgetMetrics {
    pub removed_snapshots: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentPruneMetrics {
    pub to_repack_blobs: u64,
    pub to_repack_bytes: f64,
    pub removed_blobs: u64,
    pub removed_bytes: f64,
    pub to_delete_blobs: u64,
    pub to_delete_bytes: f64,
    pub total_prune_blobs: u64,
    pub total_prune_bytes: f64,
    pub remaining_blobs: u64,
    pub remaining_bytes: f64,
    pub remaining_unused_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyPruneMetrics {
    pub containing_packs_before: u64,
    pub containing_blobs: u64,
    pub containing_size_bytes: f64,
    pub duplicate_blobs: u64,
    pub duplicate_size_bytes: f64,
    pub in_use_blobs: u64,
    pub removed_blobs: u64,
    pub invalid_files: u64,
    pub deleted_packs: u64,
    pub rewritten_packs: u64,
    pub size_freed_bytes: f64,
    pub removed_index_files: u64,
}

/// `restic prune` reports in one of two shapes depending on the restic version.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum PruneMetrics {
    Current(CurrentPruneMetrics),
    Legacy(LegacyPruneMetrics),
}

/// `restic check` is always recorded, whatever its exit code: the error
/// flags come from scanning the output text, independently of `rc`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckMetrics {
    pub errors: u8,
    pub errors_data: u8,
    pub errors_snapshots: u8,
    pub read_data: u8,
    pub check_unused: u8,
    pub duration_seconds: f64,
    pub rc: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsMetrics {
    pub total_size_bytes: u64,
    pub total_file_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackupReport {
    pub pre_hooks: Option<HookMetrics>,
    pub post_hooks: Option<HookMetrics>,
    pub repositories: PerRepository<RepoOutcome<BackupMetrics>>,
}

/// Everything collected during one run of one config.
///
/// An operation's field stays `None` when that operation did not run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsTree {
    pub errors: u32,
    pub last_run: f64,
    pub total_duration_seconds: f64,
    pub backup: Option<BackupReport>,
    pub forget: Option<PerRepository<RepoOutcome<ForgetMetrics>>>,
    pub prune: Option<PerRepository<RepoOutcome<PruneMetrics>>>,
    pub check: Option<PerRepository<CheckMetrics>>,
    pub stats: Option<PerRepository<RepoOutcome<StatsMetrics>>>,
}
