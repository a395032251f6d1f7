// src/parse/backup.rs

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::errors::{Result, RunnerError};
use crate::metrics::model::BackupMetrics;
use crate::parse::units::{parse_size, parse_time};

static FILES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Files:\s+([0-9]+) new,\s+([0-9]+) changed,\s+([0-9]+) unmodified")
        .expect("files regex")
});

static DIRS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Dirs:\s+([0-9]+) new,\s+([0-9]+) changed,\s+([0-9]+) unmodified")
        .expect("dirs regex")
});

static ADDED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Added to the repo(?:sitory)?:\s+(-?[0-9.]+ ?[a-zA-Z]*B)").expect("added regex")
});

static PROCESSED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"processed ([0-9]+) files,\s+(-?[0-9.]+ ?[a-zA-Z]*B) in ([0-9]+(?::[0-9]+){1,2})")
        .expect("processed regex")
});

fn find<'t>(re: &Regex, output: &'t str, what: &str) -> Result<Captures<'t>> {
    re.captures(output)
        .ok_or_else(|| RunnerError::parse("backup", format!("missing {what} summary")))
}

fn count(caps: &Captures<'_>, i: usize) -> Result<u64> {
    caps[i]
        .parse()
        .map_err(|e| RunnerError::parse("backup", format!("bad count '{}': {e}", &caps[i])))
}

/// Extract the summary block of `restic backup`.
pub fn parse_backup(output: &str) -> Result<BackupMetrics> {
    let files = find(&FILES, output, "files")?;
    let dirs = find(&DIRS, output, "dirs")?;
    let added = find(&ADDED, output, "added-to-repo")?;
    let processed = find(&PROCESSED, output, "processed")?;

    Ok(BackupMetrics {
        files_new: count(&files, 1)?,
        files_changed: count(&files, 2)?,
        files_unmodified: count(&files, 3)?,
        dirs_new: count(&dirs, 1)?,
        dirs_changed: count(&dirs, 2)?,
        dirs_unmodified: count(&dirs, 3)?,
        processed_files: count(&processed, 1)?,
        processed_size_bytes: parse_size(&processed[2]),
        processed_duration_seconds: parse_time(&processed[3]),
        added_to_repo: parse_size(&added[1]),
    })
}
