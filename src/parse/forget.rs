// src/parse/forget.rs

use std::sync::LazyLock;

use regex::Regex;

use crate::metrics::model::ForgetMetrics;

static REMOVED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"remove ([0-9]+) snapshots").expect("forget regex"));

/// Number of snapshots `restic forget` removed; 0 when nothing matched the policy.
pub fn parse_forget(output: &str) -> ForgetMetrics {
    let removed_snapshots = REMOVED
        .captures(output)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0);

    ForgetMetrics { removed_snapshots }
}
