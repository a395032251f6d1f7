// src/parse/stats.rs

use serde::Deserialize;

use crate::errors::{Result, RunnerError};
use crate::metrics::model::StatsMetrics;

#[derive(Debug, Deserialize)]
struct StatsJson {
    total_size: u64,
    total_file_count: u64,
}

/// Parse `restic stats --json`.
///
/// Without `-q` restic may print notices before the JSON document, so the
/// last line that looks like a JSON object is used.
pub fn parse_stats(output: &str) -> Result<StatsMetrics> {
    let line = output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with('{'))
        .ok_or_else(|| RunnerError::parse("stats", "no JSON object in output"))?;

    let stats: StatsJson = serde_json::from_str(line)?;

    Ok(StatsMetrics {
        total_size_bytes: stats.total_size,
        total_file_count: stats.total_file_count,
    })
}
