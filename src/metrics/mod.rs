// src/metrics/mod.rs

//! Typed metrics collected during a run and their Prometheus export.

pub mod model;
pub mod prometheus;

use std::fs;
use std::path::Path;

use tracing::info;

use crate::config::MetricsSection;
use crate::errors::{Result, RunnerError};

pub use model::{
    BackupMetrics, BackupReport, CheckMetrics, CurrentPruneMetrics, ForgetMetrics, HookMetrics,
    LegacyPruneMetrics, MetricsTree, PerRepository, PruneMetrics, RepoOutcome, StatsMetrics,
};

/// Write `metrics` to every configured exporter.
pub fn write_metrics(metrics: &MetricsTree, name: &str, section: &MetricsSection) -> Result<()> {
    if let Some(prometheus) = &section.prometheus {
        let text = prometheus::render(metrics, name);
        write_file(&prometheus.path, &text)?;
        info!(path = %prometheus.path.display(), "wrote prometheus metrics");
    }
    Ok(())
}

fn write_file(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).map_err(|source| RunnerError::MetricsWrite {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrometheusSection;

    #[test]
    fn writes_prometheus_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("restic.prom");
        let section = MetricsSection {
            prometheus: Some(PrometheusSection {
                path: path.clone(),
                password_replacement: String::new(),
            }),
        };

        write_metrics(&MetricsTree::default(), "cfg", &section).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("restic_total_errors{config=\"cfg\"} 0"));
    }

    #[test]
    fn unwritable_path_is_a_metrics_error() {
        let dir = tempfile::tempdir().unwrap();
        let section = MetricsSection {
            prometheus: Some(PrometheusSection {
                path: dir.path().join("missing").join("restic.prom"),
                password_replacement: String::new(),
            }),
        };

        let err = write_metrics(&MetricsTree::default(), "cfg", &section).unwrap_err();
        assert!(matches!(err, RunnerError::MetricsWrite { .. }));
    }
}
