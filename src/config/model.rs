// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

use crate::exec::{ChildEnvironment, ExecutionConfig};

/// One configuration file as read from disk (TOML or JSON).
///
/// ```toml
/// name = "nightly"
/// repositories = ["/srv/backup", "sftp:user@host:/restic"]
///
/// [environment]
/// RESTIC_PASSWORD = "secret"
///
/// [execution]
/// parallel = true
/// retry_count = 2
/// retry_backoff = "0:30 exponential"
///
/// [backup]
/// sources = ["/home", "/etc"]
/// exclude_patterns = ["*.tmp"]
///
/// [prune]
/// keep-daily = 7
/// keep-within = "30d"
///
/// [check]
/// checks = ["check-unused", "read-data"]
///
/// [metrics.prometheus]
/// path = "/var/lib/node_exporter/textfile_collector/restic.prom"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Defaults to the file's basename when loaded from disk.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub repositories: Vec<String>,

    /// Extra variables for every restic child process.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    #[serde(default)]
    pub execution: RawExecutionSection,

    #[serde(default)]
    pub backup: BackupSection,

    /// `keep-*` retention flags and `group-by`, passed to `restic forget`.
    #[serde(default)]
    pub prune: BTreeMap<String, PruneValue>,

    #[serde(default)]
    pub check: CheckSection,

    #[serde(default)]
    pub metrics: Option<MetricsSection>,

    #[serde(default)]
    pub policy: PolicySection,
}

/// `[execution]` before the backoff string is parsed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExecutionSection {
    #[serde(default)]
    pub parallel: bool,

    /// Stop running further actions once an error was counted.
    #[serde(default)]
    pub exit_on_error: bool,

    #[serde(default)]
    pub retry_count: u32,

    /// `"<H:MM:SS|M:SS> [static|linear|exponential]"`.
    #[serde(default)]
    pub retry_backoff: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BackupSection {
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub files_from: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default)]
    pub exclude_files: Vec<String>,
    #[serde(default)]
    pub exclude_if_present: Vec<String>,
    /// Shell snippets run one at a time before the backup.
    #[serde(default)]
    pub pre_hooks: Vec<String>,
    #[serde(default)]
    pub post_hooks: Vec<String>,
}

/// A retention value: `keep-last = 3` or `keep-within = "2y5m"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PruneValue {
    Number(i64),
    Text(String),
}

impl fmt::Display for PruneValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PruneValue::Number(n) => write!(f, "{n}"),
            PruneValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckMode {
    CheckUnused,
    ReadData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckSection {
    #[serde(default)]
    pub checks: Vec<CheckMode>,
}

impl CheckSection {
    pub fn has(&self, mode: CheckMode) -> bool {
        self.checks.contains(&mode)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MetricsSection {
    #[serde(default)]
    pub prometheus: Option<PrometheusSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrometheusSection {
    /// Target file, usually inside the node-exporter textfile directory.
    pub path: PathBuf,

    /// Replaces passwords in repository labels; empty drops them.
    #[serde(default)]
    pub password_replacement: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PolicySection {
    /// Count `init` on an already initialized repository as an error.
    #[serde(default)]
    pub init_already_initialized_is_error: bool,
}

/// A validated configuration, ready to drive a run.
///
/// Built with `Config::try_from(RawConfigFile)`.
#[derive(Debug, Clone)]
pub struct Config {
    pub name: String,
    pub repositories: Vec<String>,
    pub environment: ChildEnvironment,
    pub execution: ExecutionConfig,
    pub exit_on_error: bool,
    pub backup: BackupSection,
    pub prune: BTreeMap<String, PruneValue>,
    pub check: CheckSection,
    pub metrics: Option<MetricsSection>,
    pub policy: PolicySection,
}

impl Config {
    /// Replacement used when redacting repository passwords in metrics.
    pub fn password_replacement(&self) -> &str {
        self.metrics
            .as_ref()
            .and_then(|m| m.prometheus.as_ref())
            .map_or("", |p| p.password_replacement.as_str())
    }
}
