// src/config/mod.rs

pub mod discovery;
pub mod loader;
pub mod model;
pub mod validate;

pub use discovery::{configuration_file_paths, possible_config_paths};
pub use loader::{load_and_validate, load_from_path};
pub use model::{
    BackupSection, CheckMode, CheckSection, Config, MetricsSection, PolicySection,
    PrometheusSection, PruneValue, RawConfigFile, RawExecutionSection,
};
