// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{Config, RawConfigFile};
use crate::errors::Result;

/// Read a configuration file and return the raw `RawConfigFile`.
///
/// Files ending in `.json` are read as JSON, everything else as TOML. A
/// missing `name` is filled with the file's basename. No semantic validation
/// happens here; use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    debug!(path = %path.display(), "parsing configuration file");
    let contents = fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let mut config: RawConfigFile = if is_json {
        serde_json::from_str(&contents)?
    } else {
        toml::from_str(&contents)?
    };

    if config.name.is_none() {
        config.name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
    }

    Ok(config)
}

/// Load a configuration file and validate it into a [`Config`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config> {
    let raw_config = load_from_path(&path)?;
    let config = Config::try_from(raw_config)?;
    Ok(config)
}
