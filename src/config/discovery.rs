// src/config/discovery.rs

//! Locating configuration files when `--config` is not given.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Candidate locations, in search order.
pub fn possible_config_paths() -> Vec<PathBuf> {
    let xdg = std::env::var("XDG_CONFIG_HOME").ok();
    let home = std::env::var("HOME").ok();
    possible_config_paths_from(xdg.as_deref(), home.as_deref())
}

pub fn possible_config_paths_from(xdg_config_home: Option<&str>, home: Option<&str>) -> Vec<PathBuf> {
    let user_config_dir = match xdg_config_home.filter(|v| !v.is_empty()) {
        Some(xdg) => PathBuf::from(xdg),
        None => PathBuf::from(home.unwrap_or_default()).join(".config"),
    };

    vec![
        PathBuf::from("/etc/runrestic.toml"),
        PathBuf::from("/etc/runrestic.json"),
        PathBuf::from("/etc/runrestic/"),
        user_config_dir.join("runrestic"),
    ]
}

/// Every usable config file found in the default locations.
pub fn configuration_file_paths() -> Vec<PathBuf> {
    find_config_files(&possible_config_paths())
}

/// Expand `candidates` into config files.
///
/// Files are taken as-is. Directories contribute their `*.toml` and `*.json`
/// files in name order, skipping files whose permissions let group or other
/// read them. Missing or unreadable candidates are ignored.
pub fn find_config_files(candidates: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();

    for candidate in candidates {
        let Ok(path) = fs::canonicalize(candidate) else {
            debug!(path = %candidate.display(), "no access to path, skipping");
            continue;
        };

        if path.is_file() {
            found.push(path);
            continue;
        }

        let entries = match fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "cannot list directory, skipping");
                continue;
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| has_config_extension(p) && p.is_file())
            .collect();
        files.sort();

        for file in files {
            if permissions_too_open(&file) {
                warn!(
                    path = %file.display(),
                    "NOT using config: file permissions are too open, set them to 0600"
                );
                continue;
            }
            found.push(file);
        }
    }

    found
}

fn has_config_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == "toml" || ext == "json")
}

#[cfg(unix)]
fn permissions_too_open(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o077 != 0)
        .unwrap_or(true)
}

#[cfg(not(unix))]
fn permissions_too_open(_path: &Path) -> bool {
    false
}
