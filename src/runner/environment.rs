// src/runner/environment.rs

//! The environment handed to restic children.
//!
//! Nothing here touches the parent's environment: the map built by
//! [`child_environment`] is applied per child with `Command::envs`.

use std::collections::BTreeMap;

use tracing::debug;

use crate::exec::ChildEnvironment;

const MASK: &str = "**********";
const SYSTEM_CACHE: &str = "/var/cache";

/// Facts about the current process that influence the child environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostContext {
    pub is_root: bool,
    pub has_home: bool,
    pub has_xdg_cache_home: bool,
}

impl HostContext {
    pub fn detect() -> Self {
        let set = |key: &str| std::env::var_os(key).is_some_and(|v| !v.is_empty());
        Self {
            is_root: running_as_root(),
            has_home: set("HOME"),
            has_xdg_cache_home: set("XDG_CACHE_HOME"),
        }
    }
}

/// Build the child environment for one config on this host.
pub fn child_environment(
    configured: &BTreeMap<String, String>,
    show_progress: Option<f64>,
) -> ChildEnvironment {
    build_environment(configured, show_progress, HostContext::detect())
}

pub fn build_environment(
    configured: &BTreeMap<String, String>,
    show_progress: Option<f64>,
    host: HostContext,
) -> ChildEnvironment {
    let mut env = ChildEnvironment::new();

    for (key, value) in configured {
        let shown = if key == "RESTIC_PASSWORD" { MASK } else { value.as_str() };
        debug!(key = %key, value = %shown, "[Environment]");
        env.insert(key.clone(), value.clone());
    }

    // root uses the system cache; so does a user without any home
    let configured_cache = env.contains_key("XDG_CACHE_HOME");
    if !configured_cache && (host.is_root || !(host.has_home || host.has_xdg_cache_home)) {
        env.insert("XDG_CACHE_HOME".to_string(), SYSTEM_CACHE.to_string());
    }

    if let Some(interval) = show_progress.filter(|s| *s > 0.0) {
        env.insert("RESTIC_PROGRESS_FPS".to_string(), (1.0 / interval).to_string());
    }

    env
}

#[cfg(target_os = "linux")]
fn running_as_root() -> bool {
    use std::os::unix::fs::MetadataExt;

    // /proc/self belongs to the effective uid
    std::fs::metadata("/proc/self").is_ok_and(|m| m.uid() == 0)
}

#[cfg(not(target_os = "linux"))]
fn running_as_root() -> bool {
    std::env::var("USER").is_ok_and(|user| user == "root")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_host() -> HostContext {
        HostContext {
            is_root: false,
            has_home: true,
            has_xdg_cache_home: false,
        }
    }

    fn configured() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("RESTIC_PASSWORD".to_string(), "secret".to_string()),
            ("B2_ACCOUNT_ID".to_string(), "id".to_string()),
        ])
    }

    #[test]
    fn configured_values_are_passed_through() {
        let env = build_environment(&configured(), None, user_host());

        assert_eq!(env.get("RESTIC_PASSWORD").map(String::as_str), Some("secret"));
        assert_eq!(env.get("B2_ACCOUNT_ID").map(String::as_str), Some("id"));
        assert!(!env.contains_key("XDG_CACHE_HOME"));
        assert!(!env.contains_key("RESTIC_PROGRESS_FPS"));
    }

    #[test]
    fn root_and_homeless_users_get_system_cache() {
        let root = HostContext {
            is_root: true,
            ..user_host()
        };
        let homeless = HostContext::default();

        for host in [root, homeless] {
            let env = build_environment(&configured(), None, host);
            assert_eq!(env.get("XDG_CACHE_HOME").map(String::as_str), Some("/var/cache"));
        }
    }

    #[test]
    fn configured_cache_is_kept() {
        let mut cfg = configured();
        cfg.insert("XDG_CACHE_HOME".to_string(), "/srv/cache".to_string());

        let env = build_environment(&cfg, None, HostContext::default());
        assert_eq!(env.get("XDG_CACHE_HOME").map(String::as_str), Some("/srv/cache"));
    }

    #[test]
    fn show_progress_sets_fps() {
        let env = build_environment(&configured(), Some(4.0), user_host());
        assert_eq!(env.get("RESTIC_PROGRESS_FPS").map(String::as_str), Some("0.25"));
    }
}
