// src/runner/actions.rs

use std::fmt;
use std::str::FromStr;

/// One step of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Init,
    Backup,
    /// `restic forget` with the retention flags, then `restic prune`.
    Prune,
    Check,
    Stats,
    Unlock,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Init,
        Action::Backup,
        Action::Prune,
        Action::Check,
        Action::Stats,
        Action::Unlock,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Init => "init",
            Action::Backup => "backup",
            Action::Prune => "prune",
            Action::Check => "check",
            Action::Stats => "stats",
            Action::Unlock => "unlock",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown action '{s}'"))
    }
}

/// Actions run when none are requested: `backup prune check`, plus `stats`
/// when metrics will be written.
pub fn default_actions(with_metrics: bool) -> Vec<Action> {
    let mut actions = vec![Action::Backup, Action::Prune, Action::Check];
    if with_metrics {
        actions.push(Action::Stats);
    }
    actions
}

/// Split positional words into actions and arguments for restic.
///
/// Words naming an action become actions; anything else is passed through
/// to restic in its original order.
pub fn split_actions(words: &[String]) -> (Vec<Action>, Vec<String>) {
    let mut actions = Vec::new();
    let mut extra = Vec::new();

    for word in words {
        match word.parse::<Action>() {
            Ok(action) => actions.push(action),
            Err(_) => extra.push(word.clone()),
        }
    }

    (actions, extra)
}
