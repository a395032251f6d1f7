// src/runner/mod.rs

//! Orchestration of restic actions for one configuration.
//!
//! - [`actions`]: the selectable steps and their default sequence.
//! - [`commands`]: restic command lines and abort reasons per verb.
//! - [`environment`]: the environment map given to every child.
//! - [`redact`]: password removal for repository labels.
//! - [`orchestrator`]: [`ResticRunner`], which ties it all together.

pub mod actions;
pub mod commands;
pub mod environment;
pub mod orchestrator;
pub mod redact;

pub use actions::{Action, default_actions, split_actions};
pub use environment::child_environment;
pub use orchestrator::{ResticRunner, RunOptions, RunSummary};
pub use redact::redact_password;
