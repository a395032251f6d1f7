// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("invalid retry_backoff '{value}': {reason}")]
    InvalidBackoff { value: String, reason: String },

    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker for command #{index} did not complete: {message}")]
    Worker { index: usize, message: String },

    #[error("could not parse {operation} output: {reason}")]
    Parse {
        operation: &'static str,
        reason: String,
    },

    #[error("writing metrics to {}: {source}", path.display())]
    MetricsWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RunnerError {
    pub(crate) fn parse(operation: &'static str, reason: impl Into<String>) -> Self {
        RunnerError::Parse {
            operation,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;
