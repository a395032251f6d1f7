// src/exec/backoff.rs

//! Delay between retries, parsed from `retry_backoff = "<duration> [strategy]"`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::RunnerError;
use crate::parse::units::parse_clock;

/// How the base delay grows with the attempt index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffStrategy {
    #[default]
    Static,
    Linear,
    Exponential,
}

impl FromStr for BackoffStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "static" => Ok(BackoffStrategy::Static),
            "linear" => Ok(BackoffStrategy::Linear),
            "exponential" => Ok(BackoffStrategy::Exponential),
            other => Err(format!(
                "unknown strategy '{other}' (expected \"static\", \"linear\" or \"exponential\")"
            )),
        }
    }
}

impl fmt::Display for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackoffStrategy::Static => "static",
            BackoffStrategy::Linear => "linear",
            BackoffStrategy::Exponential => "exponential",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub strategy: BackoffStrategy,
}

impl Backoff {
    pub fn new(base: Duration, strategy: BackoffStrategy) -> Self {
        Self { base, strategy }
    }

    /// Sleep between attempt `attempt_index` (0-based) and the next one.
    ///
    /// static: `d`, linear: `d * (i + 1)`, exponential: `d * 2^i`.
    /// Saturates instead of overflowing.
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        match self.strategy {
            BackoffStrategy::Static => self.base,
            BackoffStrategy::Linear => self.base.saturating_mul(attempt_index.saturating_add(1)),
            BackoffStrategy::Exponential => {
                let factor = 1u32.checked_shl(attempt_index).unwrap_or(u32::MAX);
                self.base.saturating_mul(factor)
            }
        }
    }
}

impl FromStr for Backoff {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| RunnerError::InvalidBackoff {
            value: s.to_string(),
            reason,
        };

        let mut parts = s.split_whitespace();
        let duration = parts
            .next()
            .ok_or_else(|| invalid("empty value".to_string()))?;
        let strategy = match parts.next() {
            Some(name) => name.parse::<BackoffStrategy>().map_err(invalid)?,
            None => BackoffStrategy::default(),
        };
        if parts.next().is_some() {
            return Err(invalid("expected \"<duration> [strategy]\"".to_string()));
        }

        let seconds = parse_clock(duration)
            .ok_or_else(|| invalid(format!("duration '{duration}' is not H:MM:SS or M:SS")))?;

        Ok(Backoff::new(Duration::from_secs(seconds), strategy))
    }
}

impl fmt::Display for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.base.as_secs();
        write!(
            f,
            "{}:{:02}:{:02} {}",
            total / 3600,
            (total / 60) % 60,
            total % 60,
            self.strategy
        )
    }
}
