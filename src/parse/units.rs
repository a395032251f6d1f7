// src/parse/units.rs

//! Size and duration conversions for restic's human-readable output.

use std::sync::LazyLock;

use regex::Regex;
use tracing::error;

static SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-?[0-9.]+) ?([a-zA-Z]*B)").expect("size regex"));

static CLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:([0-9]+):)?([0-9]+):([0-9]+)").expect("clock regex")
});

static CLOCK_EXACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([0-9]+):)?([0-9]+):([0-9]+)$").expect("exact clock regex")
});

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const TIB: f64 = 1024.0 * 1024.0 * 1024.0 * 1024.0;

fn unit_factor(unit: &str) -> f64 {
    match unit {
        "kB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        "KiB" => KIB,
        "MiB" => MIB,
        "GiB" => GIB,
        "TiB" => TIB,
        _ => 1.0,
    }
}

/// Convert `"302.750 MiB"` (or `"0B"`) into bytes.
///
/// Returns 0.0 and logs an error when no size is found.
pub fn parse_size(size: &str) -> f64 {
    let parsed = SIZE.captures(size).and_then(|caps| {
        let number: f64 = caps[1].parse().ok()?;
        Some(number * unit_factor(&caps[2]))
    });

    match parsed {
        Some(bytes) => bytes,
        None => {
            error!(size, "failed to parse size");
            0.0
        }
    }
}

/// Render a byte count with binary units and two decimals.
pub fn make_size(size: f64) -> String {
    if size > TIB {
        format!("{:.2} TiB", size / TIB)
    } else if size > GIB {
        format!("{:.2} GiB", size / GIB)
    } else if size > MIB {
        format!("{:.2} MiB", size / MIB)
    } else if size > KIB {
        format!("{:.2} KiB", size / KIB)
    } else {
        format!("{size:.0} B")
    }
}

fn clock_seconds(caps: &regex::Captures<'_>) -> Option<u64> {
    let field = |i: usize| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    let hours = field(1)?;
    let minutes = field(2)?;
    let seconds = field(3)?;
    hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)
}

/// Find an `H:MM:SS` or `M:SS` duration anywhere in `text`, in seconds.
///
/// Returns 0 and logs an error when none is found.
pub fn parse_time(text: &str) -> u64 {
    match CLOCK.captures(text).and_then(|caps| clock_seconds(&caps)) {
        Some(seconds) => seconds,
        None => {
            error!(time = text, "failed to parse time");
            0
        }
    }
}

/// Strict variant of [`parse_time`]: the whole string must be a clock value.
pub fn parse_clock(text: &str) -> Option<u64> {
    CLOCK_EXACT
        .captures(text.trim())
        .and_then(|caps| clock_seconds(&caps))
}
