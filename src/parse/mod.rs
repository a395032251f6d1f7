// src/parse/mod.rs

//! Parsers turning the final output of a restic command into typed counters.

pub mod backup;
pub mod forget;
pub mod prune;
pub mod stats;
pub mod units;

pub use backup::parse_backup;
pub use forget::parse_forget;
pub use prune::{parse_current_prune, parse_legacy_prune, parse_prune};
pub use stats::parse_stats;
pub use units::{make_size, parse_size, parse_time};
