// src/parse/prune.rs

//! `restic prune` output comes in two shapes: the summary table printed
//! since restic 0.12 and the step-by-step log of older releases. The current
//! shape is tried first; the legacy one only when required fields are absent.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::errors::{Result, RunnerError};
use crate::metrics::model::{CurrentPruneMetrics, LegacyPruneMetrics, PruneMetrics};
use crate::parse::units::parse_size;

const SIZE: &str = r"(-?[0-9.]+ ?[a-zA-Z]*B)";

fn blobs_line(label: &str) -> Regex {
    Regex::new(&format!(r"{label}:?\s+([0-9]+) blobs / {SIZE}")).expect("prune blobs regex")
}

static TO_REPACK: LazyLock<Regex> = LazyLock::new(|| blobs_line("to repack"));
static THIS_REMOVES: LazyLock<Regex> = LazyLock::new(|| blobs_line("this removes"));
static TO_DELETE: LazyLock<Regex> = LazyLock::new(|| blobs_line("to delete"));
static TOTAL_PRUNE: LazyLock<Regex> = LazyLock::new(|| blobs_line("total prune"));
static REMAINING: LazyLock<Regex> = LazyLock::new(|| blobs_line("remaining"));
static UNUSED_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"unused size after prune:\s+{SIZE}")).expect("unused regex")
});

static CONTAINS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"repository contains ([0-9]+) packs \(([0-9]+) blobs\) with {SIZE}"
    ))
    .expect("contains regex")
});
static DUPLICATES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"([0-9]+) duplicate blobs, {SIZE} duplicate")).expect("duplicate regex")
});
static IN_USE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"found ([0-9]+) of ([0-9]+) data blobs still in use, removing ([0-9]+) blobs")
        .expect("in use regex")
});
static INVALID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"will remove ([0-9]+) invalid files").expect("invalid regex"));
static DELETE_PACKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"will delete ([0-9]+) packs and rewrite ([0-9]+) packs, this frees {SIZE}"
    ))
    .expect("delete packs regex")
});
static OLD_INDEXES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"remove ([0-9]+) old index files").expect("index regex"));

fn find<'t>(re: &Regex, output: &'t str, what: &str) -> Result<Captures<'t>> {
    re.captures(output)
        .ok_or_else(|| RunnerError::parse("prune", format!("missing '{what}' line")))
}

fn count(caps: &Captures<'_>, i: usize) -> Result<u64> {
    caps[i]
        .parse()
        .map_err(|e| RunnerError::parse("prune", format!("bad count '{}': {e}", &caps[i])))
}

/// Summary table of restic >= 0.12.
pub fn parse_current_prune(output: &str) -> Result<CurrentPruneMetrics> {
    let to_repack = find(&TO_REPACK, output, "to repack")?;
    let removes = find(&THIS_REMOVES, output, "this removes")?;
    let to_delete = find(&TO_DELETE, output, "to delete")?;
    let total = find(&TOTAL_PRUNE, output, "total prune")?;
    let remaining = find(&REMAINING, output, "remaining")?;
    let unused = find(&UNUSED_AFTER, output, "unused size after prune")?;

    Ok(CurrentPruneMetrics {
        to_repack_blobs: count(&to_repack, 1)?,
        to_repack_bytes: parse_size(&to_repack[2]),
        removed_blobs: count(&removes, 1)?,
        removed_bytes: parse_size(&removes[2]),
        to_delete_blobs: count(&to_delete, 1)?,
        to_delete_bytes: parse_size(&to_delete[2]),
        total_prune_blobs: count(&total, 1)?,
        total_prune_bytes: parse_size(&total[2]),
        remaining_blobs: count(&remaining, 1)?,
        remaining_bytes: parse_size(&remaining[2]),
        remaining_unused_size: parse_size(&unused[1]),
    })
}

/// Step-by-step log of restic < 0.12.
pub fn parse_legacy_prune(output: &str) -> Result<LegacyPruneMetrics> {
    let contains = find(&CONTAINS, output, "repository contains")?;
    let duplicates = find(&DUPLICATES, output, "duplicate blobs")?;
    let in_use = find(&IN_USE, output, "data blobs still in use")?;
    let invalid = find(&INVALID, output, "invalid files")?;
    let packs = find(&DELETE_PACKS, output, "will delete")?;
    let indexes = find(&OLD_INDEXES, output, "old index files")?;

    Ok(LegacyPruneMetrics {
        containing_packs_before: count(&contains, 1)?,
        containing_blobs: count(&contains, 2)?,
        containing_size_bytes: parse_size(&contains[3]),
        duplicate_blobs: count(&duplicates, 1)?,
        duplicate_size_bytes: parse_size(&duplicates[2]),
        in_use_blobs: count(&in_use, 1)?,
        removed_blobs: count(&in_use, 3)?,
        invalid_files: count(&invalid, 1)?,
        deleted_packs: count(&packs, 1)?,
        rewritten_packs: count(&packs, 2)?,
        size_freed_bytes: parse_size(&packs[3]),
        removed_index_files: count(&indexes, 1)?,
    })
}

/// Try the current shape, then the legacy one.
///
/// Fails only when neither shape's required lines are present.
pub fn parse_prune(output: &str) -> Result<PruneMetrics> {
    match parse_current_prune(output) {
        Ok(current) => Ok(PruneMetrics::Current(current)),
        Err(current_err) => {
            debug!(error = %current_err, "prune output is not in the current format; trying legacy");
            parse_legacy_prune(output)
                .map(PruneMetrics::Legacy)
                .map_err(|legacy_err| {
                    RunnerError::parse(
                        "prune",
                        format!("neither format matched ({current_err}; {legacy_err})"),
                    )
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

    const CURRENT: &str = "repository c2e84608 opened successfully, password is correct
loading indexes...
searching used packs...
collecting packs for deletion and repacking
[0:00] 100.00%  65 / 65 packs processed

to repack:             1 blobs / 1234 B
this removes:          2 blobs / 5678 B
to delete:            32 blobs / 158.830 KiB
total prune:          35 blobs / 158.830 KiB
remaining:         19154 blobs / 260.161 MiB
unused size after prune: 0 B (0.00% of remaining size)

rebuilding index
removing 3 old packs
done
";

    const LEGACY: &str = "password is correct
storage ID 9babef79
repository contains 11981 packs (345057 blobs) with 56.676 GiB
processed 345057 blobs: 0 duplicate blobs, 0B duplicate
load all snapshots
found 2 of 345057 data blobs still in use, removing 345055 blobs
will remove 0 invalid files
will delete 11979 packs and rewrite 0 packs, this frees 56.664 GiB
saved new indexes as [70561784]
remove 11 old index files
done
";

    #[test]
    fn parses_current_summary_table() {
        let m = parse_current_prune(CURRENT).unwrap();

        assert_eq!(m.to_repack_blobs, 1);
        assert_eq!(m.to_repack_bytes, 1234.0);
        assert_eq!(m.removed_blobs, 2);
        assert_eq!(m.removed_bytes, 5678.0);
        assert_eq!(m.to_delete_blobs, 32);
        assert_eq!(m.to_delete_bytes, 158.830 * KIB);
        assert_eq!(m.total_prune_blobs, 35);
        assert_eq!(m.total_prune_bytes, 158.830 * KIB);
        assert_eq!(m.remaining_blobs, 19154);
        assert_eq!(m.remaining_bytes, 260.161 * MIB);
        assert_eq!(m.remaining_unused_size, 0.0);
    }

    #[test]
    fn parses_legacy_log() {
        let m = parse_legacy_prune(LEGACY).unwrap();

        assert_eq!(m.containing_packs_before, 11981);
        assert_eq!(m.containing_blobs, 345057);
        assert_eq!(m.containing_size_bytes, 56.676 * GIB);
        assert_eq!(m.duplicate_blobs, 0);
        assert_eq!(m.duplicate_size_bytes, 0.0);
        assert_eq!(m.in_use_blobs, 2);
        assert_eq!(m.removed_blobs, 345055);
        assert_eq!(m.invalid_files, 0);
        assert_eq!(m.deleted_packs, 11979);
        assert_eq!(m.rewritten_packs, 0);
        assert_eq!(m.size_freed_bytes, 56.664 * GIB);
        assert_eq!(m.removed_index_files, 11);
    }

    #[test]
    fn dispatch_tags_the_matching_shape() {
        assert!(matches!(parse_prune(CURRENT), Ok(PruneMetrics::Current(_))));
        assert!(matches!(parse_prune(LEGACY), Ok(PruneMetrics::Legacy(_))));
    }

    #[test]
    fn unknown_shape_is_an_error() {
        let err = parse_prune("done\n").unwrap_err();
        assert!(matches!(err, RunnerError::Parse { operation: "prune", .. }));
    }
}
