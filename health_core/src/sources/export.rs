//! Helpers for the wearable-device (Samsung Health) CSV export.
//!
//! Export files are named `<data type>.<timestamp>.csv` and start with a
//! metadata line such as `com.samsung.health.weight,6307003,6` before the real
//! header row.

use crate::Result;
use std::path::{Path, PathBuf};

/// Prefix shared by every metadata line in the export
pub const METADATA_PREFIX: &str = "com.samsung.";

pub const WEIGHT_PREFIX: &str = "com.samsung.health.weight.";
pub const EXERCISE_PREFIX: &str = "com.samsung.shealth.exercise.";
pub const FOOD_INTAKE_PREFIX: &str = "com.samsung.health.food_intake.";

/// Drop the leading metadata line when present.
///
/// Header rows of some exports also begin with `com.samsung.` (vendor-prefixed
/// column names), so a metadata line is recognised by its numeric second field.
pub fn strip_metadata_line(text: &str) -> &str {
    let (first, rest) = match text.find('\n') {
        Some(pos) => (&text[..pos], &text[pos + 1..]),
        None => (text, ""),
    };

    if is_metadata_line(first.trim_end_matches('\r')) {
        rest
    } else {
        text
    }
}

fn is_metadata_line(line: &str) -> bool {
    if !line.starts_with(METADATA_PREFIX) {
        return false;
    }
    line.split(',')
        .nth(1)
        .is_some_and(|f| !f.trim().is_empty() && f.trim().parse::<u64>().is_ok())
}

/// List export files in `dir` named `<prefix>*.csv`, skipping any whose name
/// contains one of `excluded`. Sorted by file name.
pub fn find_exports(dir: &Path, prefix: &str, excluded: &[String]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        tracing::debug!("Export directory {:?} does not exist", dir);
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if !name.starts_with(prefix) || !name.ends_with(".csv") {
            continue;
        }

        if excluded.iter().any(|marker| name.contains(marker.as_str())) {
            tracing::debug!("Skipping auxiliary export {}", name);
            continue;
        }

        found.push(path);
    }

    found.sort();
    Ok(found)
}

/// Pick the largest file; the main table dwarfs its side tables.
pub fn largest(paths: &[PathBuf]) -> Result<Option<PathBuf>> {
    let mut best: Option<(u64, &PathBuf)> = None;
    for path in paths {
        let size = std::fs::metadata(path)?.len();
        if best.map_or(true, |(best_size, _)| size > best_size) {
            best = Some((size, path));
        }
    }
    Ok(best.map(|(_, path)| path.clone()))
}
