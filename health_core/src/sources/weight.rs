//! Body weight parser for the wearable-device export.

use super::export::{find_exports, strip_metadata_line, WEIGHT_PREFIX};
use super::{csv_reader, field, read_source_text, Schema};
use crate::coerce::{parse_datetime, parse_number};
use crate::{DailyTable, DayMap, Metric, ParseStats, Result, Source, SourceOutcome};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::path::Path;

const START_TIME: &str = "start_time";
const WEIGHT: &str = "weight";

/// Load daily weight from the first `com.samsung.health.weight.*.csv` in `export_dir`.
pub fn load_weight(export_dir: &Path) -> Result<SourceOutcome<DailyTable>> {
    let files = find_exports(export_dir, WEIGHT_PREFIX, &[])?;
    let Some(path) = files.first() else {
        tracing::warn!("Weight file not found in {:?}", export_dir);
        return Ok(SourceOutcome::unavailable("weight export not found"));
    };

    load_weight_file(path)
}

/// Load daily weight from a specific export file.
pub fn load_weight_file(path: &Path) -> Result<SourceOutcome<DailyTable>> {
    let Some(text) = read_source_text(path, Source::Weight.name())? else {
        return Ok(SourceOutcome::unavailable(format!(
            "weight export not found at {}",
            path.display()
        )));
    };

    let mut reader = csv_reader(strip_metadata_line(&text));
    let schema = Schema::from_headers(reader.headers()?);
    let missing = schema.missing(&[START_TIME, WEIGHT]);
    if !missing.is_empty() {
        tracing::warn!(
            "Weight: expected columns not found. Got: {:?}",
            schema.preview(8)
        );
        return Ok(SourceOutcome::unavailable(format!(
            "weight export is missing columns: {}",
            missing.join(", ")
        )));
    }

    let start_idx = schema.index(START_TIME);
    let weight_idx = schema.index(WEIGHT);

    let mut stats = ParseStats::default();
    let mut readings = Vec::new();
    for result in reader.records() {
        stats.rows_read += 1;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                stats.rows_skipped += 1;
                tracing::debug!("Weight row skipped: {}", e);
                continue;
            }
        };

        let at = field(&record, start_idx).and_then(parse_datetime);
        let kg = field(&record, weight_idx).and_then(parse_number);
        match (at, kg) {
            (Some(at), Some(kg)) => readings.push((at, kg)),
            _ => stats.rows_skipped += 1,
        }
    }

    let table = DailyTable::from_days(Source::Weight, last_reading_per_day(readings));
    tracing::info!(
        "Weight: {} days from {} readings ({} skipped)",
        table.len(),
        stats.rows_read,
        stats.rows_skipped
    );

    Ok(SourceOutcome::Loaded { data: table, stats })
}

/// Keep the latest reading of each day.
///
/// Readings with identical timestamps resolve to the one appearing later in
/// the input.
pub(crate) fn last_reading_per_day(
    readings: impl IntoIterator<Item = (NaiveDateTime, f64)>,
) -> DayMap {
    let mut latest: BTreeMap<NaiveDate, (NaiveDateTime, f64)> = BTreeMap::new();
    for (at, kg) in readings {
        latest
            .entry(at.date())
            .and_modify(|current| {
                if at >= current.0 {
                    *current = (at, kg);
                }
            })
            .or_insert((at, kg));
    }

    latest
        .into_iter()
        .map(|(date, (_, kg))| (date, BTreeMap::from([(Metric::WeightKg, kg)])))
        .collect()
}
