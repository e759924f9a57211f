//! Strength workout log parser.
//!
//! The workout tracker exports one row per set:
//! `Date,Title,Exercise,Set #,Reps,Weight,Time`.

use super::{csv_reader, read_source_text, Schema};
use crate::coerce::{non_empty, number_or_zero, parse_date};
use crate::{DailyTable, DayMap, Metric, ParseStats, Result, Source, SourceOutcome};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// A raw set row; `Title` and `Time` are not needed for the daily totals
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SetRow {
    #[serde(rename = "Date")]
    pub date: Option<String>,
    #[serde(rename = "Exercise")]
    pub exercise: Option<String>,
    #[serde(rename = "Set #")]
    pub set_number: Option<String>,
    #[serde(rename = "Reps")]
    pub reps: Option<String>,
    #[serde(rename = "Weight")]
    pub weight: Option<String>,
}

#[derive(Default)]
struct DayTotals {
    sets: usize,
    volume: f64,
    exercises: HashSet<String>,
}

/// Load the strength log into daily sets, volume and exercise variety.
pub fn load_strength(path: &Path) -> Result<SourceOutcome<DailyTable>> {
    let Some(text) = read_source_text(path, Source::Strength.name())? else {
        tracing::warn!("Strength file not found: {:?}", path);
        return Ok(SourceOutcome::unavailable(format!(
            "strength log not found at {}",
            path.display()
        )));
    };

    let mut reader = csv_reader(&text);
    let schema = Schema::from_headers(reader.headers()?);
    let missing = schema.missing(&["Date"]);
    if !missing.is_empty() {
        tracing::warn!(
            "Strength: Date column not found. Got: {:?}",
            schema.preview(8)
        );
        return Ok(SourceOutcome::unavailable(
            "strength log is missing column: Date",
        ));
    }
    let count_set_numbers = schema.index("Set #").is_some();

    let mut stats = ParseStats::default();
    let mut rows = Vec::new();
    for result in reader.deserialize::<SetRow>() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                stats.rows_read += 1;
                stats.rows_skipped += 1;
                tracing::debug!("Strength row skipped: {}", e);
            }
        }
    }

    let (days, row_stats) = aggregate_strength(rows, count_set_numbers);
    stats.rows_read += row_stats.rows_read;
    stats.rows_skipped += row_stats.rows_skipped;

    let table = DailyTable::from_days(Source::Strength, days);
    tracing::info!(
        "Strength: {} days from {} sets ({} skipped)",
        table.len(),
        stats.rows_read,
        stats.rows_skipped
    );

    Ok(SourceOutcome::Loaded { data: table, stats })
}

/// Aggregate set rows per date.
///
/// With `count_set_numbers`, only rows carrying a set number count towards
/// `Strength_Sets`; otherwise every row is a set.
pub(crate) fn aggregate_strength(
    rows: impl IntoIterator<Item = SetRow>,
    count_set_numbers: bool,
) -> (DayMap, ParseStats) {
    let mut totals: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();
    let mut stats = ParseStats::default();

    for row in rows {
        stats.rows_read += 1;
        let Some(date) = row.date.as_deref().and_then(parse_date) else {
            stats.rows_skipped += 1;
            continue;
        };

        let day = totals.entry(date).or_default();
        if !count_set_numbers || non_empty(row.set_number.as_deref()).is_some() {
            day.sets += 1;
        }

        let reps = number_or_zero(row.reps.as_deref());
        let weight = number_or_zero(row.weight.as_deref());
        day.volume += reps * weight;

        if let Some(name) = non_empty(row.exercise.as_deref()) {
            day.exercises.insert(name.to_string());
        }
    }

    let days = totals
        .into_iter()
        .map(|(date, t)| {
            let metrics = BTreeMap::from([
                (Metric::StrengthSets, t.sets as f64),
                (Metric::StrengthVolumeLbs, t.volume),
                (Metric::StrengthExercises, t.exercises.len() as f64),
            ]);
            (date, metrics)
        })
        .collect();

    (days, stats)
}
