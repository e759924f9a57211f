//! Exercise and meditation parser for the wearable-device export.
//!
//! The device logs meditation sessions and passive, auto-detected periods in
//! the same table as real workouts. Rows are split by activity type code:
//! meditation codes go to their own table, auto-detected codes are dropped
//! and everything else counts as exercise.

use super::export::{find_exports, largest, strip_metadata_line, EXERCISE_PREFIX};
use super::{csv_reader, field, read_source_text, Schema};
use crate::coerce::{number_or_zero, parse_code, parse_date};
use crate::config::ActivityConfig;
use crate::{DailyTable, DayMap, Metric, ParseStats, Result, Source, SourceOutcome};
use std::path::Path;

/// Column-name prefix used by the exercise export
const COLUMN_PREFIX: &str = "com.samsung.health.exercise.";

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Daily exercise and meditation tables from one export
#[derive(Clone, Debug)]
pub struct ActivityTables {
    pub exercise: DailyTable,
    pub meditation: DailyTable,
    /// Rows dropped as device-inferred passive activity
    pub auto_detected_excluded: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ActivityClass {
    Meditation,
    AutoDetected,
    Exercise,
}

/// Classify an activity code. Rows without a usable code count as exercise.
pub(crate) fn classify(code: Option<i64>, config: &ActivityConfig) -> ActivityClass {
    match code {
        Some(c) if config.meditation_codes.contains(&c) => ActivityClass::Meditation,
        Some(c) if config.auto_detected_codes.contains(&c) => ActivityClass::AutoDetected,
        _ => ActivityClass::Exercise,
    }
}

/// One coerced activity row
#[derive(Clone, Copy, Debug)]
pub(crate) struct ActivityRow {
    pub date: chrono::NaiveDate,
    pub code: Option<i64>,
    pub minutes: f64,
    pub calories: f64,
}

/// Resolved column positions; only the start time is mandatory.
struct ActivityColumns {
    start_time: Option<usize>,
    exercise_type: Option<usize>,
    duration: Option<usize>,
    calorie: Option<usize>,
}

impl ActivityColumns {
    fn resolve(schema: &Schema) -> Self {
        let lookup = |name: &str| {
            schema
                .index(&format!("{}{}", COLUMN_PREFIX, name))
                .or_else(|| schema.index(name))
        };
        Self {
            start_time: lookup("start_time"),
            exercise_type: lookup("exercise_type"),
            duration: lookup("duration"),
            calorie: lookup("calorie"),
        }
    }
}

/// Load exercise and meditation from the main exercise table in `export_dir`.
///
/// Side tables (weather, heart-rate zones, ...) share the file-name prefix; they
/// are filtered by name and the largest remaining candidate is used.
pub fn load_activity(
    export_dir: &Path,
    config: &ActivityConfig,
) -> Result<SourceOutcome<ActivityTables>> {
    let candidates = find_exports(export_dir, EXERCISE_PREFIX, &config.excluded_files)?;
    let Some(path) = largest(&candidates)? else {
        tracing::warn!("Exercise file not found in {:?}", export_dir);
        return Ok(SourceOutcome::unavailable("exercise export not found"));
    };

    if candidates.len() > 1 {
        tracing::debug!(
            "Picked {:?} out of {} exercise exports",
            path,
            candidates.len()
        );
    }

    load_activity_file(&path, config)
}

/// Load exercise and meditation from a specific export file.
pub fn load_activity_file(
    path: &Path,
    config: &ActivityConfig,
) -> Result<SourceOutcome<ActivityTables>> {
    let Some(text) = read_source_text(path, Source::Exercise.name())? else {
        return Ok(SourceOutcome::unavailable(format!(
            "exercise export not found at {}",
            path.display()
        )));
    };

    let mut reader = csv_reader(strip_metadata_line(&text));
    let schema = Schema::from_headers(reader.headers()?);
    let columns = ActivityColumns::resolve(&schema);
    if columns.start_time.is_none() {
        tracing::warn!(
            "Exercise: {}start_time not found. Got: {:?}",
            COLUMN_PREFIX,
            schema.preview(8)
        );
        return Ok(SourceOutcome::unavailable(format!(
            "exercise export is missing column {}start_time",
            COLUMN_PREFIX
        )));
    }

    let mut stats = ParseStats::default();
    let mut rows = Vec::new();
    for result in reader.records() {
        stats.rows_read += 1;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                stats.rows_skipped += 1;
                tracing::debug!("Exercise row skipped: {}", e);
                continue;
            }
        };

        let Some(date) = field(&record, columns.start_time).and_then(parse_date) else {
            stats.rows_skipped += 1;
            continue;
        };

        rows.push(ActivityRow {
            date,
            code: field(&record, columns.exercise_type).and_then(parse_code),
            minutes: number_or_zero(field(&record, columns.duration)) / MILLIS_PER_MINUTE,
            calories: number_or_zero(field(&record, columns.calorie)),
        });
    }

    let tables = aggregate_activity(rows, config);
    stats.rows_excluded = tables.auto_detected_excluded;

    tracing::info!(
        "Excluded {} auto-detected entries (codes {:?})",
        tables.auto_detected_excluded,
        config.auto_detected_codes
    );
    tracing::info!(
        "Exercise: {} days, meditation: {} days from {} rows ({} skipped)",
        tables.exercise.len(),
        tables.meditation.len(),
        stats.rows_read,
        stats.rows_skipped
    );

    Ok(SourceOutcome::Loaded {
        data: tables,
        stats,
    })
}

/// Split rows by class and sum each class per date.
pub(crate) fn aggregate_activity(
    rows: impl IntoIterator<Item = ActivityRow>,
    config: &ActivityConfig,
) -> ActivityTables {
    let mut exercise = DayMap::new();
    let mut meditation = DayMap::new();
    let mut auto_detected_excluded = 0;

    for row in rows {
        match classify(row.code, config) {
            ActivityClass::Meditation => {
                let day = meditation.entry(row.date).or_default();
                *day.entry(Metric::MeditationMinutes).or_insert(0.0) += row.minutes;
            }
            ActivityClass::AutoDetected => auto_detected_excluded += 1,
            ActivityClass::Exercise => {
                let day = exercise.entry(row.date).or_default();
                *day.entry(Metric::ExerciseCalories).or_insert(0.0) += row.calories;
                *day.entry(Metric::ExerciseMinutes).or_insert(0.0) += row.minutes;
            }
        }
    }

    ActivityTables {
        exercise: DailyTable::from_days(Source::Exercise, exercise),
        meditation: DailyTable::from_days(Source::Meditation, meditation),
        auto_detected_excluded,
    }
}
