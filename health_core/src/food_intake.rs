//! Food-intake export to daily calorie CSV.
//!
//! The wearable app mirrors the food diary into its own export as one row per
//! meal. This converter sums those meals per day into a simple `Date,Calories`
//! file for dashboards that only need energy intake.

use crate::coerce::{non_empty, parse_date, parse_number};
use crate::report::write_csv_atomic;
use crate::sources::export::{find_exports, strip_metadata_line, FOOD_INTAKE_PREFIX};
use crate::sources::{csv_reader, field, read_source_text, Schema};
use crate::{Error, ParseStats, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const SOURCE_NAME: &str = "food_intake";

/// Default output file name, written next to the input
pub const OUTPUT_NAME: &str = "mfp_daily_calories.csv";

/// Outcome of a conversion
#[derive(Clone, Debug, Serialize)]
pub struct FoodIntakeSummary {
    pub output: PathBuf,
    pub days: usize,
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
    pub average_calories: Option<f64>,
    pub stats: ParseStats,
}

/// First food-intake export in `dir`, if any
pub fn find_food_intake(dir: &Path) -> Result<Option<PathBuf>> {
    Ok(find_exports(dir, FOOD_INTAKE_PREFIX, &[])?.into_iter().next())
}

/// Default output location for `input`
pub fn default_output(input: &Path) -> PathBuf {
    input
        .parent()
        .map(|p| p.join(OUTPUT_NAME))
        .unwrap_or_else(|| PathBuf::from(OUTPUT_NAME))
}

/// Sum calories per day from `input` and write `Date,Calories` to `output`.
pub fn convert(input: &Path, output: &Path) -> Result<FoodIntakeSummary> {
    let text = read_source_text(input, SOURCE_NAME)?.ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("food intake export not found: {}", input.display()),
        ))
    })?;

    let mut reader = csv_reader(strip_metadata_line(&text));
    let schema = Schema::from_headers(reader.headers()?);
    let missing = schema.missing(&["start_time", "calorie"]);
    if !missing.is_empty() {
        return Err(Error::corrupt(
            SOURCE_NAME,
            format!("missing columns: {}", missing.join(", ")),
        ));
    }
    let start_idx = schema.index("start_time");
    let calorie_idx = schema.index("calorie");

    let mut stats = ParseStats::default();
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for result in reader.records() {
        stats.rows_read += 1;
        let Ok(record) = result else {
            stats.rows_skipped += 1;
            continue;
        };

        let date = non_empty(field(&record, start_idx)).and_then(parse_date);
        let calories = non_empty(field(&record, calorie_idx)).and_then(parse_number);
        match (date, calories) {
            (Some(date), Some(calories)) => *daily.entry(date).or_insert(0.0) += calories,
            _ => stats.rows_skipped += 1,
        }
    }

    let rows = daily
        .iter()
        .map(|(date, calories)| {
            vec![
                date.format("%Y-%m-%d").to_string(),
                format!("{}", calories.round_ties_even() as i64),
            ]
        });
    write_csv_atomic(output, &["Date", "Calories"], rows)?;

    let average_calories = if daily.is_empty() {
        None
    } else {
        Some(daily.values().sum::<f64>() / daily.len() as f64)
    };

    let summary = FoodIntakeSummary {
        output: output.to_path_buf(),
        days: daily.len(),
        first_day: daily.keys().next().copied(),
        last_day: daily.keys().next_back().copied(),
        average_calories,
        stats,
    };

    tracing::info!(
        "Wrote {} days of food intake to {:?} ({} rows skipped)",
        summary.days,
        output,
        summary.stats.rows_skipped
    );

    Ok(summary)
}
