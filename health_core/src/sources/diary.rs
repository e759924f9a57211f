//! Food/exercise diary parser.
//!
//! The diary is a flat CSV with one row per logged food or exercise entry.
//! Rows whose item name starts with the summary marker are pre-aggregated
//! totals and are dropped so they do not double-count.

use super::{csv_reader, read_source_text, Schema};
use crate::coerce::{non_empty, number_or_zero, parse_date};
use crate::config::DiaryConfig;
use crate::{DailyTable, DayMap, Metric, ParseStats, Result, Source, SourceOutcome};
use serde::Deserialize;
use std::path::Path;

const REQUIRED_COLUMNS: &[&str] = &["date", "entry_type", "food"];

/// A raw diary row; numeric fields stay textual until coercion
#[derive(Debug, Default, Deserialize)]
pub(crate) struct DiaryRow {
    pub date: Option<String>,
    pub entry_type: Option<String>,
    pub food: Option<String>,
    pub calories: Option<String>,
    pub carbs_g: Option<String>,
    pub fat_g: Option<String>,
    pub protein_g: Option<String>,
    pub sugar_g: Option<String>,
    pub fiber_g: Option<String>,
    pub sodium_mg: Option<String>,
    pub cholesterol_mg: Option<String>,
    pub duration_min: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum EntryType {
    Food,
    Exercise,
}

fn entry_type(raw: Option<&str>) -> Option<EntryType> {
    let raw = non_empty(raw)?;
    if raw.eq_ignore_ascii_case("food") {
        Some(EntryType::Food)
    } else if raw.eq_ignore_ascii_case("exercise") {
        Some(EntryType::Exercise)
    } else {
        None
    }
}

/// Load the diary CSV into daily nutrition and exercise totals.
pub fn load_diary(path: &Path, config: &DiaryConfig) -> Result<SourceOutcome<DailyTable>> {
    let Some(text) = read_source_text(path, Source::Diary.name())? else {
        tracing::warn!("Diary not found: {:?}", path);
        return Ok(SourceOutcome::unavailable(format!(
            "diary not found at {}",
            path.display()
        )));
    };

    let mut reader = csv_reader(&text);
    let schema = Schema::from_headers(reader.headers()?);
    let missing = schema.missing(REQUIRED_COLUMNS);
    if !missing.is_empty() {
        tracing::warn!(
            "Diary: expected columns {:?} not found. Got: {:?}",
            missing,
            schema.preview(8)
        );
        return Ok(SourceOutcome::unavailable(format!(
            "diary is missing columns: {}",
            missing.join(", ")
        )));
    }

    let mut stats = ParseStats::default();
    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize::<DiaryRow>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                stats.rows_read += 1;
                stats.rows_skipped += 1;
                tracing::debug!("Diary row {}: {}", idx + 2, e);
            }
        }
    }

    let (days, row_stats) = aggregate_diary(rows, &config.summary_marker);
    stats.rows_read += row_stats.rows_read;
    stats.rows_skipped += row_stats.rows_skipped;
    stats.rows_excluded += row_stats.rows_excluded;

    let table = DailyTable::from_days(Source::Diary, days);
    tracing::info!(
        "Diary: {} days from {} rows ({} skipped, {} summary rows excluded)",
        table.len(),
        stats.rows_read,
        stats.rows_skipped,
        stats.rows_excluded
    );

    Ok(SourceOutcome::Loaded { data: table, stats })
}

/// Sum food and exercise rows per date.
pub(crate) fn aggregate_diary(
    rows: impl IntoIterator<Item = DiaryRow>,
    summary_marker: &str,
) -> (DayMap, ParseStats) {
    let mut days = DayMap::new();
    let mut stats = ParseStats::default();

    for row in rows {
        stats.rows_read += 1;

        let Some(date) = row.date.as_deref().and_then(parse_date) else {
            stats.rows_skipped += 1;
            continue;
        };

        let raw_type = row.entry_type.as_deref();
        if non_empty(raw_type).is_none() {
            stats.rows_skipped += 1;
            continue;
        }
        let Some(kind) = entry_type(raw_type) else {
            stats.rows_excluded += 1;
            continue;
        };

        let name = non_empty(row.food.as_deref());
        if name.is_some_and(|n| n.starts_with(summary_marker)) {
            stats.rows_excluded += 1;
            continue;
        }

        let day = days.entry(date).or_default();
        let mut add = |metric: Metric, value: f64| {
            *day.entry(metric).or_insert(0.0) += value;
        };

        match kind {
            EntryType::Food => {
                add(Metric::MfpCalories, number_or_zero(row.calories.as_deref()));
                add(Metric::CarbsG, number_or_zero(row.carbs_g.as_deref()));
                add(Metric::FatG, number_or_zero(row.fat_g.as_deref()));
                add(Metric::ProteinG, number_or_zero(row.protein_g.as_deref()));
                add(Metric::SugarG, number_or_zero(row.sugar_g.as_deref()));
                add(Metric::FiberG, number_or_zero(row.fiber_g.as_deref()));
                add(Metric::SodiumMg, number_or_zero(row.sodium_mg.as_deref()));
                add(
                    Metric::CholesterolMg,
                    number_or_zero(row.cholesterol_mg.as_deref()),
                );
                add(Metric::FoodItems, if name.is_some() { 1.0 } else { 0.0 });
            }
            EntryType::Exercise => {
                add(
                    Metric::MfpExerciseCalories,
                    number_or_zero(row.calories.as_deref()),
                );
                add(
                    Metric::MfpExerciseMinutes,
                    number_or_zero(row.duration_min.as_deref()),
                );
            }
        }
    }

    (days, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str = "date,entry_type,food,calories,carbs_g,fat_g,protein_g,sugar_g,fiber_g,sodium_mg,cholesterol_mg,duration_min\n";

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn write_diary(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("mfp_diary.csv");
        std::fs::write(&path, format!("{}{}", HEADER, body)).unwrap();
        (temp_dir, path)
    }

    fn load(path: &Path) -> (DailyTable, ParseStats) {
        match load_diary(path, &DiaryConfig::default()).unwrap() {
            SourceOutcome::Loaded { data, stats } => (data, stats),
            SourceOutcome::Unavailable { reason } => panic!("unavailable: {}", reason),
        }
    }

    fn food_row(date: &str, name: &str, calories: &str) -> DiaryRow {
        DiaryRow {
            date: Some(date.into()),
            entry_type: Some("food".into()),
            food: Some(name.into()),
            calories: Some(calories.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_end_to_end_day_totals() {
        let (_dir, path) = write_diary(
            "2025-01-01,food,Oatmeal,500,60,10,20,5,8,100,0,\n\
             2025-01-01,food,Chicken,700,0,20,80,0,0,300,150,\n\
             2025-01-01,exercise,Running,300,,,,,,,,30\n",
        );

        let (table, stats) = load(&path);
        assert_eq!(table.len(), 1);
        assert_eq!(stats.rows_read, 3);

        let record = table.get(day("2025-01-01")).unwrap();
        assert_eq!(record.get(Metric::MfpCalories), 1200.0);
        assert_eq!(record.get(Metric::FoodItems), 2.0);
        assert_eq!(record.get(Metric::ProteinG), 100.0);
        assert_eq!(record.get(Metric::CholesterolMg), 150.0);
        assert_eq!(record.get(Metric::MfpExerciseCalories), 300.0);
        assert_eq!(record.get(Metric::MfpExerciseMinutes), 30.0);
    }

    #[test]
    fn test_summary_rows_never_count() {
        let (_dir, path) = write_diary(
            "2025-01-01,food,Generic Daily Total,5000,,,,,,,,\n\
             2025-01-01,food,Apple,95,25,0,0,19,4,2,0,\n\
             2025-01-01,exercise,Generic Exercise Total,900,,,,,,,,90\n",
        );

        let (table, stats) = load(&path);
        let record = table.get(day("2025-01-01")).unwrap();
        assert_eq!(record.get(Metric::MfpCalories), 95.0);
        assert_eq!(record.get(Metric::FoodItems), 1.0);
        assert_eq!(record.get(Metric::MfpExerciseCalories), 0.0);
        assert_eq!(record.get(Metric::MfpExerciseMinutes), 0.0);
        assert_eq!(stats.rows_excluded, 2);
    }

    #[test]
    fn test_bad_dates_and_numbers() {
        let (_dir, path) = write_diary(
            "not-a-date,food,Apple,95,,,,,,,,\n\
             2025-01-02,food,Toast,abc,12,,,,,,,\n\
             2025-01-02,exercise,Walk,n/a,,,,,,,,oops\n",
        );

        let (table, stats) = load(&path);
        assert_eq!(stats.rows_skipped, 1);
        assert_eq!(table.len(), 1);

        let record = table.get(day("2025-01-02")).unwrap();
        assert_eq!(record.get(Metric::MfpCalories), 0.0);
        assert_eq!(record.get(Metric::CarbsG), 12.0);
        assert_eq!(record.get(Metric::FoodItems), 1.0);
        assert_eq!(record.get(Metric::MfpExerciseMinutes), 0.0);
    }

    #[test]
    fn test_exercise_only_day_zero_fills_nutrition() {
        let (_dir, path) = write_diary("2025-01-03,exercise,Rowing,250,,,,,,,,20\n");

        let (table, _) = load(&path);
        let record = table.get(day("2025-01-03")).unwrap();
        assert_eq!(record.get(Metric::MfpCalories), 0.0);
        assert_eq!(record.get(Metric::FoodItems), 0.0);
        assert_eq!(record.get(Metric::MfpExerciseCalories), 250.0);
        assert_eq!(record.metrics.len(), Source::Diary.columns().len());
    }

    #[test]
    fn test_date_time_values_collapse_to_one_day() {
        let (_dir, path) = write_diary(
            "2025-01-04 08:00:00,food,Eggs,200,,,,,,,,\n\
             2025-01-04 19:30:00,food,Pasta,600,,,,,,,,\n",
        );

        let (table, _) = load(&path);
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.get(day("2025-01-04")).unwrap().get(Metric::MfpCalories),
            800.0
        );
    }

    #[test]
    fn test_row_order_does_not_change_totals() {
        let rows = || {
            vec![
                food_row("2025-01-01", "A", "100"),
                food_row("2025-01-02", "B", "250.5"),
                food_row("2025-01-01", "C", "300"),
                food_row("2025-01-02", "D", "49.5"),
            ]
        };

        let (forward, _) = aggregate_diary(rows(), "Generic");
        let (reversed, _) = aggregate_diary(rows().into_iter().rev(), "Generic");
        assert_eq!(forward, reversed);
        assert_eq!(forward[&day("2025-01-02")][&Metric::MfpCalories], 300.0);
    }

    #[test]
    fn test_unknown_entry_types_ignored() {
        let mut row = food_row("2025-01-01", "Water", "0");
        row.entry_type = Some("note".into());

        let (days, stats) = aggregate_diary(vec![row], "Generic");
        assert!(days.is_empty());
        assert_eq!(stats.rows_read, 1);
        assert_eq!(stats.rows_excluded, 1);
    }

    #[test]
    fn test_missing_entry_type_counted_as_skipped() {
        let mut row = food_row("2025-01-01", "Apple", "95");
        row.entry_type = Some("  ".into());

        let (days, stats) = aggregate_diary(vec![row], "Generic");
        assert!(days.is_empty());
        assert_eq!(stats.rows_skipped, 1);
        assert_eq!(stats.rows_excluded, 0);
    }

    #[test]
    fn test_padded_header_names() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("mfp_diary.csv");
        std::fs::write(
            &path,
            "date, entry_type, food, calories\n2025-01-01,food,Apple,95\n",
        )
        .unwrap();

        let (table, stats) = load(&path);
        assert_eq!(table.len(), 1);
        assert_eq!(stats.rows_skipped, 0);
        assert_eq!(
            table.get(day("2025-01-01")).unwrap().get(Metric::MfpCalories),
            95.0
        );
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let temp_dir = tempfile::tempdir().unwrap();
        let outcome =
            load_diary(&temp_dir.path().join("absent.csv"), &DiaryConfig::default()).unwrap();
        assert!(!outcome.is_loaded());
    }

    #[test]
    fn test_missing_columns_is_unavailable() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("mfp_diary.csv");
        std::fs::write(&path, "day,calories\n2025-01-01,100\n").unwrap();

        match load_diary(&path, &DiaryConfig::default()).unwrap() {
            SourceOutcome::Unavailable { reason } => assert!(reason.contains("entry_type")),
            SourceOutcome::Loaded { .. } => panic!("expected unavailable"),
        }
    }

    #[test]
    fn test_header_only_file_is_empty_table() {
        let (_dir, path) = write_diary("");
        let (table, stats) = load(&path);
        assert!(table.is_empty());
        assert_eq!(stats, ParseStats::default());
    }
}
