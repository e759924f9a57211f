//! One batch run: load every source, merge, write outputs.

use crate::merge::{merge_daily, MergedTable};
use crate::report::{
    write_table, MergedSummary, RunSummary, SourceSummary, DIARY_OUTPUT, MERGED_OUTPUT,
};
use crate::sources::{load_activity, load_diary, load_strength, load_weight};
use crate::{Config, DailyTable, ParseStats, Result, Source, SourceOutcome};

/// Tables and summary produced by a run
#[derive(Clone, Debug)]
pub struct RunOutput {
    pub diary: DailyTable,
    pub merged: MergedTable,
    pub summary: RunSummary,
}

/// A source after its load result has been judged
enum Settled<T> {
    Loaded(T, ParseStats),
    Missing(SourceSummary),
}

/// Turn a loader result into data or a summary entry.
///
/// Unreadable files abort the run only in strict mode.
fn settle<T>(source: Source, result: Result<SourceOutcome<T>>, strict: bool) -> Result<Settled<T>> {
    match result {
        Ok(SourceOutcome::Loaded { data, stats }) => Ok(Settled::Loaded(data, stats)),
        Ok(SourceOutcome::Unavailable { reason }) => {
            tracing::info!("Source {} unavailable: {}", source, reason);
            Ok(Settled::Missing(SourceSummary::unavailable(source, reason)))
        }
        Err(e) if strict => Err(e),
        Err(e) => {
            tracing::error!("Failed to read {} source: {}. Continuing without it.", source, e);
            Ok(Settled::Missing(SourceSummary::failed(source, &e)))
        }
    }
}

/// Load a single-table source, recording its summary
fn single_table(
    source: Source,
    result: Result<SourceOutcome<DailyTable>>,
    strict: bool,
    summaries: &mut Vec<SourceSummary>,
) -> Result<DailyTable> {
    match settle(source, result, strict)? {
        Settled::Loaded(table, stats) => {
            summaries.push(SourceSummary::loaded(&table, stats));
            Ok(table)
        }
        Settled::Missing(summary) => {
            summaries.push(summary);
            Ok(DailyTable::empty(source))
        }
    }
}

/// Run the whole pipeline for `config`.
///
/// With `dry_run` nothing is written; tables and summary are still returned.
pub fn run(config: &Config, dry_run: bool) -> Result<RunOutput> {
    config.validate()?;
    let strict = config.run.strict;
    let paths = &config.paths;
    let mut summaries = Vec::new();

    let diary = single_table(
        Source::Diary,
        load_diary(&paths.diary, &config.diary),
        strict,
        &mut summaries,
    )?;

    let weight = single_table(
        Source::Weight,
        load_weight(&paths.export_dir),
        strict,
        &mut summaries,
    )?;

    let (exercise, meditation) = match settle(
        Source::Exercise,
        load_activity(&paths.export_dir, &config.activity),
        strict,
    )? {
        Settled::Loaded(tables, stats) => {
            summaries.push(SourceSummary::loaded(&tables.exercise, stats.clone()));
            summaries.push(SourceSummary::loaded(&tables.meditation, stats));
            (tables.exercise, tables.meditation)
        }
        Settled::Missing(summary) => {
            let mut meditation = summary.clone();
            meditation.source = Source::Meditation;
            summaries.push(summary);
            summaries.push(meditation);
            (
                DailyTable::empty(Source::Exercise),
                DailyTable::empty(Source::Meditation),
            )
        }
    };

    let strength = single_table(
        Source::Strength,
        load_strength(&paths.strength),
        strict,
        &mut summaries,
    )?;

    let merged = merge_daily(
        &diary,
        &[&weight, &exercise, &meditation, &strength],
        &config.window,
    );

    let mut outputs = Vec::new();
    if dry_run {
        tracing::info!("Dry run: skipping output files");
    } else {
        if !diary.is_empty() {
            let path = paths.output_dir.join(DIARY_OUTPUT);
            write_table(&path, diary.columns(), diary.records())?;
            outputs.push(path);
        }

        let path = paths.output_dir.join(MERGED_OUTPUT);
        write_table(&path, merged.columns(), merged.records())?;
        outputs.push(path);
    }

    let summary = RunSummary {
        sources: summaries,
        merged: MergedSummary::from_table(&merged),
        outputs,
    };

    Ok(RunOutput {
        diary,
        merged,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DateWindow;
    use crate::report::SourceStatus;
    use crate::Metric;
    use chrono::NaiveDate;
    use std::fs;
    use std::path::Path;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn config_for(root: &Path) -> Config {
        let mut config = Config::default();
        config.paths.diary = root.join("mfp_diary.csv");
        config.paths.export_dir = root.join("health_data");
        config.paths.strength = root.join("strength_workouts.csv");
        config.paths.output_dir = root.join("out");
        config.window = DateWindow::new(day("2025-01-01"), day("2025-01-31"));
        config
    }

    fn write_fixtures(root: &Path) {
        fs::write(
            root.join("mfp_diary.csv"),
            "date,entry_type,food,calories,carbs_g,fat_g,protein_g,sugar_g,fiber_g,sodium_mg,cholesterol_mg,duration_min\n\
             2025-01-01,food,Oatmeal,500,,,,,,,,\n\
             2025-01-01,food,Chicken,700,,,,,,,,\n\
             2025-01-01,exercise,Running,300,,,,,,,,30\n\
             2025-02-15,food,Cake,900,,,,,,,,\n",
        )
        .unwrap();

        let export_dir = root.join("health_data");
        fs::create_dir_all(&export_dir).unwrap();
        fs::write(
            export_dir.join("com.samsung.health.weight.20250301.csv"),
            "com.samsung.health.weight,6307003,6\n\
             start_time,weight\n\
             2025-01-02 07:00:00.000,70.0\n\
             2025-01-02 20:00:00.000,70.5\n",
        )
        .unwrap();
    }

    #[test]
    fn test_run_merges_and_writes() {
        crate::logging::init_test();
        let temp_dir = tempfile::tempdir().unwrap();
        write_fixtures(temp_dir.path());
        let config = config_for(temp_dir.path());

        let output = run(&config, false).unwrap();

        // Diary keeps its out-of-window day; the merge does not
        assert_eq!(output.diary.len(), 2);
        assert_eq!(output.merged.len(), 2);

        let jan1 = output.merged.get(day("2025-01-01")).unwrap();
        assert_eq!(jan1.get(Metric::MfpCalories), 1200.0);
        assert_eq!(jan1.get(Metric::FoodItems), 2.0);
        assert_eq!(jan1.get(Metric::MfpExerciseCalories), 300.0);
        assert_eq!(jan1.get(Metric::MfpExerciseMinutes), 30.0);
        assert_eq!(jan1.get(Metric::WeightKg), 0.0);

        let jan2 = output.merged.get(day("2025-01-02")).unwrap();
        assert_eq!(jan2.get(Metric::WeightKg), 70.5);
        assert_eq!(jan2.get(Metric::MfpCalories), 0.0);

        let out_dir = temp_dir.path().join("out");
        assert!(out_dir.join(DIARY_OUTPUT).exists());
        let merged = fs::read_to_string(out_dir.join(MERGED_OUTPUT)).unwrap();
        assert!(merged.starts_with("Date,MFP_Calories,"));
        assert!(merged.contains("Weight_kg"));
        assert!(!merged.contains("Strength_Sets"));
        assert_eq!(merged.lines().count(), 3);
        assert_eq!(output.summary.outputs.len(), 2);
    }

    #[test]
    fn test_missing_sources_are_reported() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = config_for(temp_dir.path());

        let output = run(&config, false).unwrap();
        assert!(output.merged.is_empty());

        let summary = &output.summary;
        assert_eq!(summary.sources.len(), 5);
        assert!(summary
            .sources
            .iter()
            .all(|s| s.status == SourceStatus::Unavailable));
        assert_eq!(
            summary.source(Source::Meditation).unwrap().status,
            SourceStatus::Unavailable
        );

        // Merged file is still written (header only); diary output is not
        let out_dir = temp_dir.path().join("out");
        assert!(!out_dir.join(DIARY_OUTPUT).exists());
        assert_eq!(fs::read_to_string(out_dir.join(MERGED_OUTPUT)).unwrap(), "Date\n");
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_fixtures(temp_dir.path());
        let config = config_for(temp_dir.path());

        let output = run(&config, true).unwrap();
        assert_eq!(output.merged.len(), 2);
        assert!(output.summary.outputs.is_empty());
        assert!(!temp_dir.path().join("out").exists());
    }

    #[test]
    fn test_corrupt_source_fails_only_in_strict_mode() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_fixtures(temp_dir.path());
        fs::write(temp_dir.path().join("strength_workouts.csv"), [0xffu8, 0xfe, 0x00]).unwrap();

        let mut config = config_for(temp_dir.path());
        let output = run(&config, true).unwrap();
        assert_eq!(
            output.summary.source(Source::Strength).unwrap().status,
            SourceStatus::Failed
        );
        assert_eq!(output.merged.len(), 2);

        config.run.strict = true;
        assert!(run(&config, true).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = config_for(temp_dir.path());
        config.window = DateWindow::new(day("2025-02-01"), day("2025-01-01"));
        assert!(run(&config, true).is_err());
    }
}
