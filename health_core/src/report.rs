//! Output files and run summaries.
//!
//! Tables are written atomically: rows go to a locked temp file in the target
//! directory, which is synced and renamed over the destination so a dashboard
//! reading the output never sees a half-written file.

use crate::merge::MergedTable;
use crate::{DailyRecord, DailyTable, Error, Metric, ParseStats, Result, Source};
use chrono::NaiveDate;
use fs2::FileExt;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File name of the diary-only daily aggregate
pub const DIARY_OUTPUT: &str = "mfp_daily_calories.csv";

/// File name of the merged daily table
pub const MERGED_OUTPUT: &str = "merged_health_data.csv";

/// Number of trailing days included in the summary
pub const RECENT_DAYS: usize = 10;

/// Metrics whose non-zero day counts are reported for the merged table
pub const COVERAGE_METRICS: &[(Metric, &str)] = &[
    (Metric::MfpCalories, "MFP data"),
    (Metric::WeightKg, "Weight"),
    (Metric::ExerciseMinutes, "Cardio/Exercise"),
    (Metric::MeditationMinutes, "Meditation"),
    (Metric::StrengthSets, "Strength workouts"),
];

/// Format a value for CSV output: at most three decimals, no trailing `.0`.
pub fn format_value(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        // Avoid "-0"
        return "0".to_string();
    }
    format!("{}", rounded)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Write rows to `path` through a locked temp file and an atomic rename.
///
/// Returns the number of data rows written.
pub(crate) fn write_csv_atomic<I>(path: &Path, header: &[&str], rows: I) -> Result<usize>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    let mut count = 0;
    {
        let mut writer = csv::Writer::from_writer(std::io::BufWriter::new(temp.as_file()));
        writer.write_record(header)?;
        for row in rows {
            writer.write_record(&row)?;
            count += 1;
        }
        writer.flush()?;
        let mut inner = writer
            .into_inner()
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;
        inner.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Wrote {} rows to {:?}", count, path);
    Ok(count)
}

/// Write `Date` plus `columns` for each record.
pub fn write_table(path: &Path, columns: &[Metric], records: &[DailyRecord]) -> Result<usize> {
    let mut header = vec!["Date"];
    header.extend(columns.iter().map(|m| m.column_name()));

    let rows = records.iter().map(|record| {
        let mut row = Vec::with_capacity(columns.len() + 1);
        row.push(format_date(record.date));
        row.extend(columns.iter().map(|m| format_value(record.get(*m))));
        row
    });

    let count = write_csv_atomic(path, &header, rows)?;
    tracing::info!("Saved {} days to {:?}", count, path);
    Ok(count)
}

// ============================================================================
// Summaries
// ============================================================================

/// How a source fared during the run
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Loaded,
    Unavailable,
    Failed,
}

/// Per-source part of the run summary
#[derive(Clone, Debug, Serialize)]
pub struct SourceSummary {
    pub source: Source,
    pub status: SourceStatus,
    /// Why the source is unavailable or failed
    pub detail: Option<String>,
    pub days: usize,
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
    pub stats: ParseStats,
    pub averages: BTreeMap<Metric, f64>,
    /// Most recent value of the headline metric (latest weight)
    pub latest: Option<f64>,
}

/// Headline metrics averaged per source
fn average_metrics(source: Source) -> &'static [Metric] {
    match source {
        Source::Diary => &[
            Metric::MfpCalories,
            Metric::ProteinG,
            Metric::CarbsG,
            Metric::FatG,
        ],
        Source::Weight => &[Metric::WeightKg],
        Source::Exercise => &[Metric::ExerciseMinutes, Metric::ExerciseCalories],
        Source::Meditation => &[Metric::MeditationMinutes],
        Source::Strength => &[Metric::StrengthSets, Metric::StrengthVolumeLbs],
    }
}

impl SourceSummary {
    pub fn loaded(table: &DailyTable, stats: ParseStats) -> Self {
        let source = table.source();
        let range = table.date_range();
        let averages = average_metrics(source)
            .iter()
            .filter_map(|m| table.mean(*m).map(|v| (*m, v)))
            .collect();
        let latest = match source {
            Source::Weight => table.records().last().map(|r| r.get(Metric::WeightKg)),
            _ => None,
        };

        Self {
            source,
            status: SourceStatus::Loaded,
            detail: None,
            days: table.len(),
            first_day: range.map(|(first, _)| first),
            last_day: range.map(|(_, last)| last),
            stats,
            averages,
            latest,
        }
    }

    pub fn unavailable(source: Source, reason: impl Into<String>) -> Self {
        Self::not_loaded(source, SourceStatus::Unavailable, reason.into())
    }

    pub fn failed(source: Source, error: &Error) -> Self {
        Self::not_loaded(source, SourceStatus::Failed, error.to_string())
    }

    fn not_loaded(source: Source, status: SourceStatus, detail: String) -> Self {
        Self {
            source,
            status,
            detail: Some(detail),
            days: 0,
            first_day: None,
            last_day: None,
            stats: ParseStats::default(),
            averages: BTreeMap::new(),
            latest: None,
        }
    }
}

/// Merged-table part of the run summary
#[derive(Clone, Debug, Serialize)]
pub struct MergedSummary {
    pub days: usize,
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
    pub columns: Vec<Metric>,
    /// Days with a non-zero value, for each coverage metric present
    pub days_with: BTreeMap<Metric, usize>,
    pub recent: Vec<DailyRecord>,
}

impl MergedSummary {
    pub fn from_table(merged: &MergedTable) -> Self {
        let days_with = COVERAGE_METRICS
            .iter()
            .filter(|(m, _)| merged.has_column(*m))
            .map(|(m, _)| (*m, merged.days_with(*m)))
            .collect();

        Self {
            days: merged.len(),
            first_day: merged.records().first().map(|r| r.date),
            last_day: merged.records().last().map(|r| r.date),
            columns: merged.columns().to_vec(),
            days_with,
            recent: merged.tail(RECENT_DAYS).to_vec(),
        }
    }
}

/// Everything the CLI prints after a run
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub sources: Vec<SourceSummary>,
    pub merged: MergedSummary,
    pub outputs: Vec<PathBuf>,
}

impl RunSummary {
    pub fn source(&self, source: Source) -> Option<&SourceSummary> {
        self.sources.iter().find(|s| s.source == source)
    }
}
