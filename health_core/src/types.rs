//! Core domain types for healthmerge.
//!
//! This module defines the fundamental types used throughout the system:
//! - Metric columns and the sources that produce them
//! - Daily records and per-source daily tables
//! - Parse diagnostics and per-source load outcomes

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Metrics
// ============================================================================

/// A metric column in a daily table.
///
/// Declaration order is the canonical column order within a source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "MFP_Calories")]
    MfpCalories,
    #[serde(rename = "Carbs_g")]
    CarbsG,
    #[serde(rename = "Fat_g")]
    FatG,
    #[serde(rename = "Protein_g")]
    ProteinG,
    #[serde(rename = "Sugar_g")]
    SugarG,
    #[serde(rename = "Fiber_g")]
    FiberG,
    #[serde(rename = "Sodium_mg")]
    SodiumMg,
    #[serde(rename = "Cholesterol_mg")]
    CholesterolMg,
    #[serde(rename = "Food_Items")]
    FoodItems,
    #[serde(rename = "MFP_Exercise_Calories")]
    MfpExerciseCalories,
    #[serde(rename = "MFP_Exercise_Minutes")]
    MfpExerciseMinutes,
    #[serde(rename = "Weight_kg")]
    WeightKg,
    #[serde(rename = "Exercise_Calories")]
    ExerciseCalories,
    #[serde(rename = "Exercise_Minutes")]
    ExerciseMinutes,
    #[serde(rename = "Meditation_Minutes")]
    MeditationMinutes,
    #[serde(rename = "Strength_Sets")]
    StrengthSets,
    #[serde(rename = "Strength_Volume_lbs")]
    StrengthVolumeLbs,
    #[serde(rename = "Strength_Exercises")]
    StrengthExercises,
}

impl Metric {
    /// Header used for this metric in output files.
    pub fn column_name(self) -> &'static str {
        match self {
            Metric::MfpCalories => "MFP_Calories",
            Metric::CarbsG => "Carbs_g",
            Metric::FatG => "Fat_g",
            Metric::ProteinG => "Protein_g",
            Metric::SugarG => "Sugar_g",
            Metric::FiberG => "Fiber_g",
            Metric::SodiumMg => "Sodium_mg",
            Metric::CholesterolMg => "Cholesterol_mg",
            Metric::FoodItems => "Food_Items",
            Metric::MfpExerciseCalories => "MFP_Exercise_Calories",
            Metric::MfpExerciseMinutes => "MFP_Exercise_Minutes",
            Metric::WeightKg => "Weight_kg",
            Metric::ExerciseCalories => "Exercise_Calories",
            Metric::ExerciseMinutes => "Exercise_Minutes",
            Metric::MeditationMinutes => "Meditation_Minutes",
            Metric::StrengthSets => "Strength_Sets",
            Metric::StrengthVolumeLbs => "Strength_Volume_lbs",
            Metric::StrengthExercises => "Strength_Exercises",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.column_name())
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Which input produced a daily table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Diary,
    Weight,
    Exercise,
    Meditation,
    Strength,
}

impl Source {
    pub fn name(self) -> &'static str {
        match self {
            Source::Diary => "diary",
            Source::Weight => "weight",
            Source::Exercise => "exercise",
            Source::Meditation => "meditation",
            Source::Strength => "strength",
        }
    }

    /// Columns a table from this source carries, in output order.
    pub fn columns(self) -> &'static [Metric] {
        match self {
            Source::Diary => &[
                Metric::MfpCalories,
                Metric::CarbsG,
                Metric::FatG,
                Metric::ProteinG,
                Metric::SugarG,
                Metric::FiberG,
                Metric::SodiumMg,
                Metric::CholesterolMg,
                Metric::FoodItems,
                Metric::MfpExerciseCalories,
                Metric::MfpExerciseMinutes,
            ],
            Source::Weight => &[Metric::WeightKg],
            Source::Exercise => &[Metric::ExerciseCalories, Metric::ExerciseMinutes],
            Source::Meditation => &[Metric::MeditationMinutes],
            Source::Strength => &[
                Metric::StrengthSets,
                Metric::StrengthVolumeLbs,
                Metric::StrengthExercises,
            ],
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

// ============================================================================
// Daily records and tables
// ============================================================================

/// One calendar day of metric values
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub metrics: BTreeMap<Metric, f64>,
}

impl DailyRecord {
    /// Value of `metric`, zero when the record does not carry it
    pub fn get(&self, metric: Metric) -> f64 {
        self.metrics.get(&metric).copied().unwrap_or(0.0)
    }
}

/// Per-day accumulator keyed by date; the shape every parser aggregates into.
pub type DayMap = BTreeMap<NaiveDate, BTreeMap<Metric, f64>>;

/// A per-source table with exactly one record per date, sorted by date.
#[derive(Clone, Debug, PartialEq)]
pub struct DailyTable {
    source: Source,
    records: Vec<DailyRecord>,
}

impl DailyTable {
    pub fn empty(source: Source) -> Self {
        Self {
            source,
            records: Vec::new(),
        }
    }

    /// Build a table from per-day values, zero-filling every column of the source.
    pub fn from_days(source: Source, days: DayMap) -> Self {
        let columns = source.columns();
        let records = days
            .into_iter()
            .map(|(date, values)| {
                let metrics = columns
                    .iter()
                    .map(|m| (*m, values.get(m).copied().unwrap_or(0.0)))
                    .collect();
                DailyRecord { date, metrics }
            })
            .collect();

        Self { source, records }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn columns(&self) -> &'static [Metric] {
        self.source.columns()
    }

    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailyRecord> {
        self.records
            .binary_search_by(|r| r.date.cmp(&date))
            .ok()
            .map(|idx| &self.records[idx])
    }

    /// First and last date in the table
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.records.first()?.date, self.records.last()?.date))
    }

    /// Mean of `metric` across all days, `None` for an empty table
    pub fn mean(&self, metric: Metric) -> Option<f64> {
        mean_of(&self.records, metric)
    }
}

pub(crate) fn mean_of(records: &[DailyRecord], metric: Metric) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let total: f64 = records.iter().map(|r| r.get(metric)).sum();
    Some(total / records.len() as f64)
}

// ============================================================================
// Load outcomes
// ============================================================================

/// Row-level diagnostics collected during a parse pass.
///
/// Skipped rows never change aggregate values; they are reported only.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    /// Data rows read from the file
    pub rows_read: usize,
    /// Rows dropped because a required field (usually the date) did not parse
    pub rows_skipped: usize,
    /// Rows deliberately filtered out (summary rows, unknown diary entry
    /// types, auto-detected activity)
    pub rows_excluded: usize,
}

/// Result of loading one source.
///
/// A source file that exists but cannot be read at all is an `Err` from the
/// loader instead.
#[derive(Clone, Debug)]
pub enum SourceOutcome<T> {
    Loaded { data: T, stats: ParseStats },
    Unavailable { reason: String },
}

impl<T> SourceOutcome<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        SourceOutcome::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, SourceOutcome::Loaded { .. })
    }
}
