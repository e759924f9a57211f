//! Daily outer-join merge across all source tables.

use crate::config::DateWindow;
use crate::types::mean_of;
use crate::{DailyRecord, DailyTable, Metric};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// The merged per-day table.
///
/// Columns are the union of the columns of every non-empty input table; every
/// record carries every column.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MergedTable {
    columns: Vec<Metric>,
    records: Vec<DailyRecord>,
}

impl MergedTable {
    pub fn columns(&self) -> &[Metric] {
        &self.columns
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

    pub fn has_column(&self, metric: Metric) -> bool {
        self.columns.contains(&metric)
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailyRecord> {
        self.records
            .binary_search_by(|r| r.date.cmp(&date))
            .ok()
            .map(|idx| &self.records[idx])
    }

    /// Days on which `metric` is non-zero
    pub fn days_with(&self, metric: Metric) -> usize {
        self.records.iter().filter(|r| r.get(metric) > 0.0).count()
    }

    pub fn mean(&self, metric: Metric) -> Option<f64> {
        mean_of(&self.records, metric)
    }

    /// The last `n` days, oldest first
    pub fn tail(&self, n: usize) -> &[DailyRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }
}

/// Outer-join `base` and `extras` on date, keep `window`, zero-fill and sort.
///
/// Empty tables contribute neither dates nor columns, so an unavailable diary
/// does not add empty nutrition columns to the output.
pub fn merge_daily(base: &DailyTable, extras: &[&DailyTable], window: &DateWindow) -> MergedTable {
    let tables = std::iter::once(base)
        .chain(extras.iter().copied())
        .filter(|t| !t.is_empty());

    let mut columns: Vec<Metric> = Vec::new();
    let mut days: BTreeMap<NaiveDate, BTreeMap<Metric, f64>> = BTreeMap::new();

    for table in tables {
        for metric in table.columns() {
            if !columns.contains(metric) {
                columns.push(*metric);
            }
        }

        for record in table.records() {
            if !window.contains(record.date) {
                continue;
            }
            let day = days.entry(record.date).or_default();
            for (metric, value) in &record.metrics {
                day.insert(*metric, *value);
            }
        }
    }

    let records = days
        .into_iter()
        .map(|(date, values)| DailyRecord {
            date,
            metrics: columns
                .iter()
                .map(|m| (*m, values.get(m).copied().unwrap_or(0.0)))
                .collect(),
        })
        .collect::<Vec<_>>();

    tracing::info!(
        "Merged {} days across {} columns ({} to {})",
        records.len(),
        columns.len(),
        window.start,
        window.end
    );

    MergedTable { columns, records }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DayMap, Source};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn table(source: Source, entries: &[(&str, Metric, f64)]) -> DailyTable {
        let mut days = DayMap::new();
        for (date, metric, value) in entries {
            days.entry(day(date)).or_default().insert(*metric, *value);
        }
        DailyTable::from_days(source, days)
    }

    fn wide_window() -> DateWindow {
        DateWindow::new(day("2024-01-01"), day("2026-12-31"))
    }

    #[test]
    fn test_weight_only_day_zero_fills_nutrition() {
        let diary = table(Source::Diary, &[("2025-01-01", Metric::MfpCalories, 1800.0)]);
        let weight = table(Source::Weight, &[("2025-01-02", Metric::WeightKg, 70.5)]);

        let merged = merge_daily(&diary, &[&weight], &wide_window());
        assert_eq!(merged.len(), 2);

        let jan2 = merged.get(day("2025-01-02")).unwrap();
        assert_eq!(jan2.get(Metric::WeightKg), 70.5);
        assert_eq!(jan2.get(Metric::MfpCalories), 0.0);
        assert_eq!(jan2.metrics.len(), merged.columns().len());

        let jan1 = merged.get(day("2025-01-01")).unwrap();
        assert_eq!(jan1.get(Metric::WeightKg), 0.0);
        assert_eq!(jan1.get(Metric::MfpCalories), 1800.0);
    }

    #[test]
    fn test_window_excludes_outside_dates() {
        let diary = table(
            Source::Diary,
            &[
                ("2024-11-30", Metric::MfpCalories, 1.0),
                ("2024-12-01", Metric::MfpCalories, 2.0),
                ("2026-02-21", Metric::MfpCalories, 3.0),
                ("2026-02-22", Metric::MfpCalories, 4.0),
            ],
        );
        let weight = table(
            Source::Weight,
            &[
                ("2024-11-30", Metric::WeightKg, 70.0),
                ("2026-02-22", Metric::WeightKg, 71.0),
            ],
        );

        let merged = merge_daily(&diary, &[&weight], &DateWindow::default());
        let dates: Vec<_> = merged.records().iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day("2024-12-01"), day("2026-02-21")]);
        // Weight still contributes its column even with no in-window days
        assert!(merged.has_column(Metric::WeightKg));
    }

    #[test]
    fn test_empty_tables_add_no_columns() {
        let diary = DailyTable::empty(Source::Diary);
        let strength = DailyTable::empty(Source::Strength);
        let weight = table(Source::Weight, &[("2025-01-01", Metric::WeightKg, 70.0)]);

        let merged = merge_daily(&diary, &[&weight, &strength], &wide_window());
        assert_eq!(merged.columns(), &[Metric::WeightKg]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_all_empty() {
        let merged = merge_daily(&DailyTable::empty(Source::Diary), &[], &wide_window());
        assert!(merged.is_empty());
        assert!(merged.columns().is_empty());
    }

    #[test]
    fn test_columns_follow_input_order_and_dates_sorted() {
        let diary = table(Source::Diary, &[("2025-01-03", Metric::MfpCalories, 1.0)]);
        let exercise = table(Source::Exercise, &[("2025-01-01", Metric::ExerciseMinutes, 30.0)]);
        let meditation = table(
            Source::Meditation,
            &[("2025-01-02", Metric::MeditationMinutes, 10.0)],
        );

        let merged = merge_daily(&diary, &[&exercise, &meditation], &wide_window());
        let dates: Vec<_> = merged.records().iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day("2025-01-01"), day("2025-01-02"), day("2025-01-03")]);

        let columns = merged.columns();
        assert_eq!(columns[0], Metric::MfpCalories);
        assert_eq!(columns[columns.len() - 1], Metric::MeditationMinutes);
        assert_eq!(merged.days_with(Metric::ExerciseMinutes), 1);
    }

    #[test]
    fn test_tail() {
        let weight = table(
            Source::Weight,
            &[
                ("2025-01-01", Metric::WeightKg, 70.0),
                ("2025-01-02", Metric::WeightKg, 70.1),
                ("2025-01-03", Metric::WeightKg, 70.2),
            ],
        );
        let merged = merge_daily(&DailyTable::empty(Source::Diary), &[&weight], &wide_window());
        assert_eq!(merged.tail(2).len(), 2);
        assert_eq!(merged.tail(2)[0].date, day("2025-01-02"));
        assert_eq!(merged.tail(10).len(), 3);
    }
}
