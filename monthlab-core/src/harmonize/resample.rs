//! Conversion of a classified series to monthly observations.
//!
//! | class     | strategy                                             |
//! |-----------|------------------------------------------------------|
//! | daily     | mean per calendar month, empty months absent         |
//! | quarterly | month grid, interpolated inside, held at both ends   |
//! | annual    | each year repeated for January through December      |
//! | monthly   | passed through, snapped to month start               |
//!
//! Only numeric columns are carried; text columns (including the raw date
//! audit column) are dropped here.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

use super::frequency::FrequencyClass;
use super::interpolate;
use crate::config::InterpolationMethod;
use crate::diagnostics::{emit, DiagnosticKind, DiagnosticsSink};
use crate::domain::{
    add_months, month_start, months_between, DatedRecord, DatedSeries, MonthlySeries, ValueColumn,
};
use crate::error::HarmonizeError;

#[derive(Debug, Clone, Copy, Default)]
pub struct MonthlyResampler {
    method: InterpolationMethod,
}

impl MonthlyResampler {
    pub fn new(method: InterpolationMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> InterpolationMethod {
        self.method
    }

    /// Resample `series` according to `class`.
    pub fn resample(
        &self,
        series: &DatedSeries,
        class: FrequencyClass,
        sink: &dyn DiagnosticsSink,
    ) -> Result<MonthlySeries, HarmonizeError> {
        let numeric = series.numeric_columns();
        let result = match class {
            FrequencyClass::Daily => mean_by_month(series, &numeric),
            FrequencyClass::Quarterly => self.interpolate_quarterly(series, &numeric),
            FrequencyClass::Annual => repeat_annual(series, &numeric, sink),
            FrequencyClass::Monthly => pass_through(series, &numeric, sink),
            FrequencyClass::Unknown => {
                return Err(HarmonizeError::UnclassifiableFrequency {
                    observations: series.len(),
                })
            }
        };

        tracing::debug!(
            series = %series.name,
            %class,
            input_rows = series.len(),
            output_rows = result.len(),
            columns = result.columns.len(),
            "resampled to monthly"
        );
        Ok(result)
    }

    fn interpolate_quarterly(&self, series: &DatedSeries, numeric: &[usize]) -> MonthlySeries {
        let binned = mean_by_month(series, numeric);
        let (Some(first), Some(last)) = (binned.first_date(), binned.last_date()) else {
            return binned;
        };

        let span = months_between(first, last) as usize + 1;
        let grid: Vec<NaiveDate> = (0..span as u32).map(|m| add_months(first, m)).collect();

        let columns = binned
            .columns
            .iter()
            .map(|col| {
                let mut on_grid = vec![None; span];
                for (date, value) in binned.dates.iter().zip(&col.values) {
                    on_grid[months_between(first, *date) as usize] = *value;
                }
                ValueColumn::new(col.name.clone(), interpolate::fill_outward(&on_grid, self.method))
            })
            .collect();

        MonthlySeries::new(series.name.clone(), grid, columns)
    }
}

/// Arithmetic mean of non-missing values per calendar month.
fn mean_by_month(series: &DatedSeries, numeric: &[usize]) -> MonthlySeries {
    let mut buckets: BTreeMap<NaiveDate, Vec<(f64, usize)>> = BTreeMap::new();
    for record in &series.records {
        let acc = buckets
            .entry(month_start(record.date))
            .or_insert_with(|| vec![(0.0, 0); numeric.len()]);
        for (slot, &col) in numeric.iter().enumerate() {
            if let Some(v) = record.values.get(col).and_then(|c| c.as_number()) {
                acc[slot].0 += v;
                acc[slot].1 += 1;
            }
        }
    }

    let dates: Vec<NaiveDate> = buckets.keys().copied().collect();
    let columns = numeric
        .iter()
        .enumerate()
        .map(|(slot, &col)| {
            let values = buckets
                .values()
                .map(|acc| {
                    let (sum, n) = acc[slot];
                    (n > 0).then(|| sum / n as f64)
                })
                .collect();
            ValueColumn::new(series.columns[col].clone(), values)
        })
        .collect();

    MonthlySeries::new(series.name.clone(), dates, columns)
}

/// Twelve identical monthly rows per annual observation.
fn repeat_annual(
    series: &DatedSeries,
    numeric: &[usize],
    sink: &dyn DiagnosticsSink,
) -> MonthlySeries {
    let mut by_year: BTreeMap<i32, &DatedRecord> = BTreeMap::new();
    for record in &series.records {
        if by_year.contains_key(&record.date.year()) {
            emit(
                sink,
                &series.name,
                DiagnosticKind::DuplicatePeriod { date: record.date },
            );
            continue;
        }
        by_year.insert(record.date.year(), record);
    }

    let mut dates = Vec::with_capacity(by_year.len() * 12);
    let mut columns: Vec<ValueColumn> = numeric
        .iter()
        .map(|&col| ValueColumn::new(series.columns[col].clone(), Vec::with_capacity(by_year.len() * 12)))
        .collect();

    for (&year, record) in &by_year {
        for month in 1..=12 {
            let Some(date) = NaiveDate::from_ymd_opt(year, month, 1) else {
                continue;
            };
            dates.push(date);
            for (column, &col) in columns.iter_mut().zip(numeric) {
                column
                    .values
                    .push(record.values.get(col).and_then(|c| c.as_number()));
            }
        }
    }

    MonthlySeries::new(series.name.clone(), dates, columns)
}

/// Monthly input: one row per month, keyed at month start.
fn pass_through(
    series: &DatedSeries,
    numeric: &[usize],
    sink: &dyn DiagnosticsSink,
) -> MonthlySeries {
    let mut by_month: BTreeMap<NaiveDate, &DatedRecord> = BTreeMap::new();
    for record in &series.records {
        let key = month_start(record.date);
        if by_month.contains_key(&key) {
            emit(
                sink,
                &series.name,
                DiagnosticKind::DuplicatePeriod { date: record.date },
            );
            continue;
        }
        by_month.insert(key, record);
    }

    let dates: Vec<NaiveDate> = by_month.keys().copied().collect();
    let columns = numeric
        .iter()
        .map(|&col| {
            ValueColumn::new(
                series.columns[col].clone(),
                by_month
                    .values()
                    .map(|r| r.values.get(col).and_then(|c| c.as_number()))
                    .collect(),
            )
        })
        .collect();

    MonthlySeries::new(series.name.clone(), dates, columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::domain::CellValue;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series(rows: &[(NaiveDate, f64)]) -> DatedSeries {
        DatedSeries {
            name: "S".into(),
            columns: vec!["value".into(), "date_raw".into()],
            records: rows
                .iter()
                .map(|(date, v)| DatedRecord {
                    date: *date,
                    values: vec![CellValue::Number(*v), CellValue::Text(date.to_string())],
                })
                .collect(),
        }
    }

    fn values(s: &MonthlySeries) -> Vec<Option<f64>> {
        s.column("value").unwrap().values.clone()
    }

    #[test]
    fn daily_mean_per_month_and_skips_empty_months() {
        let input = series(&[
            (d(2024, 1, 2), 1.0),
            (d(2024, 1, 3), 3.0),
            (d(2024, 3, 1), 10.0),
        ]);
        let sink = CollectingSink::new();
        let out = MonthlyResampler::default()
            .resample(&input, FrequencyClass::Daily, &sink)
            .unwrap();

        assert_eq!(out.dates, vec![d(2024, 1, 1), d(2024, 3, 1)]);
        assert_eq!(values(&out), vec![Some(2.0), Some(10.0)]);
        assert!(out.is_well_formed());
    }

    #[test]
    fn text_columns_are_dropped() {
        let input = series(&[(d(2024, 1, 2), 1.0), (d(2024, 1, 3), 3.0)]);
        let out = MonthlyResampler::default()
            .resample(&input, FrequencyClass::Daily, &CollectingSink::new())
            .unwrap();
        assert_eq!(out.column_names(), vec!["value"]);
    }

    #[test]
    fn quarterly_linear_between_anchors() {
        let input = series(&[(d(2020, 3, 31), 100.0), (d(2020, 6, 30), 110.0)]);
        let out = MonthlyResampler::new(InterpolationMethod::Linear)
            .resample(&input, FrequencyClass::Quarterly, &CollectingSink::new())
            .unwrap();

        assert_eq!(
            out.dates,
            vec![d(2020, 3, 1), d(2020, 4, 1), d(2020, 5, 1), d(2020, 6, 1)]
        );
        let v = values(&out);
        assert_eq!(v[0], Some(100.0));
        assert!((v[1].unwrap() - (100.0 + 10.0 / 3.0)).abs() < 1e-9);
        assert!((v[2].unwrap() - (100.0 + 20.0 / 3.0)).abs() < 1e-9);
        assert_eq!(v[3], Some(110.0));
    }

    #[test]
    fn quarterly_fills_edges_of_sparse_column() {
        let mut input = series(&[
            (d(2020, 3, 31), 1.0),
            (d(2020, 6, 30), 2.0),
            (d(2020, 9, 30), 3.0),
        ]);
        input.records[0].values[0] = CellValue::Missing;
        let out = MonthlyResampler::default()
            .resample(&input, FrequencyClass::Quarterly, &CollectingSink::new())
            .unwrap();
        let v = values(&out);
        assert_eq!(v.first().copied().flatten(), Some(2.0));
        assert!(v.iter().all(Option::is_some));
    }

    #[test]
    fn annual_repeats_twelve_months() {
        let input = series(&[(d(2021, 12, 31), 500.0)]);
        let out = MonthlyResampler::default()
            .resample(&input, FrequencyClass::Annual, &CollectingSink::new())
            .unwrap();

        assert_eq!(out.len(), 12);
        assert_eq!(out.dates[0], d(2021, 1, 1));
        assert_eq!(out.dates[11], d(2021, 12, 1));
        assert!(values(&out).iter().all(|v| *v == Some(500.0)));
    }

    #[test]
    fn annual_duplicate_year_keeps_first_and_warns() {
        let input = series(&[(d(2021, 6, 30), 1.0), (d(2021, 12, 31), 2.0), (d(2022, 12, 31), 3.0)]);
        let sink = CollectingSink::new();
        let out = MonthlyResampler::default()
            .resample(&input, FrequencyClass::Annual, &sink)
            .unwrap();

        assert_eq!(out.len(), 24);
        assert_eq!(out.value("value", d(2021, 7, 1)), Some(1.0));
        assert_eq!(
            sink.for_series("S"),
            vec![DiagnosticKind::DuplicatePeriod { date: d(2021, 12, 31) }]
        );
    }

    #[test]
    fn monthly_passes_through_at_month_start() {
        let input = series(&[(d(2024, 1, 31), 1.0), (d(2024, 2, 29), 2.0)]);
        let out = MonthlyResampler::default()
            .resample(&input, FrequencyClass::Monthly, &CollectingSink::new())
            .unwrap();
        assert_eq!(out.dates, vec![d(2024, 1, 1), d(2024, 2, 1)]);
        assert_eq!(values(&out), vec![Some(1.0), Some(2.0)]);
    }

    #[test]
    fn monthly_duplicate_month_keeps_first_and_warns() {
        let input = series(&[(d(2024, 1, 5), 1.0), (d(2024, 1, 20), 2.0), (d(2024, 2, 10), 3.0)]);
        let sink = CollectingSink::new();
        let out = MonthlyResampler::default()
            .resample(&input, FrequencyClass::Monthly, &sink)
            .unwrap();

        assert_eq!(out.dates, vec![d(2024, 1, 1), d(2024, 2, 1)]);
        assert_eq!(values(&out), vec![Some(1.0), Some(3.0)]);
        assert_eq!(
            sink.for_series("S"),
            vec![DiagnosticKind::DuplicatePeriod { date: d(2024, 1, 20) }]
        );
    }

    #[test]
    fn unknown_class_is_an_error() {
        let input = series(&[(d(2024, 1, 1), 1.0)]);
        let err = MonthlyResampler::default()
            .resample(&input, FrequencyClass::Unknown, &CollectingSink::new())
            .unwrap_err();
        assert!(matches!(err, HarmonizeError::UnclassifiableFrequency { .. }));
    }
}
