//! Month-keyed numeric series.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::DateRange;

/// A named numeric column; `None` marks a missing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl ValueColumn {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }
}

/// One row per month, keyed by the first day of the month.
///
/// Invariant: `dates` is strictly increasing and every column has
/// `dates.len()` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeries {
    pub name: String,
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<ValueColumn>,
}

impl MonthlySeries {
    pub fn new(name: impl Into<String>, dates: Vec<NaiveDate>, columns: Vec<ValueColumn>) -> Self {
        debug_assert!(columns.iter().all(|c| c.values.len() == dates.len()));
        Self {
            name: name.into(),
            dates,
            columns,
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&ValueColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Value of `column` at `date`, if the row exists and the value is present.
    pub fn value(&self, column: &str, date: NaiveDate) -> Option<f64> {
        let row = self.dates.binary_search(&date).ok()?;
        self.column(column)?.values[row]
    }

    /// Dates strictly increasing, all at month start, columns aligned.
    pub fn is_well_formed(&self) -> bool {
        self.dates.windows(2).all(|w| w[0] < w[1])
            && self.dates.iter().all(|d| d.day() == 1)
            && self.columns.iter().all(|c| c.values.len() == self.dates.len())
    }

    /// Rows within `range` (inclusive).
    pub fn filter_range(&self, range: &DateRange) -> Self {
        let keep: Vec<usize> = (0..self.dates.len())
            .filter(|&i| range.contains(self.dates[i]))
            .collect();
        Self {
            name: self.name.clone(),
            dates: keep.iter().map(|&i| self.dates[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| ValueColumn::new(c.name.clone(), keep.iter().map(|&i| c.values[i]).collect()))
                .collect(),
        }
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Month start `months` months after `date`'s month.
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    month_start(date)
        .checked_add_months(chrono::Months::new(months))
        .unwrap_or(date)
}

/// Whole months from `from`'s month to `to`'s month.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to.year() as i64 - from.year() as i64) * 12 + (to.month() as i64 - from.month() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample() -> MonthlySeries {
        MonthlySeries::new(
            "CPI",
            vec![d(2020, 1, 1), d(2020, 2, 1), d(2020, 3, 1)],
            vec![ValueColumn::new("cpi", vec![Some(1.0), None, Some(3.0)])],
        )
    }

    #[test]
    fn value_lookup() {
        let s = sample();
        assert_eq!(s.value("cpi", d(2020, 1, 1)), Some(1.0));
        assert_eq!(s.value("cpi", d(2020, 2, 1)), None);
        assert_eq!(s.value("cpi", d(2021, 1, 1)), None);
        assert_eq!(s.value("other", d(2020, 1, 1)), None);
    }

    #[test]
    fn filter_range_keeps_columns_aligned() {
        let s = sample();
        let filtered = s.filter_range(&DateRange::new(d(2020, 2, 1), d(2020, 12, 31)));
        assert_eq!(filtered.dates, vec![d(2020, 2, 1), d(2020, 3, 1)]);
        assert_eq!(filtered.columns[0].values, vec![None, Some(3.0)]);
        assert!(filtered.is_well_formed());
    }

    #[test]
    fn month_arithmetic() {
        assert_eq!(month_start(d(2020, 3, 31)), d(2020, 3, 1));
        assert_eq!(add_months(d(2020, 11, 15), 3), d(2021, 2, 1));
        assert_eq!(months_between(d(2020, 3, 31), d(2020, 6, 30)), 3);
        assert_eq!(months_between(d(2019, 12, 1), d(2021, 1, 1)), 13);
    }

    #[test]
    fn well_formed_rejects_duplicates() {
        let mut s = sample();
        s.dates[1] = s.dates[0];
        assert!(!s.is_well_formed());
    }
}
