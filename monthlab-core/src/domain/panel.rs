//! The merged wide table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::monthly::ValueColumn;
use crate::config::DateRange;

/// Unique monthly dates as rows, one column per selected series value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<ValueColumn>,
}

/// Missing-value count for one panel column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Missingness {
    pub column: String,
    pub missing: usize,
    /// Share of rows missing, in percent, rounded to two decimals.
    pub percentage: f64,
}

impl Panel {
    pub fn height(&self) -> usize {
        self.dates.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&ValueColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn value(&self, column: &str, date: NaiveDate) -> Option<f64> {
        let row = self.dates.binary_search(&date).ok()?;
        self.column(column)?.values[row]
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.dates.first()?, *self.dates.last()?))
    }

    /// Per-column missing counts. Reads the panel only.
    pub fn missingness(&self) -> Vec<Missingness> {
        let rows = self.height();
        self.columns
            .iter()
            .map(|c| {
                let missing = c.missing_count();
                let percentage = if rows == 0 {
                    0.0
                } else {
                    (missing as f64 / rows as f64 * 10_000.0).round() / 100.0
                };
                Missingness {
                    column: c.name.clone(),
                    missing,
                    percentage,
                }
            })
            .collect()
    }

    /// Rows within `range` (inclusive).
    pub fn filter_range(&self, range: &DateRange) -> Self {
        let keep: Vec<usize> = (0..self.dates.len())
            .filter(|&i| range.contains(self.dates[i]))
            .collect();
        Self {
            dates: keep.iter().map(|&i| self.dates[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| ValueColumn::new(c.name.clone(), keep.iter().map(|&i| c.values[i]).collect()))
                .collect(),
        }
    }
}
