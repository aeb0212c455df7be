//! Input records, before and after date normalization.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single cell of an input table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Missing,
}

impl CellValue {
    /// Interpret raw cell text. Empty cells and NA markers are `Missing`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || is_na_marker(trimmed) {
            return Self::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Self::Number(v),
            Ok(_) => Self::Missing,
            Err(_) => Self::Text(trimmed.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    pub fn from_option(value: Option<f64>) -> Self {
        value.map_or(Self::Missing, Self::Number)
    }
}

fn is_na_marker(s: &str) -> bool {
    matches!(s, "NaN" | "nan" | "NA" | "N/A" | "null" | "--")
}

/// One row of an input table, exactly as read. Fields align with the
/// owning series' `columns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    fields: Vec<String>,
}

impl RawRecord {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// An input table with its header.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    pub name: String,
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
}

impl RawSeries {
    pub fn new(name: impl Into<String>, columns: Vec<String>, records: Vec<RawRecord>) -> Self {
        Self {
            name: name.into(),
            columns,
            records,
        }
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Field of `column` on a record, if both exist.
    pub fn get<'a>(&self, record: &'a RawRecord, column: &str) -> Option<&'a str> {
        self.column_index(column).and_then(|i| record.field(i))
    }
}

/// A record whose date has been normalized to a calendar date.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedRecord {
    pub date: NaiveDate,
    pub values: Vec<CellValue>,
}

/// A series keyed by canonical dates, sorted ascending (stable for ties).
///
/// `columns` excludes the original date column; its raw text is kept as an
/// audit column named `{date column}_raw`.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedSeries {
    pub name: String,
    pub columns: Vec<String>,
    pub records: Vec<DatedRecord>,
}

impl DatedSeries {
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.date).collect()
    }

    /// Indices of columns whose non-missing cells are all numbers.
    pub fn numeric_columns(&self) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|&i| {
                !self
                    .records
                    .iter()
                    .any(|r| r.values.get(i).is_some_and(CellValue::is_text))
            })
            .collect()
    }

    /// Numeric value of `column` on every record, in record order.
    pub fn numbers(&self, column: usize) -> Vec<Option<f64>> {
        self.records
            .iter()
            .map(|r| r.values.get(column).and_then(CellValue::as_number))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cells() {
        assert_eq!(CellValue::parse(" 12.5 "), CellValue::Number(12.5));
        assert_eq!(CellValue::parse("-3"), CellValue::Number(-3.0));
        assert_eq!(CellValue::parse(""), CellValue::Missing);
        assert_eq!(CellValue::parse("NaN"), CellValue::Missing);
        assert_eq!(CellValue::parse("inf"), CellValue::Missing);
        assert_eq!(
            CellValue::parse("2024年3月份"),
            CellValue::Text("2024年3月份".into())
        );
    }

    #[test]
    fn numeric_columns_ignore_missing_cells() {
        let series = DatedSeries {
            name: "CPI".into(),
            columns: vec!["value".into(), "note".into()],
            records: vec![
                DatedRecord {
                    date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                    values: vec![CellValue::Number(1.0), CellValue::Text("a".into())],
                },
                DatedRecord {
                    date: NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
                    values: vec![CellValue::Missing, CellValue::Missing],
                },
            ],
        };
        assert_eq!(series.numeric_columns(), vec![0]);
        assert_eq!(series.numbers(0), vec![Some(1.0), None]);
    }

    #[test]
    fn raw_series_lookup_by_column_name() {
        let series = RawSeries::new(
            "PMI",
            vec!["月份".into(), "制造业-指数".into()],
            vec![RawRecord::new(vec!["2024年1月份".into(), "49.2".into()])],
        );
        let record = &series.records[0];
        assert_eq!(series.get(record, "制造业-指数"), Some("49.2"));
        assert_eq!(series.get(record, "absent"), None);
    }
}
