//! Date normalization.
//!
//! Statistics providers label periods in several textual forms. One sample
//! value per column selects the pattern (a column is homogeneous within a
//! file); every row is then parsed with that pattern. Any row that does not
//! parse fails the whole file, so no partially converted output exists.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::domain::{CellValue, DatedRecord, DatedSeries, RawSeries};
use crate::error::HarmonizeError;

static YEAR_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})\s*(?:年|year)\s*(\d{1,2})\s*(?:月|month)").expect("valid regex")
});

static YEAR_QUARTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d{4})\s*(?:年|year)\s*(?:第\s*(\d)(?:\s*-\s*(\d))?\s*季度|Q(\d)(?:\s*-\s*Q?(\d))?)",
    )
    .expect("valid regex")
});

static YEAR_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_sj\.(\d{4})").expect("valid regex"));

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})").expect("valid regex"));

/// Source date encodings, in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePattern {
    /// `2024年3月份`, `2024 year 3 month` → first of the month.
    YearMonth,
    /// `2024年第1-2季度`, `2024 year Q1` → end of the (last) quarter.
    YearQuarter,
    /// `zb.A0A0101_sj.2020` → December 31 of the embedded year.
    YearCode,
    /// `YYYY-MM-DD`, passed through.
    Iso,
}

impl DatePattern {
    /// Detect the pattern of a sample value.
    pub fn detect(sample: &str) -> Option<Self> {
        if YEAR_MONTH.is_match(sample) {
            Some(Self::YearMonth)
        } else if YEAR_QUARTER.is_match(sample) {
            Some(Self::YearQuarter)
        } else if YEAR_CODE.is_match(sample) {
            Some(Self::YearCode)
        } else if ISO_DATE.is_match(sample.trim()) {
            Some(Self::Iso)
        } else {
            None
        }
    }

    /// Parse one value under this pattern.
    pub fn parse(self, raw: &str) -> Option<NaiveDate> {
        match self {
            Self::YearMonth => {
                let caps = YEAR_MONTH.captures(raw)?;
                let year = caps[1].parse().ok()?;
                let month = caps[2].parse().ok()?;
                NaiveDate::from_ymd_opt(year, month, 1)
            }
            Self::YearQuarter => {
                let caps = YEAR_QUARTER.captures(raw)?;
                let year: i32 = caps[1].parse().ok()?;
                let first = caps.get(2).or_else(|| caps.get(4))?;
                let last = caps.get(3).or_else(|| caps.get(5)).unwrap_or(first);
                let start_q: u32 = first.as_str().parse().ok()?;
                let end_q: u32 = last.as_str().parse().ok()?;
                quarter_end(year, start_q.max(end_q))
            }
            Self::YearCode => {
                let caps = YEAR_CODE.captures(raw)?;
                let year = caps[1].parse().ok()?;
                NaiveDate::from_ymd_opt(year, 12, 31)
            }
            Self::Iso => {
                let caps = ISO_DATE.captures(raw.trim())?;
                let year = caps[1].parse().ok()?;
                let month = caps[2].parse().ok()?;
                let day = caps[3].parse().ok()?;
                NaiveDate::from_ymd_opt(year, month, day)
            }
        }
    }
}

/// Calendar end of quarter `q` (1..=4).
pub fn quarter_end(year: i32, quarter: u32) -> Option<NaiveDate> {
    let (month, day) = match quarter {
        1 => (3, 31),
        2 => (6, 30),
        3 => (9, 30),
        4 => (12, 31),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Canonical text form of a date key.
pub fn canonical(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Normalizes the date column of raw input tables.
pub struct DateNormalizer;

impl DateNormalizer {
    /// Normalize a single value, detecting its pattern on the fly.
    pub fn normalize_value(raw: &str) -> Option<NaiveDate> {
        DatePattern::detect(raw)?.parse(raw)
    }

    /// Detect the pattern of `date_column` from its first non-empty value.
    pub fn detect_column(
        series: &RawSeries,
        date_column: &str,
    ) -> Result<DatePattern, HarmonizeError> {
        let idx = series
            .column_index(date_column)
            .ok_or_else(|| HarmonizeError::MissingRequiredColumn {
                column: date_column.to_string(),
            })?;
        let sample = series
            .records
            .iter()
            .filter_map(|r| r.field(idx))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .ok_or(HarmonizeError::EmptySeries)?;

        DatePattern::detect(sample).ok_or_else(|| HarmonizeError::UnrecognizedDateFormat {
            column: date_column.to_string(),
            sample: sample.to_string(),
        })
    }

    /// Normalize every record of `series`.
    ///
    /// The date column is replaced by canonical dates; its original text is
    /// kept as the `{date_column}_raw` audit column. Records are sorted by
    /// date, ties keeping input order.
    pub fn normalize(series: &RawSeries, date_column: &str) -> Result<DatedSeries, HarmonizeError> {
        let pattern = Self::detect_column(series, date_column)?;
        let date_idx = series
            .column_index(date_column)
            .ok_or_else(|| HarmonizeError::MissingRequiredColumn {
                column: date_column.to_string(),
            })?;

        let mut columns: Vec<String> = series
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != date_idx)
            .map(|(_, c)| c.clone())
            .collect();
        columns.push(format!("{date_column}_raw"));

        let mut records = Vec::with_capacity(series.records.len());
        for (row, record) in series.records.iter().enumerate() {
            let raw = record.field(date_idx).unwrap_or("").trim();
            let date = pattern
                .parse(raw)
                .ok_or_else(|| HarmonizeError::MalformedDate {
                    column: date_column.to_string(),
                    row,
                    value: raw.to_string(),
                })?;

            let mut values: Vec<CellValue> = (0..series.columns.len())
                .filter(|&i| i != date_idx)
                .map(|i| CellValue::parse(record.field(i).unwrap_or("")))
                .collect();
            values.push(CellValue::Text(raw.to_string()));

            records.push(DatedRecord { date, values });
        }

        records.sort_by_key(|r| r.date);

        tracing::debug!(
            series = %series.name,
            pattern = ?pattern,
            rows = records.len(),
            "normalized dates"
        );

        Ok(DatedSeries {
            name: series.name.clone(),
            columns,
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawRecord;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn raw(columns: &[&str], rows: &[&[&str]]) -> RawSeries {
        RawSeries::new(
            "test",
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| RawRecord::new(r.iter().map(|f| f.to_string()).collect()))
                .collect(),
        )
    }

    #[test]
    fn year_month_forms() {
        assert_eq!(DateNormalizer::normalize_value("2024年3月份"), Some(d(2024, 3, 1)));
        assert_eq!(DateNormalizer::normalize_value("2024年12月"), Some(d(2024, 12, 1)));
        assert_eq!(
            DateNormalizer::normalize_value("2024 year 3 month"),
            Some(d(2024, 3, 1))
        );
    }

    #[test]
    fn quarter_maps_to_end_of_greatest_quarter() {
        assert_eq!(DateNormalizer::normalize_value("2024年第1季度"), Some(d(2024, 3, 31)));
        assert_eq!(DateNormalizer::normalize_value("2024年第1-2季度"), Some(d(2024, 6, 30)));
        assert_eq!(DateNormalizer::normalize_value("2023年第1-3季度"), Some(d(2023, 9, 30)));
        assert_eq!(DateNormalizer::normalize_value("2023年第1-4季度"), Some(d(2023, 12, 31)));
        assert_eq!(DateNormalizer::normalize_value("2024 year Q1"), Some(d(2024, 3, 31)));
        assert_eq!(DateNormalizer::normalize_value("2024 year Q1-Q2"), Some(d(2024, 6, 30)));
    }

    #[test]
    fn invalid_quarter_is_rejected() {
        assert_eq!(DatePattern::YearQuarter.parse("2024年第5季度"), None);
    }

    #[test]
    fn year_code_maps_to_december_31() {
        assert_eq!(
            DateNormalizer::normalize_value("zb.A0A0101_sj.2020"),
            Some(d(2020, 12, 31))
        );
    }

    #[test]
    fn canonical_passes_through() {
        assert_eq!(DateNormalizer::normalize_value("2021-07-15"), Some(d(2021, 7, 15)));
        assert_eq!(
            DateNormalizer::normalize_value("2021-07-15 00:00:00"),
            Some(d(2021, 7, 15))
        );
        assert_eq!(canonical(d(2021, 7, 5)), "2021-07-05");
    }

    #[test]
    fn unknown_text_is_unrecognized() {
        assert_eq!(DatePattern::detect("March 2024"), None);
        assert_eq!(DatePattern::detect("2024/03/01"), None);
    }

    #[test]
    fn normalize_keeps_raw_audit_column_and_sorts() {
        let series = raw(
            &["月份", "当月"],
            &[&["2024年2月份", "101.2"], &["2024年1月份", "100.5"]],
        );
        let dated = DateNormalizer::normalize(&series, "月份").unwrap();

        assert_eq!(dated.columns, vec!["当月", "月份_raw"]);
        assert_eq!(dated.dates(), vec![d(2024, 1, 1), d(2024, 2, 1)]);
        assert_eq!(dated.records[0].values[0], CellValue::Number(100.5));
        assert_eq!(
            dated.records[0].values[1],
            CellValue::Text("2024年1月份".into())
        );
    }

    #[test]
    fn unrecognized_sample_fails_whole_file() {
        let series = raw(&["date", "v"], &[&["Jan 2024", "1"], &["2024-02-01", "2"]]);
        let err = DateNormalizer::normalize(&series, "date").unwrap_err();
        assert!(matches!(err, HarmonizeError::UnrecognizedDateFormat { .. }));
    }

    #[test]
    fn malformed_row_fails_whole_file() {
        let series = raw(&["月份", "v"], &[&["2024年1月份", "1"], &["2024年13月份", "2"]]);
        let err = DateNormalizer::normalize(&series, "月份").unwrap_err();
        assert_eq!(
            err,
            HarmonizeError::MalformedDate {
                column: "月份".into(),
                row: 1,
                value: "2024年13月份".into(),
            }
        );
    }

    #[test]
    fn missing_date_column_is_reported() {
        let series = raw(&["date", "v"], &[&["2024-01-01", "1"]]);
        let err = DateNormalizer::normalize(&series, "季度").unwrap_err();
        assert!(matches!(err, HarmonizeError::MissingRequiredColumn { .. }));
    }

    #[test]
    fn renormalizing_canonical_output_is_a_no_op() {
        for sample in ["2024年3月份", "2024年第1-2季度", "zb.A01_sj.2019", "2020-02-29"] {
            let first = DateNormalizer::normalize_value(sample).unwrap();
            let again = DateNormalizer::normalize_value(&canonical(first)).unwrap();
            assert_eq!(first, again, "{sample}");
        }
    }
}
