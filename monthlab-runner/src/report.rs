//! Read-only summaries: inspection of a raw input file and the data quality
//! report of a written panel.

use chrono::NaiveDate;
use monthlab_core::domain::{CellValue, Missingness, Panel, ValueColumn};
use monthlab_core::harmonize::{Classification, DateNormalizer, DatePattern, FrequencyClassifier};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::loader::{self, LoadError};
use crate::pipeline::SeriesError;

/// What the pipeline would see in one raw file.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub path: PathBuf,
    pub rows: usize,
    pub pattern: DatePattern,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub classification: Classification,
    pub numeric_columns: Vec<String>,
    pub text_columns: Vec<String>,
}

/// Detect, normalize, and classify `path` without writing anything.
pub fn inspect(path: &Path, date_column: &str) -> Result<Inspection, SeriesError> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let raw = loader::load_csv(path, &name)?;
    let pattern = DateNormalizer::detect_column(&raw, date_column)?;
    let dated = DateNormalizer::normalize(&raw, date_column)?;
    let dates = dated.dates();

    let numeric = dated.numeric_columns();
    let (numeric_columns, text_columns) = dated
        .columns
        .iter()
        .enumerate()
        .fold((Vec::new(), Vec::new()), |(mut num, mut text), (i, c)| {
            if numeric.contains(&i) {
                num.push(c.clone());
            } else {
                text.push(c.clone());
            }
            (num, text)
        });

    Ok(Inspection {
        path: path.to_path_buf(),
        rows: raw.records.len(),
        pattern,
        first_date: dates.first().copied(),
        last_date: dates.last().copied(),
        classification: FrequencyClassifier::classify(&dates),
        numeric_columns,
        text_columns,
    })
}

impl fmt::Display for Inspection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File:      {}", self.path.display())?;
        writeln!(f, "Rows:      {}", self.rows)?;
        writeln!(f, "Pattern:   {:?}", self.pattern)?;
        match (self.first_date, self.last_date) {
            (Some(first), Some(last)) => writeln!(f, "Range:     {first} .. {last}")?,
            _ => writeln!(f, "Range:     -")?,
        }
        match self.classification.median_gap_days {
            Some(gap) => writeln!(
                f,
                "Frequency: {} (median gap {gap:.1} days)",
                self.classification.class
            )?,
            None => writeln!(f, "Frequency: {}", self.classification.class)?,
        }
        writeln!(f, "Numeric:   {}", self.numeric_columns.join(", "))?;
        write!(f, "Text:      {}", self.text_columns.join(", "))
    }
}

/// Data quality summary of a panel file.
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub missingness: Vec<Missingness>,
}

impl QualityReport {
    pub fn from_panel(path: &Path, panel: &Panel) -> Self {
        let range = panel.date_range();
        Self {
            path: path.to_path_buf(),
            rows: panel.height(),
            columns: panel.width(),
            first_date: range.map(|(first, _)| first),
            last_date: range.map(|(_, last)| last),
            missingness: panel.missingness(),
        }
    }

    /// Columns with at least one missing value.
    pub fn incomplete(&self) -> impl Iterator<Item = &Missingness> {
        self.missingness.iter().filter(|m| m.missing > 0)
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Panel:   {}", self.path.display())?;
        writeln!(f, "Shape:   {} rows x {} columns", self.rows, self.columns)?;
        if let (Some(first), Some(last)) = (self.first_date, self.last_date) {
            writeln!(f, "Range:   {first} .. {last}")?;
        }
        if self.incomplete().next().is_none() {
            return write!(f, "No missing values");
        }
        writeln!(f, "Missing values:")?;
        let width = self
            .missingness
            .iter()
            .map(|m| m.column.chars().count())
            .max()
            .unwrap_or(0);
        for m in self.incomplete() {
            let pad = width - m.column.chars().count();
            writeln!(
                f,
                "  {}{} {:>6} ({:.2}%)",
                m.column,
                " ".repeat(pad),
                m.missing,
                m.percentage
            )?;
        }
        Ok(())
    }
}

/// Read a harmonized table (first column `date`, the rest numeric) as a panel.
pub fn read_panel(path: &Path) -> Result<Panel, LoadError> {
    let invalid = |reason: String| LoadError::InvalidTable {
        path: path.to_path_buf(),
        reason,
    };

    let raw = loader::load_csv(path, "panel")?;
    if raw.columns.first().map(String::as_str) != Some("date") {
        return Err(invalid("first column is not `date`".into()));
    }

    let mut rows: Vec<(NaiveDate, Vec<Option<f64>>)> = Vec::with_capacity(raw.records.len());
    for (i, record) in raw.records.iter().enumerate() {
        let text = record.field(0).unwrap_or("");
        let date = DateNormalizer::normalize_value(text)
            .ok_or_else(|| invalid(format!("row {i}: unreadable date '{text}'")))?;
        let values = (1..raw.columns.len())
            .map(|c| CellValue::parse(record.field(c).unwrap_or("")).as_number())
            .collect();
        rows.push((date, values));
    }
    rows.sort_by_key(|(date, _)| *date);

    let columns = raw.columns[1..]
        .iter()
        .enumerate()
        .map(|(c, name)| ValueColumn::new(name.clone(), rows.iter().map(|(_, v)| v[c]).collect()))
        .collect();

    Ok(Panel {
        dates: rows.into_iter().map(|(date, _)| date).collect(),
        columns,
    })
}

/// Load `path` and summarize it.
pub fn quality_report(path: &Path) -> Result<QualityReport, LoadError> {
    let panel = read_panel(path)?;
    Ok(QualityReport::from_panel(path, &panel))
}
