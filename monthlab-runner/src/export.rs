//! Persistence of harmonized tables and the run report.
//!
//! Formats:
//! - **CSV**: `date` first in `YYYY-MM-DD`, then value columns; missing is an empty cell
//! - **Parquet**: same layout, `date` as a Date column and nulls for missing values
//! - **JSON**: the run report
//!
//! Every file is written to `{name}.tmp` and renamed into place, so an
//! interrupted run never leaves a truncated artifact.

use chrono::NaiveDate;
use monthlab_core::domain::{MonthlySeries, Panel, ValueColumn};
use polars::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::OutputConfig;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV writer flush failed: {0}")]
    Flush(String),

    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("parquet: {0}")]
    Parquet(String),

    #[error("report serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Render a monthly series as CSV text.
pub fn series_csv(series: &MonthlySeries) -> Result<String, ExportError> {
    table_csv(&series.dates, &series.columns)
}

/// Render a panel as CSV text.
pub fn panel_csv(panel: &Panel) -> Result<String, ExportError> {
    table_csv(&panel.dates, &panel.columns)
}

fn table_csv(dates: &[NaiveDate], columns: &[ValueColumn]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(std::iter::once("date").chain(columns.iter().map(|c| c.name.as_str())))?;

    for (row, date) in dates.iter().enumerate() {
        let mut record = Vec::with_capacity(columns.len() + 1);
        record.push(date.format("%Y-%m-%d").to_string());
        for column in columns {
            record.push(column.values[row].map(|v| v.to_string()).unwrap_or_default());
        }
        wtr.write_record(&record)?;
    }

    let data = wtr
        .into_inner()
        .map_err(|e| ExportError::Flush(e.to_string()))?;
    Ok(String::from_utf8(data)?)
}

// ─── Parquet ────────────────────────────────────────────────────────

fn table_dataframe(dates: &[NaiveDate], columns: &[ValueColumn]) -> Result<DataFrame, ExportError> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| ExportError::Parquet("epoch date".into()))?;
    let days: Vec<i32> = dates
        .iter()
        .map(|d| (*d - epoch).num_days() as i32)
        .collect();

    let mut frame = Vec::with_capacity(columns.len() + 1);
    frame.push(
        Column::new("date".into(), days)
            .cast(&DataType::Date)
            .map_err(|e| ExportError::Parquet(format!("date cast: {e}")))?,
    );
    for column in columns {
        frame.push(Column::new(column.name.as_str().into(), column.values.clone()));
    }

    DataFrame::new(frame).map_err(|e| ExportError::Parquet(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), ExportError> {
    let tmp_path = tmp_path_for(path);
    let file = fs::File::create(&tmp_path).map_err(|source| ExportError::Io {
        path: tmp_path.clone(),
        source,
    })?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            ExportError::Parquet(format!("write parquet: {e}"))
        })?;
    rename_into_place(&tmp_path, path)
}

// ─── Files ──────────────────────────────────────────────────────────

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn rename_into_place(tmp_path: &Path, path: &Path) -> Result<(), ExportError> {
    fs::rename(tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(tmp_path);
        ExportError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Write `contents` to `path` atomically.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ExportError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|source| ExportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, contents).map_err(|source| ExportError::Io {
        path: tmp_path.clone(),
        source,
    })?;
    rename_into_place(&tmp_path, path)
}

/// Output path of a harmonized series, without extension.
pub fn series_stem(output: &OutputConfig, name: &str) -> PathBuf {
    output.dir.join(format!("{name}_monthly"))
}

/// Write a monthly series as CSV (and Parquet when enabled). Returns the files written.
pub fn write_series(series: &MonthlySeries, output: &OutputConfig) -> Result<Vec<PathBuf>, ExportError> {
    let stem = series_stem(output, &series.name);
    write_table(&stem, &series.dates, &series.columns, output.parquet)
}

/// Write the panel as CSV (and Parquet when enabled). Returns the files written.
pub fn write_panel(panel: &Panel, output: &OutputConfig) -> Result<Vec<PathBuf>, ExportError> {
    let stem = output.dir.join(&output.panel_name);
    write_table(&stem, &panel.dates, &panel.columns, output.parquet)
}

fn write_table(
    stem: &Path,
    dates: &[NaiveDate],
    columns: &[ValueColumn],
    parquet: bool,
) -> Result<Vec<PathBuf>, ExportError> {
    let csv_path = stem.with_extension("csv");
    write_atomic(&csv_path, table_csv(dates, columns)?.as_bytes())?;
    let mut written = vec![csv_path];

    if parquet {
        let parquet_path = stem.with_extension("parquet");
        write_parquet(&table_dataframe(dates, columns)?, &parquet_path)?;
        written.push(parquet_path);
    }

    tracing::debug!(files = ?written, rows = dates.len(), "wrote table");
    Ok(written)
}

/// Serialize `report` as pretty JSON to `path`, atomically.
pub fn write_json<T: Serialize>(report: &T, path: &Path) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(report)?;
    write_atomic(path, json.as_bytes())
}

/// BLAKE3 content hash of a panel's CSV rendering.
pub fn panel_hash(panel: &Panel) -> Result<String, ExportError> {
    Ok(blake3::hash(panel_csv(panel)?.as_bytes()).to_hex().to_string())
}
