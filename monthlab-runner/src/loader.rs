//! CSV ingest into [`RawSeries`].
//!
//! Files are UTF-8 with a header row; a leading byte-order mark is dropped.
//! Repeated header names are made unique as `name`, `name_1`, `name_2`.
//! Cells stay as text here; interpretation happens in the core.

use monthlab_core::domain::{RawRecord, RawSeries};
use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no header row")]
    NoHeader { path: PathBuf },

    #[error("{path} is not a harmonized table: {reason}")]
    InvalidTable { path: PathBuf, reason: String },
}

/// Read a CSV file as the series `name`.
pub fn load_csv(path: &Path, name: &str) -> Result<RawSeries, LoadError> {
    let file = fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let series = read_csv(file, name).map_err(|source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    if series.columns.is_empty() {
        return Err(LoadError::NoHeader {
            path: path.to_path_buf(),
        });
    }

    tracing::debug!(
        series = %name,
        path = %path.display(),
        rows = series.records.len(),
        columns = series.columns.len(),
        "loaded csv"
    );
    Ok(series)
}

/// Parse CSV from any reader. Blank lines are skipped; short rows are allowed.
pub fn read_csv<R: Read>(reader: R, name: &str) -> Result<RawSeries, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').trim().to_string()
            } else {
                h.to_string()
            }
        })
        .collect();
    let columns = dedup_headers(headers);

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        if row.iter().all(str::is_empty) {
            continue;
        }
        records.push(RawRecord::new(row.iter().map(str::to_string).collect()));
    }

    Ok(RawSeries::new(name, columns, records))
}

/// Make header names unique: later repeats get `_1`, `_2`, ...
pub fn dedup_headers(headers: Vec<String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    headers
        .into_iter()
        .map(|h| {
            let mut name = h.clone();
            let mut n = 1;
            while used.contains(&name) {
                name = format!("{h}_{n}");
                n += 1;
            }
            used.insert(name.clone());
            name
        })
        .collect()
}
