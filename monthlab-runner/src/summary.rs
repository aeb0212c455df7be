//! Run report: per-series outcomes, the panel, and every diagnostic raised.

use chrono::{NaiveDate, NaiveDateTime};
use monthlab_core::domain::{Missingness, Panel};
use monthlab_core::harmonize::{ChainLinkReport, FrequencyClass};
use monthlab_core::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::pipeline::{HarmonizedSeries, SeriesError};

/// File name of the JSON run report inside the output directory.
pub const REPORT_FILE: &str = "run_report.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesOutcome {
    pub name: String,
    pub status: SeriesStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub frequency: Option<FrequencyClass>,
    pub median_gap_days: Option<f64>,
    pub input_rows: usize,
    pub output_rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain_link: Vec<ChainLinkReport>,
}

impl SeriesOutcome {
    pub fn succeeded(name: &str, harmonized: &HarmonizedSeries, files: Vec<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            status: SeriesStatus::Succeeded,
            error: None,
            frequency: Some(harmonized.classification.class),
            median_gap_days: harmonized.classification.median_gap_days,
            input_rows: harmonized.input_rows,
            output_rows: harmonized.monthly.len(),
            first_date: harmonized.monthly.first_date(),
            last_date: harmonized.monthly.last_date(),
            files,
            chain_link: harmonized.chain_link.clone(),
        }
    }

    pub fn failed(name: &str, error: &SeriesError) -> Self {
        Self {
            name: name.to_string(),
            status: SeriesStatus::Failed,
            error: Some(error.to_string()),
            frequency: None,
            median_gap_days: None,
            input_rows: 0,
            output_rows: 0,
            first_date: None,
            last_date: None,
            files: Vec::new(),
            chain_link: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SeriesStatus::Succeeded
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelSummary {
    pub files: Vec<PathBuf>,
    pub rows: usize,
    pub columns: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// BLAKE3 of the panel CSV.
    pub hash: String,
    pub missingness: Vec<Missingness>,
}

impl PanelSummary {
    pub fn new(panel: &Panel, files: Vec<PathBuf>, hash: String) -> Self {
        let range = panel.date_range();
        Self {
            files,
            rows: panel.height(),
            columns: panel.width(),
            first_date: range.map(|(first, _)| first),
            last_date: range.map(|(_, last)| last),
            hash,
            missingness: panel.missingness(),
        }
    }
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub generated_at: NaiveDateTime,
    pub config_hash: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub series: Vec<SeriesOutcome>,
    pub panel: Option<PanelSummary>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn outcome(&self, name: &str) -> Option<&SeriesOutcome> {
        self.series.iter().find(|s| s.name == name)
    }

    pub fn diagnostics_for<'a>(&'a self, series: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics.iter().filter(move |d| d.series == series)
    }
}
