//! Pipeline manifest.
//!
//! A TOML file declares every input series, how each one is treated, and
//! which columns go into the merged panel. Nothing is inferred from file
//! names.

use monthlab_core::harmonize::{ChainLinkSpec, FrequencyClass};
use monthlab_core::HarmonizeConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("manifest declares no series")]
    NoSeries,

    #[error("series '{0}' is declared more than once")]
    DuplicateSeries(String),

    #[error("merge references unknown series '{0}'")]
    UnknownMergeSeries(String),

    #[error("date range start {start} is after end {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("base year {0} is outside 1000..=9999")]
    BaseYearOutOfRange(i32),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    #[serde(default)]
    pub harmonize: HarmonizeConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub series: Vec<SeriesConfig>,

    /// Panel composition; no panel is built when absent.
    #[serde(default)]
    pub merge: Option<MergeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Also write Parquet copies of every table.
    #[serde(default)]
    pub parquet: bool,

    #[serde(default = "default_panel_name")]
    pub panel_name: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_panel_name() -> String {
    "unified_monthly".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            parquet: false,
            panel_name: default_panel_name(),
        }
    }
}

/// One input file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesConfig {
    pub name: String,
    pub path: PathBuf,
    pub date_column: String,

    /// Expected granularity. Only cross-checked against the detected class.
    #[serde(default)]
    pub frequency_hint: Option<FrequencyClass>,

    /// Level/growth pairs to reconstruct, applied in order.
    #[serde(default)]
    pub chain_link: Vec<ChainLinkSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeConfig {
    pub base: MergeSource,
    #[serde(default)]
    pub sources: Vec<MergeSource>,
}

impl MergeConfig {
    /// Base first, then sources in declaration order.
    pub fn all(&self) -> impl Iterator<Item = &MergeSource> {
        std::iter::once(&self.base).chain(&self.sources)
    }
}

/// A series and the columns it contributes; empty selects all value columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeSource {
    pub series: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

impl PipelineConfig {
    /// Parse and validate a manifest. Relative paths stay as written.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a manifest file, resolving relative paths against its directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }
        tracing::debug!(
            manifest = %path.display(),
            series = config.series.len(),
            "loaded manifest"
        );
        Ok(config)
    }

    pub fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |p: &Path| {
            if p.is_relative() {
                base_dir.join(p)
            } else {
                p.to_path_buf()
            }
        };
        self.output.dir = resolve(&self.output.dir);
        for series in &mut self.series {
            series.path = resolve(&series.path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.series.is_empty() {
            return Err(ConfigError::NoSeries);
        }

        let mut names = HashSet::new();
        for series in &self.series {
            if !names.insert(series.name.as_str()) {
                return Err(ConfigError::DuplicateSeries(series.name.clone()));
            }
        }

        if let Some(merge) = &self.merge {
            if let Some(unknown) = merge.all().find(|s| !names.contains(s.series.as_str())) {
                return Err(ConfigError::UnknownMergeSeries(unknown.series.clone()));
            }
        }

        if let Some(range) = &self.harmonize.date_range {
            if !range.is_valid() {
                return Err(ConfigError::InvalidDateRange {
                    start: range.start,
                    end: range.end,
                });
            }
        }

        if !(1000..=9999).contains(&self.harmonize.base_year) {
            return Err(ConfigError::BaseYearOutOfRange(self.harmonize.base_year));
        }

        Ok(())
    }

    pub fn series(&self, name: &str) -> Option<&SeriesConfig> {
        self.series.iter().find(|s| s.name == name)
    }

    /// Deterministic BLAKE3 hash of the effective configuration.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }
}
