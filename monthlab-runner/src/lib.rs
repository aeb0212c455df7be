//! MonthLab Runner: manifest-driven harmonization pipeline.
//!
//! This crate builds on `monthlab-core` to provide:
//! - TOML pipeline manifest with validation
//! - CSV ingest with BOM stripping and header dedup
//! - Parallel per-series harmonization with failure isolation
//! - Panel merge over whichever series succeeded
//! - Atomic CSV/Parquet export and a JSON run report
//! - Raw file inspection and panel quality reports

pub mod config;
pub mod export;
pub mod loader;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod summary;

pub use config::{ConfigError, MergeConfig, MergeSource, OutputConfig, PipelineConfig, SeriesConfig};
pub use export::ExportError;
pub use loader::{load_csv, LoadError};
pub use pipeline::{harmonize_series, run_pipeline, HarmonizedSeries, SeriesError};
pub use progress::{NoProgress, PipelineProgress, StdoutProgress};
pub use report::{inspect, quality_report, Inspection, QualityReport};
pub use summary::{PanelSummary, RunSummary, SeriesOutcome, SeriesStatus, REPORT_FILE};
