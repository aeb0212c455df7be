//! Diagnostics sink for recoverable conditions.
//!
//! Components never log through global state. They receive a
//! `&dyn DiagnosticsSink` and report every substitution or fallback they make,
//! so tests can assert on exactly what was emitted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::harmonize::frequency::FrequencyClass;

/// A recoverable condition raised while harmonizing one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Name of the series the condition was raised on.
    pub series: String,
    pub kind: DiagnosticKind,
    /// Input file of the series, when the caller knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl Diagnostic {
    pub fn new(series: impl Into<String>, kind: DiagnosticKind) -> Self {
        Self {
            series: series.into(),
            kind,
            source: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticKind {
    /// The configured base year had no usable annual point; another year anchors the chain.
    MissingBaseYearAnchor { requested: i32, substituted: i32 },

    /// No December records: every record was treated as an annual observation.
    NoYearEndRecords,

    /// `1 + growth/100` was zero; the point was left to the interpolation fallback.
    DegenerateGrowthRate { date: NaiveDate, growth: f64 },

    /// Reconstructed from the year's nominal ratio rather than a chain step.
    NominalRatioFallback { date: NaiveDate },

    /// Filled by linear interpolation over the reconstructed column.
    InterpolationFallback { date: NaiveDate },

    /// Still missing after every reconstruction step.
    UnresolvedReconstructionPoint { date: NaiveDate },

    /// The declared frequency disagrees with the one detected from date spacing.
    FrequencyHintMismatch {
        declared: FrequencyClass,
        detected: FrequencyClass,
    },

    /// A second observation for an already-populated month or year was dropped.
    DuplicatePeriod { date: NaiveDate },

    /// None of the selected columns exist in the series; it was left out of the panel.
    ColumnsUnavailable { requested: Vec<String> },

    /// Some selected columns are absent; the series was merged without them.
    SelectedColumnsMissing { missing: Vec<String> },
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBaseYearAnchor {
                requested,
                substituted,
            } => write!(
                f,
                "base year {requested} unavailable, anchoring at {substituted} instead"
            ),
            Self::NoYearEndRecords => {
                write!(f, "no year-end records, treating every record as annual")
            }
            Self::DegenerateGrowthRate { date, growth } => write!(
                f,
                "degenerate growth rate {growth}% at {date}, left for interpolation"
            ),
            Self::NominalRatioFallback { date } => write!(
                f,
                "low confidence: {date} reconstructed from nominal ratio to year-end"
            ),
            Self::InterpolationFallback { date } => {
                write!(f, "{date} filled by linear interpolation")
            }
            Self::UnresolvedReconstructionPoint { date } => {
                write!(f, "{date} unresolved, left missing")
            }
            Self::FrequencyHintMismatch { declared, detected } => write!(
                f,
                "declared frequency {declared} but detected {detected}; using detected"
            ),
            Self::DuplicatePeriod { date } => {
                write!(f, "duplicate observation for period {date} dropped")
            }
            Self::ColumnsUnavailable { requested } => write!(
                f,
                "none of the selected columns [{}] found, series skipped in merge",
                requested.join(", ")
            ),
            Self::SelectedColumnsMissing { missing } => write!(
                f,
                "selected columns [{}] not found, merged without them",
                missing.join(", ")
            ),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.series, self.kind)?;
        if let Some(source) = &self.source {
            write!(f, " ({})", source.display())?;
        }
        Ok(())
    }
}

/// Receiver for diagnostics. Shared across worker threads.
pub trait DiagnosticsSink: Send + Sync {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Helper so components can write `warn(sink, series, kind)`.
pub(crate) fn emit(sink: &dyn DiagnosticsSink, series: &str, kind: DiagnosticKind) {
    sink.emit(Diagnostic::new(series, kind));
}

/// Keeps every diagnostic in memory, in emission order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    items: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything collected so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.items
            .lock()
            .map(|items| items.clone())
            .unwrap_or_default()
    }

    /// Diagnostics raised on one series.
    pub fn for_series(&self, series: &str) -> Vec<DiagnosticKind> {
        self.diagnostics()
            .into_iter()
            .filter(|d| d.series == series)
            .map(|d| d.kind)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticsSink for CollectingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        if let Ok(mut items) = self.items.lock() {
            items.push(diagnostic);
        }
    }
}

/// Forwards each diagnostic to `tracing` at WARN level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match &diagnostic.source {
            Some(source) => tracing::warn!(
                series = %diagnostic.series,
                source = %source.display(),
                "{}",
                diagnostic.kind
            ),
            None => tracing::warn!(series = %diagnostic.series, "{}", diagnostic.kind),
        }
    }
}

/// Forwards to several sinks in order.
pub struct FanoutSink<'a> {
    sinks: Vec<&'a dyn DiagnosticsSink>,
}

impl<'a> FanoutSink<'a> {
    pub fn new(sinks: Vec<&'a dyn DiagnosticsSink>) -> Self {
        Self { sinks }
    }
}

impl DiagnosticsSink for FanoutSink<'_> {
    fn emit(&self, diagnostic: Diagnostic) {
        for sink in &self.sinks {
            sink.emit(diagnostic.clone());
        }
    }
}

/// Attaches each series' input file to its diagnostics before forwarding.
pub struct SourceSink<'a> {
    inner: &'a dyn DiagnosticsSink,
    sources: HashMap<String, PathBuf>,
}

impl<'a> SourceSink<'a> {
    pub fn new(inner: &'a dyn DiagnosticsSink, sources: HashMap<String, PathBuf>) -> Self {
        Self { inner, sources }
    }
}

impl DiagnosticsSink for SourceSink<'_> {
    fn emit(&self, mut diagnostic: Diagnostic) {
        if diagnostic.source.is_none() {
            diagnostic.source = self.sources.get(&diagnostic.series).cloned();
        }
        self.inner.emit(diagnostic);
    }
}
