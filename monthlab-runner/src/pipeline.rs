//! Pipeline orchestration.
//!
//! Each declared series runs independently on the rayon pool:
//! load → normalize dates → chain link (if declared) → classify → resample →
//! date-range filter → write. The merge waits for every series to finish and
//! uses whichever ones succeeded. One bad file never stops the others.

use monthlab_core::domain::{MonthlySeries, Panel, RawSeries};
use monthlab_core::harmonize::{
    ChainLinkReport, Classification, DateNormalizer, FrequencyClassifier, MergeSelection,
    MonthlyResampler, PanelMerger, RealValueChainLinker,
};
use monthlab_core::{
    CollectingSink, DateRange, Diagnostic, DiagnosticKind, DiagnosticsSink, FanoutSink,
    HarmonizeConfig, HarmonizeError, SourceSink, TracingSink,
};
use rayon::prelude::*;
use thiserror::Error;

use crate::config::{MergeConfig, PipelineConfig, SeriesConfig};
use crate::export::{self, ExportError};
use crate::loader::{self, LoadError};
use crate::progress::PipelineProgress;
use crate::summary::{PanelSummary, RunSummary, SeriesOutcome, REPORT_FILE};

/// Why one series was excluded from the run.
#[derive(Debug, Error)]
pub enum SeriesError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Harmonize(#[from] HarmonizeError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// A series after every per-series stage.
#[derive(Debug, Clone)]
pub struct HarmonizedSeries {
    pub monthly: MonthlySeries,
    pub classification: Classification,
    /// One report per reconstructed level/growth pair, in order.
    pub chain_link: Vec<ChainLinkReport>,
    pub input_rows: usize,
}

/// Run the per-series stages on an already loaded table.
pub fn harmonize_raw(
    raw: &RawSeries,
    series: &SeriesConfig,
    settings: &HarmonizeConfig,
    sink: &dyn DiagnosticsSink,
) -> Result<HarmonizedSeries, HarmonizeError> {
    let dated = DateNormalizer::normalize(raw, &series.date_column)?;

    let linker = RealValueChainLinker::new(settings.base_year);
    let (dated, chain_link) = series.chain_link.iter().try_fold(
        (dated, Vec::new()),
        |(current, mut reports), spec| {
            let (linked, report) = linker.link(&current, spec, sink)?;
            reports.push(report);
            Ok::<_, HarmonizeError>((linked, reports))
        },
    )?;

    let classification = FrequencyClassifier::require(&dated.dates())?;
    if let Some(declared) = series.frequency_hint {
        if declared != classification.class {
            sink.emit(Diagnostic::new(
                series.name.as_str(),
                DiagnosticKind::FrequencyHintMismatch {
                    declared,
                    detected: classification.class,
                },
            ));
        }
    }

    let monthly = MonthlyResampler::new(settings.interpolation_method).resample(
        &dated,
        classification.class,
        sink,
    )?;
    let monthly = match &settings.date_range {
        Some(range) => monthly.filter_range(range),
        None => monthly,
    };

    tracing::info!(
        series = %series.name,
        class = %classification.class,
        input_rows = raw.records.len(),
        months = monthly.len(),
        "harmonized"
    );

    Ok(HarmonizedSeries {
        monthly,
        classification,
        chain_link,
        input_rows: raw.records.len(),
    })
}

/// Load and harmonize one declared series.
pub fn harmonize_series(
    series: &SeriesConfig,
    settings: &HarmonizeConfig,
    sink: &dyn DiagnosticsSink,
) -> Result<HarmonizedSeries, SeriesError> {
    let raw = loader::load_csv(&series.path, &series.name)?;
    Ok(harmonize_raw(&raw, series, settings, sink)?)
}

/// Outer-join the completed series named by `merge`. Failed series are left out.
pub fn build_panel(
    merge: &MergeConfig,
    completed: &[MonthlySeries],
    range: Option<&DateRange>,
    sink: &dyn DiagnosticsSink,
) -> Option<Panel> {
    let selections: Vec<MergeSelection<'_>> = merge
        .all()
        .filter_map(|source| {
            let found = completed.iter().find(|s| s.name == source.series);
            if found.is_none() {
                tracing::warn!(series = %source.series, "not merged: series did not complete");
            }
            found.map(|s| MergeSelection::new(s, &source.columns))
        })
        .collect();

    let Some((base, rest)) = selections.split_first() else {
        tracing::warn!("no merge inputs completed; panel not written");
        return None;
    };
    let panel = PanelMerger::merge(*base, rest, sink);
    Some(match range {
        Some(range) => panel.filter_range(range),
        None => panel,
    })
}

/// Run the whole manifest: harmonize every series in parallel, merge, export,
/// and write the run report.
///
/// Per-series failures are recorded in the summary. Only failures writing the
/// panel or the report itself are returned as errors.
pub fn run_pipeline(
    config: &PipelineConfig,
    progress: &dyn PipelineProgress,
) -> Result<RunSummary, ExportError> {
    let collecting = CollectingSink::new();
    let tracing_sink = TracingSink;
    let fanout = FanoutSink::new(vec![&tracing_sink as &dyn DiagnosticsSink, &collecting]);
    let sink = SourceSink::new(
        &fanout,
        config
            .series
            .iter()
            .map(|s| (s.name.clone(), s.path.clone()))
            .collect(),
    );
    let total = config.series.len();

    tracing::info!(series = total, output = %config.output.dir.display(), "pipeline started");

    let results: Vec<Result<(HarmonizedSeries, Vec<std::path::PathBuf>), SeriesError>> = config
        .series
        .par_iter()
        .enumerate()
        .map(|(index, series)| {
            progress.on_start(&series.name, index, total);
            let result = harmonize_series(series, &config.harmonize, &sink).and_then(|h| {
                let files = export::write_series(&h.monthly, &config.output)?;
                Ok((h, files))
            });
            progress.on_complete(&series.name, index, total, result.as_ref().map(|_| ()));
            result
        })
        .collect();

    // Barrier: every series has finished past this point.
    let mut outcomes = Vec::with_capacity(total);
    let mut completed = Vec::new();
    for (series, result) in config.series.iter().zip(results) {
        match result {
            Ok((harmonized, files)) => {
                outcomes.push(SeriesOutcome::succeeded(&series.name, &harmonized, files));
                completed.push(harmonized.monthly);
            }
            Err(e) => {
                tracing::error!(series = %series.name, error = %e, "series failed");
                outcomes.push(SeriesOutcome::failed(&series.name, &e));
            }
        }
    }
    let succeeded = completed.len();
    let failed = total - succeeded;

    let panel = config.merge.as_ref().and_then(|merge| {
        build_panel(merge, &completed, config.harmonize.date_range.as_ref(), &sink)
    });
    let panel = panel
        .map(|panel| -> Result<PanelSummary, ExportError> {
            let files = export::write_panel(&panel, &config.output)?;
            Ok(PanelSummary::new(&panel, files, export::panel_hash(&panel)?))
        })
        .transpose()?;

    let mut diagnostics = collecting.diagnostics();
    diagnostics.sort_by(|a, b| a.series.cmp(&b.series));

    let summary = RunSummary {
        generated_at: chrono::Local::now().naive_local(),
        config_hash: config.config_hash(),
        total,
        succeeded,
        failed,
        series: outcomes,
        panel,
        diagnostics,
    };
    export::write_json(&summary, &config.output.dir.join(REPORT_FILE))?;

    tracing::info!(succeeded, failed, warnings = summary.diagnostics.len(), "pipeline finished");
    progress.on_batch_complete(succeeded, failed, total);

    Ok(summary)
}
