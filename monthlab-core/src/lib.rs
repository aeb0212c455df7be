//! MonthLab Core: harmonization of heterogeneous economic time series.
//!
//! Turns provider tables with mixed date labels and granularities into
//! monthly series and one merged panel:
//! - Date normalization to canonical calendar dates
//! - Frequency classification from median date spacing
//! - Monthly resampling (mean, interpolation, repetition, pass-through)
//! - Chain-linked real values from nominal levels and real growth rates
//! - Outer-join merge into a wide panel with missingness reporting
//!
//! Recoverable substitutions are reported through a [`diagnostics::DiagnosticsSink`];
//! fatal per-series conditions are [`error::HarmonizeError`].

pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod harmonize;

pub use config::{DateRange, HarmonizeConfig, InterpolationMethod};
pub use diagnostics::{
    CollectingSink, Diagnostic, DiagnosticKind, DiagnosticsSink, FanoutSink, SourceSink,
    TracingSink,
};
pub use error::HarmonizeError;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything handed across rayon workers is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::RawSeries>();
        require_sync::<domain::RawSeries>();
        require_send::<domain::DatedSeries>();
        require_sync::<domain::DatedSeries>();
        require_send::<domain::MonthlySeries>();
        require_sync::<domain::MonthlySeries>();
        require_send::<domain::Panel>();
        require_sync::<domain::Panel>();

        require_send::<HarmonizeConfig>();
        require_sync::<HarmonizeConfig>();
        require_send::<HarmonizeError>();
        require_sync::<HarmonizeError>();
        require_send::<harmonize::ChainLinkReport>();
        require_sync::<harmonize::ChainLinkReport>();
        require_send::<harmonize::MonthlyResampler>();
        require_sync::<harmonize::MonthlyResampler>();

        require_send::<CollectingSink>();
        require_sync::<CollectingSink>();
        require_send::<TracingSink>();
        require_sync::<TracingSink>();
    }

    /// A sink shared by reference across threads collects every warning.
    #[test]
    fn collecting_sink_is_shareable_across_threads() {
        let sink = CollectingSink::new();
        std::thread::scope(|s| {
            for name in ["A", "B", "C"] {
                let sink = &sink;
                s.spawn(move || {
                    sink.emit(Diagnostic::new(name, DiagnosticKind::NoYearEndRecords));
                });
            }
        });
        assert_eq!(sink.len(), 3);
    }
}
