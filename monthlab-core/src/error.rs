//! Structured error types for the harmonization engine.
//!
//! Every variant is fatal for the series it was raised on. Recoverable
//! conditions (base-year substitution, degenerate growth rates, interpolation
//! fallbacks) are reported through the diagnostics sink instead.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HarmonizeError {
    #[error("unrecognized date format in column '{column}': sample value {sample:?}")]
    UnrecognizedDateFormat { column: String, sample: String },

    #[error("malformed date {value:?} at row {row} (column '{column}')")]
    MalformedDate {
        column: String,
        row: usize,
        value: String,
    },

    #[error("missing required column '{column}'")]
    MissingRequiredColumn { column: String },

    #[error("cannot classify frequency: need at least 2 dated observations, got {observations}")]
    UnclassifiableFrequency { observations: usize },

    #[error("series has no records")]
    EmptySeries,

    #[error("no annual observation of '{column}' carries a nominal level to anchor the chain")]
    NoAnchorAvailable { column: String },
}
