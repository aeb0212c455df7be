//! The harmonization stages, in pipeline order.

pub mod chain_link;
pub mod dates;
pub mod frequency;
pub mod interpolate;
pub mod merge;
pub mod resample;

pub use chain_link::{
    ChainAnchor, ChainLinkReport, ChainLinkSpec, RealValueChainLinker, RecordResolution,
    Resolution,
};
pub use dates::{canonical, DateNormalizer, DatePattern};
pub use frequency::{Classification, FrequencyClass, FrequencyClassifier};
pub use merge::{MergeSelection, PanelMerger};
pub use resample::MonthlyResampler;
