//! Harmonization settings supplied by the calling layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default reconstruction anchor year.
pub const DEFAULT_BASE_YEAR: i32 = 2015;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonizeConfig {
    /// Year in which real values equal nominal values.
    #[serde(default = "default_base_year")]
    pub base_year: i32,

    /// Method used to fill months between quarterly observations.
    #[serde(default)]
    pub interpolation_method: InterpolationMethod,

    /// Inclusive bound applied to every output before persistence.
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

fn default_base_year() -> i32 {
    DEFAULT_BASE_YEAR
}

impl Default for HarmonizeConfig {
    fn default() -> Self {
        Self {
            base_year: DEFAULT_BASE_YEAR,
            interpolation_method: InterpolationMethod::default(),
            date_range: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    #[default]
    Linear,
    Cubic,
    Quadratic,
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Linear => "linear",
            Self::Cubic => "cubic",
            Self::Quadratic => "quadratic",
        };
        f.write_str(name)
    }
}

/// Inclusive `[start, end]` date bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }
}
