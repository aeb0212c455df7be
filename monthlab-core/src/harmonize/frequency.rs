//! Frequency classification from observed date spacing.
//!
//! Providers do not reliably declare granularity, so the class is derived
//! from the median gap between consecutive sorted dates of each file.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::HarmonizeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyClass {
    Daily,
    Monthly,
    Quarterly,
    Annual,
    Unknown,
}

impl fmt::Display for FrequencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Daily => "daily",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annual => "annual",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Classification result with the statistic it was derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub class: FrequencyClass,
    /// Median absolute gap in days; `None` for fewer than two dates.
    pub median_gap_days: Option<f64>,
}

pub struct FrequencyClassifier;

impl FrequencyClassifier {
    /// Classify a date sequence. Input order does not matter; dates are sorted first.
    pub fn classify(dates: &[NaiveDate]) -> Classification {
        match median_gap_days(dates) {
            None => Classification {
                class: FrequencyClass::Unknown,
                median_gap_days: None,
            },
            Some(gap) => Classification {
                class: Self::class_for_gap(gap),
                median_gap_days: Some(gap),
            },
        }
    }

    /// Like [`classify`](Self::classify), failing when the class is unknown.
    pub fn require(dates: &[NaiveDate]) -> Result<Classification, HarmonizeError> {
        let classification = Self::classify(dates);
        if classification.class == FrequencyClass::Unknown {
            return Err(HarmonizeError::UnclassifiableFrequency {
                observations: dates.len(),
            });
        }
        Ok(classification)
    }

    /// Thresholds: <10 daily, 50..=120 quarterly, >300 annual, else monthly.
    pub fn class_for_gap(gap: f64) -> FrequencyClass {
        if gap < 10.0 {
            FrequencyClass::Daily
        } else if (50.0..=120.0).contains(&gap) {
            FrequencyClass::Quarterly
        } else if gap > 300.0 {
            FrequencyClass::Annual
        } else {
            FrequencyClass::Monthly
        }
    }
}

/// Median of absolute day gaps between consecutive sorted dates.
pub fn median_gap_days(dates: &[NaiveDate]) -> Option<f64> {
    if dates.len() < 2 {
        return None;
    }
    let mut sorted = dates.to_vec();
    sorted.sort();

    let mut gaps: Vec<i64> = sorted
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days().abs())
        .collect();
    gaps.sort_unstable();

    let n = gaps.len();
    let median = if n % 2 == 1 {
        gaps[n / 2] as f64
    } else {
        (gaps[n / 2 - 1] + gaps[n / 2]) as f64 / 2.0
    };
    Some(median)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn every(start: NaiveDate, step_days: i64, n: usize) -> Vec<NaiveDate> {
        (0..n as i64).map(|i| start + Duration::days(i * step_days)).collect()
    }

    #[test]
    fn daily_series() {
        let dates = every(d(2024, 1, 2), 1, 30);
        assert_eq!(FrequencyClassifier::classify(&dates).class, FrequencyClass::Daily);
    }

    #[test]
    fn monthly_series() {
        let dates: Vec<_> = (1..=12).map(|m| d(2023, m, 1)).collect();
        let c = FrequencyClassifier::classify(&dates);
        assert_eq!(c.class, FrequencyClass::Monthly);
        assert_eq!(c.median_gap_days, Some(31.0));
    }

    #[test]
    fn quarterly_series() {
        let dates = vec![d(2023, 3, 31), d(2023, 6, 30), d(2023, 9, 30), d(2023, 12, 31)];
        assert_eq!(
            FrequencyClassifier::classify(&dates).class,
            FrequencyClass::Quarterly
        );
    }

    #[test]
    fn annual_series() {
        let dates = vec![d(2019, 12, 31), d(2020, 12, 31), d(2021, 12, 31)];
        assert_eq!(FrequencyClassifier::classify(&dates).class, FrequencyClass::Annual);
    }

    #[test]
    fn boundaries() {
        assert_eq!(FrequencyClassifier::class_for_gap(9.5), FrequencyClass::Daily);
        assert_eq!(FrequencyClassifier::class_for_gap(10.0), FrequencyClass::Monthly);
        assert_eq!(FrequencyClassifier::class_for_gap(49.0), FrequencyClass::Monthly);
        assert_eq!(FrequencyClassifier::class_for_gap(50.0), FrequencyClass::Quarterly);
        assert_eq!(FrequencyClassifier::class_for_gap(120.0), FrequencyClass::Quarterly);
        assert_eq!(FrequencyClassifier::class_for_gap(180.0), FrequencyClass::Monthly);
        assert_eq!(FrequencyClassifier::class_for_gap(300.0), FrequencyClass::Monthly);
        assert_eq!(FrequencyClassifier::class_for_gap(301.0), FrequencyClass::Annual);
    }

    #[test]
    fn unsorted_input_is_sorted_first() {
        let dates = vec![d(2021, 12, 31), d(2019, 12, 31), d(2020, 12, 31)];
        assert_eq!(FrequencyClassifier::classify(&dates).class, FrequencyClass::Annual);
    }

    #[test]
    fn even_count_uses_mean_of_middle_gaps() {
        // gaps 1, 3, 5, 7
        let dates = vec![d(2024, 1, 1), d(2024, 1, 2), d(2024, 1, 5), d(2024, 1, 10), d(2024, 1, 17)];
        assert_eq!(median_gap_days(&dates), Some(4.0));
    }

    #[test]
    fn fewer_than_two_dates_is_unknown() {
        let c = FrequencyClassifier::classify(&[d(2024, 1, 1)]);
        assert_eq!(c.class, FrequencyClass::Unknown);
        assert_eq!(c.median_gap_days, None);

        let err = FrequencyClassifier::require(&[]).unwrap_err();
        assert_eq!(err, HarmonizeError::UnclassifiableFrequency { observations: 0 });
    }
}
