//! Chain-linked reconstruction of real values.
//!
//! A nominal level column `L` and a year-over-year real growth column `G`
//! (percent) are turned into a real level `R` that equals `L` in the anchor
//! year and moves with `G` everywhere else:
//!
//! 1. annual points are the December records (or every record, if none are)
//! 2. the anchor year is the configured base year, or the median available year
//! 3. `R[base] = L[base]`
//! 4. forward:  `R[y] = R[y-1] * (1 + G[y]/100)`
//! 5. backward: `R[y] = R[y+1] / (1 + G[y+1]/100)`
//! 6. other records: `R = R[one year earlier] * (1 + G/100)`, else the
//!    year's real value scaled by `L / L[year-end]` (flagged as low confidence)
//! 7. interior gaps: linear interpolation over record positions
//!
//! Annual values accumulate in a `BTreeMap<year, real>` built by folding over
//! the years in propagation order; no table is mutated in place.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::interpolate;
use crate::config::InterpolationMethod;
use crate::diagnostics::{emit, DiagnosticKind, DiagnosticsSink};
use crate::domain::{CellValue, DatedRecord, DatedSeries};
use crate::error::HarmonizeError;

/// Which columns to reconstruct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLinkSpec {
    /// Nominal level column; replaced by the real values.
    pub level_column: String,
    /// Year-over-year real growth, in percent.
    pub growth_column: String,
    /// Keep the growth column in the output instead of dropping it.
    #[serde(default)]
    pub retain_growth: bool,
}

impl ChainLinkSpec {
    pub fn new(level_column: impl Into<String>, growth_column: impl Into<String>) -> Self {
        Self {
            level_column: level_column.into(),
            growth_column: growth_column.into(),
            retain_growth: false,
        }
    }
}

/// The fixed point real values are propagated from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainAnchor {
    pub year: i32,
    pub nominal: f64,
}

/// How a record's real value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Anchor,
    Forward,
    Backward,
    PriorPeriod,
    NominalRatio,
    Interpolated,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordResolution {
    pub date: NaiveDate,
    pub resolution: Resolution,
    pub value: Option<f64>,
}

/// Audit trail of one reconstruction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainLinkReport {
    pub level_column: String,
    pub anchor: ChainAnchor,
    pub requested_base_year: i32,
    /// Real value per annual point, by year.
    pub annual_real: BTreeMap<i32, f64>,
    /// One entry per record, in record order.
    pub records: Vec<RecordResolution>,
}

impl ChainLinkReport {
    pub fn base_year_substituted(&self) -> bool {
        self.anchor.year != self.requested_base_year
    }

    pub fn count(&self, resolution: Resolution) -> usize {
        self.records
            .iter()
            .filter(|r| r.resolution == resolution)
            .count()
    }

    pub fn resolution_at(&self, date: NaiveDate) -> Option<Resolution> {
        self.records
            .iter()
            .find(|r| r.date == date)
            .map(|r| r.resolution)
    }
}

/// One representative record per year.
#[derive(Debug, Clone, Copy)]
struct AnnualPoint {
    record: usize,
    date: NaiveDate,
    nominal: Option<f64>,
    growth: Option<f64>,
}

/// Multiplicative factor for a growth rate in percent; `None` when degenerate.
fn growth_factor(growth: f64) -> Option<f64> {
    let factor = 1.0 + growth / 100.0;
    (factor != 0.0).then_some(factor)
}

pub struct RealValueChainLinker {
    base_year: i32,
}

impl RealValueChainLinker {
    pub fn new(base_year: i32) -> Self {
        Self { base_year }
    }

    /// Replace `spec.level_column` with chain-linked real values.
    pub fn link(
        &self,
        series: &DatedSeries,
        spec: &ChainLinkSpec,
        sink: &dyn DiagnosticsSink,
    ) -> Result<(DatedSeries, ChainLinkReport), HarmonizeError> {
        let level_idx = required_column(series, &spec.level_column)?;
        let growth_idx = required_column(series, &spec.growth_column)?;
        if series.is_empty() {
            return Err(HarmonizeError::EmptySeries);
        }

        let nominal = series.numbers(level_idx);
        let growth = series.numbers(growth_idx);
        let name = series.name.as_str();

        let annual = annual_points(series, &nominal, &growth, sink);
        let anchor = self.choose_anchor(name, &spec.level_column, &annual, sink)?;
        let mut flagged = BTreeSet::new();
        let annual_real = propagate(anchor, &annual, name, sink, &mut flagged);

        let n = series.len();
        let mut real: Vec<Option<f64>> = vec![None; n];
        let mut resolution = vec![Resolution::Unresolved; n];
        for (year, (value, how)) in &annual_real {
            let point = &annual[year];
            real[point.record] = Some(*value);
            resolution[point.record] = *how;
        }

        // Step 6: remaining records, in date order, seeing earlier results.
        let mut by_date: BTreeMap<NaiveDate, f64> = annual_real
            .keys()
            .map(|year| (annual[year].date, annual_real[year].0))
            .collect();
        for idx in 0..n {
            if real[idx].is_some() {
                continue;
            }
            let date = series.records[idx].date;
            let prior = date
                .checked_sub_months(Months::new(12))
                .and_then(|p| by_date.get(&p).copied());

            let resolved = match (prior, growth[idx]) {
                (Some(prior_real), Some(g)) => match growth_factor(g) {
                    Some(factor) => Some((prior_real * factor, Resolution::PriorPeriod)),
                    None => {
                        if flagged.insert(date) {
                            emit(sink, name, DiagnosticKind::DegenerateGrowthRate { date, growth: g });
                        }
                        None
                    }
                },
                _ => nominal_ratio(date, nominal[idx], &annual, &annual_real).map(|v| {
                    emit(sink, name, DiagnosticKind::NominalRatioFallback { date });
                    (v, Resolution::NominalRatio)
                }),
            };

            if let Some((value, how)) = resolved {
                real[idx] = Some(value);
                resolution[idx] = how;
                by_date.insert(date, value);
            }
        }

        // Step 7: last-resort interior interpolation.
        let filled = interpolate::fill_interior(&real, InterpolationMethod::Linear);
        for idx in 0..n {
            let date = series.records[idx].date;
            match (real[idx], filled[idx]) {
                (None, Some(_)) => {
                    resolution[idx] = Resolution::Interpolated;
                    emit(sink, name, DiagnosticKind::InterpolationFallback { date });
                }
                (None, None) => {
                    emit(sink, name, DiagnosticKind::UnresolvedReconstructionPoint { date });
                }
                _ => {}
            }
        }

        let output = replace_level(series, level_idx, growth_idx, spec.retain_growth, &filled);
        let report = ChainLinkReport {
            level_column: spec.level_column.clone(),
            anchor,
            requested_base_year: self.base_year,
            annual_real: annual_real.iter().map(|(y, (v, _))| (*y, *v)).collect(),
            records: series
                .records
                .iter()
                .zip(resolution.iter().zip(&filled))
                .map(|(r, (how, value))| RecordResolution {
                    date: r.date,
                    resolution: *how,
                    value: *value,
                })
                .collect(),
        };

        tracing::info!(
            series = %name,
            column = %spec.level_column,
            anchor_year = anchor.year,
            anchor_nominal = anchor.nominal,
            resolved = report.records.iter().filter(|r| r.value.is_some()).count(),
            total = n,
            "chain-linked real values"
        );

        Ok((output, report))
    }

    /// Base year if it has a nominal level, else the median year that does.
    fn choose_anchor(
        &self,
        name: &str,
        level_column: &str,
        annual: &BTreeMap<i32, AnnualPoint>,
        sink: &dyn DiagnosticsSink,
    ) -> Result<ChainAnchor, HarmonizeError> {
        if let Some(nominal) = annual.get(&self.base_year).and_then(|p| p.nominal) {
            return Ok(ChainAnchor {
                year: self.base_year,
                nominal,
            });
        }

        let candidates: Vec<(i32, f64)> = annual
            .iter()
            .filter_map(|(year, p)| p.nominal.map(|v| (*year, v)))
            .collect();
        let (year, nominal) = candidates.get(candidates.len() / 2).copied().ok_or_else(|| {
            HarmonizeError::NoAnchorAvailable {
                column: level_column.to_string(),
            }
        })?;

        emit(
            sink,
            name,
            DiagnosticKind::MissingBaseYearAnchor {
                requested: self.base_year,
                substituted: year,
            },
        );
        Ok(ChainAnchor { year, nominal })
    }
}

fn required_column(series: &DatedSeries, column: &str) -> Result<usize, HarmonizeError> {
    series
        .column_index(column)
        .ok_or_else(|| HarmonizeError::MissingRequiredColumn {
            column: column.to_string(),
        })
}

/// First December record of each year; every record if there are none.
fn annual_points(
    series: &DatedSeries,
    nominal: &[Option<f64>],
    growth: &[Option<f64>],
    sink: &dyn DiagnosticsSink,
) -> BTreeMap<i32, AnnualPoint> {
    let year_end: Vec<usize> = (0..series.len())
        .filter(|&i| series.records[i].date.month() == 12)
        .collect();

    let selected: Vec<usize> = if year_end.is_empty() {
        emit(sink, &series.name, DiagnosticKind::NoYearEndRecords);
        (0..series.len()).collect()
    } else {
        year_end
    };

    selected.into_iter().fold(BTreeMap::new(), |mut acc, i| {
        let date = series.records[i].date;
        acc.entry(date.year()).or_insert(AnnualPoint {
            record: i,
            date,
            nominal: nominal[i],
            growth: growth[i],
        });
        acc
    })
}

/// Forward and backward propagation from the anchor over calendar-adjacent years.
fn propagate(
    anchor: ChainAnchor,
    annual: &BTreeMap<i32, AnnualPoint>,
    name: &str,
    sink: &dyn DiagnosticsSink,
    flagged: &mut BTreeSet<NaiveDate>,
) -> BTreeMap<i32, (f64, Resolution)> {
    let seeded = BTreeMap::from([(anchor.year, (anchor.nominal, Resolution::Anchor))]);

    let forward = annual
        .range(anchor.year + 1..)
        .fold(seeded, |mut acc, (&year, point)| {
            let prev = acc.get(&(year - 1)).map(|(v, _)| *v);
            if let (Some(prev), Some(g)) = (prev, point.growth) {
                match growth_factor(g) {
                    Some(factor) => {
                        acc.insert(year, (prev * factor, Resolution::Forward));
                    }
                    None => {
                        flagged.insert(point.date);
                        emit(sink, name, DiagnosticKind::DegenerateGrowthRate { date: point.date, growth: g });
                    }
                }
            }
            acc
        });

    annual
        .range(..anchor.year)
        .rev()
        .fold(forward, |mut acc, (&year, point)| {
            let next = acc.get(&(year + 1)).map(|(v, _)| *v);
            let next_growth = annual.get(&(year + 1)).and_then(|p| p.growth);
            if let (Some(next), Some(g)) = (next, next_growth) {
                match growth_factor(g) {
                    Some(factor) => {
                        acc.insert(year, (next / factor, Resolution::Backward));
                    }
                    None => {
                        flagged.insert(point.date);
                        emit(sink, name, DiagnosticKind::DegenerateGrowthRate { date: point.date, growth: g });
                    }
                }
            }
            acc
        })
}

/// Year's real value scaled by the record's share of the year-end nominal level.
fn nominal_ratio(
    date: NaiveDate,
    nominal: Option<f64>,
    annual: &BTreeMap<i32, AnnualPoint>,
    annual_real: &BTreeMap<i32, (f64, Resolution)>,
) -> Option<f64> {
    let year = date.year();
    let (year_real, _) = annual_real.get(&year)?;
    let year_nominal = annual.get(&year)?.nominal.filter(|v| *v != 0.0)?;
    Some(year_real * nominal? / year_nominal)
}

fn replace_level(
    series: &DatedSeries,
    level_idx: usize,
    growth_idx: usize,
    retain_growth: bool,
    real: &[Option<f64>],
) -> DatedSeries {
    let keep = |i: usize| retain_growth || i != growth_idx;
    DatedSeries {
        name: series.name.clone(),
        columns: series
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| keep(*i))
            .map(|(_, c)| c.clone())
            .collect(),
        records: series
            .records
            .iter()
            .zip(real)
            .map(|(record, value)| DatedRecord {
                date: record.date,
                values: record
                    .values
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| keep(*i))
                    .map(|(i, cell)| {
                        if i == level_idx {
                            CellValue::from_option(*value)
                        } else {
                            cell.clone()
                        }
                    })
                    .collect(),
            })
            .collect(),
    }
}
