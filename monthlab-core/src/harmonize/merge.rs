//! Wide-panel merge.
//!
//! Full outer join of monthly series on the date key: the panel's dates are
//! the union of every contributing series' dates, and a series with no row
//! for a date contributes a missing value there. Nothing is forward-filled.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::diagnostics::{emit, DiagnosticKind, DiagnosticsSink};
use crate::domain::{MonthlySeries, Panel, ValueColumn};

/// A series and the columns it contributes. An empty `columns` list selects
/// every value column of the series.
#[derive(Debug, Clone, Copy)]
pub struct MergeSelection<'a> {
    pub series: &'a MonthlySeries,
    pub columns: &'a [String],
}

impl<'a> MergeSelection<'a> {
    pub fn new(series: &'a MonthlySeries, columns: &'a [String]) -> Self {
        Self { series, columns }
    }

    /// Selected columns present in the series, in selection order.
    fn available(&self) -> Vec<&'a ValueColumn> {
        if self.columns.is_empty() {
            return self.series.columns.iter().collect();
        }
        self.columns
            .iter()
            .filter_map(|name| self.series.column(name))
            .collect()
    }

    fn missing(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|name| self.series.column(name).is_none())
            .cloned()
            .collect()
    }
}

pub struct PanelMerger;

impl PanelMerger {
    /// Merge `base` and `sources` into one panel.
    ///
    /// Output columns are named `{series}_{position}`, position counting the
    /// selected columns available in that source from zero; a name that is
    /// still taken gets `_{n}` appended.
    pub fn merge(
        base: MergeSelection<'_>,
        sources: &[MergeSelection<'_>],
        sink: &dyn DiagnosticsSink,
    ) -> Panel {
        let selections: Vec<(&str, Vec<&ValueColumn>, &MonthlySeries)> =
            std::iter::once(&base)
                .chain(sources)
                .filter_map(|sel| {
                    let available = sel.available();
                    if available.is_empty() {
                        emit(
                            sink,
                            &sel.series.name,
                            DiagnosticKind::ColumnsUnavailable {
                                requested: sel.columns.to_vec(),
                            },
                        );
                        return None;
                    }
                    let missing = sel.missing();
                    if !missing.is_empty() {
                        emit(
                            sink,
                            &sel.series.name,
                            DiagnosticKind::SelectedColumnsMissing { missing },
                        );
                    }
                    Some((sel.series.name.as_str(), available, sel.series))
                })
                .collect();

        let dates: Vec<NaiveDate> = selections
            .iter()
            .flat_map(|(_, _, series)| series.dates.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut used = HashSet::new();
        let mut columns = Vec::new();
        for (name, available, series) in &selections {
            let row_of: HashMap<NaiveDate, usize> = series
                .dates
                .iter()
                .enumerate()
                .map(|(i, d)| (*d, i))
                .collect();

            for (position, column) in available.iter().enumerate() {
                let values = dates
                    .iter()
                    .map(|d| row_of.get(d).and_then(|&row| column.values[row]))
                    .collect();
                let output_name = unique_name(format!("{name}_{position}"), &mut used);
                columns.push(ValueColumn::new(output_name, values));
            }
        }

        tracing::info!(
            series = selections.len(),
            rows = dates.len(),
            columns = columns.len(),
            "merged panel"
        );

        Panel { dates, columns }
    }
}

fn unique_name(candidate: String, used: &mut HashSet<String>) -> String {
    let mut name = candidate.clone();
    let mut n = 1;
    while used.contains(&name) {
        name = format!("{candidate}_{n}");
        n += 1;
    }
    used.insert(name.clone());
    name
}
