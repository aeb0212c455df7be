//! End-to-end harmonization scenarios on raw provider tables.
//!
//! Each test starts from text rows as a loader would produce them and runs
//! the stages in pipeline order: normalize, chain link, classify, resample,
//! merge.

use chrono::{Datelike, NaiveDate};

use monthlab_core::domain::{MonthlySeries, RawRecord, RawSeries};
use monthlab_core::harmonize::{
    ChainLinkSpec, DateNormalizer, FrequencyClass, FrequencyClassifier, MergeSelection,
    MonthlyResampler, PanelMerger, RealValueChainLinker, Resolution,
};
use monthlab_core::{CollectingSink, DiagnosticKind, InterpolationMethod};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn raw(name: &str, columns: &[&str], rows: &[&[&str]]) -> RawSeries {
    RawSeries::new(
        name,
        columns.iter().map(|c| c.to_string()).collect(),
        rows.iter()
            .map(|r| RawRecord::new(r.iter().map(|f| f.to_string()).collect()))
            .collect(),
    )
}

fn to_monthly(series: &RawSeries, date_column: &str, sink: &CollectingSink) -> MonthlySeries {
    let dated = DateNormalizer::normalize(series, date_column).unwrap();
    let class = FrequencyClassifier::require(&dated.dates()).unwrap().class;
    MonthlyResampler::new(InterpolationMethod::Linear)
        .resample(&dated, class, sink)
        .unwrap()
}

#[test]
fn quarterly_labels_interpolate_linearly() {
    let gdp = raw(
        "GDP",
        &["季度", "value"],
        &[&["2020年第1季度", "100"], &["2020年第1-2季度", "110"]],
    );
    let sink = CollectingSink::new();
    let dated = DateNormalizer::normalize(&gdp, "季度").unwrap();
    let class = FrequencyClassifier::classify(&dated.dates());
    assert_eq!(class.class, FrequencyClass::Quarterly);

    let monthly = MonthlyResampler::new(InterpolationMethod::Linear)
        .resample(&dated, class.class, &sink)
        .unwrap();
    let april = monthly.value("value", d(2020, 4, 1)).unwrap();
    let may = monthly.value("value", d(2020, 5, 1)).unwrap();
    assert!((april - 103.33).abs() < 0.01);
    assert!((may - 106.67).abs() < 0.01);
    assert_eq!(monthly.column_names(), vec!["value"]);
}

#[test]
fn annual_year_codes_repeat_across_months() {
    let pop = raw(
        "POP",
        &["year", "total"],
        &[&["zb.A030101_sj.2021", "500"], &["zb.A030101_sj.2020", "490"]],
    );
    let monthly = to_monthly(&pop, "year", &CollectingSink::new());

    assert_eq!(monthly.len(), 24);
    let year_2021: Vec<_> = monthly
        .dates
        .iter()
        .zip(&monthly.column("total").unwrap().values)
        .filter(|(date, _)| date.year() == 2021)
        .collect();
    assert_eq!(year_2021.len(), 12);
    assert_eq!(*year_2021[0].0, d(2021, 1, 1));
    assert_eq!(*year_2021[11].0, d(2021, 12, 1));
    assert!(year_2021.iter().all(|(_, v)| **v == Some(500.0)));
}

#[test]
fn chain_link_runs_before_resampling() {
    let gdp = raw(
        "GDP",
        &["季度", "国内生产总值-绝对值", "国内生产总值-同比增长"],
        &[
            &["2014年第1-4季度", "640000", "7.4"],
            &["2015年第1-4季度", "1000", "4"],
            &["2016年第1-4季度", "1200", "5"],
        ],
    );
    let sink = CollectingSink::new();
    let dated = DateNormalizer::normalize(&gdp, "季度").unwrap();
    let (linked, report) = RealValueChainLinker::new(2015)
        .link(
            &dated,
            &ChainLinkSpec::new("国内生产总值-绝对值", "国内生产总值-同比增长"),
            &sink,
        )
        .unwrap();

    assert_eq!(report.annual_real[&2015], 1000.0);
    assert!((report.annual_real[&2016] - 1050.0).abs() < 1e-9);
    assert!((report.annual_real[&2014] - 961.54).abs() < 0.01);
    assert!(linked.column_index("国内生产总值-同比增长").is_none());

    let class = FrequencyClassifier::require(&linked.dates()).unwrap().class;
    assert_eq!(class, FrequencyClass::Annual);
    let monthly = MonthlyResampler::default().resample(&linked, class, &sink).unwrap();
    let july = monthly.value("国内生产总值-绝对值", d(2016, 7, 1)).unwrap();
    assert!((july - 1050.0).abs() < 1e-9);
    assert!(sink.is_empty());
}

#[test]
fn degenerate_growth_is_interpolated_never_divided() {
    let gdp = raw(
        "GDP",
        &["季度", "level", "yoy"],
        &[
            &["2015年第1-2季度", "480", "7"],
            &["2015年第1-4季度", "1000", "6.9"],
            &["2016年第1-2季度", "520", "5"],
            &["2016年第1-4季度", "1080", "-100"],
            &["2017年第1-2季度", "560", "10"],
        ],
    );
    let sink = CollectingSink::new();
    let dated = DateNormalizer::normalize(&gdp, "季度").unwrap();
    let (linked, report) = RealValueChainLinker::new(2015)
        .link(&dated, &ChainLinkSpec::new("level", "yoy"), &sink)
        .unwrap();

    assert_eq!(report.resolution_at(d(2016, 12, 31)), Some(Resolution::Interpolated));
    let value = linked.records[3].values[0].as_number().unwrap();
    assert!(value.is_finite());
    assert!((value - (504.0 + 554.4) / 2.0).abs() < 1e-9);

    let kinds = sink.for_series("GDP");
    assert!(kinds
        .iter()
        .any(|k| matches!(k, DiagnosticKind::DegenerateGrowthRate { .. })));
    assert!(kinds.contains(&DiagnosticKind::InterpolationFallback { date: d(2016, 12, 31) }));
}

#[test]
fn mixed_frequencies_merge_into_one_panel() {
    let sink = CollectingSink::new();
    let cpi = to_monthly(
        &raw(
            "CPI",
            &["月份", "全国-当月", "全国-同比增长"],
            &[
                &["2024年3月份", "100.1", "0.1"],
                &["2024年2月份", "100.7", "0.7"],
                &["2024年1月份", "99.2", "-0.8"],
            ],
        ),
        "月份",
        &sink,
    );
    let pmi = to_monthly(
        &raw(
            "PMI",
            &["date", "pmi"],
            &[&["2024-02-29", "49.1"], &["2024-03-31", "50.8"], &["2024-04-30", "49.4"]],
        ),
        "date",
        &sink,
    );

    let base_cols = vec!["全国-当月".to_string(), "全国-同比增长".to_string()];
    let pmi_cols = vec!["pmi".to_string()];
    let panel = PanelMerger::merge(
        MergeSelection::new(&cpi, &base_cols),
        &[MergeSelection::new(&pmi, &pmi_cols)],
        &sink,
    );

    assert_eq!(
        panel.dates,
        vec![d(2024, 1, 1), d(2024, 2, 1), d(2024, 3, 1), d(2024, 4, 1)]
    );
    assert_eq!(panel.column_names(), vec!["CPI_0", "CPI_1", "PMI_0"]);
    assert_eq!(panel.value("PMI_0", d(2024, 1, 1)), None);
    assert_eq!(panel.value("CPI_1", d(2024, 1, 1)), Some(-0.8));
    assert_eq!(panel.value("CPI_0", d(2024, 4, 1)), None);

    let missing = panel.missingness();
    assert_eq!(missing[0].missing, 1);
    assert_eq!(missing[0].percentage, 25.0);
    assert!(sink.is_empty());
}
