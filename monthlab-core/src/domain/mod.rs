//! Domain types: raw and dated records, monthly series, the merged panel.

pub mod monthly;
pub mod panel;
pub mod record;

pub use monthly::{add_months, month_start, months_between, MonthlySeries, ValueColumn};
pub use panel::{Missingness, Panel};
pub use record::{CellValue, DatedRecord, DatedSeries, RawRecord, RawSeries};
