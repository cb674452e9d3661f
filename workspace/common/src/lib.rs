//! Common transport-layer types shared between the backend handlers and the
//! compute crate. These structs are the shapes the report endpoints emit,
//! kept here so the computation layer does not depend on the HTTP crate.

mod calendar;
mod reports;

pub use calendar::{AgingBucket, CollectionPeriod, MonthKey};
pub use reports::{
    money, AgingReportRow, CollectionSummaryRow, CollectorPerformanceRow, MasterlistRow,
    MonthlyReportRow, GRAND_TOTAL_LABEL, UNASSIGNED_COLLECTOR,
};
