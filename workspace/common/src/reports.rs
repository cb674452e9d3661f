//! Row shapes emitted by the report pivoters.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::calendar::AgingBucket;

/// Display name used for loans that have no assigned collector.
pub const UNASSIGNED_COLLECTOR: &str = "Unassigned";

/// Normalizes a money amount to exactly two decimal places.
///
/// SQLite hands decimals back with whatever scale survived storage
/// (`50000.00` comes back as `50000`), so every amount that leaves a
/// report or response goes through here to keep the rendering stable
/// across backends.
pub fn money(mut value: Decimal) -> Decimal {
    value.rescale(2);
    value
}

/// Collector name of the synthetic grand-total row on the monthly pivots.
pub const GRAND_TOTAL_LABEL: &str = "TOTAL";

/// One (collector, bucket) cell of the receivables aging report. Every
/// collector in the report carries all six buckets, zero-filled where no
/// loan matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AgingReportRow {
    pub collector_name: String,
    pub bucket: AgingBucket,
    pub accounts: u64,
    /// Sum of outstanding balances in the bucket.
    pub reported_amount: Decimal,
    /// Sum of amounts collected in the bucket.
    pub collected_amount: Decimal,
    /// Sum of running balances in the bucket.
    pub ending_balance: Decimal,
}

/// Per-collector performance metrics, ordered by total collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CollectorPerformanceRow {
    pub collector_name: String,
    pub total_accounts: u64,
    pub total_outstanding: Decimal,
    pub total_collected: Decimal,
    pub total_running_balance: Decimal,
    /// `collected / outstanding * 100`, two decimals. `None` when the
    /// collector's total outstanding is zero; the rate is undefined then.
    pub collection_rate: Option<Decimal>,
    pub paid_accounts: u64,
}

/// One collector row of the monthly pivot. Exactly one of `months` (keys
/// `"01"`-`"12"`) and `periods` (keys `"Period 1"`-`"Period 8"`) is
/// present depending on the report type; every key is emitted even when
/// its value is zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyReportRow {
    pub collector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub months: Option<BTreeMap<String, Decimal>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periods: Option<BTreeMap<String, Decimal>>,
    pub total: Decimal,
}

/// Total collected per collector over a caller-supplied date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CollectionSummaryRow {
    pub collector_name: String,
    pub total_collected: Decimal,
}

/// One loan row of the masterlist and monitoring report: the loan's
/// standing plus its payments for the target year pivoted into month
/// columns (keys `"01"`-`"12"`, zero-filled).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MasterlistRow {
    pub loan_id: i32,
    pub area: Option<String>,
    pub city: Option<String>,
    pub barangay: Option<String>,
    /// `None` for unassigned loans.
    pub collector_name: Option<String>,
    pub borrower_name: String,
    pub month_reported: String,
    /// Original outstanding balance.
    pub principal: Decimal,
    /// Lifetime collected counter, not limited to the target year.
    pub total_collected_lifetime: Decimal,
    pub running_balance: Decimal,
    pub moving_status: String,
    pub monthly_payments: BTreeMap<String, Decimal>,
}
