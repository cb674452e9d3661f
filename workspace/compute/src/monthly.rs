//! Monthly summary pivots: collector × time-bucket matrices for a target
//! year, either from the loan records ("reported") or from the payment
//! transactions ("collection").

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::NaiveDate;
use common::{
    money, CollectionPeriod, GRAND_TOTAL_LABEL, MonthKey, MonthlyReportRow, UNASSIGNED_COLLECTOR,
};
use model::entities::{collector, loan, payment};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::instrument;

use crate::error::{ComputeError, Result};

/// Years representable by the two-digit `MM-YY` report codes. Report
/// endpoints reject anything outside this window instead of trying to
/// build dates for it.
pub const REPORT_YEAR_RANGE: std::ops::RangeInclusive<i32> = 2000..=2099;

pub(crate) fn ensure_report_year(year: i32) -> Result<()> {
    if !REPORT_YEAR_RANGE.contains(&year) {
        return Err(ComputeError::Validation(format!(
            "year {year} is outside the supported range 2000-2099"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthlyReportKind {
    /// Outstanding balances grouped by the month the loan was reported.
    Reported,
    /// Payment amounts grouped by the eight ~45-day collection periods.
    Collection,
}

impl FromStr for MonthlyReportKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s {
            "reported" => Ok(MonthlyReportKind::Reported),
            "collection" => Ok(MonthlyReportKind::Collection),
            _ => Err(()),
        }
    }
}

fn zero_months() -> BTreeMap<String, Decimal> {
    (1..=12).map(|m| (month_label(m), Decimal::ZERO)).collect()
}

fn zero_periods() -> BTreeMap<String, Decimal> {
    CollectionPeriod::ALL
        .iter()
        .map(|p| (p.label().to_string(), Decimal::ZERO))
        .collect()
}

fn month_label(month: u32) -> String {
    format!("{month:02}")
}

/// Builds the requested pivot for `year`. Every collector row carries the
/// full zero-initialized bucket map plus a `total`; a synthetic grand-total
/// row (collector `TOTAL`) accumulates the already-computed per-collector
/// totals, so the footer always equals the column sums exactly.
#[instrument(skip(db))]
pub async fn monthly_report<C: ConnectionTrait>(
    db: &C,
    year: i32,
    kind: MonthlyReportKind,
) -> Result<Vec<MonthlyReportRow>> {
    ensure_report_year(year)?;
    let table = match kind {
        MonthlyReportKind::Reported => reported_buckets(db, year).await?,
        MonthlyReportKind::Collection => collection_buckets(db, year).await?,
    };
    Ok(pivot(table, kind))
}

/// collector name -> bucket label -> amount, zero-initialized per collector.
type BucketTable = BTreeMap<String, BTreeMap<String, Decimal>>;

async fn reported_buckets<C: ConnectionTrait>(db: &C, year: i32) -> Result<BucketTable> {
    let loans = loan::Entity::find()
        .find_also_related(collector::Entity)
        .all(db)
        .await?;

    let mut table = BucketTable::new();
    for (loan, collector) in loans {
        // Year is matched on the two-digit suffix of the stored code.
        let Some(key) = MonthKey::from_report_code(&loan.month_reported) else {
            continue;
        };
        if key.year != year {
            continue;
        }
        let name = collector
            .map(|c| c.name)
            .unwrap_or_else(|| UNASSIGNED_COLLECTOR.to_string());
        let buckets = table.entry(name).or_insert_with(zero_months);
        *buckets.entry(month_label(key.month)).or_insert(Decimal::ZERO) +=
            loan.outstanding_balance;
    }
    Ok(table)
}

async fn collection_buckets<C: ConnectionTrait>(db: &C, year: i32) -> Result<BucketTable> {
    // The year was range-checked, so these dates always exist.
    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .ok_or_else(|| ComputeError::Validation(format!("invalid year {year}")))?;
    let end = NaiveDate::from_ymd_opt(year + 1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .ok_or_else(|| ComputeError::Validation(format!("invalid year {year}")))?;

    let payments = payment::Entity::find()
        .filter(payment::Column::PaymentDate.gte(start))
        .filter(payment::Column::PaymentDate.lt(end))
        .find_also_related(loan::Entity)
        .all(db)
        .await?;

    let collectors: HashMap<i32, String> = collector::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let mut table = BucketTable::new();
    for (payment, loan) in payments {
        let name = loan
            .and_then(|l| l.collector_id)
            .and_then(|id| collectors.get(&id).cloned())
            .unwrap_or_else(|| UNASSIGNED_COLLECTOR.to_string());
        let period = CollectionPeriod::of_date(payment.payment_date.date_naive());
        let buckets = table.entry(name).or_insert_with(zero_periods);
        *buckets
            .entry(period.label().to_string())
            .or_insert(Decimal::ZERO) += payment.amount;
    }
    Ok(table)
}

fn pivot(table: BucketTable, kind: MonthlyReportKind) -> Vec<MonthlyReportRow> {
    let mut grand_buckets = match kind {
        MonthlyReportKind::Reported => zero_months(),
        MonthlyReportKind::Collection => zero_periods(),
    };
    let mut grand_total = Decimal::ZERO;

    let mut rows = Vec::with_capacity(table.len() + 1);
    for (name, buckets) in table {
        let total: Decimal = buckets.values().copied().sum();
        for (label, amount) in &buckets {
            *grand_buckets.entry(label.clone()).or_insert(Decimal::ZERO) += *amount;
        }
        // Grand total accumulates the per-collector totals, not an
        // independent aggregate, so footer and rows can never drift.
        grand_total += total;
        rows.push(row(name, buckets, total, kind));
    }
    rows.push(row(
        GRAND_TOTAL_LABEL.to_string(),
        grand_buckets,
        grand_total,
        kind,
    ));
    rows
}

fn row(
    collector: String,
    buckets: BTreeMap<String, Decimal>,
    total: Decimal,
    kind: MonthlyReportKind,
) -> MonthlyReportRow {
    let buckets: BTreeMap<String, Decimal> =
        buckets.into_iter().map(|(k, v)| (k, money(v))).collect();
    let total = money(total);
    match kind {
        MonthlyReportKind::Reported => MonthlyReportRow {
            collector,
            months: Some(buckets),
            periods: None,
            total,
        },
        MonthlyReportKind::Collection => MonthlyReportRow {
            collector,
            months: None,
            periods: Some(buckets),
            total,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use sea_orm::Set;

    #[tokio::test]
    async fn reported_pivot_zero_fills_and_totals() {
        let db = testing::setup_db().await;
        let (_, rossana) = testing::seed_collector_with_user(&db, "Rossana").await;
        let (_, dante) = testing::seed_collector_with_user(&db, "Dante").await;

        let mut a = testing::loan_row("LC-1", Some(rossana.id), "Abad, Ana", "01-25");
        a.outstanding_balance = Set(testing::pesos(10_000));
        testing::insert_loan(&db, a).await;

        let mut b = testing::loan_row("LC-2", Some(rossana.id), "Bello, Ben", "01-25");
        b.outstanding_balance = Set(testing::pesos(5_000));
        testing::insert_loan(&db, b).await;

        let mut c = testing::loan_row("LC-3", Some(dante.id), "Cruz, Carla", "07-25");
        c.outstanding_balance = Set(testing::pesos(20_000));
        testing::insert_loan(&db, c).await;

        // Different year: excluded from the 2025 pivot.
        let mut d = testing::loan_row("LC-4", Some(dante.id), "Diaz, Dan", "03-24");
        d.outstanding_balance = Set(testing::pesos(99_000));
        testing::insert_loan(&db, d).await;

        let rows = monthly_report(&db, 2025, MonthlyReportKind::Reported)
            .await
            .unwrap();
        // Two collectors plus the grand-total footer.
        assert_eq!(rows.len(), 3);

        let rossana_row = rows.iter().find(|r| r.collector == "Rossana").unwrap();
        let months = rossana_row.months.as_ref().unwrap();
        assert_eq!(months.len(), 12);
        assert_eq!(months["01"], testing::pesos(15_000));
        assert_eq!(months["07"], Decimal::ZERO);
        assert_eq!(rossana_row.total, testing::pesos(15_000));

        let footer = rows.last().unwrap();
        assert_eq!(footer.collector, GRAND_TOTAL_LABEL);
        assert_eq!(footer.total, testing::pesos(35_000));
        let footer_months = footer.months.as_ref().unwrap();
        assert_eq!(footer_months["01"], testing::pesos(15_000));
        assert_eq!(footer_months["07"], testing::pesos(20_000));
        // Footer equals the sum of the per-collector totals to the cent.
        let sum: Decimal = rows[..rows.len() - 1].iter().map(|r| r.total).sum();
        assert_eq!(footer.total, sum);
        // And each row's total equals the sum of its own buckets.
        for r in &rows[..rows.len() - 1] {
            let bucket_sum: Decimal = r.months.as_ref().unwrap().values().copied().sum();
            assert_eq!(r.total, bucket_sum);
        }
    }

    #[tokio::test]
    async fn collection_pivot_buckets_payments_into_periods() {
        let db = testing::setup_db().await;
        let admin = testing::seed_admin(&db).await;
        let (_, rossana) = testing::seed_collector_with_user(&db, "Rossana").await;
        let loan = testing::seed_loan(&db, "LC-1", Some(rossana.id), "Abad, Ana", "01-25").await;

        let date = |m, d| NaiveDate::from_ymd_opt(2025, m, d).unwrap();
        // Period 1 boundary (inclusive) and Period 2 start.
        testing::seed_payment(&db, loan.id, testing::pesos(1_000), date(2, 15), admin.id).await;
        testing::seed_payment(&db, loan.id, testing::pesos(2_000), date(2, 16), admin.id).await;
        testing::seed_payment(&db, loan.id, testing::pesos(3_000), date(12, 31), admin.id).await;
        // Previous year: excluded.
        let prev = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        testing::seed_payment(&db, loan.id, testing::pesos(9_000), prev, admin.id).await;

        let rows = monthly_report(&db, 2025, MonthlyReportKind::Collection)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let rossana_row = &rows[0];
        assert_eq!(rossana_row.collector, "Rossana");
        let periods = rossana_row.periods.as_ref().unwrap();
        assert_eq!(periods.len(), 8);
        assert_eq!(periods["Period 1"], testing::pesos(1_000));
        assert_eq!(periods["Period 2"], testing::pesos(2_000));
        assert_eq!(periods["Period 8"], testing::pesos(3_000));
        assert_eq!(periods["Period 5"], Decimal::ZERO);
        assert_eq!(rossana_row.total, testing::pesos(6_000));

        let footer = &rows[1];
        assert_eq!(footer.collector, GRAND_TOTAL_LABEL);
        assert_eq!(footer.total, testing::pesos(6_000));
    }

    #[tokio::test]
    async fn out_of_range_year_is_a_validation_error() {
        let db = testing::setup_db().await;
        for year in [300_000, 1999, -1] {
            let err = monthly_report(&db, year, MonthlyReportKind::Collection)
                .await
                .unwrap_err();
            assert!(matches!(err, ComputeError::Validation(_)), "year {year}");
        }
    }

    #[tokio::test]
    async fn empty_year_still_emits_footer() {
        let db = testing::setup_db().await;
        let rows = monthly_report(&db, 2025, MonthlyReportKind::Reported)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].collector, GRAND_TOTAL_LABEL);
        assert_eq!(rows[0].total, Decimal::ZERO);
    }
}
