//! Masterlist and monitoring report: every loan with its current standing
//! plus the target year's payments pivoted into month columns, grouped
//! area, then collector, then borrower.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use common::{money, MasterlistRow};
use model::entities::{collector, loan, payment};
use rust_decimal::Decimal;
use sea_orm::{ActiveEnum, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::instrument;

use crate::error::{ComputeError, Result};
use crate::monthly::ensure_report_year;

fn zero_months() -> BTreeMap<String, Decimal> {
    (1..=12).map(|m| (format!("{m:02}"), Decimal::ZERO)).collect()
}

fn nulls_last(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Builds the masterlist for `year`: one row per loan across the whole
/// book, each carrying a zero-filled month map (`"01"`-`"12"`) of that
/// year's payments. Rows sort by area, then collector name, then borrower
/// name, with missing area or collector last.
#[instrument(skip(db))]
pub async fn masterlist_report<C: ConnectionTrait>(db: &C, year: i32) -> Result<Vec<MasterlistRow>> {
    ensure_report_year(year)?;
    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .ok_or_else(|| ComputeError::Validation(format!("invalid year {year}")))?;
    let end = NaiveDate::from_ymd_opt(year + 1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .ok_or_else(|| ComputeError::Validation(format!("invalid year {year}")))?;

    let loans = loan::Entity::find()
        .find_also_related(collector::Entity)
        .all(db)
        .await?;
    let payments = payment::Entity::find()
        .filter(payment::Column::PaymentDate.gte(start))
        .filter(payment::Column::PaymentDate.lt(end))
        .all(db)
        .await?;

    let mut per_loan: HashMap<i32, BTreeMap<String, Decimal>> = HashMap::new();
    for p in payments {
        let months = per_loan.entry(p.loan_id).or_insert_with(zero_months);
        *months
            .entry(format!("{:02}", p.payment_date.month()))
            .or_insert(Decimal::ZERO) += p.amount;
    }

    let mut rows: Vec<MasterlistRow> = loans
        .into_iter()
        .map(|(l, c)| {
            let monthly_payments = per_loan
                .remove(&l.id)
                .unwrap_or_else(zero_months)
                .into_iter()
                .map(|(k, v)| (k, money(v)))
                .collect();
            let principal = money(l.outstanding_balance);
            let total_collected_lifetime = money(l.amount_collected);
            let running_balance = money(l.running_balance());
            MasterlistRow {
                loan_id: l.id,
                area: l.area,
                city: l.city,
                barangay: l.barangay,
                collector_name: c.map(|c| c.name),
                borrower_name: l.borrower_name,
                month_reported: l.month_reported,
                principal,
                total_collected_lifetime,
                running_balance,
                moving_status: l.moving_status.to_value(),
                monthly_payments,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        nulls_last(&a.area, &b.area)
            .then_with(|| nulls_last(&a.collector_name, &b.collector_name))
            .then_with(|| a.borrower_name.cmp(&b.borrower_name))
    });
    Ok(rows)
}
