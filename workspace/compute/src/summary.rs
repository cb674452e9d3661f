//! Collection summary: total collected per collector over a date range.

use std::collections::{BTreeMap, HashMap};

use chrono::{Days, NaiveDate};
use common::{money, CollectionSummaryRow, UNASSIGNED_COLLECTOR};
use model::entities::{collector, loan, payment};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::instrument;

use crate::error::{ComputeError, Result};

/// Sums payment amounts per collector between `start` and `end` (both
/// inclusive, whole days), ordered by total collected descending.
#[instrument(skip(db))]
pub async fn collection_summary<C: ConnectionTrait>(
    db: &C,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<CollectionSummaryRow>> {
    if end < start {
        return Err(ComputeError::Validation(
            "end_date must not precede start_date".to_string(),
        ));
    }
    let start_at = start.and_hms_opt(0, 0, 0).unwrap().and_utc();
    let end_at = end
        .checked_add_days(Days::new(1))
        .unwrap_or(end)
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc();

    let payments = payment::Entity::find()
        .filter(payment::Column::PaymentDate.gte(start_at))
        .filter(payment::Column::PaymentDate.lt(end_at))
        .find_also_related(loan::Entity)
        .all(db)
        .await?;

    let collectors: HashMap<i32, String> = collector::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
    for (payment, loan) in payments {
        let name = loan
            .and_then(|l| l.collector_id)
            .and_then(|id| collectors.get(&id).cloned())
            .unwrap_or_else(|| UNASSIGNED_COLLECTOR.to_string());
        *totals.entry(name).or_insert(Decimal::ZERO) += payment.amount;
    }

    let mut rows: Vec<CollectionSummaryRow> = totals
        .into_iter()
        .map(|(collector_name, total_collected)| CollectionSummaryRow {
            collector_name,
            total_collected: money(total_collected),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.total_collected
            .cmp(&a.total_collected)
            .then_with(|| a.collector_name.cmp(&b.collector_name))
    });
    Ok(rows)
}
