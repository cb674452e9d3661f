//! Receivables aging: classifies every non-paid loan into a days-past-due
//! bucket as of a given date and aggregates per (collector, bucket).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use common::{money, AgingBucket, AgingReportRow, UNASSIGNED_COLLECTOR};
use model::entities::{collector, loan};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::instrument;

use crate::error::Result;

#[derive(Debug, Default, Clone, Copy)]
struct BucketCell {
    accounts: u64,
    reported: Decimal,
    collected: Decimal,
    ending: Decimal,
}

/// Builds the aging report as of `today`.
///
/// Loans with moving status `Paid` do not participate; loans that are not
/// yet due (or due today) are "current" and fall into no bucket. Every
/// collector that has at least one non-paid loan emits exactly six rows,
/// zero-filled where a bucket is empty, so consumers can index any bucket
/// without treating a missing row as meaningful.
#[instrument(skip(db))]
pub async fn aging_report<C: ConnectionTrait>(
    db: &C,
    today: NaiveDate,
) -> Result<Vec<AgingReportRow>> {
    let loans = loan::Entity::find()
        .filter(loan::Column::MovingStatus.ne(loan::MovingStatus::Paid))
        .find_also_related(collector::Entity)
        .all(db)
        .await?;

    let mut table: BTreeMap<String, [BucketCell; 6]> = BTreeMap::new();
    for (loan, collector) in loans {
        let name = collector
            .map(|c| c.name)
            .unwrap_or_else(|| UNASSIGNED_COLLECTOR.to_string());
        let cells = table.entry(name).or_default();
        let Some(bucket) = AgingBucket::from_days_past_due(loan.days_past_due(today)) else {
            // Current loan: the collector still shows up, all-zero.
            continue;
        };
        let cell = &mut cells[bucket as usize];
        cell.accounts += 1;
        cell.reported += loan.outstanding_balance;
        cell.collected += loan.amount_collected;
        cell.ending += loan.running_balance();
    }

    let mut rows = Vec::with_capacity(table.len() * AgingBucket::ALL.len());
    for (name, cells) in table {
        for bucket in AgingBucket::ALL {
            let cell = cells[bucket as usize];
            rows.push(AgingReportRow {
                collector_name: name.clone(),
                bucket,
                accounts: cell.accounts,
                reported_amount: money(cell.reported),
                collected_amount: money(cell.collected),
                ending_balance: money(cell.ending),
            });
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use model::entities::loan::MovingStatus;
    use sea_orm::Set;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn thirty_five_days_past_due_lands_in_31_45() {
        let db = testing::setup_db().await;
        let (_, rossana) = testing::seed_collector_with_user(&db, "Rossana").await;

        let mut row = testing::loan_row("LC-1", Some(rossana.id), "Abad, Ana", "03-25");
        row.due_date = Set(date(2025, 3, 15));
        row.outstanding_balance = Set(testing::pesos(50_000));
        row.amount_collected = Set(testing::pesos(20_000));
        testing::insert_loan(&db, row).await;

        // 35 days after the due date.
        let rows = aging_report(&db, date(2025, 4, 19)).await.unwrap();
        assert_eq!(rows.len(), 6);

        let hit: Vec<_> = rows.iter().filter(|r| r.accounts > 0).collect();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].bucket, AgingBucket::Days31To45);
        assert_eq!(hit[0].reported_amount, testing::pesos(50_000));
        assert_eq!(hit[0].collected_amount, testing::pesos(20_000));
        assert_eq!(hit[0].ending_balance, testing::pesos(30_000));
    }

    #[tokio::test]
    async fn every_collector_emits_exactly_six_buckets() {
        let db = testing::setup_db().await;
        let (_, rossana) = testing::seed_collector_with_user(&db, "Rossana").await;
        let (_, dante) = testing::seed_collector_with_user(&db, "Dante").await;

        let mut a = testing::loan_row("LC-1", Some(rossana.id), "Abad, Ana", "03-25");
        a.due_date = Set(date(2025, 1, 1));
        testing::insert_loan(&db, a).await;

        // Dante's only loan is current, so all six of his rows are zero.
        let mut b = testing::loan_row("LC-2", Some(dante.id), "Bello, Ben", "03-25");
        b.due_date = Set(date(2025, 12, 1));
        testing::insert_loan(&db, b).await;

        // Unassigned loan shows under the placeholder collector.
        let mut c = testing::loan_row("LC-3", None, "Cruz, Carla", "03-25");
        c.due_date = Set(date(2025, 5, 20));
        testing::insert_loan(&db, c).await;

        let rows = aging_report(&db, date(2025, 6, 1)).await.unwrap();
        assert_eq!(rows.len(), 18);
        for name in ["Rossana", "Dante", UNASSIGNED_COLLECTOR] {
            let buckets: Vec<_> = rows
                .iter()
                .filter(|r| r.collector_name == name)
                .map(|r| r.bucket)
                .collect();
            assert_eq!(buckets, AgingBucket::ALL.to_vec(), "collector {name}");
        }
        assert!(
            rows.iter()
                .filter(|r| r.collector_name == "Dante")
                .all(|r| r.accounts == 0 && r.ending_balance.is_zero())
        );
    }

    #[tokio::test]
    async fn paid_loans_are_excluded() {
        let db = testing::setup_db().await;
        let mut row = testing::loan_row("LC-1", None, "Abad, Ana", "03-25");
        row.due_date = Set(date(2025, 1, 1));
        row.moving_status = Set(MovingStatus::Paid);
        testing::insert_loan(&db, row).await;

        let rows = aging_report(&db, date(2025, 6, 1)).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn due_today_is_current() {
        let db = testing::setup_db().await;
        let mut row = testing::loan_row("LC-1", None, "Abad, Ana", "03-25");
        row.due_date = Set(date(2025, 6, 1));
        testing::insert_loan(&db, row).await;

        let rows = aging_report(&db, date(2025, 6, 1)).await.unwrap();
        // Six zero rows for the unassigned book, nothing bucketed.
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|r| r.accounts == 0));
    }
}
