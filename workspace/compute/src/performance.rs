//! Collector performance metrics over the whole loan book.

use std::collections::BTreeMap;

use common::{money, CollectorPerformanceRow, UNASSIGNED_COLLECTOR};
use model::entities::{collector, loan};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{ConnectionTrait, EntityTrait};
use tracing::instrument;

use crate::error::Result;

#[derive(Debug, Default, Clone, Copy)]
struct Acc {
    accounts: u64,
    outstanding: Decimal,
    collected: Decimal,
    running: Decimal,
    paid: u64,
}

/// Per-collector totals plus the collection rate, ordered by total
/// collected descending. The rate is `collected / outstanding * 100`
/// rounded to two decimals, and is undefined (`None`) when a collector's
/// total outstanding is zero.
#[instrument(skip(db))]
pub async fn performance_report<C: ConnectionTrait>(db: &C) -> Result<Vec<CollectorPerformanceRow>> {
    let loans = loan::Entity::find()
        .find_also_related(collector::Entity)
        .all(db)
        .await?;

    let mut table: BTreeMap<String, Acc> = BTreeMap::new();
    for (loan, collector) in loans {
        let name = collector
            .map(|c| c.name)
            .unwrap_or_else(|| UNASSIGNED_COLLECTOR.to_string());
        let acc = table.entry(name).or_default();
        acc.accounts += 1;
        acc.outstanding += loan.outstanding_balance;
        acc.collected += loan.amount_collected;
        acc.running += loan.running_balance();
        if loan.moving_status == loan::MovingStatus::Paid {
            acc.paid += 1;
        }
    }

    let mut rows: Vec<CollectorPerformanceRow> = table
        .into_iter()
        .map(|(name, acc)| {
            let collection_rate = if acc.outstanding.is_zero() {
                None
            } else {
                Some(
                    (acc.collected / acc.outstanding * Decimal::from(100))
                        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
                )
            };
            CollectorPerformanceRow {
                collector_name: name,
                total_accounts: acc.accounts,
                total_outstanding: money(acc.outstanding),
                total_collected: money(acc.collected),
                total_running_balance: money(acc.running),
                collection_rate,
                paid_accounts: acc.paid,
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.total_collected
            .cmp(&a.total_collected)
            .then_with(|| a.collector_name.cmp(&b.collector_name))
    });
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use model::entities::loan::MovingStatus;
    use sea_orm::Set;

    #[tokio::test]
    async fn totals_rate_and_ordering() {
        let db = testing::setup_db().await;
        let (_, rossana) = testing::seed_collector_with_user(&db, "Rossana").await;
        let (_, dante) = testing::seed_collector_with_user(&db, "Dante").await;

        let mut a = testing::loan_row("LC-1", Some(rossana.id), "Abad, Ana", "03-25");
        a.outstanding_balance = Set(testing::pesos(60_000));
        a.amount_collected = Set(testing::pesos(20_000));
        testing::insert_loan(&db, a).await;

        let mut b = testing::loan_row("LC-2", Some(rossana.id), "Bello, Ben", "03-25");
        b.outstanding_balance = Set(testing::pesos(30_000));
        b.amount_collected = Set(testing::pesos(30_000));
        b.moving_status = Set(MovingStatus::Paid);
        testing::insert_loan(&db, b).await;

        let mut c = testing::loan_row("LC-3", Some(dante.id), "Cruz, Carla", "03-25");
        c.outstanding_balance = Set(testing::pesos(40_000));
        c.amount_collected = Set(testing::pesos(10_000));
        testing::insert_loan(&db, c).await;

        let rows = performance_report(&db).await.unwrap();
        assert_eq!(rows.len(), 2);

        // Rossana collected more, so she leads.
        assert_eq!(rows[0].collector_name, "Rossana");
        assert_eq!(rows[0].total_accounts, 2);
        assert_eq!(rows[0].total_outstanding, testing::pesos(90_000));
        assert_eq!(rows[0].total_collected, testing::pesos(50_000));
        assert_eq!(rows[0].total_running_balance, testing::pesos(40_000));
        assert_eq!(rows[0].paid_accounts, 1);
        // 50000 / 90000 * 100 = 55.56 at two decimals.
        assert_eq!(
            rows[0].collection_rate,
            Some(Decimal::new(5556, 2)),
        );

        assert_eq!(rows[1].collector_name, "Dante");
        assert_eq!(rows[1].collection_rate, Some(Decimal::new(2500, 2)));
    }

    #[tokio::test]
    async fn zero_outstanding_yields_undefined_rate() {
        let db = testing::setup_db().await;
        let (_, rossana) = testing::seed_collector_with_user(&db, "Rossana").await;
        let mut row = testing::loan_row("LC-1", Some(rossana.id), "Abad, Ana", "03-25");
        row.outstanding_balance = Set(Decimal::ZERO);
        row.amount_collected = Set(Decimal::ZERO);
        testing::insert_loan(&db, row).await;

        let rows = performance_report(&db).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].collection_rate, None);
    }
}
