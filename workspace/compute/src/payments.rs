//! The payment recorder: inserting a payment row and bumping the loan's
//! collected counter as one unit of work.

use chrono::Utc;
use model::entities::{loan, payment, user};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeUtc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{info, instrument};

use crate::actor::Actor;
use crate::audit::{self, FieldChange};
use crate::error::{ComputeError, Result};
use crate::loans::ensure_loan_access;

/// Input to [`record_payment`]. The payment date defaults to the
/// submission instant when omitted.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub loan_id: i32,
    pub amount: Decimal,
    pub payment_date: Option<DateTimeUtc>,
}

/// A payment joined with its recorder and borrower, for display.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub id: i32,
    pub amount: Decimal,
    pub payment_date: DateTimeUtc,
    pub recorded_by_name: String,
    pub borrower_name: String,
}

/// Records a payment atomically: the balance check, the payment insert,
/// the counter increment and the audit row all commit or roll back
/// together.
///
/// The not-to-exceed check runs against the loan row as read inside the
/// transaction. On Postgres that read takes a row lock, so two concurrent
/// payments whose combined total exceeds the balance resolve to exactly
/// one winner; SQLite serializes the writing transactions themselves.
#[instrument(skip(db))]
pub async fn record_payment<C>(db: &C, actor: &Actor, input: NewPayment) -> Result<payment::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    if input.amount <= Decimal::ZERO {
        return Err(ComputeError::Validation(
            "payment amount must be positive".to_string(),
        ));
    }

    let actor = *actor;
    let row = db
        .transaction::<_, payment::Model, ComputeError>(|txn| {
            Box::pin(async move {
                let mut lookup = loan::Entity::find_by_id(input.loan_id);
                // SQLite has no row locks; its writers serialize on the
                // connection instead.
                if txn.get_database_backend() == DbBackend::Postgres {
                    lookup = lookup.lock_exclusive();
                }
                let before = lookup
                    .one(txn)
                    .await?
                    .ok_or(ComputeError::LoanNotFound(input.loan_id))?;
                ensure_loan_access(txn, &actor, &before).await?;

                let remaining = before.running_balance();
                if input.amount > remaining {
                    return Err(ComputeError::PaymentExceedsBalance {
                        attempted: input.amount,
                        remaining,
                    });
                }

                let now = Utc::now();
                let updated_rows = loan::Entity::update_many()
                    .col_expr(
                        loan::Column::AmountCollected,
                        Expr::col(loan::Column::AmountCollected).add(Expr::val(input.amount)),
                    )
                    .col_expr(loan::Column::UpdatedAt, Expr::val(now).into())
                    .filter(loan::Column::Id.eq(input.loan_id))
                    .exec(txn)
                    .await?
                    .rows_affected;
                if updated_rows == 0 {
                    return Err(ComputeError::LoanNotFound(input.loan_id));
                }

                let after = loan::Entity::find_by_id(input.loan_id)
                    .one(txn)
                    .await?
                    .ok_or(ComputeError::LoanNotFound(input.loan_id))?;

                let row = payment::ActiveModel {
                    loan_id: Set(input.loan_id),
                    amount: Set(input.amount),
                    payment_date: Set(input.payment_date.unwrap_or(now)),
                    recorded_by: Set(actor.user_id),
                    created_at: Set(now),
                    ..Default::default()
                }
                .insert(txn)
                .await?;

                audit::record_changes(
                    txn,
                    input.loan_id,
                    actor.user_id,
                    now,
                    vec![FieldChange {
                        field: "amount_collected",
                        old: Some(audit::money_text(before.amount_collected)),
                        new: Some(audit::money_text(after.amount_collected)),
                    }],
                )
                .await?;

                Ok(row)
            })
        })
        .await?;

    info!(
        loan_id = input.loan_id,
        payment_id = row.id,
        "payment recorded"
    );
    Ok(row)
}

/// Lists a loan's payments, newest first. Collector-role actors may only
/// see their own loans' payments.
#[instrument(skip(db))]
pub async fn payment_history<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    loan_id: i32,
) -> Result<Vec<PaymentRecord>> {
    let loan = loan::Entity::find_by_id(loan_id)
        .one(db)
        .await?
        .ok_or(ComputeError::LoanNotFound(loan_id))?;
    ensure_loan_access(db, actor, &loan).await?;

    let payments = payment::Entity::find()
        .filter(payment::Column::LoanId.eq(loan_id))
        .find_also_related(user::Entity)
        .order_by_desc(payment::Column::PaymentDate)
        .all(db)
        .await?;

    Ok(payments
        .into_iter()
        .map(|(p, recorder)| PaymentRecord {
            id: p.id,
            amount: p.amount,
            payment_date: p.payment_date,
            recorded_by_name: recorder.map(|u| u.full_name).unwrap_or_default(),
            borrower_name: loan.borrower_name.clone(),
        })
        .collect())
}
