//! Loan lifecycle: create, update, collector self-service updates, delete,
//! and the per-loan change history. Every mutation runs in a transaction
//! and leaves field-level audit rows behind.

use chrono::{NaiveDate, Utc};
use common::MonthKey;
use model::entities::{collector, loan, loan_history, user};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeUtc;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{info, instrument};

use crate::actor::Actor;
use crate::audit::{self, FieldChange, push_change};
use crate::error::{ComputeError, Result};

/// Input for creating or fully updating a loan.
#[derive(Debug, Clone)]
pub struct LoanInput {
    pub loan_code: String,
    pub collector_id: Option<i32>,
    pub borrower_name: String,
    pub month_reported: String,
    pub due_date: NaiveDate,
    pub outstanding_balance: Decimal,
    pub amount_collected: Option<Decimal>,
    pub moving_status: loan::MovingStatus,
    pub location_status: loan::LocationStatus,
    pub area: Option<String>,
    pub city: Option<String>,
    pub barangay: Option<String>,
    pub full_address: Option<String>,
}

impl LoanInput {
    fn validate(&self) -> Result<()> {
        if self.loan_code.trim().is_empty() {
            return Err(ComputeError::Validation(
                "loan_code must not be empty".to_string(),
            ));
        }
        if self.borrower_name.trim().is_empty() {
            return Err(ComputeError::Validation(
                "borrower_name must not be empty".to_string(),
            ));
        }
        if MonthKey::from_report_code(&self.month_reported).is_none() {
            return Err(ComputeError::Validation(format!(
                "month_reported '{}' is not in MM-YY format",
                self.month_reported
            )));
        }
        if self.outstanding_balance < Decimal::ZERO {
            return Err(ComputeError::Validation(
                "outstanding_balance must not be negative".to_string(),
            ));
        }
        if let Some(collected) = self.amount_collected {
            if collected < Decimal::ZERO {
                return Err(ComputeError::Validation(
                    "amount_collected must not be negative".to_string(),
                ));
            }
            if collected > self.outstanding_balance {
                return Err(ComputeError::CollectedExceedsOutstanding);
            }
        }
        Ok(())
    }
}

/// One row of a loan's change history, joined with the editor's name.
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    pub id: i32,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by_name: String,
    pub changed_at: DateTimeUtc,
}

/// Staff actors see every loan; collector actors only their own. Used by
/// single-loan reads and by the payment recorder.
pub(crate) async fn ensure_loan_access<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    loan: &loan::Model,
) -> Result<()> {
    if actor.role.is_staff() {
        return Ok(());
    }
    match actor.collector_profile(db).await? {
        Some(profile) if loan.collector_id == Some(profile.id) => Ok(()),
        _ => Err(ComputeError::AccessDenied),
    }
}

/// Loads one loan, enforcing the actor's scope.
#[instrument(skip(db))]
pub async fn fetch_loan<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    loan_id: i32,
) -> Result<loan::Model> {
    let loan = loan::Entity::find_by_id(loan_id)
        .one(db)
        .await?
        .ok_or(ComputeError::LoanNotFound(loan_id))?;
    ensure_loan_access(db, actor, &loan).await?;
    Ok(loan)
}

async fn ensure_collector_exists<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    collector::Entity::find_by_id(id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or(ComputeError::CollectorNotFound(id))
}

async fn ensure_code_free<C: ConnectionTrait>(
    db: &C,
    code: &str,
    except_loan: Option<i32>,
) -> Result<()> {
    let mut query = loan::Entity::find().filter(loan::Column::LoanCode.eq(code));
    if let Some(id) = except_loan {
        query = query.filter(loan::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(ComputeError::DuplicateLoanCode(code.to_string()));
    }
    Ok(())
}

/// Creates a loan. Staff only; the collector assignment must point at an
/// existing profile and the loan code must be unused.
#[instrument(skip(db, input), fields(loan_code = %input.loan_code))]
pub async fn create_loan<C>(db: &C, actor: &Actor, input: LoanInput) -> Result<loan::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    actor.require_staff()?;
    input.validate()?;

    let created = db
        .transaction::<_, loan::Model, ComputeError>(|txn| {
            Box::pin(async move {
                if let Some(collector_id) = input.collector_id {
                    ensure_collector_exists(txn, collector_id).await?;
                }
                ensure_code_free(txn, &input.loan_code, None).await?;

                let now = Utc::now();
                let row = loan::ActiveModel {
                    loan_code: Set(input.loan_code),
                    collector_id: Set(input.collector_id),
                    borrower_name: Set(input.borrower_name),
                    month_reported: Set(input.month_reported),
                    due_date: Set(input.due_date),
                    outstanding_balance: Set(input.outstanding_balance),
                    amount_collected: Set(input.amount_collected.unwrap_or(Decimal::ZERO)),
                    moving_status: Set(input.moving_status),
                    location_status: Set(input.location_status),
                    area: Set(input.area),
                    city: Set(input.city),
                    barangay: Set(input.barangay),
                    full_address: Set(input.full_address),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
                Ok(row)
            })
        })
        .await?;

    info!(loan_id = created.id, "loan created");
    Ok(created)
}

/// Replaces every editable field of a loan. Staff only. When the input
/// omits `amount_collected` the stored counter is kept. Each field that
/// actually changed gets its own audit row.
#[instrument(skip(db, input))]
pub async fn update_loan<C>(
    db: &C,
    actor: &Actor,
    loan_id: i32,
    input: LoanInput,
) -> Result<loan::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    actor.require_staff()?;
    input.validate()?;
    let actor = *actor;

    let updated = db
        .transaction::<_, loan::Model, ComputeError>(|txn| {
            Box::pin(async move {
                let existing = loan::Entity::find_by_id(loan_id)
                    .one(txn)
                    .await?
                    .ok_or(ComputeError::LoanNotFound(loan_id))?;

                if let Some(collector_id) = input.collector_id {
                    if existing.collector_id != Some(collector_id) {
                        ensure_collector_exists(txn, collector_id).await?;
                    }
                }
                if input.loan_code != existing.loan_code {
                    ensure_code_free(txn, &input.loan_code, Some(loan_id)).await?;
                }

                let final_collected = input.amount_collected.unwrap_or(existing.amount_collected);
                if final_collected > input.outstanding_balance {
                    return Err(ComputeError::CollectedExceedsOutstanding);
                }

                let mut changes: Vec<FieldChange> = Vec::new();
                push_change(
                    &mut changes,
                    "loan_code",
                    Some(existing.loan_code.clone()),
                    Some(input.loan_code.clone()),
                );
                push_change(
                    &mut changes,
                    "collector_id",
                    existing.collector_id.map(|id| id.to_string()),
                    input.collector_id.map(|id| id.to_string()),
                );
                push_change(
                    &mut changes,
                    "borrower_name",
                    Some(existing.borrower_name.clone()),
                    Some(input.borrower_name.clone()),
                );
                push_change(
                    &mut changes,
                    "month_reported",
                    Some(existing.month_reported.clone()),
                    Some(input.month_reported.clone()),
                );
                push_change(
                    &mut changes,
                    "due_date",
                    Some(existing.due_date.to_string()),
                    Some(input.due_date.to_string()),
                );
                push_change(
                    &mut changes,
                    "outstanding_balance",
                    Some(audit::money_text(existing.outstanding_balance)),
                    Some(audit::money_text(input.outstanding_balance)),
                );
                push_change(
                    &mut changes,
                    "amount_collected",
                    Some(audit::money_text(existing.amount_collected)),
                    Some(audit::money_text(final_collected)),
                );
                push_change(
                    &mut changes,
                    "moving_status",
                    Some(existing.moving_status.to_value()),
                    Some(input.moving_status.to_value()),
                );
                push_change(
                    &mut changes,
                    "location_status",
                    Some(existing.location_status.to_value()),
                    Some(input.location_status.to_value()),
                );
                push_change(
                    &mut changes,
                    "area",
                    existing.area.clone(),
                    input.area.clone(),
                );
                push_change(
                    &mut changes,
                    "city",
                    existing.city.clone(),
                    input.city.clone(),
                );
                push_change(
                    &mut changes,
                    "barangay",
                    existing.barangay.clone(),
                    input.barangay.clone(),
                );
                push_change(
                    &mut changes,
                    "full_address",
                    existing.full_address.clone(),
                    input.full_address.clone(),
                );

                let now = Utc::now();
                let mut active: loan::ActiveModel = existing.into();
                active.loan_code = Set(input.loan_code);
                active.collector_id = Set(input.collector_id);
                active.borrower_name = Set(input.borrower_name);
                active.month_reported = Set(input.month_reported);
                active.due_date = Set(input.due_date);
                active.outstanding_balance = Set(input.outstanding_balance);
                active.amount_collected = Set(final_collected);
                active.moving_status = Set(input.moving_status);
                active.location_status = Set(input.location_status);
                active.area = Set(input.area);
                active.city = Set(input.city);
                active.barangay = Set(input.barangay);
                active.full_address = Set(input.full_address);
                if !changes.is_empty() {
                    active.updated_at = Set(now);
                }
                let row = active.update(txn).await?;

                audit::record_changes(txn, loan_id, actor.user_id, now, changes).await?;
                Ok(row)
            })
        })
        .await?;

    info!(loan_id, "loan updated");
    Ok(updated)
}

/// Collector self-service: set the collected counter on one of the actor's
/// own loans. This is the only loan field a collector-role actor may edit.
#[instrument(skip(db))]
pub async fn update_amount_collected<C>(
    db: &C,
    actor: &Actor,
    loan_id: i32,
    amount_collected: Decimal,
) -> Result<loan::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    if amount_collected < Decimal::ZERO {
        return Err(ComputeError::Validation(
            "amount_collected must not be negative".to_string(),
        ));
    }
    let actor = *actor;

    let updated = db
        .transaction::<_, loan::Model, ComputeError>(|txn| {
            Box::pin(async move {
                let existing = loan::Entity::find_by_id(loan_id)
                    .one(txn)
                    .await?
                    .ok_or(ComputeError::LoanNotFound(loan_id))?;
                ensure_loan_access(txn, &actor, &existing).await?;

                if amount_collected > existing.outstanding_balance {
                    return Err(ComputeError::CollectedExceedsOutstanding);
                }

                let mut changes: Vec<FieldChange> = Vec::new();
                push_change(
                    &mut changes,
                    "amount_collected",
                    Some(audit::money_text(existing.amount_collected)),
                    Some(audit::money_text(amount_collected)),
                );

                let now = Utc::now();
                let mut active: loan::ActiveModel = existing.into();
                active.amount_collected = Set(amount_collected);
                if !changes.is_empty() {
                    active.updated_at = Set(now);
                }
                let row = active.update(txn).await?;

                audit::record_changes(txn, loan_id, actor.user_id, now, changes).await?;
                Ok(row)
            })
        })
        .await?;

    info!(loan_id, "amount_collected updated");
    Ok(updated)
}

/// Deletes a loan and, through the cascade, its payments and history.
/// Admin only.
#[instrument(skip(db))]
pub async fn delete_loan<C: ConnectionTrait>(db: &C, actor: &Actor, loan_id: i32) -> Result<()> {
    actor.require_admin()?;
    let res = loan::Entity::delete_by_id(loan_id).exec(db).await?;
    if res.rows_affected == 0 {
        return Err(ComputeError::LoanNotFound(loan_id));
    }
    info!(loan_id, "loan deleted");
    Ok(())
}

/// Lists a loan's field-level change history, newest first, with the
/// editor's display name joined in.
#[instrument(skip(db))]
pub async fn change_history<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    loan_id: i32,
) -> Result<Vec<ChangeRecord>> {
    let loan = loan::Entity::find_by_id(loan_id)
        .one(db)
        .await?
        .ok_or(ComputeError::LoanNotFound(loan_id))?;
    ensure_loan_access(db, actor, &loan).await?;

    let rows = loan_history::Entity::find()
        .filter(loan_history::Column::LoanId.eq(loan_id))
        .find_also_related(user::Entity)
        .order_by_desc(loan_history::Column::ChangedAt)
        .order_by_desc(loan_history::Column::Id)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(h, editor)| ChangeRecord {
            id: h.id,
            field_name: h.field_name,
            old_value: h.old_value,
            new_value: h.new_value,
            changed_by_name: editor.map(|u| u.full_name).unwrap_or_default(),
            changed_at: h.changed_at,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Role;
    use crate::testing;
    use model::entities::loan::{LocationStatus, MovingStatus};

    fn input(code: &str, collector_id: Option<i32>) -> LoanInput {
        LoanInput {
            loan_code: code.to_string(),
            collector_id,
            borrower_name: "Abad, Ana".to_string(),
            month_reported: "03-25".to_string(),
            due_date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            outstanding_balance: testing::pesos(50_000),
            amount_collected: None,
            moving_status: MovingStatus::Moving,
            location_status: LocationStatus::NotLocated,
            area: None,
            city: None,
            barangay: None,
            full_address: None,
        }
    }

    #[tokio::test]
    async fn create_and_fetch() {
        let db = testing::setup_db().await;
        let admin = testing::seed_admin(&db).await;
        let actor = Actor::new(admin.id, Role::Admin);

        let created = create_loan(&db, &actor, input("LC-1", None)).await.unwrap();
        assert_eq!(created.loan_code, "LC-1");
        assert_eq!(created.amount_collected, Decimal::ZERO);

        let fetched = fetch_loan(&db, &actor, created.id).await.unwrap();
        assert_eq!(fetched.id, created.id);
    }

    #[tokio::test]
    async fn create_rejects_duplicates_bad_collectors_and_bad_input() {
        let db = testing::setup_db().await;
        let admin = testing::seed_admin(&db).await;
        let actor = Actor::new(admin.id, Role::Admin);
        create_loan(&db, &actor, input("LC-1", None)).await.unwrap();

        let err = create_loan(&db, &actor, input("LC-1", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ComputeError::DuplicateLoanCode(code) if code == "LC-1"));

        let err = create_loan(&db, &actor, input("LC-2", Some(999)))
            .await
            .unwrap_err();
        assert!(matches!(err, ComputeError::CollectorNotFound(999)));

        let mut bad = input("LC-3", None);
        bad.month_reported = "2025-03".to_string();
        let err = create_loan(&db, &actor, bad).await.unwrap_err();
        assert!(matches!(err, ComputeError::Validation(_)));

        let mut bad = input("LC-4", None);
        bad.amount_collected = Some(testing::pesos(60_000));
        let err = create_loan(&db, &actor, bad).await.unwrap_err();
        assert!(matches!(err, ComputeError::CollectedExceedsOutstanding));
    }

    #[tokio::test]
    async fn create_requires_staff() {
        let db = testing::setup_db().await;
        let (login, _) = testing::seed_collector_with_user(&db, "Rossana").await;
        let actor = Actor::new(login.id, Role::Collector);
        let err = create_loan(&db, &actor, input("LC-1", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ComputeError::AccessDenied));
    }

    #[tokio::test]
    async fn update_diffs_fields_into_audit_rows() {
        let db = testing::setup_db().await;
        let admin = testing::seed_admin(&db).await;
        let actor = Actor::new(admin.id, Role::Admin);
        let loan = create_loan(&db, &actor, input("LC-1", None)).await.unwrap();

        let mut changed = input("LC-1", None);
        changed.borrower_name = "Abad, Anna".to_string();
        changed.moving_status = MovingStatus::NotMoving;
        let updated = update_loan(&db, &actor, loan.id, changed).await.unwrap();
        assert_eq!(updated.borrower_name, "Abad, Anna");

        let history = change_history(&db, &actor, loan.id).await.unwrap();
        assert_eq!(history.len(), 2);
        let fields: Vec<&str> = history.iter().map(|h| h.field_name.as_str()).collect();
        assert!(fields.contains(&"borrower_name"));
        assert!(fields.contains(&"moving_status"));
        let name_change = history
            .iter()
            .find(|h| h.field_name == "borrower_name")
            .unwrap();
        assert_eq!(name_change.old_value.as_deref(), Some("Abad, Ana"));
        assert_eq!(name_change.new_value.as_deref(), Some("Abad, Anna"));
        assert_eq!(name_change.changed_by_name, "admin");
    }

    #[tokio::test]
    async fn resubmitting_identical_input_writes_no_audit_rows() {
        let db = testing::setup_db().await;
        let admin = testing::seed_admin(&db).await;
        let actor = Actor::new(admin.id, Role::Admin);
        let loan = create_loan(&db, &actor, input("LC-1", None)).await.unwrap();

        // Balances read back from SQLite lose their scale; an unchanged
        // amount must still diff as unchanged.
        update_loan(&db, &actor, loan.id, input("LC-1", None))
            .await
            .unwrap();

        let history = change_history(&db, &actor, loan.id).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn update_keeps_counter_when_input_omits_it() {
        let db = testing::setup_db().await;
        let admin = testing::seed_admin(&db).await;
        let actor = Actor::new(admin.id, Role::Admin);
        let loan = create_loan(&db, &actor, input("LC-1", None)).await.unwrap();
        update_amount_collected(&db, &actor, loan.id, testing::pesos(10_000))
            .await
            .unwrap();

        let mut changed = input("LC-1", None);
        changed.borrower_name = "Abad, Anna".to_string();
        let updated = update_loan(&db, &actor, loan.id, changed).await.unwrap();
        assert_eq!(updated.amount_collected, testing::pesos(10_000));
    }

    #[tokio::test]
    async fn rename_onto_existing_code_conflicts() {
        let db = testing::setup_db().await;
        let admin = testing::seed_admin(&db).await;
        let actor = Actor::new(admin.id, Role::Admin);
        create_loan(&db, &actor, input("LC-1", None)).await.unwrap();
        let second = create_loan(&db, &actor, input("LC-2", None)).await.unwrap();

        let err = update_loan(&db, &actor, second.id, input("LC-1", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ComputeError::DuplicateLoanCode(_)));

        // Re-submitting the loan's own code is not a conflict.
        update_loan(&db, &actor, second.id, input("LC-2", None))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn collector_updates_own_counter_but_not_others() {
        let db = testing::setup_db().await;
        let (rossana_login, rossana) = testing::seed_collector_with_user(&db, "Rossana").await;
        let (_, dante) = testing::seed_collector_with_user(&db, "Dante").await;
        let own = testing::seed_loan(&db, "LC-1", Some(rossana.id), "Abad, Ana", "03-25").await;
        let other = testing::seed_loan(&db, "LC-2", Some(dante.id), "Bello, Ben", "03-25").await;

        let actor = Actor::new(rossana_login.id, Role::Collector);
        let updated = update_amount_collected(&db, &actor, own.id, testing::pesos(5_000))
            .await
            .unwrap();
        assert_eq!(updated.amount_collected, testing::pesos(5_000));

        let err = update_amount_collected(&db, &actor, other.id, testing::pesos(5_000))
            .await
            .unwrap_err();
        assert!(matches!(err, ComputeError::AccessDenied));

        let err = update_amount_collected(&db, &actor, own.id, testing::pesos(60_000))
            .await
            .unwrap_err();
        assert!(matches!(err, ComputeError::CollectedExceedsOutstanding));
    }

    #[tokio::test]
    async fn delete_is_admin_only_and_checks_existence() {
        let db = testing::setup_db().await;
        let admin = testing::seed_admin(&db).await;
        let supervisor =
            testing::seed_user(&db, "supervisor", model::entities::user::UserRole::Supervisor)
                .await;
        let loan = testing::seed_loan(&db, "LC-1", None, "Abad, Ana", "03-25").await;

        let err = delete_loan(&db, &Actor::new(supervisor.id, Role::Supervisor), loan.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ComputeError::AccessDenied));

        let actor = Actor::new(admin.id, Role::Admin);
        delete_loan(&db, &actor, loan.id).await.unwrap();
        let err = delete_loan(&db, &actor, loan.id).await.unwrap_err();
        assert!(matches!(err, ComputeError::LoanNotFound(_)));
    }

    #[tokio::test]
    async fn collector_cannot_fetch_foreign_loan() {
        let db = testing::setup_db().await;
        let (login, _) = testing::seed_collector_with_user(&db, "Rossana").await;
        let (_, dante) = testing::seed_collector_with_user(&db, "Dante").await;
        let loan = testing::seed_loan(&db, "LC-1", Some(dante.id), "Abad, Ana", "03-25").await;

        let err = fetch_loan(&db, &Actor::new(login.id, Role::Collector), loan.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ComputeError::AccessDenied));
    }
}
