//! Shared fixtures for the compute tests: an in-memory database with the
//! real migrations applied, plus seed helpers for the common shapes.

use chrono::{NaiveDate, Utc};
use migration::{Migrator, MigratorTrait};
use model::entities::{collector, loan, payment, user};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};

pub(crate) async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");
    db.execute_unprepared("PRAGMA foreign_keys = ON;")
        .await
        .expect("Failed to enable foreign keys");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub(crate) async fn seed_user(
    db: &DatabaseConnection,
    username: &str,
    role: user::UserRole,
) -> user::Model {
    user::ActiveModel {
        username: Set(username.to_string()),
        full_name: Set(username.to_string()),
        role: Set(role),
        status: Set(user::UserStatus::Active),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed user")
}

pub(crate) async fn seed_admin(db: &DatabaseConnection) -> user::Model {
    seed_user(db, "admin", user::UserRole::Admin).await
}

/// Creates a collector together with its linked login user.
pub(crate) async fn seed_collector_with_user(
    db: &DatabaseConnection,
    name: &str,
) -> (user::Model, collector::Model) {
    let login = seed_user(db, &name.to_lowercase(), user::UserRole::Collector).await;
    let profile = collector::ActiveModel {
        name: Set(name.to_string()),
        user_id: Set(Some(login.id)),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed collector");
    (login, profile)
}

/// A loan ActiveModel with sensible defaults; tweak fields before calling
/// [`insert_loan`].
pub(crate) fn loan_row(
    code: &str,
    collector_id: Option<i32>,
    borrower: &str,
    month_reported: &str,
) -> loan::ActiveModel {
    let now = Utc::now();
    loan::ActiveModel {
        loan_code: Set(code.to_string()),
        collector_id: Set(collector_id),
        borrower_name: Set(borrower.to_string()),
        month_reported: Set(month_reported.to_string()),
        due_date: Set(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()),
        outstanding_balance: Set(Decimal::new(50_000_00, 2)),
        amount_collected: Set(Decimal::ZERO),
        moving_status: Set(loan::MovingStatus::Moving),
        location_status: Set(loan::LocationStatus::NotLocated),
        area: Set(None),
        city: Set(None),
        barangay: Set(None),
        full_address: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
}

pub(crate) async fn insert_loan(db: &DatabaseConnection, row: loan::ActiveModel) -> loan::Model {
    row.insert(db).await.expect("Failed to seed loan")
}

pub(crate) async fn seed_loan(
    db: &DatabaseConnection,
    code: &str,
    collector_id: Option<i32>,
    borrower: &str,
    month_reported: &str,
) -> loan::Model {
    insert_loan(db, loan_row(code, collector_id, borrower, month_reported)).await
}

pub(crate) async fn seed_payment(
    db: &DatabaseConnection,
    loan_id: i32,
    amount: Decimal,
    paid_on: NaiveDate,
    recorded_by: i32,
) -> payment::Model {
    let paid_at = paid_on.and_hms_opt(12, 0, 0).unwrap().and_utc();
    payment::ActiveModel {
        loan_id: Set(loan_id),
        amount: Set(amount),
        payment_date: Set(paid_at),
        recorded_by: Set(recorded_by),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed payment")
}

pub(crate) fn pesos(units: i64) -> Decimal {
    Decimal::new(units * 100, 2)
}
