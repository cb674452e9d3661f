use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// Payment-activity classification of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum MovingStatus {
    #[sea_orm(string_value = "Moving")]
    Moving,
    /// Not moving.
    #[sea_orm(string_value = "NM")]
    NotMoving,
    /// Not moving since release.
    #[sea_orm(string_value = "NMSR")]
    NotMovingSinceRelease,
    #[sea_orm(string_value = "Paid")]
    Paid,
}

/// Whether the borrower has been located in the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(2))")]
pub enum LocationStatus {
    #[sea_orm(string_value = "L")]
    Located,
    #[sea_orm(string_value = "NL")]
    NotLocated,
}

/// A past-due loan account under collection.
///
/// `amount_collected` is a running counter maintained by the payment
/// recorder; it must never exceed `outstanding_balance`. The running
/// balance is derived, never stored.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// User-facing loan code, unique across the office.
    #[sea_orm(unique)]
    pub loan_code: String,
    /// Owning collector; `None` renders as "Unassigned" in reports.
    pub collector_id: Option<i32>,
    pub borrower_name: String,
    /// Literal `MM-YY` report code, e.g. `"01-26"`. Parse with
    /// `common::MonthKey` before comparing or bucketing.
    pub month_reported: String,
    pub due_date: NaiveDate,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub outstanding_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub amount_collected: Decimal,
    pub moving_status: MovingStatus,
    pub location_status: LocationStatus,
    pub area: Option<String>,
    pub city: Option<String>,
    pub barangay: Option<String>,
    pub full_address: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Outstanding balance minus the collected counter. Non-negative as
    /// long as the payment recorder's invariant holds.
    pub fn running_balance(&self) -> Decimal {
        self.outstanding_balance - self.amount_collected
    }

    /// Whole days past due as of `today`; zero or negative means current.
    pub fn days_past_due(&self, today: NaiveDate) -> i64 {
        (today - self.due_date).num_days()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::collector::Entity",
        from = "Column::CollectorId",
        to = "super::collector::Column::Id",
        on_delete = "Restrict"
    )]
    Collector,
    #[sea_orm(has_many = "super::payment::Entity")]
    Payment,
    #[sea_orm(has_many = "super::loan_history::Entity")]
    LoanHistory,
}

impl Related<super::collector::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Collector.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl Related<super::loan_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoanHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
