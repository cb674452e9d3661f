use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Username).unique_key())
                    .col(string(Users::FullName))
                    .col(string_len(Users::Role, 20))
                    .col(string_len(Users::Status, 20))
                    .col(timestamp_with_time_zone(Users::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // Create collectors table
        manager
            .create_table(
                Table::create()
                    .table(Collectors::Table)
                    .if_not_exists()
                    .col(pk_auto(Collectors::Id))
                    .col(string(Collectors::Name))
                    .col(integer_null(Collectors::UserId).unique_key())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_collector_user")
                            .from(Collectors::Table, Collectors::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create loans table
        manager
            .create_table(
                Table::create()
                    .table(Loans::Table)
                    .if_not_exists()
                    .col(pk_auto(Loans::Id))
                    .col(string(Loans::LoanCode).unique_key())
                    .col(integer_null(Loans::CollectorId))
                    .col(string(Loans::BorrowerName))
                    // Literal "MM-YY" report code; compared only after
                    // parsing into a structured month key.
                    .col(string_len(Loans::MonthReported, 5))
                    .col(date(Loans::DueDate))
                    .col(decimal_len(Loans::OutstandingBalance, 16, 2))
                    .col(decimal_len(Loans::AmountCollected, 16, 2))
                    .col(string_len(Loans::MovingStatus, 10))
                    .col(string_len(Loans::LocationStatus, 2))
                    .col(string_null(Loans::Area))
                    .col(string_null(Loans::City))
                    .col(string_null(Loans::Barangay))
                    .col(string_null(Loans::FullAddress))
                    .col(timestamp_with_time_zone(Loans::CreatedAt))
                    .col(timestamp_with_time_zone(Loans::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_loan_collector")
                            .from(Loans::Table, Loans::CollectorId)
                            .to(Collectors::Table, Collectors::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create payments table
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(pk_auto(Payments::Id))
                    .col(integer(Payments::LoanId))
                    .col(decimal_len(Payments::Amount, 16, 2))
                    .col(timestamp_with_time_zone(Payments::PaymentDate))
                    .col(integer(Payments::RecordedBy))
                    .col(timestamp_with_time_zone(Payments::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_loan")
                            .from(Payments::Table, Payments::LoanId)
                            .to(Loans::Table, Loans::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_user")
                            .from(Payments::Table, Payments::RecordedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create loan_history table (field-level audit trail)
        manager
            .create_table(
                Table::create()
                    .table(LoanHistory::Table)
                    .if_not_exists()
                    .col(pk_auto(LoanHistory::Id))
                    .col(integer(LoanHistory::LoanId))
                    .col(string(LoanHistory::FieldName))
                    .col(string_null(LoanHistory::OldValue))
                    .col(string_null(LoanHistory::NewValue))
                    .col(integer(LoanHistory::ChangedBy))
                    .col(timestamp_with_time_zone(LoanHistory::ChangedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_loan_history_loan")
                            .from(LoanHistory::Table, LoanHistory::LoanId)
                            .to(Loans::Table, Loans::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_loan_history_user")
                            .from(LoanHistory::Table, LoanHistory::ChangedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Listing is always ordered by borrower name; reports group by
        // collector.
        manager
            .create_index(
                Index::create()
                    .name("idx_loans_borrower_name")
                    .table(Loans::Table)
                    .col(Loans::BorrowerName)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_loans_collector_id")
                    .table(Loans::Table)
                    .col(Loans::CollectorId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_payments_loan_id")
                    .table(Payments::Table)
                    .col(Payments::LoanId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LoanHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Loans::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Collectors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    FullName,
    Role,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Collectors {
    Table,
    Id,
    Name,
    UserId,
}

#[derive(DeriveIden)]
enum Loans {
    Table,
    Id,
    LoanCode,
    CollectorId,
    BorrowerName,
    MonthReported,
    DueDate,
    OutstandingBalance,
    AmountCollected,
    MovingStatus,
    LocationStatus,
    Area,
    City,
    Barangay,
    FullAddress,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Payments {
    Table,
    Id,
    LoanId,
    Amount,
    PaymentDate,
    RecordedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum LoanHistory {
    Table,
    Id,
    LoanId,
    FieldName,
    OldValue,
    NewValue,
    ChangedBy,
    ChangedAt,
}
