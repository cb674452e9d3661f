//! Field-level audit trail for loans. The acting user travels as an
//! explicit parameter into the mutating transaction; there is no ambient
//! "current actor" session state.

use model::entities::loan_history;
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeUtc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};

use crate::error::Result;

/// Renders a money amount as an audit value at a fixed two decimals.
/// Values read back from SQLite lose their stored scale, so diffing on
/// plain `to_string` would record changes that never happened.
pub(crate) fn money_text(value: Decimal) -> String {
    format!("{value:.2}")
}

/// One field-level change, old value to new value.
#[derive(Debug, Clone)]
pub struct FieldChange {
    pub field: &'static str,
    pub old: Option<String>,
    pub new: Option<String>,
}

/// Appends a change to the list if the value actually changed.
pub fn push_change(
    changes: &mut Vec<FieldChange>,
    field: &'static str,
    old: Option<String>,
    new: Option<String>,
) {
    if old != new {
        changes.push(FieldChange { field, old, new });
    }
}

/// Writes one `loan_history` row per change. Call inside the transaction
/// that performs the mutation itself.
pub async fn record_changes<C: ConnectionTrait>(
    db: &C,
    loan_id: i32,
    changed_by: i32,
    changed_at: DateTimeUtc,
    changes: Vec<FieldChange>,
) -> Result<()> {
    for change in changes {
        loan_history::ActiveModel {
            loan_id: Set(loan_id),
            field_name: Set(change.field.to_string()),
            old_value: Set(change.old),
            new_value: Set(change.new),
            changed_by: Set(changed_by),
            changed_at: Set(changed_at),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}
