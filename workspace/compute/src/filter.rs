//! Builds the role-scoped, parameterized loan query behind the listing
//! endpoint. All active filters combine with AND; results are always
//! ordered by borrower name.

use chrono::NaiveDate;
use model::entities::{collector, loan};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Select,
};
use tracing::{debug, instrument};

use crate::actor::{Actor, Role};
use crate::error::Result;

/// Optional field filters accepted by the loan list endpoint. Empty
/// strings count as absent.
#[derive(Debug, Default, Clone)]
pub struct LoanFilter {
    pub collector_id: Option<i32>,
    pub moving_status: Option<loan::MovingStatus>,
    pub location_status: Option<loan::LocationStatus>,
    pub month_reported: Option<String>,
    pub overdue: bool,
    pub search: Option<String>,
    pub code: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Builds the scoped loan query for `actor`.
///
/// A collector-role actor is unconditionally restricted to the loans owned
/// by their linked collector profile; any caller-supplied `collector_id`
/// is ignored for that role. A collector user without a linked profile
/// matches nothing.
#[instrument(skip(db))]
pub async fn scoped_loan_query<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    filter: &LoanFilter,
    today: NaiveDate,
) -> Result<Select<loan::Entity>> {
    let mut cond = Condition::all();

    if actor.role == Role::Collector {
        let profile = collector::Entity::find()
            .filter(collector::Column::UserId.eq(actor.user_id))
            .one(db)
            .await?;
        match profile {
            Some(own) => {
                debug!(collector_id = own.id, "scoping loan query to collector");
                cond = cond.add(loan::Column::CollectorId.eq(own.id));
            }
            None => {
                debug!(user_id = actor.user_id, "collector user has no profile");
                cond = cond.add(Expr::value(false));
            }
        }
    } else if let Some(collector_id) = filter.collector_id {
        cond = cond.add(loan::Column::CollectorId.eq(collector_id));
    }

    if let Some(status) = filter.moving_status {
        cond = cond.add(loan::Column::MovingStatus.eq(status));
    }
    if let Some(status) = filter.location_status {
        cond = cond.add(loan::Column::LocationStatus.eq(status));
    }
    if let Some(month) = present(&filter.month_reported) {
        cond = cond.add(loan::Column::MonthReported.eq(month));
    }
    if filter.overdue {
        cond = cond.add(loan::Column::DueDate.lt(today)).add(
            Expr::col(loan::Column::OutstandingBalance)
                .gt(Expr::col(loan::Column::AmountCollected)),
        );
    }
    if let Some(term) = present(&filter.search) {
        let pattern = format!("%{}%", term.to_lowercase());
        cond = cond.add(
            Condition::any()
                .add(
                    Expr::expr(Func::lower(Expr::col(loan::Column::BorrowerName)))
                        .like(pattern.clone()),
                )
                .add(Expr::expr(Func::lower(Expr::col(loan::Column::LoanCode))).like(pattern)),
        );
    }
    if let Some(code) = present(&filter.code) {
        cond = cond.add(loan::Column::LoanCode.eq(code));
    }

    Ok(loan::Entity::find()
        .filter(cond)
        .order_by_asc(loan::Column::BorrowerName))
}
