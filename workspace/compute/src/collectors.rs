//! Collector profile management. Deletion is blocked while loans are still
//! assigned, since the loan FK restricts it anyway; the domain error names
//! the collector and the count so the caller can say why.

use model::entities::{collector, loan, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::{info, instrument};

use crate::actor::Actor;
use crate::error::{ComputeError, Result};

#[derive(Debug, Clone)]
pub struct CollectorInput {
    pub name: String,
    /// Optional linked login user. At most one collector per user.
    pub user_id: Option<i32>,
}

impl CollectorInput {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ComputeError::Validation(
                "collector name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A collector with its current assigned-loan count.
#[derive(Debug, Clone)]
pub struct CollectorSummary {
    pub id: i32,
    pub name: String,
    pub user_id: Option<i32>,
    pub assigned_loans: u64,
}

/// Lists collectors by name with their assigned-loan counts.
#[instrument(skip(db))]
pub async fn list_collectors<C: ConnectionTrait>(db: &C) -> Result<Vec<CollectorSummary>> {
    let collectors = collector::Entity::find()
        .order_by_asc(collector::Column::Name)
        .all(db)
        .await?;

    let mut rows = Vec::with_capacity(collectors.len());
    for c in collectors {
        let assigned_loans = loan::Entity::find()
            .filter(loan::Column::CollectorId.eq(c.id))
            .count(db)
            .await?;
        rows.push(CollectorSummary {
            id: c.id,
            name: c.name,
            user_id: c.user_id,
            assigned_loans,
        });
    }
    Ok(rows)
}

async fn ensure_user_exists<C: ConnectionTrait>(db: &C, id: i32) -> Result<()> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or(ComputeError::UserNotFound(id))
}

#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_collector<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    input: CollectorInput,
) -> Result<collector::Model> {
    actor.require_staff()?;
    input.validate()?;
    if let Some(user_id) = input.user_id {
        ensure_user_exists(db, user_id).await?;
    }

    let created = collector::ActiveModel {
        name: Set(input.name),
        user_id: Set(input.user_id),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(collector_id = created.id, "collector created");
    Ok(created)
}

#[instrument(skip(db, input))]
pub async fn update_collector<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    collector_id: i32,
    input: CollectorInput,
) -> Result<collector::Model> {
    actor.require_staff()?;
    input.validate()?;

    let existing = collector::Entity::find_by_id(collector_id)
        .one(db)
        .await?
        .ok_or(ComputeError::CollectorNotFound(collector_id))?;
    if let Some(user_id) = input.user_id {
        if existing.user_id != Some(user_id) {
            ensure_user_exists(db, user_id).await?;
        }
    }

    let mut active: collector::ActiveModel = existing.into();
    active.name = Set(input.name);
    active.user_id = Set(input.user_id);
    Ok(active.update(db).await?)
}

/// Deletes a collector, refusing while any loan is still assigned.
#[instrument(skip(db))]
pub async fn delete_collector<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    collector_id: i32,
) -> Result<()> {
    actor.require_staff()?;

    let existing = collector::Entity::find_by_id(collector_id)
        .one(db)
        .await?
        .ok_or(ComputeError::CollectorNotFound(collector_id))?;
    let loans = loan::Entity::find()
        .filter(loan::Column::CollectorId.eq(collector_id))
        .count(db)
        .await?;
    if loans > 0 {
        return Err(ComputeError::CollectorHasLoans {
            name: existing.name,
            loans,
        });
    }

    collector::Entity::delete_by_id(collector_id).exec(db).await?;
    info!(collector_id, "collector deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Role;
    use crate::testing;

    #[tokio::test]
    async fn create_list_update_delete() {
        let db = testing::setup_db().await;
        let admin = testing::seed_admin(&db).await;
        let actor = Actor::new(admin.id, Role::Admin);

        let created = create_collector(
            &db,
            &actor,
            CollectorInput {
                name: "Rossana".to_string(),
                user_id: None,
            },
        )
        .await
        .unwrap();

        let listed = list_collectors(&db).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Rossana");
        assert_eq!(listed[0].assigned_loans, 0);

        update_collector(
            &db,
            &actor,
            created.id,
            CollectorInput {
                name: "Rossana D.".to_string(),
                user_id: None,
            },
        )
        .await
        .unwrap();

        delete_collector(&db, &actor, created.id).await.unwrap();
        assert!(list_collectors(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_blocked_while_loans_assigned() {
        let db = testing::setup_db().await;
        let admin = testing::seed_admin(&db).await;
        let actor = Actor::new(admin.id, Role::Admin);
        let (_, rossana) = testing::seed_collector_with_user(&db, "Rossana").await;
        testing::seed_loan(&db, "LC-1", Some(rossana.id), "Abad, Ana", "03-25").await;
        testing::seed_loan(&db, "LC-2", Some(rossana.id), "Bello, Ben", "03-25").await;

        let err = delete_collector(&db, &actor, rossana.id).await.unwrap_err();
        match err {
            ComputeError::CollectorHasLoans { name, loans } => {
                assert_eq!(name, "Rossana");
                assert_eq!(loans, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn collector_role_cannot_manage_collectors() {
        let db = testing::setup_db().await;
        let (login, _) = testing::seed_collector_with_user(&db, "Rossana").await;
        let actor = Actor::new(login.id, Role::Collector);
        let err = create_collector(
            &db,
            &actor,
            CollectorInput {
                name: "Dante".to_string(),
                user_id: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ComputeError::AccessDenied));
    }

    #[tokio::test]
    async fn linking_unknown_user_fails() {
        let db = testing::setup_db().await;
        let admin = testing::seed_admin(&db).await;
        let actor = Actor::new(admin.id, Role::Admin);
        let err = create_collector(
            &db,
            &actor,
            CollectorInput {
                name: "Dante".to_string(),
                user_id: Some(999),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ComputeError::UserNotFound(999)));
    }
}
