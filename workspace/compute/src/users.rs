//! User administration: account creation, the pending/active/rejected
//! approval flow, and role changes. Admin only throughout.

use chrono::Utc;
use model::entities::user;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{info, instrument};

use crate::actor::Actor;
use crate::error::{ComputeError, Result};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub full_name: String,
    pub role: user::UserRole,
}

/// Partial update; `None` fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub role: Option<user::UserRole>,
    pub status: Option<user::UserStatus>,
}

#[instrument(skip(db))]
pub async fn list_users<C: ConnectionTrait>(db: &C, actor: &Actor) -> Result<Vec<user::Model>> {
    actor.require_admin()?;
    Ok(user::Entity::find()
        .order_by_asc(user::Column::Username)
        .all(db)
        .await?)
}

/// Creates an account in `pending` status, awaiting approval.
#[instrument(skip(db, input), fields(username = %input.username))]
pub async fn create_user<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    input: NewUser,
) -> Result<user::Model> {
    actor.require_admin()?;
    if input.username.trim().is_empty() {
        return Err(ComputeError::Validation(
            "username must not be empty".to_string(),
        ));
    }
    if input.full_name.trim().is_empty() {
        return Err(ComputeError::Validation(
            "full_name must not be empty".to_string(),
        ));
    }
    let taken = user::Entity::find()
        .filter(user::Column::Username.eq(&input.username))
        .one(db)
        .await?
        .is_some();
    if taken {
        return Err(ComputeError::DuplicateUsername(input.username));
    }

    let created = user::ActiveModel {
        username: Set(input.username),
        full_name: Set(input.full_name),
        role: Set(input.role),
        status: Set(user::UserStatus::Pending),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(user_id = created.id, "user created");
    Ok(created)
}

/// Updates name, role or status. Approving a pending account is a status
/// update to `active`.
#[instrument(skip(db, update))]
pub async fn update_user<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    user_id: i32,
    update: UserUpdate,
) -> Result<user::Model> {
    actor.require_admin()?;
    let existing = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(ComputeError::UserNotFound(user_id))?;

    let mut active: user::ActiveModel = existing.into();
    if let Some(full_name) = update.full_name {
        if full_name.trim().is_empty() {
            return Err(ComputeError::Validation(
                "full_name must not be empty".to_string(),
            ));
        }
        active.full_name = Set(full_name);
    }
    if let Some(role) = update.role {
        active.role = Set(role);
    }
    if let Some(status) = update.status {
        active.status = Set(status);
    }
    Ok(active.update(db).await?)
}
