//! The authenticated actor every core operation runs as. Verification of
//! credentials happens in the external auth middleware; this crate only
//! consumes the resulting `{ id, role }` pair.

use std::fmt;
use std::str::FromStr;

use model::entities::collector;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::error::{ComputeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Supervisor,
    Collector,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Supervisor => "supervisor",
            Role::Collector => "collector",
        }
    }

    /// Admins and supervisors manage the whole office.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Supervisor)
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s {
            "admin" => Ok(Role::Admin),
            "supervisor" => Ok(Role::Supervisor),
            "collector" => Ok(Role::Collector),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated actor context passed explicitly into every operation.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: i32,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: i32, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn require_staff(&self) -> Result<()> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(ComputeError::AccessDenied)
        }
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ComputeError::AccessDenied)
        }
    }

    /// Resolves the collector profile linked to this user, if any. Only
    /// meaningful for collector-role actors.
    pub async fn collector_profile<C: ConnectionTrait>(
        &self,
        db: &C,
    ) -> Result<Option<collector::Model>> {
        Ok(collector::Entity::find()
            .filter(collector::Column::UserId.eq(self.user_id))
            .one(db)
            .await?)
    }
}
