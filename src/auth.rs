//! Actor extraction. Credential verification lives in the upstream auth
//! middleware; by the time a request reaches this service it carries the
//! authenticated identity in `x-user-id` / `x-user-role` headers.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use compute::actor::{Actor, Role};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated actor of the current request.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Actor);

fn header_value<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("Missing or invalid {} header", name)))
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id: i32 = header_value(parts, USER_ID_HEADER)?
            .parse()
            .map_err(|_| {
                ApiError::Unauthorized(format!("Missing or invalid {} header", USER_ID_HEADER))
            })?;
        let role: Role = header_value(parts, USER_ROLE_HEADER)?
            .parse()
            .map_err(|_| {
                ApiError::Unauthorized(format!("Missing or invalid {} header", USER_ROLE_HEADER))
            })?;
        Ok(CurrentUser(Actor::new(user_id, role)))
    }
}
