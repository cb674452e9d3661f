use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, Utc};
use compute::error::ComputeError;
use compute::users::{self, NewUser, UserUpdate};
use model::entities::user::{self, UserRole, UserStatus};
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;
use validator::Validate;

/// Request body for creating a user
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    /// Username (must be unique)
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub full_name: String,
    /// admin, supervisor or collector
    pub role: String,
}

/// Request body for updating a user. Omitted fields keep their value.
#[derive(Debug, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    /// admin, supervisor or collector
    pub role: Option<String>,
    /// pending, active or rejected
    pub status: Option<String>,
}

/// User response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub full_name: String,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            full_name: model.full_name,
            role: model.role.to_value(),
            status: model.status.to_value(),
            created_at: model.created_at,
        }
    }
}

fn parse_role(value: &str) -> Result<UserRole, ApiError> {
    UserRole::try_from_value(&value.to_string())
        .map_err(|_| ComputeError::Validation(format!("'{}' is not a valid role", value)).into())
}

fn parse_status(value: &str) -> Result<UserStatus, ApiError> {
    UserStatus::try_from_value(&value.to_string())
        .map_err(|_| ComputeError::Validation(format!("'{}' is not a valid status", value)).into())
}

/// List all users (admin only)
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<Vec<UserResponse>>),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_users(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    let rows = users::list_users(&state.db, &actor).await?;
    let data = rows.into_iter().map(UserResponse::from).collect();

    Ok(Json(ApiResponse {
        data,
        message: "Users retrieved successfully".to_string(),
        success: true,
    }))
}

/// Create a user in pending status (admin only)
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn create_user(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateUserRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let role = parse_role(&request.role)?;
    let created = users::create_user(
        &state.db,
        &actor,
        NewUser {
            username: request.username,
            full_name: request.full_name,
            role,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: UserResponse::from(created),
            message: "User created successfully".to_string(),
            success: true,
        }),
    ))
}

/// Update a user's name, role or status (admin only)
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated successfully", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn update_user(
    CurrentUser(actor): CurrentUser,
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateUserRequest>>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let update = UserUpdate {
        full_name: request.full_name,
        role: request.role.as_deref().map(parse_role).transpose()?,
        status: request.status.as_deref().map(parse_status).transpose()?,
    };
    let updated = users::update_user(&state.db, &actor, user_id, update).await?;

    Ok(Json(ApiResponse {
        data: UserResponse::from(updated),
        message: "User updated successfully".to_string(),
        success: true,
    }))
}
