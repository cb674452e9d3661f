use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use compute::collectors::{self, CollectorInput};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;
use validator::Validate;

/// Request body for creating or updating a collector
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct CollectorRequest {
    /// Collector display name
    #[validate(length(min = 1))]
    pub name: String,
    /// Linked login user, if any
    pub user_id: Option<i32>,
}

/// Collector response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CollectorResponse {
    pub id: i32,
    pub name: String,
    pub user_id: Option<i32>,
    /// Number of loans currently assigned
    pub assigned_loans: u64,
}

/// List collectors with their assigned-loan counts
#[utoipa::path(
    get,
    path = "/api/v1/collectors",
    tag = "collectors",
    responses(
        (status = 200, description = "Collectors retrieved successfully", body = ApiResponse<Vec<CollectorResponse>>),
        (status = 401, description = "Missing actor identity", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_collectors(
    CurrentUser(_actor): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CollectorResponse>>>, ApiError> {
    let rows = collectors::list_collectors(&state.db).await?;
    let data = rows
        .into_iter()
        .map(|c| CollectorResponse {
            id: c.id,
            name: c.name,
            user_id: c.user_id,
            assigned_loans: c.assigned_loans,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        message: "Collectors retrieved successfully".to_string(),
        success: true,
    }))
}

/// Create a collector
#[utoipa::path(
    post,
    path = "/api/v1/collectors",
    tag = "collectors",
    request_body = CollectorRequest,
    responses(
        (status = 201, description = "Collector created successfully", body = ApiResponse<CollectorResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Caller is not staff", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn create_collector(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CollectorRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<CollectorResponse>>), ApiError> {
    let created = collectors::create_collector(
        &state.db,
        &actor,
        CollectorInput {
            name: request.name,
            user_id: request.user_id,
        },
    )
    .await?;
    state.cache.invalidate_all();

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: CollectorResponse {
                id: created.id,
                name: created.name,
                user_id: created.user_id,
                assigned_loans: 0,
            },
            message: "Collector created successfully".to_string(),
            success: true,
        }),
    ))
}

/// Update a collector
#[utoipa::path(
    put,
    path = "/api/v1/collectors/{collector_id}",
    tag = "collectors",
    params(
        ("collector_id" = i32, Path, description = "Collector ID"),
    ),
    request_body = CollectorRequest,
    responses(
        (status = 200, description = "Collector updated successfully", body = ApiResponse<CollectorResponse>),
        (status = 404, description = "Collector not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn update_collector(
    CurrentUser(actor): CurrentUser,
    Path(collector_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CollectorRequest>>,
) -> Result<Json<ApiResponse<CollectorResponse>>, ApiError> {
    let updated = collectors::update_collector(
        &state.db,
        &actor,
        collector_id,
        CollectorInput {
            name: request.name,
            user_id: request.user_id,
        },
    )
    .await?;
    state.cache.invalidate_all();

    Ok(Json(ApiResponse {
        data: CollectorResponse {
            id: updated.id,
            name: updated.name,
            user_id: updated.user_id,
            assigned_loans: 0,
        },
        message: "Collector updated successfully".to_string(),
        success: true,
    }))
}

/// Delete a collector
///
/// Refused while the collector still has assigned loans.
#[utoipa::path(
    delete,
    path = "/api/v1/collectors/{collector_id}",
    tag = "collectors",
    params(
        ("collector_id" = i32, Path, description = "Collector ID"),
    ),
    responses(
        (status = 200, description = "Collector deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Collector not found", body = ErrorResponse),
        (status = 422, description = "Collector still has assigned loans", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_collector(
    CurrentUser(actor): CurrentUser,
    Path(collector_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    collectors::delete_collector(&state.db, &actor, collector_id).await?;
    state.cache.invalidate_all();

    Ok(Json(ApiResponse {
        data: format!("Collector {} deleted", collector_id),
        message: "Collector deleted successfully".to_string(),
        success: true,
    }))
}
