use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use common::money;
use compute::payments::{self, NewPayment};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

/// Request body for recording a payment
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreatePaymentRequest {
    /// Payment amount; must be positive and not exceed the running balance
    pub amount: Decimal,
    /// When the payment happened; defaults to now
    pub payment_date: Option<DateTime<Utc>>,
}

/// Payment response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub id: i32,
    pub loan_id: i32,
    pub amount: Decimal,
    pub payment_date: DateTime<Utc>,
    pub recorded_by_name: String,
    pub borrower_name: String,
}

/// List a loan's payments, newest first
#[utoipa::path(
    get,
    path = "/api/v1/loans/{loan_id}/payments",
    tag = "payments",
    params(
        ("loan_id" = i32, Path, description = "Loan ID"),
    ),
    responses(
        (status = 200, description = "Payments retrieved successfully", body = ApiResponse<Vec<PaymentResponse>>),
        (status = 403, description = "Loan belongs to another collector", body = ErrorResponse),
        (status = 404, description = "Loan not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_payments(
    CurrentUser(actor): CurrentUser,
    Path(loan_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<PaymentResponse>>>, ApiError> {
    let records = payments::payment_history(&state.db, &actor, loan_id).await?;
    let data = records
        .into_iter()
        .map(|r| PaymentResponse {
            id: r.id,
            loan_id,
            amount: money(r.amount),
            payment_date: r.payment_date,
            recorded_by_name: r.recorded_by_name,
            borrower_name: r.borrower_name,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        message: "Payments retrieved successfully".to_string(),
        success: true,
    }))
}

/// Record a payment against a loan
#[utoipa::path(
    post,
    path = "/api/v1/loans/{loan_id}/payments",
    tag = "payments",
    params(
        ("loan_id" = i32, Path, description = "Loan ID"),
    ),
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment recorded successfully", body = ApiResponse<PaymentResponse>),
        (status = 400, description = "Invalid amount", body = ErrorResponse),
        (status = 404, description = "Loan not found", body = ErrorResponse),
        (status = 422, description = "Payment exceeds the running balance", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn create_payment(
    CurrentUser(actor): CurrentUser,
    Path(loan_id): Path<i32>,
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentResponse>>), ApiError> {
    let recorded = payments::record_payment(
        &state.db,
        &actor,
        NewPayment {
            loan_id,
            amount: request.amount,
            payment_date: request.payment_date,
        },
    )
    .await?;
    state.cache.invalidate_all();

    // Re-read through the history to pick up the joined display names.
    let latest = payments::payment_history(&state.db, &actor, loan_id)
        .await?
        .into_iter()
        .find(|r| r.id == recorded.id);
    let (recorded_by_name, borrower_name) = latest
        .map(|r| (r.recorded_by_name, r.borrower_name))
        .unwrap_or_default();

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: PaymentResponse {
                id: recorded.id,
                loan_id,
                amount: money(recorded.amount),
                payment_date: recorded.payment_date,
                recorded_by_name,
                borrower_name,
            },
            message: "Payment recorded successfully".to_string(),
            success: true,
        }),
    ))
}
