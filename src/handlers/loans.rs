use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{NaiveDate, Utc};
use common::{money, MonthKey};
use compute::actor::Role;
use compute::date_range::month_reported_in_range;
use compute::error::ComputeError;
use compute::filter::{scoped_loan_query, LoanFilter};
use compute::loans::{self, LoanInput};
use model::entities::{collector, loan};
use rust_decimal::Decimal;
use sea_orm::{ActiveEnum, EntityTrait};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

fn validate_month_reported(value: &str) -> Result<(), ValidationError> {
    if MonthKey::from_report_code(value).is_none() {
        return Err(ValidationError::new("month_reported"));
    }
    Ok(())
}

/// Deserializes a nullable update field so that "absent" (keep the stored
/// value) and an explicit `null` (clear the value) stay distinguishable.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

/// Query parameters for the loan list endpoint
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoanListQuery {
    /// Filter by collector (ignored for collector-role callers)
    pub collector_id: Option<i32>,
    /// Filter by moving status (Moving, NM, NMSR, Paid)
    pub moving_status: Option<String>,
    /// Filter by location status (L, NL)
    pub location_status: Option<String>,
    /// Exact month-reported code (MM-YY)
    pub month_reported: Option<String>,
    /// Only loans past due with a positive running balance
    pub overdue: Option<bool>,
    /// Case-insensitive substring match on borrower name or loan code
    pub search: Option<String>,
    /// Exact loan code lookup
    pub code: Option<String>,
    /// Month-reported range start (YYYY-MM-DD, day ignored)
    pub start_date: Option<NaiveDate>,
    /// Month-reported range end (YYYY-MM-DD, day ignored)
    pub end_date: Option<NaiveDate>,
}

/// Request body for creating a loan
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateLoanRequest {
    /// Loan code (must be unique)
    #[validate(length(min = 1))]
    pub loan_code: String,
    /// Assigned collector ID
    pub collector_id: Option<i32>,
    #[validate(length(min = 1))]
    pub borrower_name: String,
    /// Month the loan was reported, MM-YY
    #[validate(custom(function = "validate_month_reported"))]
    pub month_reported: String,
    pub due_date: NaiveDate,
    pub outstanding_balance: Decimal,
    pub amount_collected: Option<Decimal>,
    /// Moving, NM, NMSR or Paid
    pub moving_status: String,
    /// L or NL
    pub location_status: String,
    pub area: Option<String>,
    pub city: Option<String>,
    pub barangay: Option<String>,
    pub full_address: Option<String>,
}

/// Request body for updating a loan. Omitted fields keep their stored
/// value; nullable fields clear on an explicit `null`. Collector-role
/// callers may only supply `amount_collected`.
#[derive(Debug, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateLoanRequest {
    pub loan_code: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub collector_id: Option<Option<i32>>,
    pub borrower_name: Option<String>,
    #[validate(custom(function = "validate_month_reported"))]
    pub month_reported: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub outstanding_balance: Option<Decimal>,
    pub amount_collected: Option<Decimal>,
    pub moving_status: Option<String>,
    pub location_status: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub area: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub barangay: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub full_address: Option<Option<String>>,
}

/// Loan response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoanResponse {
    pub id: i32,
    pub loan_code: String,
    pub collector_id: Option<i32>,
    pub collector_name: Option<String>,
    pub borrower_name: String,
    pub month_reported: String,
    pub due_date: NaiveDate,
    pub outstanding_balance: Decimal,
    pub amount_collected: Decimal,
    /// Derived: outstanding_balance - amount_collected
    pub running_balance: Decimal,
    pub moving_status: String,
    pub location_status: String,
    pub area: Option<String>,
    pub city: Option<String>,
    pub barangay: Option<String>,
    pub full_address: Option<String>,
}

impl LoanResponse {
    fn from_model(model: loan::Model, collector_name: Option<String>) -> Self {
        Self {
            id: model.id,
            loan_code: model.loan_code,
            collector_id: model.collector_id,
            collector_name,
            borrower_name: model.borrower_name,
            month_reported: model.month_reported,
            due_date: model.due_date,
            running_balance: money(model.outstanding_balance - model.amount_collected),
            outstanding_balance: money(model.outstanding_balance),
            amount_collected: money(model.amount_collected),
            moving_status: model.moving_status.to_value(),
            location_status: model.location_status.to_value(),
            area: model.area,
            city: model.city,
            barangay: model.barangay,
            full_address: model.full_address,
        }
    }
}

/// One entry of a loan's change history
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoanHistoryResponse {
    pub id: i32,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by_name: String,
    pub changed_at: chrono::DateTime<Utc>,
}

fn parse_moving_status(value: &str) -> Result<loan::MovingStatus, ApiError> {
    loan::MovingStatus::try_from_value(&value.to_string()).map_err(|_| {
        ComputeError::Validation(format!("'{}' is not a valid moving status", value)).into()
    })
}

fn parse_location_status(value: &str) -> Result<loan::LocationStatus, ApiError> {
    loan::LocationStatus::try_from_value(&value.to_string()).map_err(|_| {
        ComputeError::Validation(format!("'{}' is not a valid location status", value)).into()
    })
}

async fn collector_names(state: &AppState) -> Result<HashMap<i32, String>, ApiError> {
    let names = collector::Entity::find()
        .all(&state.db)
        .await
        .map_err(ComputeError::from)?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    Ok(names)
}

/// List loans visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/loans",
    tag = "loans",
    responses(
        (status = 200, description = "Loans retrieved successfully", body = ApiResponse<Vec<LoanResponse>>),
        (status = 401, description = "Missing actor identity", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_loans(
    CurrentUser(actor): CurrentUser,
    Query(query): Query<LoanListQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<LoanResponse>>>, ApiError> {
    let filter = LoanFilter {
        collector_id: query.collector_id,
        moving_status: query
            .moving_status
            .as_deref()
            .map(parse_moving_status)
            .transpose()?,
        location_status: query
            .location_status
            .as_deref()
            .map(parse_location_status)
            .transpose()?,
        month_reported: query.month_reported,
        overdue: query.overdue.unwrap_or(false),
        search: query.search,
        code: query.code,
    };

    let today = Utc::now().date_naive();
    let loans = scoped_loan_query(&state.db, &actor, &filter, today)
        .await?
        .all(&state.db)
        .await
        .map_err(ComputeError::from)?;

    // The MM-YY range bounds cannot be pushed into SQL; filter here.
    let loans: Vec<loan::Model> = loans
        .into_iter()
        .filter(|l| month_reported_in_range(&l.month_reported, query.start_date, query.end_date))
        .collect();
    debug!(count = loans.len(), "loans after range filter");

    let names = collector_names(&state).await?;
    let data: Vec<LoanResponse> = loans
        .into_iter()
        .map(|l| {
            let name = l.collector_id.and_then(|id| names.get(&id).cloned());
            LoanResponse::from_model(l, name)
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        message: "Loans retrieved successfully".to_string(),
        success: true,
    }))
}

/// Get a single loan
#[utoipa::path(
    get,
    path = "/api/v1/loans/{loan_id}",
    tag = "loans",
    params(
        ("loan_id" = i32, Path, description = "Loan ID"),
    ),
    responses(
        (status = 200, description = "Loan retrieved successfully", body = ApiResponse<LoanResponse>),
        (status = 403, description = "Loan belongs to another collector", body = ErrorResponse),
        (status = 404, description = "Loan not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_loan(
    CurrentUser(actor): CurrentUser,
    Path(loan_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<LoanResponse>>, ApiError> {
    let loan = loans::fetch_loan(&state.db, &actor, loan_id).await?;
    let names = collector_names(&state).await?;
    let name = loan.collector_id.and_then(|id| names.get(&id).cloned());

    Ok(Json(ApiResponse {
        data: LoanResponse::from_model(loan, name),
        message: "Loan retrieved successfully".to_string(),
        success: true,
    }))
}

fn create_input(request: CreateLoanRequest) -> Result<LoanInput, ApiError> {
    Ok(LoanInput {
        loan_code: request.loan_code,
        collector_id: request.collector_id,
        borrower_name: request.borrower_name,
        month_reported: request.month_reported,
        due_date: request.due_date,
        outstanding_balance: request.outstanding_balance,
        amount_collected: request.amount_collected,
        moving_status: parse_moving_status(&request.moving_status)?,
        location_status: parse_location_status(&request.location_status)?,
        area: request.area,
        city: request.city,
        barangay: request.barangay,
        full_address: request.full_address,
    })
}

/// Create a new loan
#[utoipa::path(
    post,
    path = "/api/v1/loans",
    tag = "loans",
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created successfully", body = ApiResponse<LoanResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Caller is not staff", body = ErrorResponse),
        (status = 409, description = "Loan code already exists", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn create_loan(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<CreateLoanRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<LoanResponse>>), ApiError> {
    let input = create_input(request)?;
    let created = loans::create_loan(&state.db, &actor, input).await?;
    state.cache.invalidate_all();

    let names = collector_names(&state).await?;
    let name = created.collector_id.and_then(|id| names.get(&id).cloned());
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: LoanResponse::from_model(created, name),
            message: "Loan created successfully".to_string(),
            success: true,
        }),
    ))
}

/// Update a loan
///
/// Staff may change any field; collector-role callers may only submit
/// `amount_collected` for loans assigned to them.
#[utoipa::path(
    put,
    path = "/api/v1/loans/{loan_id}",
    tag = "loans",
    params(
        ("loan_id" = i32, Path, description = "Loan ID"),
    ),
    request_body = UpdateLoanRequest,
    responses(
        (status = 200, description = "Loan updated successfully", body = ApiResponse<LoanResponse>),
        (status = 404, description = "Loan not found", body = ErrorResponse),
        (status = 409, description = "Loan code already exists", body = ErrorResponse),
        (status = 422, description = "Domain rule violated", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn update_loan(
    CurrentUser(actor): CurrentUser,
    Path(loan_id): Path<i32>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<UpdateLoanRequest>>,
) -> Result<Json<ApiResponse<LoanResponse>>, ApiError> {
    let updated = if actor.role == Role::Collector {
        let touches_restricted = request.loan_code.is_some()
            || request.collector_id.is_some()
            || request.borrower_name.is_some()
            || request.month_reported.is_some()
            || request.due_date.is_some()
            || request.outstanding_balance.is_some()
            || request.moving_status.is_some()
            || request.location_status.is_some()
            || request.area.is_some()
            || request.city.is_some()
            || request.barangay.is_some()
            || request.full_address.is_some();
        if touches_restricted {
            return Err(ComputeError::CollectorFieldRestriction.into());
        }
        let amount = request
            .amount_collected
            .ok_or_else(|| ComputeError::Validation("amount_collected is required".to_string()))?;
        loans::update_amount_collected(&state.db, &actor, loan_id, amount).await?
    } else {
        let existing = loans::fetch_loan(&state.db, &actor, loan_id).await?;
        let input = LoanInput {
            loan_code: request.loan_code.unwrap_or(existing.loan_code),
            collector_id: request.collector_id.unwrap_or(existing.collector_id),
            borrower_name: request.borrower_name.unwrap_or(existing.borrower_name),
            month_reported: request.month_reported.unwrap_or(existing.month_reported),
            due_date: request.due_date.unwrap_or(existing.due_date),
            outstanding_balance: request
                .outstanding_balance
                .unwrap_or(existing.outstanding_balance),
            amount_collected: request.amount_collected,
            moving_status: match request.moving_status.as_deref() {
                Some(value) => parse_moving_status(value)?,
                None => existing.moving_status,
            },
            location_status: match request.location_status.as_deref() {
                Some(value) => parse_location_status(value)?,
                None => existing.location_status,
            },
            area: request.area.unwrap_or(existing.area),
            city: request.city.unwrap_or(existing.city),
            barangay: request.barangay.unwrap_or(existing.barangay),
            full_address: request.full_address.unwrap_or(existing.full_address),
        };
        loans::update_loan(&state.db, &actor, loan_id, input).await?
    };
    state.cache.invalidate_all();

    let names = collector_names(&state).await?;
    let name = updated.collector_id.and_then(|id| names.get(&id).cloned());
    Ok(Json(ApiResponse {
        data: LoanResponse::from_model(updated, name),
        message: "Loan updated successfully".to_string(),
        success: true,
    }))
}

/// Delete a loan (admin only)
#[utoipa::path(
    delete,
    path = "/api/v1/loans/{loan_id}",
    tag = "loans",
    params(
        ("loan_id" = i32, Path, description = "Loan ID"),
    ),
    responses(
        (status = 200, description = "Loan deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "Loan not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_loan(
    CurrentUser(actor): CurrentUser,
    Path(loan_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    loans::delete_loan(&state.db, &actor, loan_id).await?;
    state.cache.invalidate_all();

    Ok(Json(ApiResponse {
        data: format!("Loan {} deleted", loan_id),
        message: "Loan deleted successfully".to_string(),
        success: true,
    }))
}

/// Get a loan's field-level change history, newest first
#[utoipa::path(
    get,
    path = "/api/v1/loans/{loan_id}/history",
    tag = "loans",
    params(
        ("loan_id" = i32, Path, description = "Loan ID"),
    ),
    responses(
        (status = 200, description = "History retrieved successfully", body = ApiResponse<Vec<LoanHistoryResponse>>),
        (status = 404, description = "Loan not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_loan_history(
    CurrentUser(actor): CurrentUser,
    Path(loan_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<LoanHistoryResponse>>>, ApiError> {
    let records = loans::change_history(&state.db, &actor, loan_id).await?;
    let data = records
        .into_iter()
        .map(|r| LoanHistoryResponse {
            id: r.id,
            field_name: r.field_name,
            old_value: r.old_value,
            new_value: r.new_value,
            changed_by_name: r.changed_by_name,
            changed_at: r.changed_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        message: "Loan history retrieved successfully".to_string(),
        success: true,
    }))
}
