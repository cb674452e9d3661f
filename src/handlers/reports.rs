use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, CachedData, ErrorResponse};
use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{Datelike, NaiveDate, Utc};
use common::{
    AgingReportRow, CollectionSummaryRow, CollectorPerformanceRow, MasterlistRow, MonthlyReportRow,
};
use compute::error::ComputeError;
use compute::monthly::MonthlyReportKind;
use compute::{aging, masterlist, monthly, performance, summary};
use serde::Deserialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;

/// Query parameters for the monthly report
#[derive(Debug, Deserialize, ToSchema)]
pub struct MonthlyQuery {
    /// Target year; defaults to the current year
    pub year: Option<i32>,
    /// "reported" (default) or "collection"
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Query parameters for the masterlist report
#[derive(Debug, Deserialize, ToSchema)]
pub struct MasterlistQuery {
    /// Target year for the month columns; defaults to the current year
    pub year: Option<i32>,
}

/// Query parameters for the collection summary
#[derive(Debug, Deserialize, ToSchema)]
pub struct SummaryQuery {
    /// Range start (inclusive)
    pub start_date: NaiveDate,
    /// Range end (inclusive)
    pub end_date: NaiveDate,
}

/// Receivables aging report
#[utoipa::path(
    get,
    path = "/api/v1/reports/aging",
    tag = "reports",
    responses(
        (status = 200, description = "Aging report retrieved successfully", body = ApiResponse<Vec<AgingReportRow>>),
        (status = 403, description = "Caller is not staff", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn aging_report(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AgingReportRow>>>, ApiError> {
    actor.require_staff()?;

    let today = Utc::now().date_naive();
    let cache_key = format!("aging_{}", today);
    if let Some(CachedData::Aging(rows)) = state.cache.get(&cache_key).await {
        debug!("aging report served from cache");
        return Ok(Json(ok_response(rows)));
    }

    let rows = aging::aging_report(&state.db, today).await?;
    state
        .cache
        .insert(cache_key, CachedData::Aging(rows.clone()))
        .await;
    Ok(Json(ok_response(rows)))
}

/// Collector performance report
#[utoipa::path(
    get,
    path = "/api/v1/reports/performance",
    tag = "reports",
    responses(
        (status = 200, description = "Performance report retrieved successfully", body = ApiResponse<Vec<CollectorPerformanceRow>>),
        (status = 403, description = "Caller is not staff", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn performance_report(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CollectorPerformanceRow>>>, ApiError> {
    actor.require_staff()?;

    let cache_key = "performance".to_string();
    if let Some(CachedData::Performance(rows)) = state.cache.get(&cache_key).await {
        debug!("performance report served from cache");
        return Ok(Json(ok_response(rows)));
    }

    let rows = performance::performance_report(&state.db).await?;
    state
        .cache
        .insert(cache_key, CachedData::Performance(rows.clone()))
        .await;
    Ok(Json(ok_response(rows)))
}

/// Monthly pivot, by month reported or by collection period
#[utoipa::path(
    get,
    path = "/api/v1/reports/monthly",
    tag = "reports",
    params(
        ("year" = Option<i32>, Query, description = "Target year; defaults to the current year"),
        ("type" = Option<String>, Query, description = "reported (default) or collection"),
    ),
    responses(
        (status = 200, description = "Monthly report retrieved successfully", body = ApiResponse<Vec<MonthlyReportRow>>),
        (status = 400, description = "Unknown report type", body = ErrorResponse),
        (status = 403, description = "Caller is not staff", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn monthly_report(
    CurrentUser(actor): CurrentUser,
    Query(query): Query<MonthlyQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<MonthlyReportRow>>>, ApiError> {
    actor.require_staff()?;

    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let kind_name = query.kind.as_deref().unwrap_or("reported");
    let kind: MonthlyReportKind = kind_name.parse().map_err(|_| {
        ComputeError::Validation(format!("'{}' is not a valid report type", kind_name))
    })?;

    let cache_key = format!("monthly_{}_{}", year, kind_name);
    if let Some(CachedData::Monthly(rows)) = state.cache.get(&cache_key).await {
        debug!("monthly report served from cache");
        return Ok(Json(ok_response(rows)));
    }

    let rows = monthly::monthly_report(&state.db, year, kind).await?;
    state
        .cache
        .insert(cache_key, CachedData::Monthly(rows.clone()))
        .await;
    Ok(Json(ok_response(rows)))
}

/// Masterlist and monitoring report, grouped area then collector
#[utoipa::path(
    get,
    path = "/api/v1/reports/masterlist",
    tag = "reports",
    params(
        ("year" = Option<i32>, Query, description = "Target year for the month columns; defaults to the current year"),
    ),
    responses(
        (status = 200, description = "Masterlist retrieved successfully", body = ApiResponse<Vec<MasterlistRow>>),
        (status = 400, description = "Year out of range", body = ErrorResponse),
        (status = 403, description = "Caller is not staff", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn masterlist_report(
    CurrentUser(actor): CurrentUser,
    Query(query): Query<MasterlistQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<MasterlistRow>>>, ApiError> {
    actor.require_staff()?;

    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let cache_key = format!("masterlist_{}", year);
    if let Some(CachedData::Masterlist(rows)) = state.cache.get(&cache_key).await {
        debug!("masterlist served from cache");
        return Ok(Json(ok_response(rows)));
    }

    let rows = masterlist::masterlist_report(&state.db, year).await?;
    state
        .cache
        .insert(cache_key, CachedData::Masterlist(rows.clone()))
        .await;
    Ok(Json(ok_response(rows)))
}

/// Total collected per collector over a date range
#[utoipa::path(
    get,
    path = "/api/v1/reports/collection-summary",
    tag = "reports",
    params(
        ("start_date" = NaiveDate, Query, description = "Range start (inclusive)"),
        ("end_date" = NaiveDate, Query, description = "Range end (inclusive)"),
    ),
    responses(
        (status = 200, description = "Collection summary retrieved successfully", body = ApiResponse<Vec<CollectionSummaryRow>>),
        (status = 400, description = "Invalid date range", body = ErrorResponse),
        (status = 403, description = "Caller is not staff", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn collection_summary_report(
    CurrentUser(actor): CurrentUser,
    Query(query): Query<SummaryQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CollectionSummaryRow>>>, ApiError> {
    actor.require_staff()?;

    let cache_key = format!("summary_{}_{}", query.start_date, query.end_date);
    if let Some(CachedData::Summary(rows)) = state.cache.get(&cache_key).await {
        debug!("collection summary served from cache");
        return Ok(Json(ok_response(rows)));
    }

    let rows = summary::collection_summary(&state.db, query.start_date, query.end_date).await?;
    state
        .cache
        .insert(cache_key, CachedData::Summary(rows.clone()))
        .await;
    Ok(Json(ok_response(rows)))
}

fn ok_response<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        data,
        message: "Report retrieved successfully".to_string(),
        success: true,
    }
}
