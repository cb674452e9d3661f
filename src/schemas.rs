use common::{
    AgingReportRow, CollectionSummaryRow, CollectorPerformanceRow, MasterlistRow, MonthlyReportRow,
};
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Cache for report responses
    pub cache: Cache<String, CachedData>,
}

/// Cached report payloads
#[derive(Clone, Debug)]
pub enum CachedData {
    Aging(Vec<AgingReportRow>),
    Performance(Vec<CollectorPerformanceRow>),
    Masterlist(Vec<MasterlistRow>),
    Monthly(Vec<MonthlyReportRow>),
    Summary(Vec<CollectionSummaryRow>),
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::loans::list_loans,
        crate::handlers::loans::get_loan,
        crate::handlers::loans::create_loan,
        crate::handlers::loans::update_loan,
        crate::handlers::loans::delete_loan,
        crate::handlers::loans::get_loan_history,
        crate::handlers::payments::list_payments,
        crate::handlers::payments::create_payment,
        crate::handlers::collectors::list_collectors,
        crate::handlers::collectors::create_collector,
        crate::handlers::collectors::update_collector,
        crate::handlers::collectors::delete_collector,
        crate::handlers::users::list_users,
        crate::handlers::users::create_user,
        crate::handlers::users::update_user,
        crate::handlers::reports::aging_report,
        crate::handlers::reports::performance_report,
        crate::handlers::reports::masterlist_report,
        crate::handlers::reports::monthly_report,
        crate::handlers::reports::collection_summary_report,
    ),
    components(
        schemas(
            ApiResponse<Vec<crate::handlers::loans::LoanResponse>>,
            ApiResponse<crate::handlers::loans::LoanResponse>,
            ApiResponse<Vec<crate::handlers::loans::LoanHistoryResponse>>,
            ApiResponse<Vec<crate::handlers::payments::PaymentResponse>>,
            ApiResponse<crate::handlers::payments::PaymentResponse>,
            ApiResponse<Vec<crate::handlers::collectors::CollectorResponse>>,
            ApiResponse<crate::handlers::collectors::CollectorResponse>,
            ApiResponse<Vec<crate::handlers::users::UserResponse>>,
            ApiResponse<crate::handlers::users::UserResponse>,
            ApiResponse<Vec<common::AgingReportRow>>,
            ApiResponse<Vec<common::CollectorPerformanceRow>>,
            ApiResponse<Vec<common::MasterlistRow>>,
            ApiResponse<Vec<common::MonthlyReportRow>>,
            ApiResponse<Vec<common::CollectionSummaryRow>>,
            ApiResponse<String>,
            ErrorResponse,
            HealthResponse,
            crate::handlers::loans::LoanListQuery,
            crate::handlers::reports::MasterlistQuery,
            crate::handlers::reports::MonthlyQuery,
            crate::handlers::reports::SummaryQuery,
            crate::handlers::loans::CreateLoanRequest,
            crate::handlers::loans::UpdateLoanRequest,
            crate::handlers::loans::LoanResponse,
            crate::handlers::loans::LoanHistoryResponse,
            crate::handlers::payments::CreatePaymentRequest,
            crate::handlers::payments::PaymentResponse,
            crate::handlers::collectors::CollectorRequest,
            crate::handlers::collectors::CollectorResponse,
            crate::handlers::users::CreateUserRequest,
            crate::handlers::users::UpdateUserRequest,
            crate::handlers::users::UserResponse,
            common::AgingReportRow,
            common::AgingBucket,
            common::CollectorPerformanceRow,
            common::MasterlistRow,
            common::MonthlyReportRow,
            common::CollectionSummaryRow,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "loans", description = "Loan account management"),
        (name = "payments", description = "Payment recording and history"),
        (name = "collectors", description = "Collector profile management"),
        (name = "users", description = "User administration"),
        (name = "reports", description = "Aging, performance and monthly reports"),
    ),
    info(
        title = "LendWatch API",
        description = "Loan collection monitoring API - role-scoped loan tracking, payment recording and collection reports",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
