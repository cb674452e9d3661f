use crate::handlers::{
    collectors::{create_collector, delete_collector, list_collectors, update_collector},
    health::health_check,
    loans::{create_loan, delete_loan, get_loan, get_loan_history, list_loans, update_loan},
    payments::{create_payment, list_payments},
    reports::{
        aging_report, collection_summary_report, masterlist_report, monthly_report,
        performance_report,
    },
    users::{create_user, list_users, update_user},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Loan CRUD routes
        .route("/api/v1/loans", get(list_loans))
        .route("/api/v1/loans", post(create_loan))
        .route("/api/v1/loans/:loan_id", get(get_loan))
        .route("/api/v1/loans/:loan_id", put(update_loan))
        .route("/api/v1/loans/:loan_id", delete(delete_loan))
        // Per-loan payment and audit history routes
        .route("/api/v1/loans/:loan_id/payments", get(list_payments))
        .route("/api/v1/loans/:loan_id/payments", post(create_payment))
        .route("/api/v1/loans/:loan_id/history", get(get_loan_history))
        // Collector CRUD routes
        .route("/api/v1/collectors", get(list_collectors))
        .route("/api/v1/collectors", post(create_collector))
        .route("/api/v1/collectors/:collector_id", put(update_collector))
        .route("/api/v1/collectors/:collector_id", delete(delete_collector))
        // User administration routes
        .route("/api/v1/users", get(list_users))
        .route("/api/v1/users", post(create_user))
        .route("/api/v1/users/:user_id", put(update_user))
        // Report routes
        .route("/api/v1/reports/aging", get(aging_report))
        .route("/api/v1/reports/performance", get(performance_report))
        .route("/api/v1/reports/masterlist", get(masterlist_report))
        .route("/api/v1/reports/monthly", get(monthly_report))
        .route(
            "/api/v1/reports/collection-summary",
            get(collection_summary_report),
        )
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
