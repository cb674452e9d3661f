use rust_decimal::Decimal;
use thiserror::Error;

/// Error taxonomy of the computation core. Domain errors carry the
/// offending values so the request boundary can surface precise messages.
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Loan {0} not found")]
    LoanNotFound(i32),

    #[error("Collector {0} not found")]
    CollectorNotFound(i32),

    #[error("User {0} not found")]
    UserNotFound(i32),

    /// Duplicate loan code on create or rename.
    #[error("Loan code '{0}' already exists")]
    DuplicateLoanCode(String),

    #[error("Username '{0}' already exists")]
    DuplicateUsername(String),

    /// Payment rejected because it would push the collected counter past
    /// the outstanding balance.
    #[error("Payment amount ({attempted}) exceeds the running balance ({remaining})")]
    PaymentExceedsBalance {
        attempted: Decimal,
        remaining: Decimal,
    },

    #[error("Amount collected cannot exceed outstanding balance")]
    CollectedExceedsOutstanding,

    /// Collector deletion blocked by assigned loans.
    #[error("Collector '{name}' still has {loans} assigned loan(s)")]
    CollectorHasLoans { name: String, loans: u64 },

    /// A collector-role actor tried to edit anything other than the
    /// collected counter.
    #[error("Collectors may only update amount_collected")]
    CollectorFieldRestriction,

    /// The actor's role does not permit the operation, or the loan belongs
    /// to another collector.
    #[error("Access denied")]
    AccessDenied,

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;

impl From<sea_orm::TransactionError<ComputeError>> for ComputeError {
    fn from(err: sea_orm::TransactionError<ComputeError>) -> Self {
        match err {
            sea_orm::TransactionError::Connection(e) => ComputeError::Database(e),
            sea_orm::TransactionError::Transaction(e) => e,
        }
    }
}
