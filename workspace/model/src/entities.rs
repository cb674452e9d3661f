//! This file serves as the root for all SeaORM entity modules.
//! The data model mirrors the lending office's collection workflow: a flat
//! loan book owned by collectors, append-only payments, and a field-level
//! audit trail.

pub mod collector;
pub mod loan;
pub mod loan_history;
pub mod payment;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::collector::Entity as Collector;
    pub use super::loan::Entity as Loan;
    pub use super::loan_history::Entity as LoanHistory;
    pub use super::payment::Entity as Payment;
    pub use super::user::Entity as User;
}
