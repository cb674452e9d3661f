pub mod collectors;
pub mod health;
pub mod loans;
pub mod payments;
pub mod reports;
pub mod users;
