//! Computation core of the collection monitoring service: role-scoped loan
//! filtering, the month-reported date-range post-filter, running-balance and
//! aging classification, the report pivoters, and the transactional payment
//! recorder and loan mutations.
//!
//! Everything here operates on the SeaORM entities from the `model` crate
//! and returns the transport shapes from `common`; the HTTP layer above is
//! a thin mapping onto these functions.

pub mod actor;
pub mod aging;
pub mod audit;
pub mod collectors;
pub mod date_range;
pub mod error;
pub mod filter;
pub mod loans;
pub mod masterlist;
pub mod monthly;
pub mod payments;
pub mod performance;
pub mod summary;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;
