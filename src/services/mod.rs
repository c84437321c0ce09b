//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They own the storage units of work and enforce the balance rules.

pub mod balance_service;

pub use balance_service::BalanceService;
