//! Data models representing database entities and API payloads.

/// User balance model
pub mod balance;
/// Funds reservation model and outcomes
pub mod reservation;
/// Transaction history model
pub mod transaction;
