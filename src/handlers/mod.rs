//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, query string)
//! 2. Validates it and calls the balance service
//! 3. Maps the result to an HTTP response (JSON, status code)

/// Balance read and credit endpoints
pub mod balances;
/// Health check endpoint
pub mod health;
/// Reserve, accept and cancel endpoints
pub mod reservations;
/// Transaction history endpoint
pub mod transactions;
