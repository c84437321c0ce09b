//! HTTP router assembly.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{handlers, services::BalanceService, storage::Storage};

/// Build the application router around a balance service.
///
/// Generic over the storage backend so the same routes serve PostgreSQL in
/// production and the in-memory backend in tests.
pub fn router<S: Storage>(service: Arc<BalanceService<S>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check::<S>))
        // Balance routes
        .route(
            "/balance/user/{user_id}",
            get(handlers::balances::get_balance::<S>),
        )
        .route("/balance/add", post(handlers::balances::credit::<S>))
        // History routes
        .route(
            "/transactions/user/{user_id}",
            get(handlers::transactions::get_history::<S>),
        )
        // Reservation routes
        .route("/reservation", post(handlers::reservations::reserve::<S>))
        .route(
            "/reservation/accept",
            post(handlers::reservations::accept::<S>),
        )
        .route(
            "/reservation/cancel",
            post(handlers::reservations::cancel::<S>),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
