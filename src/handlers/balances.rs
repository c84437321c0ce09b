//! Balance HTTP handlers.
//!
//! This module implements the balance endpoints:
//! - GET /balance/user/{user_id} - Read a user's balance
//! - POST /balance/add - Credit a user's balance

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    error::AppError,
    models::balance::{BalanceResponse, CreditRequest, CreditResponse},
    services::BalanceService,
    storage::Storage,
};

/// Get a user's balance.
///
/// # Response
///
/// - **Success (200 OK)**: `{"user_id": 7, "amount": 60}`
/// - **Error (404)**: the user has no balance yet
pub async fn get_balance<S: Storage>(
    State(service): State<Arc<BalanceService<S>>>,
    Path(user_id): Path<i64>,
) -> Result<Json<BalanceResponse>, AppError> {
    let balance = service
        .get_balance(user_id)
        .await?
        .ok_or(AppError::BalanceNotFound(user_id))?;

    Ok(Json(balance.into()))
}

/// Credit a user's balance, opening it on first use.
///
/// # Request Body
///
/// ```json
/// {
///   "user_id": 7,
///   "amount": 100
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "message": "Opened a balance for user 7 and credited 100",
///   "balance": { "user_id": 7, "amount": 100 }
/// }
/// ```
pub async fn credit<S: Storage>(
    State(service): State<Arc<BalanceService<S>>>,
    Json(request): Json<CreditRequest>,
) -> Result<Json<CreditResponse>, AppError> {
    request.validate()?;

    let receipt = service.credit(request.user_id, request.amount).await?;

    Ok(Json(receipt.into()))
}
