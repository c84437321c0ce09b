//! Transaction history HTTP handler.
//!
//! - GET /transactions/user/{user_id}?page=&sort=&order=

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::transaction::{HistoryItem, HistoryParams, HistoryQuery},
    services::BalanceService,
    storage::Storage,
};

/// Response body of the history endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub page: u32,
    pub transactions: Vec<HistoryItem>,
}

/// List one page (10 rows) of a user's transaction history.
///
/// # Query Parameters
///
/// - `page`: 1-based page number; 0 and 1 both mean the first page
/// - `sort`: `created_at` (default) or `amount`
/// - `order`: `desc` (default) or `asc`
///
/// Unsupported `sort` / `order` values fall back to the defaults.
///
/// # Response
///
/// - **Success (200 OK)**:
///
/// ```json
/// {
///   "page": 1,
///   "transactions": [
///     { "transaction_type": "funds debited for service 3", "amount": 40, "date": "2025-12-21" }
///   ]
/// }
/// ```
///
/// - **Error (404)**: the user has no balance
pub async fn get_history<S: Storage>(
    State(service): State<Arc<BalanceService<S>>>,
    Path(user_id): Path<i64>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, AppError> {
    let query = HistoryQuery::from(params);

    let transactions = service
        .transaction_history(user_id, &query)
        .await?
        .ok_or(AppError::BalanceNotFound(user_id))?;

    Ok(Json(HistoryResponse {
        page: query.page,
        transactions,
    }))
}
