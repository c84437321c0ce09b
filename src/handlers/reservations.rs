//! Reservation HTTP handlers.
//!
//! This module implements the funds-hold endpoints:
//! - POST /reservation - Hold funds for a service order
//! - POST /reservation/accept - Finalize a held order as paid
//! - POST /reservation/cancel - Release a held order back to the balance
//!
//! Business outcomes are answered with an [`OutcomeResponse`] body. The
//! status code depends on the outcome:
//!
//! - success → 200 OK
//! - no balance / no reservation → 404 Not Found
//! - insufficient funds → 422 Unprocessable Entity
//! - already finalized / duplicate order → 409 Conflict

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    error::AppError,
    models::reservation::{
        AcceptOutcome, CancelOutcome, OrderRequest, OutcomeResponse, ReserveOutcome,
        ReserveRequest,
    },
    services::BalanceService,
    storage::Storage,
};

type OutcomeReply = (StatusCode, Json<OutcomeResponse>);

/// Reserve funds for an order.
///
/// # Request Body
///
/// ```json
/// {
///   "user_id": 7,
///   "service_id": 3,
///   "order_id": 55,
///   "amount": 40
/// }
/// ```
pub async fn reserve<S: Storage>(
    State(service): State<Arc<BalanceService<S>>>,
    Json(request): Json<ReserveRequest>,
) -> Result<OutcomeReply, AppError> {
    request.validate()?;

    let outcome = service
        .reserve(
            request.user_id,
            request.service_id,
            request.order_id,
            request.amount,
        )
        .await?;

    let status = match outcome {
        ReserveOutcome::Reserved { .. } => StatusCode::OK,
        ReserveOutcome::NoBalance { .. } => StatusCode::NOT_FOUND,
        ReserveOutcome::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ReserveOutcome::DuplicateOrder { .. } => StatusCode::CONFLICT,
    };

    Ok(reply(
        status,
        OutcomeResponse::new(outcome.code(), outcome.message(), outcome.reservation()),
    ))
}

/// Accept the reservation of an order.
///
/// # Request Body
///
/// ```json
/// { "order_id": 55 }
/// ```
pub async fn accept<S: Storage>(
    State(service): State<Arc<BalanceService<S>>>,
    Json(request): Json<OrderRequest>,
) -> Result<OutcomeReply, AppError> {
    request.validate()?;

    let outcome = service.accept(request.order_id).await?;

    let status = match outcome {
        AcceptOutcome::Accepted(_) => StatusCode::OK,
        AcceptOutcome::NoReservation { .. } => StatusCode::NOT_FOUND,
        AcceptOutcome::NotInProgress { .. } => StatusCode::CONFLICT,
    };

    Ok(reply(
        status,
        OutcomeResponse::new(outcome.code(), outcome.message(), outcome.reservation()),
    ))
}

/// Cancel the reservation of an order, refunding the balance.
pub async fn cancel<S: Storage>(
    State(service): State<Arc<BalanceService<S>>>,
    Json(request): Json<OrderRequest>,
) -> Result<OutcomeReply, AppError> {
    request.validate()?;

    let outcome = service.cancel(request.order_id).await?;

    let status = match outcome {
        CancelOutcome::Cancelled { .. } => StatusCode::OK,
        CancelOutcome::NoReservation { .. } => StatusCode::NOT_FOUND,
        CancelOutcome::NotInProgress { .. } => StatusCode::CONFLICT,
    };

    Ok(reply(
        status,
        OutcomeResponse::new(outcome.code(), outcome.message(), outcome.reservation()),
    ))
}

fn reply(status: StatusCode, body: OutcomeResponse) -> OutcomeReply {
    (status, Json(body))
}
