//! Reservation data models, request types and business outcomes.
//!
//! A reservation holds funds for a paid service until the order is accepted
//! or cancelled. The held amount leaves the available balance when the
//! reservation is created.
//!
//! # State Machine
//!
//! ```text
//! InProgress --accept--> Accepted   (terminal)
//! InProgress --cancel--> Cancelled  (terminal, refunds the balance)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::balance::{Balance, validate_amount, validate_id};

/// Lifecycle state of a reservation.
///
/// Stored in the `status SMALLINT` column of the `reservations` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    InProgress = 1,
    Cancelled = 2,
    Accepted = 3,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::InProgress => "in_progress",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Accepted => "accepted",
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReservationStatus::InProgress)
    }
}

/// Represents a reservation record from the database.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct Reservation {
    pub id: i64,
    pub user_id: i64,
    pub service_id: i64,

    /// External correlation key used to accept or cancel later (unique)
    pub order_id: i64,

    pub amount: i64,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to insert a reservation.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub user_id: i64,
    pub service_id: i64,
    pub order_id: i64,
    pub amount: i64,
}

/// Request to hold funds for a service order.
///
/// # JSON Example
///
/// ```json
/// {
///   "user_id": 7,
///   "service_id": 3,
///   "order_id": 55,
///   "amount": 40
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    pub user_id: i64,
    pub service_id: i64,
    pub order_id: i64,
    pub amount: i64,
}

impl ReserveRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_id("user_id", self.user_id)?;
        validate_id("service_id", self.service_id)?;
        validate_id("order_id", self.order_id)?;
        validate_amount(self.amount)
    }
}

/// Request to accept or cancel the reservation of an order.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub order_id: i64,
}

impl OrderRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_id("order_id", self.order_id)
    }
}

/// Result of a reserve request.
#[derive(Debug, Clone)]
pub enum ReserveOutcome {
    /// Funds were debited and the reservation created.
    Reserved {
        reservation: Reservation,
        balance: Balance,
    },
    /// The user has never been credited.
    NoBalance { user_id: i64 },
    /// The requested amount exceeds the available balance.
    InsufficientFunds {
        user_id: i64,
        available: i64,
        requested: i64,
    },
    /// A reservation already exists for this order.
    DuplicateOrder { order_id: i64 },
}

impl ReserveOutcome {
    pub fn code(&self) -> &'static str {
        match self {
            ReserveOutcome::Reserved { .. } => "reserved",
            ReserveOutcome::NoBalance { .. } => "no_balance",
            ReserveOutcome::InsufficientFunds { .. } => "insufficient_funds",
            ReserveOutcome::DuplicateOrder { .. } => "duplicate_order",
        }
    }

    pub fn message(&self) -> String {
        match self {
            ReserveOutcome::Reserved { reservation, .. } => format!(
                "Reserved {} for order {}",
                reservation.amount, reservation.order_id
            ),
            ReserveOutcome::NoBalance { user_id } => {
                format!("User {user_id} has no balance")
            }
            ReserveOutcome::InsufficientFunds { user_id, .. } => {
                format!("User {user_id} has insufficient funds")
            }
            ReserveOutcome::DuplicateOrder { order_id } => {
                format!("Order {order_id} already has a reservation")
            }
        }
    }

    pub fn reservation(&self) -> Option<&Reservation> {
        match self {
            ReserveOutcome::Reserved { reservation, .. } => Some(reservation),
            _ => None,
        }
    }
}

/// Result of an accept request.
#[derive(Debug, Clone)]
pub enum AcceptOutcome {
    Accepted(Reservation),
    NoReservation { order_id: i64 },
    NotInProgress {
        order_id: i64,
        status: ReservationStatus,
    },
}

impl AcceptOutcome {
    pub fn code(&self) -> &'static str {
        match self {
            AcceptOutcome::Accepted(_) => "accepted",
            AcceptOutcome::NoReservation { .. } => "no_reservation",
            AcceptOutcome::NotInProgress { .. } => "not_in_progress",
        }
    }

    pub fn message(&self) -> String {
        match self {
            AcceptOutcome::Accepted(reservation) => format!(
                "Debited {} from reserve for order {}",
                reservation.amount, reservation.order_id
            ),
            AcceptOutcome::NoReservation { order_id } => {
                format!("No reservation for order {order_id}")
            }
            AcceptOutcome::NotInProgress { order_id, status } => format!(
                "Reservation for order {order_id} is already {}",
                status.as_str()
            ),
        }
    }

    pub fn reservation(&self) -> Option<&Reservation> {
        match self {
            AcceptOutcome::Accepted(reservation) => Some(reservation),
            _ => None,
        }
    }
}

/// Result of a cancel request.
#[derive(Debug, Clone)]
pub enum CancelOutcome {
    /// The reservation was cancelled and its amount returned to the balance.
    Cancelled {
        reservation: Reservation,
        balance: Balance,
    },
    NoReservation { order_id: i64 },
    NotInProgress {
        order_id: i64,
        status: ReservationStatus,
    },
}

impl CancelOutcome {
    pub fn code(&self) -> &'static str {
        match self {
            CancelOutcome::Cancelled { .. } => "cancelled",
            CancelOutcome::NoReservation { .. } => "no_reservation",
            CancelOutcome::NotInProgress { .. } => "not_in_progress",
        }
    }

    pub fn message(&self) -> String {
        match self {
            CancelOutcome::Cancelled { reservation, .. } => format!(
                "Returned {} to user {} for order {}",
                reservation.amount, reservation.user_id, reservation.order_id
            ),
            CancelOutcome::NoReservation { order_id } => {
                format!("No reservation for order {order_id}")
            }
            CancelOutcome::NotInProgress { order_id, status } => format!(
                "Reservation for order {order_id} is already {}",
                status.as_str()
            ),
        }
    }

    pub fn reservation(&self) -> Option<&Reservation> {
        match self {
            CancelOutcome::Cancelled { reservation, .. } => Some(reservation),
            _ => None,
        }
    }
}

/// Reservation as returned to API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReservationResponse {
    pub user_id: i64,
    pub service_id: i64,
    pub order_id: i64,
    pub amount: i64,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Reservation> for ReservationResponse {
    fn from(reservation: &Reservation) -> Self {
        Self {
            user_id: reservation.user_id,
            service_id: reservation.service_id,
            order_id: reservation.order_id,
            amount: reservation.amount,
            status: reservation.status,
            created_at: reservation.created_at,
            updated_at: reservation.updated_at,
        }
    }
}

/// Response body for reserve, accept and cancel.
///
/// ```json
/// {
///   "code": "reserved",
///   "message": "Reserved 40 for order 55",
///   "reservation": { "order_id": 55, "status": "in_progress", ... }
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct OutcomeResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reservation: Option<ReservationResponse>,
}

impl OutcomeResponse {
    pub fn new(code: &str, message: String, reservation: Option<&Reservation>) -> Self {
        Self {
            code: code.to_string(),
            message,
            reservation: reservation.map(ReservationResponse::from),
        }
    }
}
