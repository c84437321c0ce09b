//! Balance data models and API request/response types.
//!
//! This module defines:
//! - `Balance`: Database entity holding a user's available funds
//! - `CreditRequest`: Request body for crediting a balance
//! - `CreditReceipt`: Result of a credit, with its user-facing message
//! - `BalanceResponse`: Response body returned to clients

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Represents a balance record from the database.
///
/// # Database Table
///
/// Maps to the `balances` table. Each user has at most one balance,
/// opened by their first credit and never deleted.
///
/// # Amount Storage
///
/// Amounts are stored as `i64` in the smallest currency unit and must be
/// >= 0 (enforced by a database CHECK constraint).
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct Balance {
    /// Unique identifier for this balance
    pub id: i64,

    /// Owner of the balance (unique)
    pub user_id: i64,

    /// Available (unreserved) funds
    pub amount: i64,
}

/// Request to credit (add money to) a user's balance.
///
/// # JSON Example
///
/// ```json
/// {
///   "user_id": 7,
///   "amount": 100
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreditRequest {
    pub user_id: i64,
    pub amount: i64,
}

impl CreditRequest {
    /// Reject non-positive ids and amounts before they reach the service.
    pub fn validate(&self) -> Result<(), AppError> {
        validate_id("user_id", self.user_id)?;
        validate_amount(self.amount)
    }
}

/// Outcome of a successful credit.
#[derive(Debug, Clone)]
pub struct CreditReceipt {
    /// Balance after the credit was applied
    pub balance: Balance,

    /// Amount that was credited
    pub credited: i64,

    /// Whether this credit opened the balance
    pub created: bool,
}

impl CreditReceipt {
    pub fn message(&self) -> String {
        if self.created {
            format!(
                "Opened a balance for user {} and credited {}",
                self.balance.user_id, self.credited
            )
        } else {
            format!(
                "Credited {} to user {}",
                self.credited, self.balance.user_id
            )
        }
    }
}

/// Response body for balance endpoints.
///
/// ```json
/// {
///   "user_id": 7,
///   "amount": 60
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub user_id: i64,
    pub amount: i64,
}

impl From<Balance> for BalanceResponse {
    fn from(balance: Balance) -> Self {
        Self {
            user_id: balance.user_id,
            amount: balance.amount,
        }
    }
}

/// Response body for the credit endpoint.
#[derive(Debug, Serialize)]
pub struct CreditResponse {
    pub message: String,
    pub balance: BalanceResponse,
}

impl From<CreditReceipt> for CreditResponse {
    fn from(receipt: CreditReceipt) -> Self {
        Self {
            message: receipt.message(),
            balance: receipt.balance.into(),
        }
    }
}

pub(crate) fn validate_id(field: &str, value: i64) -> Result<(), AppError> {
    if value <= 0 {
        return Err(AppError::InvalidRequest(format!(
            "{field} must be a positive integer"
        )));
    }
    Ok(())
}

pub(crate) fn validate_amount(amount: i64) -> Result<(), AppError> {
    if amount <= 0 {
        return Err(AppError::InvalidRequest(
            "Amount must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_request_rejects_non_positive_amount() {
        let zero = CreditRequest {
            user_id: 7,
            amount: 0,
        };
        let negative = CreditRequest {
            user_id: 7,
            amount: -5,
        };

        assert!(matches!(zero.validate(), Err(AppError::InvalidRequest(_))));
        assert!(matches!(
            negative.validate(),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn credit_request_rejects_non_positive_user() {
        let request = CreditRequest {
            user_id: 0,
            amount: 10,
        };

        assert!(request.validate().is_err());
    }

    #[test]
    fn receipt_message_mentions_opening() {
        let receipt = CreditReceipt {
            balance: Balance {
                id: 1,
                user_id: 7,
                amount: 100,
            },
            credited: 100,
            created: true,
        };

        assert_eq!(
            receipt.message(),
            "Opened a balance for user 7 and credited 100"
        );
    }
}
