//! Balance service - Core business logic for balances and reservations.
//!
//! This service handles:
//! - Crediting balances (opening them on first credit)
//! - Reserving funds for a service order
//! - Accepting or cancelling a reservation
//! - Reading balances and transaction history
//!
//! # Atomicity Guarantees
//!
//! Every operation runs inside one storage unit of work. The balance change,
//! the reservation write and the history row are committed together or not
//! at all.
//!
//! # Money Flow
//!
//! A reservation debits the balance when it is created. Accepting it only
//! records the payment; cancelling it returns the amount to the balance.

use tracing::{info, warn};

use crate::{
    error::AppError,
    models::{
        balance::{Balance, CreditReceipt},
        reservation::{
            AcceptOutcome, CancelOutcome, NewReservation, ReservationStatus, ReserveOutcome,
        },
        transaction::{HistoryItem, HistoryQuery, NewHistoryEntry, TransactionKind},
    },
    storage::{Storage, StorageError, StorageTx},
};

pub struct BalanceService<S> {
    storage: S,
}

impl<S: Storage> BalanceService<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Check that the storage backend is reachable.
    pub async fn ping(&self) -> Result<(), AppError> {
        self.storage.ping().await?;
        Ok(())
    }

    /// Current balance of a user, if one has been opened.
    #[tracing::instrument(skip(self))]
    pub async fn get_balance(&self, user_id: i64) -> Result<Option<Balance>, AppError> {
        let mut tx = self.storage.begin().await?;
        let balance = tx.read_balance(user_id).await?;
        tx.commit().await?;

        Ok(balance)
    }

    /// Add funds to a user's balance, opening it when absent.
    ///
    /// # Process
    ///
    /// 1. Lock the balance (or open it at zero)
    /// 2. Store the increased amount
    /// 3. Append a credit history row
    /// 4. Commit
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: the new amount would overflow
    /// - `Storage`: storage failed; nothing was written
    #[tracing::instrument(skip(self))]
    pub async fn credit(&self, user_id: i64, amount: i64) -> Result<CreditReceipt, AppError> {
        let mut tx = self.storage.begin().await?;

        let (balance, created) = match tx.get_balance(user_id).await? {
            Some(balance) => (balance, false),
            None => tx.create_balance(user_id, 0).await?,
        };

        let new_amount = balance
            .amount
            .checked_add(amount)
            .ok_or_else(|| AppError::InvalidRequest("Balance would overflow".to_string()))?;

        let balance = tx.set_balance_amount(balance.id, new_amount).await?;
        tx.append_history(NewHistoryEntry {
            balance_id: balance.id,
            kind: TransactionKind::Credit,
            service_id: None,
            amount,
        })
        .await?;

        tx.commit().await?;

        info!(balance = balance.amount, created, "balance credited");
        Ok(CreditReceipt {
            balance,
            credited: amount,
            created,
        })
    }

    /// Hold `amount` from the user's balance for a service order.
    ///
    /// # Process
    ///
    /// 1. Lock the order's reservation (if any) and reject duplicates
    /// 2. Lock the balance and check for sufficient funds
    /// 3. Debit the balance, create the reservation, append a reserve row
    /// 4. Commit
    ///
    /// The reservation is locked before the balance, the same order as
    /// accept and cancel use.
    #[tracing::instrument(skip(self))]
    pub async fn reserve(
        &self,
        user_id: i64,
        service_id: i64,
        order_id: i64,
        amount: i64,
    ) -> Result<ReserveOutcome, AppError> {
        let mut tx = self.storage.begin().await?;

        if tx.get_reservation_by_order(order_id).await?.is_some() {
            warn!("order already has a reservation");
            return Ok(ReserveOutcome::DuplicateOrder { order_id });
        }

        let Some(balance) = tx.get_balance(user_id).await? else {
            info!("no balance to reserve from");
            return Ok(ReserveOutcome::NoBalance { user_id });
        };

        if amount > balance.amount {
            info!(available = balance.amount, "insufficient funds");
            return Ok(ReserveOutcome::InsufficientFunds {
                user_id,
                available: balance.amount,
                requested: amount,
            });
        }

        let balance = tx
            .set_balance_amount(balance.id, balance.amount - amount)
            .await?;

        let reservation = match tx
            .create_reservation(NewReservation {
                user_id,
                service_id,
                order_id,
                amount,
            })
            .await
        {
            Ok(reservation) => reservation,
            // A concurrent request created the same order first; dropping
            // the unit of work undoes the debit.
            Err(StorageError::Conflict(_)) => {
                warn!("order reserved concurrently");
                return Ok(ReserveOutcome::DuplicateOrder { order_id });
            }
            Err(err) => return Err(err.into()),
        };

        tx.append_history(NewHistoryEntry {
            balance_id: balance.id,
            kind: TransactionKind::Reserve,
            service_id: Some(service_id),
            amount,
        })
        .await?;

        tx.commit().await?;

        info!(balance = balance.amount, "funds reserved");
        Ok(ReserveOutcome::Reserved {
            reservation,
            balance,
        })
    }

    /// Finalize the reservation of an order as a paid service.
    ///
    /// The balance is not touched; the funds left it at reservation time.
    /// Only `InProgress` reservations can be accepted, so a second accept
    /// never writes a second payment row.
    #[tracing::instrument(skip(self))]
    pub async fn accept(&self, order_id: i64) -> Result<AcceptOutcome, AppError> {
        let mut tx = self.storage.begin().await?;

        let Some(reservation) = tx.get_reservation_by_order(order_id).await? else {
            info!("no reservation for order");
            return Ok(AcceptOutcome::NoReservation { order_id });
        };

        if reservation.status.is_terminal() {
            warn!(status = reservation.status.as_str(), "reservation is not in progress");
            return Ok(AcceptOutcome::NotInProgress {
                order_id,
                status: reservation.status,
            });
        }

        let reservation = tx
            .set_reservation_status(reservation.id, ReservationStatus::Accepted)
            .await?;

        let balance = owning_balance(&mut tx, reservation.user_id).await?;
        tx.append_history(NewHistoryEntry {
            balance_id: balance.id,
            kind: TransactionKind::PaidService,
            service_id: Some(reservation.service_id),
            amount: reservation.amount,
        })
        .await?;

        tx.commit().await?;

        info!(amount = reservation.amount, "reservation accepted");
        Ok(AcceptOutcome::Accepted(reservation))
    }

    /// Cancel the reservation of an order and return its amount to the
    /// owning balance.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, order_id: i64) -> Result<CancelOutcome, AppError> {
        let mut tx = self.storage.begin().await?;

        let Some(reservation) = tx.get_reservation_by_order(order_id).await? else {
            info!("no reservation for order");
            return Ok(CancelOutcome::NoReservation { order_id });
        };

        if reservation.status.is_terminal() {
            warn!(status = reservation.status.as_str(), "reservation is not in progress");
            return Ok(CancelOutcome::NotInProgress {
                order_id,
                status: reservation.status,
            });
        }

        let reservation = tx
            .set_reservation_status(reservation.id, ReservationStatus::Cancelled)
            .await?;

        let balance = owning_balance(&mut tx, reservation.user_id).await?;
        let refunded = balance.amount.checked_add(reservation.amount).ok_or_else(|| {
            StorageError::Integrity(format!("refund overflows balance {}", balance.id))
        })?;
        let balance = tx.set_balance_amount(balance.id, refunded).await?;

        tx.append_history(NewHistoryEntry {
            balance_id: balance.id,
            kind: TransactionKind::Refund,
            service_id: Some(reservation.service_id),
            amount: reservation.amount,
        })
        .await?;

        tx.commit().await?;

        info!(balance = balance.amount, "reservation cancelled");
        Ok(CancelOutcome::Cancelled {
            reservation,
            balance,
        })
    }

    /// One page of a user's history, or `None` when the user has no balance.
    #[tracing::instrument(skip(self))]
    pub async fn transaction_history(
        &self,
        user_id: i64,
        query: &HistoryQuery,
    ) -> Result<Option<Vec<HistoryItem>>, AppError> {
        let mut tx = self.storage.begin().await?;

        let Some(balance) = tx.read_balance(user_id).await? else {
            return Ok(None);
        };

        let rows = tx.list_history(balance.id, query).await?;
        tx.commit().await?;

        Ok(Some(rows.iter().map(HistoryItem::from).collect()))
    }
}

/// Balance a reservation was taken from. Its absence means the stored rows
/// are inconsistent, which aborts the unit of work.
async fn owning_balance<T: StorageTx>(tx: &mut T, user_id: i64) -> Result<Balance, StorageError> {
    tx.get_balance(user_id).await?.ok_or_else(|| {
        StorageError::Integrity(format!("reservation owner {user_id} has no balance"))
    })
}
