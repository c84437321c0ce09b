//! In-process storage backend.
//!
//! All state sits behind one `tokio::sync::Mutex`. A unit of work holds the
//! lock for its whole lifetime and edits a working copy, which replaces the
//! shared state only on commit. Units of work are therefore fully
//! serialized, and a dropped one leaves no trace.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    models::{
        balance::Balance,
        reservation::{NewReservation, Reservation, ReservationStatus},
        transaction::{HistoryEntry, HistoryQuery, NewHistoryEntry, SortField, SortOrder},
    },
    storage::{Storage, StorageError, StorageTx},
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    balances: Vec<Balance>,
    reservations: Vec<Reservation>,
    history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
    fail_history: Arc<AtomicBool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `append_history` fail until switched off again.
    #[doc(hidden)]
    pub fn fail_history_appends(&self, fail: bool) {
        self.fail_history.store(fail, Ordering::SeqCst);
    }

    /// Committed reservations, in insertion order.
    pub async fn reservations(&self) -> Vec<Reservation> {
        self.state.lock().await.reservations.clone()
    }

    /// Committed history rows, in insertion order.
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.state.lock().await.history.clone()
    }

    /// Insert a raw history row, bypassing the service.
    #[doc(hidden)]
    pub async fn insert_raw_history(&self, entry: HistoryEntry) {
        self.state.lock().await.history.push(entry);
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StorageError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();

        Ok(MemoryTx {
            guard,
            working,
            fail_history: self.fail_history.clone(),
        })
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_history: Arc<AtomicBool>,
}

impl MemoryTx {
    fn balance_mut(&mut self, balance_id: i64) -> Result<&mut Balance, StorageError> {
        self.working
            .balances
            .iter_mut()
            .find(|b| b.id == balance_id)
            .ok_or_else(|| StorageError::Integrity(format!("balance {balance_id} does not exist")))
    }
}

#[async_trait]
impl StorageTx for MemoryTx {
    async fn get_balance(&mut self, user_id: i64) -> Result<Option<Balance>, StorageError> {
        Ok(self
            .working
            .balances
            .iter()
            .find(|b| b.user_id == user_id)
            .cloned())
    }

    async fn read_balance(&mut self, user_id: i64) -> Result<Option<Balance>, StorageError> {
        self.get_balance(user_id).await
    }

    async fn create_balance(
        &mut self,
        user_id: i64,
        amount: i64,
    ) -> Result<(Balance, bool), StorageError> {
        if let Some(existing) = self.working.balances.iter().find(|b| b.user_id == user_id) {
            return Ok((existing.clone(), false));
        }

        let balance = Balance {
            id: self.working.balances.len() as i64 + 1,
            user_id,
            amount,
        };
        self.working.balances.push(balance.clone());
        Ok((balance, true))
    }

    async fn set_balance_amount(
        &mut self,
        balance_id: i64,
        new_amount: i64,
    ) -> Result<Balance, StorageError> {
        if new_amount < 0 {
            return Err(StorageError::Integrity(format!(
                "balance {balance_id} cannot become negative"
            )));
        }

        let balance = self.balance_mut(balance_id)?;
        balance.amount = new_amount;
        Ok(balance.clone())
    }

    async fn append_history(&mut self, entry: NewHistoryEntry) -> Result<(), StorageError> {
        if self.fail_history.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "history append failed".to_string(),
            ));
        }

        let id = self.working.history.len() as i64 + 1;
        self.working.history.push(HistoryEntry {
            id,
            balance_id: entry.balance_id,
            transaction_type_id: entry.kind.id(),
            service_id: entry.service_id,
            amount: entry.amount,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn create_reservation(
        &mut self,
        reservation: NewReservation,
    ) -> Result<Reservation, StorageError> {
        if self
            .working
            .reservations
            .iter()
            .any(|r| r.order_id == reservation.order_id)
        {
            return Err(StorageError::Conflict(format!(
                "order {} already has a reservation",
                reservation.order_id
            )));
        }

        let now = Utc::now();
        let created = Reservation {
            id: self.working.reservations.len() as i64 + 1,
            user_id: reservation.user_id,
            service_id: reservation.service_id,
            order_id: reservation.order_id,
            amount: reservation.amount,
            status: ReservationStatus::InProgress,
            created_at: now,
            updated_at: now,
        };
        self.working.reservations.push(created.clone());
        Ok(created)
    }

    async fn get_reservation_by_order(
        &mut self,
        order_id: i64,
    ) -> Result<Option<Reservation>, StorageError> {
        Ok(self
            .working
            .reservations
            .iter()
            .find(|r| r.order_id == order_id)
            .cloned())
    }

    async fn set_reservation_status(
        &mut self,
        reservation_id: i64,
        status: ReservationStatus,
    ) -> Result<Reservation, StorageError> {
        let reservation = self
            .working
            .reservations
            .iter_mut()
            .find(|r| r.id == reservation_id)
            .ok_or_else(|| {
                StorageError::Integrity(format!("reservation {reservation_id} does not exist"))
            })?;

        reservation.status = status;
        reservation.updated_at = Utc::now();
        Ok(reservation.clone())
    }

    async fn list_history(
        &mut self,
        balance_id: i64,
        query: &HistoryQuery,
    ) -> Result<Vec<HistoryEntry>, StorageError> {
        let mut rows: Vec<HistoryEntry> = self
            .working
            .history
            .iter()
            .filter(|h| h.balance_id == balance_id)
            .cloned()
            .collect();

        match query.sort {
            SortField::CreatedAt => rows.sort_by_key(|h| (h.created_at, h.id)),
            SortField::Amount => rows.sort_by_key(|h| (h.amount, h.id)),
        }
        if query.order == SortOrder::Desc {
            rows.reverse();
        }

        Ok(rows
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .collect())
    }

    async fn commit(self) -> Result<(), StorageError> {
        let MemoryTx {
            mut guard, working, ..
        } = self;
        *guard = working;
        Ok(())
    }
}
