//! Persistence boundary used by the balance service.
//!
//! The service never issues queries itself. It opens a unit of work with
//! [`Storage::begin`], performs its reads and writes through [`StorageTx`],
//! and commits. A unit of work that is dropped without `commit` is rolled
//! back, so an operation that fails half way leaves nothing behind.
//!
//! # Locking
//!
//! `get_balance` and `get_reservation_by_order` lock the row they return
//! until the unit of work ends. Compound operations therefore see a balance
//! that no concurrent request can change between the check and the write.
//! Pure reads use `read_balance`, which takes no lock and does not wait for
//! in-flight writers.

use async_trait::async_trait;

use crate::models::{
    balance::Balance,
    reservation::{NewReservation, Reservation, ReservationStatus},
    transaction::{HistoryEntry, HistoryQuery, NewHistoryEntry},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

/// Failure of the persistence collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Stored rows contradict each other.
    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Factory for units of work.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    type Tx: StorageTx;

    async fn begin(&self) -> Result<Self::Tx, StorageError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), StorageError>;
}

/// One atomic unit of work.
#[async_trait]
pub trait StorageTx: Send + Sized {
    /// Balance of `user_id`, locked for the rest of the unit of work.
    async fn get_balance(&mut self, user_id: i64) -> Result<Option<Balance>, StorageError>;

    /// Balance of `user_id` as last committed, without locking it.
    async fn read_balance(&mut self, user_id: i64) -> Result<Option<Balance>, StorageError>;

    /// Open a balance. If one was opened concurrently, that row is returned
    /// (locked) instead. The flag is `true` only when this call inserted it.
    async fn create_balance(
        &mut self,
        user_id: i64,
        amount: i64,
    ) -> Result<(Balance, bool), StorageError>;

    async fn set_balance_amount(
        &mut self,
        balance_id: i64,
        new_amount: i64,
    ) -> Result<Balance, StorageError>;

    async fn append_history(&mut self, entry: NewHistoryEntry) -> Result<(), StorageError>;

    /// Insert an `InProgress` reservation. Fails with
    /// [`StorageError::Conflict`] when the order already has one.
    async fn create_reservation(
        &mut self,
        reservation: NewReservation,
    ) -> Result<Reservation, StorageError>;

    /// Reservation of `order_id`, locked for the rest of the unit of work.
    async fn get_reservation_by_order(
        &mut self,
        order_id: i64,
    ) -> Result<Option<Reservation>, StorageError>;

    async fn set_reservation_status(
        &mut self,
        reservation_id: i64,
        status: ReservationStatus,
    ) -> Result<Reservation, StorageError>;

    async fn list_history(
        &mut self,
        balance_id: i64,
        query: &HistoryQuery,
    ) -> Result<Vec<HistoryEntry>, StorageError>;

    async fn commit(self) -> Result<(), StorageError>;
}
