//! PostgreSQL backend built on sqlx.
//!
//! Each unit of work is a database transaction. Row locks are taken with
//! `SELECT ... FOR UPDATE`, so two requests touching the same balance or
//! order are serialized by PostgreSQL.

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use crate::{
    db::DbPool,
    models::{
        balance::Balance,
        reservation::{NewReservation, Reservation, ReservationStatus},
        transaction::{HistoryEntry, HistoryQuery, NewHistoryEntry},
    },
    storage::{Storage, StorageError, StorageTx},
};

const RESERVATION_COLUMNS: &str =
    "id, user_id, service_id, order_id, amount, status, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: DbPool,
}

impl PgStorage {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Storage for PgStorage {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, StorageError> {
        let tx = self.pool.begin().await?;
        Ok(PgTx { tx })
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Open PostgreSQL transaction. Rolled back by sqlx when dropped uncommitted.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StorageTx for PgTx {
    async fn get_balance(&mut self, user_id: i64) -> Result<Option<Balance>, StorageError> {
        let balance = sqlx::query_as::<_, Balance>(
            "SELECT id, user_id, amount FROM balances WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(balance)
    }

    async fn read_balance(&mut self, user_id: i64) -> Result<Option<Balance>, StorageError> {
        let balance = sqlx::query_as::<_, Balance>(
            "SELECT id, user_id, amount FROM balances WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(balance)
    }

    async fn create_balance(
        &mut self,
        user_id: i64,
        amount: i64,
    ) -> Result<(Balance, bool), StorageError> {
        // The no-op update makes a concurrent insert return (and lock) the
        // existing row instead of failing. `xmax = 0` only holds for a row
        // this statement inserted.
        let (id, user_id, amount, inserted) = sqlx::query_as::<_, (i64, i64, i64, bool)>(
            r#"
            INSERT INTO balances (user_id, amount)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id, amount, (xmax = 0) AS inserted
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok((
            Balance {
                id,
                user_id,
                amount,
            },
            inserted,
        ))
    }

    async fn set_balance_amount(
        &mut self,
        balance_id: i64,
        new_amount: i64,
    ) -> Result<Balance, StorageError> {
        let balance = sqlx::query_as::<_, Balance>(
            r#"
            UPDATE balances
            SET amount = $1
            WHERE id = $2
            RETURNING id, user_id, amount
            "#,
        )
        .bind(new_amount)
        .bind(balance_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(balance)
    }

    async fn append_history(&mut self, entry: NewHistoryEntry) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO transaction_history (balance_id, transaction_type_id, service_id, amount)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(entry.balance_id)
        .bind(entry.kind.id())
        .bind(entry.service_id)
        .bind(entry.amount)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn create_reservation(
        &mut self,
        reservation: NewReservation,
    ) -> Result<Reservation, StorageError> {
        let query = format!(
            r#"
            INSERT INTO reservations (user_id, service_id, order_id, amount, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {RESERVATION_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Reservation>(&query)
            .bind(reservation.user_id)
            .bind(reservation.service_id)
            .bind(reservation.order_id)
            .bind(reservation.amount)
            .bind(ReservationStatus::InProgress)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|err| match err {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    StorageError::Conflict(format!(
                        "order {} already has a reservation",
                        reservation.order_id
                    ))
                }
                other => StorageError::Database(other),
            })
    }

    async fn get_reservation_by_order(
        &mut self,
        order_id: i64,
    ) -> Result<Option<Reservation>, StorageError> {
        let query =
            format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE order_id = $1 FOR UPDATE");

        let reservation = sqlx::query_as::<_, Reservation>(&query)
            .bind(order_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(reservation)
    }

    async fn set_reservation_status(
        &mut self,
        reservation_id: i64,
        status: ReservationStatus,
    ) -> Result<Reservation, StorageError> {
        let query = format!(
            r#"
            UPDATE reservations
            SET status = $1,
                updated_at = NOW()
            WHERE id = $2
            RETURNING {RESERVATION_COLUMNS}
            "#
        );

        let reservation = sqlx::query_as::<_, Reservation>(&query)
            .bind(status)
            .bind(reservation_id)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(reservation)
    }

    async fn list_history(
        &mut self,
        balance_id: i64,
        query: &HistoryQuery,
    ) -> Result<Vec<HistoryEntry>, StorageError> {
        // Column and direction come from closed enums, never from request text.
        let sql = format!(
            r#"
            SELECT id, balance_id, transaction_type_id, service_id, amount, created_at
            FROM transaction_history
            WHERE balance_id = $1
            ORDER BY {column} {direction}, id {direction}
            LIMIT $2 OFFSET $3
            "#,
            column = query.sort.column(),
            direction = query.order.keyword(),
        );

        let rows = sqlx::query_as::<_, HistoryEntry>(&sql)
            .bind(balance_id)
            .bind(query.limit())
            .bind(query.offset())
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(rows)
    }

    async fn commit(self) -> Result<(), StorageError> {
        self.tx.commit().await?;
        Ok(())
    }
}
