//! Balance service against a real PostgreSQL database.
//!
//! These tests need a reachable server and are skipped by default. Run them
//! with:
//!
//! ```text
//! DATABASE_URL=postgres://... cargo test --test postgres_test -- --ignored
//! ```
//!
//! Every test works on its own user and order ids, so the suite can run
//! repeatedly against the same database.

use std::{
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
    time::Duration,
};

use anyhow::{Context, Result};
use balance_service::{
    db,
    models::{
        reservation::{AcceptOutcome, ReservationStatus, ReserveOutcome},
        transaction::{HistoryQuery, SortField, SortOrder},
    },
    services::BalanceService,
    storage::{PgStorage, Storage, StorageTx},
};
use chrono::Utc;

static NEXT_ID: AtomicI64 = AtomicI64::new(0);

/// Id no earlier run of the suite has used.
fn unique_id() -> i64 {
    let base = Utc::now().timestamp_micros() * 1_000;
    base + NEXT_ID.fetch_add(1, Ordering::SeqCst)
}

async fn pg_service() -> Result<Arc<BalanceService<PgStorage>>> {
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = db::create_pool(&url, 20).await?;
    db::run_migrations(&pool).await?;

    Ok(Arc::new(BalanceService::new(PgStorage::new(pool))))
}

async fn amount_of(service: &BalanceService<PgStorage>, user_id: i64) -> Result<i64> {
    Ok(service
        .get_balance(user_id)
        .await?
        .map(|b| b.amount)
        .unwrap_or_default())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_pg_concurrent_full_reserves_only_one_wins() -> Result<()> {
    let service = pg_service().await?;
    let user_id = unique_id();
    service.credit(user_id, 100).await?;

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let service = service.clone();
            let order_id = unique_id();
            tokio::spawn(async move { service.reserve(user_id, 3, order_id, 100).await })
        })
        .collect();

    let mut reserved = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await?? {
            ReserveOutcome::Reserved { .. } => reserved += 1,
            ReserveOutcome::InsufficientFunds { .. } => insufficient += 1,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    assert_eq!(reserved, 1);
    assert_eq!(insufficient, 4);
    assert_eq!(amount_of(&service, user_id).await?, 0);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_pg_concurrent_accepts_pay_once() -> Result<()> {
    let service = pg_service().await?;
    let user_id = unique_id();
    let order_id = unique_id();
    service.credit(user_id, 100).await?;
    service.reserve(user_id, 3, order_id, 40).await?;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.accept(order_id).await })
        })
        .collect();

    let mut accepted = Vec::new();
    for handle in handles {
        if let AcceptOutcome::Accepted(reservation) = handle.await?? {
            accepted.push(reservation);
        }
    }

    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].status, ReservationStatus::Accepted);
    assert_eq!(amount_of(&service, user_id).await?, 60);

    let query = HistoryQuery::new(1, SortField::CreatedAt, SortOrder::Asc);
    let history = service
        .transaction_history(user_id, &query)
        .await?
        .context("balance should exist")?;
    let paid = history
        .iter()
        .filter(|item| item.transaction_type == "funds debited for service 3")
        .count();
    assert_eq!(paid, 1);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_pg_concurrent_first_credits_open_one_balance() -> Result<()> {
    let service = pg_service().await?;
    let user_id = unique_id();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.credit(user_id, 5).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        if handle.await??.created {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    assert_eq!(amount_of(&service, user_id).await?, 50);

    let history = service
        .transaction_history(user_id, &HistoryQuery::default())
        .await?
        .context("balance should exist")?;
    assert_eq!(history.len(), 10);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_pg_duplicate_order_is_rejected_and_debited_once() -> Result<()> {
    let service = pg_service().await?;
    let user_id = unique_id();
    let order_id = unique_id();
    service.credit(user_id, 100).await?;

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.reserve(user_id, 3, order_id, 10).await })
        })
        .collect();

    let mut reserved = 0;
    let mut duplicate = 0;
    for handle in handles {
        match handle.await?? {
            ReserveOutcome::Reserved { .. } => reserved += 1,
            ReserveOutcome::DuplicateOrder { .. } => duplicate += 1,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    assert_eq!(reserved, 1);
    assert_eq!(duplicate, 5);
    assert_eq!(amount_of(&service, user_id).await?, 90);

    // A later request for the same order is still a duplicate.
    let again = service.reserve(user_id, 3, order_id, 10).await?;
    assert!(matches!(again, ReserveOutcome::DuplicateOrder { .. }));
    assert_eq!(amount_of(&service, user_id).await?, 90);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_pg_balance_reads_do_not_wait_for_row_locks() -> Result<()> {
    let service = pg_service().await?;
    let user_id = unique_id();
    service.credit(user_id, 25).await?;

    // Hold the row lock a writer would take.
    let mut writer = service.storage().begin().await?;
    writer
        .get_balance(user_id)
        .await?
        .context("balance should exist")?;

    let balance = tokio::time::timeout(Duration::from_secs(5), service.get_balance(user_id))
        .await
        .context("balance read blocked on a row lock")??;
    assert_eq!(balance.map(|b| b.amount), Some(25));

    let history = tokio::time::timeout(
        Duration::from_secs(5),
        service.transaction_history(user_id, &HistoryQuery::default()),
    )
    .await
    .context("history read blocked on a row lock")??;
    assert_eq!(history.map(|rows| rows.len()), Some(1));

    drop(writer);
    Ok(())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at PostgreSQL"]
async fn test_pg_create_balance_reports_insert_once() -> Result<()> {
    let service = pg_service().await?;
    let user_id = unique_id();

    let mut tx = service.storage().begin().await?;
    let (first, inserted) = tx.create_balance(user_id, 0).await?;
    assert!(inserted);

    let (second, inserted) = tx.create_balance(user_id, 0).await?;
    assert!(!inserted);
    assert_eq!(first, second);

    tx.commit().await?;
    Ok(())
}
