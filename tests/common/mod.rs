// Helpers are shared by several test binaries, each using a subset.
#![allow(dead_code)]

use std::sync::Arc;

use balance_service::{
    models::{reservation::ReserveOutcome, transaction::TransactionKind},
    services::BalanceService,
    storage::MemoryStorage,
};

/// Balance service over a fresh in-memory backend.
pub fn test_service() -> Arc<BalanceService<MemoryStorage>> {
    Arc::new(BalanceService::new(MemoryStorage::new()))
}

/// Kinds of all committed history rows, in insertion order.
pub async fn history_kinds(service: &BalanceService<MemoryStorage>) -> Vec<TransactionKind> {
    service
        .storage()
        .history()
        .await
        .iter()
        .filter_map(|entry| entry.kind())
        .collect()
}

pub async fn balance_amount(service: &BalanceService<MemoryStorage>, user_id: i64) -> i64 {
    service
        .get_balance(user_id)
        .await
        .unwrap()
        .map(|b| b.amount)
        .unwrap_or_default()
}

pub fn is_reserved(outcome: &ReserveOutcome) -> bool {
    matches!(outcome, ReserveOutcome::Reserved { .. })
}
