//! Balance service: per-user balances, transaction history and a
//! reserve-then-accept/cancel funds hold for paid services.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod storage;
