//! Ferrobank - double-entry ledger backend
//!
//! A PostgreSQL-backed ledger that moves money between accounts while
//! preserving double-entry invariants under concurrent access.
//!
//! # Modules
//!
//! - [`store`] - ledger persistence, the transaction executor and the
//!   transfer engine (the concurrency-critical core)
//! - [`api`] - axum REST gateway
//! - [`token`] - JWT access/refresh token issuance
//! - [`worker`] - background task queue for verification mail
//! - [`mail`] - email delivery abstraction
//! - [`config`] / [`logging`] - runtime wiring
//! - [`util`] - password hashing, currencies, random helpers

pub mod api;
pub mod config;
pub mod logging;
pub mod mail;
pub mod store;
pub mod token;
pub mod util;
pub mod worker;

pub use config::AppConfig;
pub use store::{Store, StoreError, TransferTxParams, TransferTxResult};
pub use token::TokenMaker;
