//! VIP purchase backend for the game servers.
//!
//! HTTP service gluing together Steam identity verification, InfinitePay
//! checkout, webhook reconciliation, and the per-server-instance VIP
//! entitlement ledger, persisted as whole JSON documents on disk.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use config::AppConfig;
pub use error::AppError;
pub use routes::router;
pub use state::AppState;
