//! VIP Core - Shared domain types.
//!
//! This crate provides the domain vocabulary used across the VIP purchase
//! backend:
//!
//! - `backend` - HTTP API serving checkout, webhooks, and VIP queries
//! - `integration-tests` - HTTP-level tests against the real router
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no file
//! access. Every identifier crossing the API boundary (Steam IDs, Discord
//! IDs, server instances, VIP tiers, order references) is a validated
//! newtype so malformed input is rejected before it reaches persistence.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
