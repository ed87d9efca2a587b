//! External collaborators and domain services.
//!
//! - [`steam`] - Steam OpenID handshake and Web API identity validation
//! - [`payments`] - InfinitePay checkout links and webhook signatures
//! - [`vip`] - the VIP entitlement ledger
//! - [`sessions`] - TTL-bounded cache for the bot's transient flow state

pub mod payments;
pub mod sessions;
pub mod steam;
pub mod vip;
