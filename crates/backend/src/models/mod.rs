//! Persisted record types.
//!
//! Two stores exist, each with its own file and lock, and nothing is
//! reconciled between them:
//!
//! - [`document`] - the per-server-instance document holding users, VIP
//!   entitlements, purchases, and Discord<->Steam links. This is the ledger
//!   the checkout and webhook paths operate on.
//! - [`bot`] - the instance-independent document backing the Discord bot's
//!   simplified purchase flow. It shares no invariant with the ledger.

pub mod bot;
pub mod document;

pub use bot::{BotPayment, BotPaymentStatus, BotStoreDocument, BotUser};
pub use document::{DiscordSteamLink, Document, Purchase, PurchaseStatus, User, VipEntitlement};
