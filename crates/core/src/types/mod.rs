//! Validated newtypes for the VIP purchase domain.

mod discord;
mod instance;
mod order;
mod steam_id;
mod vip;

pub use discord::{DiscordId, DiscordIdError};
pub use instance::{InvalidInstance, ServerInstance};
pub use order::OrderNsu;
pub use steam_id::{SteamId64, SteamIdError};
pub use vip::VipType;
