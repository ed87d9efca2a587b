//! TTL-bounded session cache for the Discord bot flow.
//!
//! The bot walks users through server choice, Steam linking, and checkout
//! across several interactions. The transient state between those steps
//! lives here, keyed by Discord identifier, with a bounded capacity and a
//! TTL so abandoned flows evaporate instead of accumulating forever. The
//! durable outcome of the flow (chosen server, linked Steam ID) is
//! persisted separately in the bot store.

use std::time::Duration;

use moka::sync::Cache;

use vip_core::{DiscordId, ServerInstance};

/// Transient per-user flow state. Losing it is harmless; the user restarts
/// the flow.
#[derive(Debug, Clone, Default)]
pub struct BotSession {
    /// Server picked in the current flow.
    pub server: Option<ServerInstance>,
    /// SteamID64 the user confirmed in the current flow.
    pub steam_id64: Option<String>,
    /// The OpenID login URL handed out for this flow.
    pub steam_auth_url: Option<String>,
}

/// Bounded, expiring session store.
#[derive(Clone)]
pub struct BotSessionStore {
    cache: Cache<DiscordId, BotSession>,
}

impl BotSessionStore {
    /// Default time-to-live for a flow session.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);
    /// Default maximum number of concurrent sessions.
    pub const DEFAULT_CAPACITY: u64 = 10_000;

    /// Create a store with the default TTL and capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(Self::DEFAULT_TTL, Self::DEFAULT_CAPACITY)
    }

    /// Create a store with explicit limits (used by tests).
    #[must_use]
    pub fn with_limits(ttl: Duration, capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(capacity)
                .build(),
        }
    }

    /// Current session for a user, if one is live.
    #[must_use]
    pub fn get(&self, discord_id: &DiscordId) -> Option<BotSession> {
        self.cache.get(discord_id)
    }

    /// Apply a mutation to the user's session, creating it if absent.
    /// Refreshes the TTL.
    pub fn update<F>(&self, discord_id: &DiscordId, f: F)
    where
        F: FnOnce(&mut BotSession),
    {
        let mut session = self.cache.get(discord_id).unwrap_or_default();
        f(&mut session);
        self.cache.insert(discord_id.clone(), session);
    }

    /// Drop a user's session (flow completed or abandoned).
    pub fn remove(&self, discord_id: &DiscordId) {
        self.cache.invalidate(discord_id);
    }
}

impl Default for BotSessionStore {
    fn default() -> Self {
        Self::new()
    }
}
