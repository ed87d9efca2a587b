//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::{BotStore, JsonStore};
use crate::services::payments::{CheckoutProvider, InfinitePayClient, PaymentError};
use crate::services::sessions::BotSessionStore;
use crate::services::steam::{SteamClient, SteamError, SteamGateway};

/// Error creating the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("steam client: {0}")]
    Steam(#[from] SteamError),
    #[error("payment client: {0}")]
    Payment(#[from] PaymentError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. External collaborators sit behind trait
/// objects so tests can swap in doubles without network access.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    store: JsonStore,
    bot_store: BotStore,
    sessions: BotSessionStore,
    steam: Arc<dyn SteamGateway>,
    payments: Arc<dyn CheckoutProvider>,
}

impl AppState {
    /// Create the production state: real Steam and InfinitePay clients,
    /// stores rooted at the configured data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client fails to build.
    pub fn new(config: AppConfig) -> Result<Self, StateError> {
        let steam: Arc<dyn SteamGateway> = Arc::new(SteamClient::new(&config)?);
        let payments: Arc<dyn CheckoutProvider> = Arc::new(InfinitePayClient::new(&config)?);
        Ok(Self::with_collaborators(config, steam, payments))
    }

    /// Create state with explicit collaborators (tests inject doubles
    /// here).
    #[must_use]
    pub fn with_collaborators(
        config: AppConfig,
        steam: Arc<dyn SteamGateway>,
        payments: Arc<dyn CheckoutProvider>,
    ) -> Self {
        let store = JsonStore::new(&config.data_dir);
        let bot_store = BotStore::new(&config.data_dir);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                bot_store,
                sessions: BotSessionStore::new(),
                steam,
                payments,
            }),
        }
    }

    /// Get a reference to the backend configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the per-instance document store.
    #[must_use]
    pub fn store(&self) -> &JsonStore {
        &self.inner.store
    }

    /// Get a reference to the bot-side store.
    #[must_use]
    pub fn bot_store(&self) -> &BotStore {
        &self.inner.bot_store
    }

    /// Get a reference to the bot session cache.
    #[must_use]
    pub fn sessions(&self) -> &BotSessionStore {
        &self.inner.sessions
    }

    /// Get a reference to the Steam collaborator.
    #[must_use]
    pub fn steam(&self) -> &dyn SteamGateway {
        self.inner.steam.as_ref()
    }

    /// Get a reference to the payment collaborator.
    #[must_use]
    pub fn payments(&self) -> &dyn CheckoutProvider {
        self.inner.payments.as_ref()
    }
}
