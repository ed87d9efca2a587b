//! Instance-independent store for the Discord bot flow.

use std::path::PathBuf;

use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;

use vip_core::DiscordId;

use super::StoreError;
use crate::models::{BotStoreDocument, BotUser};

/// Store for the bot-side document (`users.json`).
///
/// Same first-read-creates, whole-document semantics as
/// [`super::JsonStore`], with a single lock since there is only one file.
pub struct BotStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl BotStore {
    /// File name of the bot document inside the data directory.
    pub const FILE_NAME: &'static str = "users.json";

    /// Create a store whose document lives under `data_dir`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join(Self::FILE_NAME),
            lock: Mutex::new(()),
        }
    }

    /// Read the bot document, creating an empty one if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on I/O failure or a corrupt file.
    pub async fn read(&self) -> Result<BotStoreDocument, StoreError> {
        let _guard = self.lock.lock().await;
        self.read_unlocked().await
    }

    /// Run a read-modify-write cycle under the store lock.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a [`StoreError`] if reading or
    /// writing fails.
    pub async fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut BotStoreDocument) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.lock.lock().await;
        let mut doc = self.read_unlocked().await?;
        let value = f(&mut doc)?;
        self.write_unlocked(&doc).await?;
        Ok(value)
    }

    /// Upsert a bot user by Discord identity and apply a mutation to it.
    ///
    /// Creates a blank record on first sight, then hands it to the closure;
    /// `updatedAt` is refreshed after the closure runs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on I/O failure or a corrupt file.
    pub async fn upsert_user<F>(
        &self,
        discord_id: &DiscordId,
        f: F,
    ) -> Result<BotUser, StoreError>
    where
        F: FnOnce(&mut BotUser),
    {
        self.with_transaction(|doc| {
            let pos = doc
                .users
                .iter()
                .position(|u| &u.discord_id == discord_id)
                .unwrap_or_else(|| {
                    doc.users.push(BotUser::new(discord_id.clone()));
                    doc.users.len() - 1
                });

            let user = &mut doc.users[pos];
            f(user);
            user.updated_at = Utc::now();
            Ok::<_, StoreError>(user.clone())
        })
        .await
    }

    async fn read_unlocked(&self) -> Result<BotStoreDocument, StoreError> {
        if !fs::try_exists(&self.path).await? {
            let doc = BotStoreDocument::default();
            self.write_unlocked(&doc).await?;
            return Ok(doc);
        }

        let raw = fs::read_to_string(&self.path).await?;
        serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn write_unlocked(&self, doc: &BotStoreDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let encoded = serde_json::to_string_pretty(doc).map_err(StoreError::Encode)?;
        fs::write(&self.path, encoded).await?;
        Ok(())
    }
}
