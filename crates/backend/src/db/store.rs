//! Per-instance document store with exclusive read-modify-write cycles.

use std::path::PathBuf;

use tokio::fs;
use tokio::sync::Mutex;

use vip_core::ServerInstance;

use super::StoreError;
use crate::models::Document;

/// Whole-document JSON store, one file per server instance.
///
/// `read` materializes a default empty document on first access
/// (first-read-creates; there is no separate initialize step). All access
/// to a given instance's file is serialized behind a per-instance async
/// mutex, so a [`Self::with_transaction`] cycle can never interleave with
/// another writer on the same instance. Different instances proceed
/// concurrently.
pub struct JsonStore {
    data_dir: PathBuf,
    locks: [Mutex<()>; ServerInstance::ALL.len()],
}

impl JsonStore {
    /// Create a store rooted at `data_dir`. The directory is created lazily
    /// on first write.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            locks: [Mutex::new(()), Mutex::new(())],
        }
    }

    /// Path of the document file for an instance.
    #[must_use]
    pub fn document_path(&self, instance: ServerInstance) -> PathBuf {
        self.data_dir.join(format!("{instance}.json"))
    }

    /// Read an instance's document, creating an empty one if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on I/O failure or if the file on disk is not
    /// valid JSON for the document schema.
    pub async fn read(&self, instance: ServerInstance) -> Result<Document, StoreError> {
        let _guard = self.lock_for(instance).lock().await;
        self.read_unlocked(instance).await
    }

    /// Overwrite an instance's document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on I/O or serialization failure.
    pub async fn write(&self, instance: ServerInstance, doc: &Document) -> Result<(), StoreError> {
        let _guard = self.lock_for(instance).lock().await;
        self.write_unlocked(instance, doc).await
    }

    /// Run a read-modify-write cycle under the instance's exclusive lock.
    ///
    /// The closure receives the document snapshot, mutates it in place, and
    /// returns a value. The document is written back only when the closure
    /// succeeds; an `Err` leaves the file untouched.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a [`StoreError`] (converted via
    /// `From`) if reading or writing the document fails.
    pub async fn with_transaction<T, E, F>(
        &self,
        instance: ServerInstance,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut Document) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.lock_for(instance).lock().await;
        let mut doc = self.read_unlocked(instance).await?;
        let value = f(&mut doc)?;
        self.write_unlocked(instance, &doc).await?;
        Ok(value)
    }

    fn lock_for(&self, instance: ServerInstance) -> &Mutex<()> {
        match instance {
            ServerInstance::Solo => &self.locks[0],
            ServerInstance::Duo => &self.locks[1],
        }
    }

    async fn read_unlocked(&self, instance: ServerInstance) -> Result<Document, StoreError> {
        let path = self.document_path(instance);
        if !fs::try_exists(&path).await? {
            let doc = Document::default();
            self.write_unlocked(instance, &doc).await?;
            return Ok(doc);
        }

        let raw = fs::read_to_string(&path).await?;
        serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt { path, source })
    }

    async fn write_unlocked(
        &self,
        instance: ServerInstance,
        doc: &Document,
    ) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir).await?;
        let encoded = serde_json::to_string_pretty(doc).map_err(StoreError::Encode)?;
        fs::write(self.document_path(instance), encoded).await?;
        Ok(())
    }
}
