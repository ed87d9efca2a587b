//! JSON-file persistence.
//!
//! Flat files on local disk, one whole-document read/write per call - not a
//! transactional database. See [`store::JsonStore`] for the per-instance
//! ledger documents and [`bot_store::BotStore`] for the bot-side document.

pub mod bot_store;
pub mod store;

pub use bot_store::BotStore;
pub use store::JsonStore;

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A document on disk is not valid JSON for its schema.
    #[error("corrupt document at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A document could not be serialized for writing.
    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),
}
