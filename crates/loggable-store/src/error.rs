// error.rs — Error types for the audit-log stores.
//
// Store failures are never translated by the engine; they propagate to the
// caller of the flush unchanged.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while staging, flushing, or reading log entries.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to open, read, or append to a store file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize or deserialize an entry (malformed JSON).
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An in-place update referenced an entry the store has never seen.
    #[error("log entry not found in store: {0}")]
    UnknownEntry(Uuid),

    /// A log-entry type was routed to a store id that is not registered.
    #[error("no store registered under id '{0}'")]
    UnknownStore(String),

    /// The JSONL hash chain is broken.
    #[error("integrity check failed at line {line}: expected hash {expected}, got {actual}")]
    IntegrityViolation {
        line: usize,
        expected: String,
        actual: String,
    },

    /// A revert targeted a version with no recorded entry.
    #[error("no version {version} recorded for {object_class}#{object_id}")]
    VersionNotFound {
        object_class: String,
        object_id: String,
        version: u32,
    },
}
