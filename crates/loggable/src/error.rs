// error.rs — Error types for the Loggable engine.
//
// Store failures pass through unchanged via `Store`; the engine does not
// retry or roll back.

use std::path::PathBuf;
use thiserror::Error;

use loggable_store::StoreError;

/// Errors that can occur while configuring the engine or running a cycle.
#[derive(Debug, Error)]
pub enum LoggableError {
    /// The identity (or another setting) could not be normalized.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An audit store failed to stage, patch, or flush.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Failed to read the configuration file.
    #[error("failed to read config at {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, LoggableError>;
