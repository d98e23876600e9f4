// error.rs — Error types for the in-memory host.

use thiserror::Error;

use loggable::LoggableError;
use loggable_store::StoreError;

use crate::entity::EntityRef;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("class not registered: {0}")]
    UnknownClass(String),

    #[error("entity {0} does not belong to this manager")]
    UnknownEntity(EntityRef),

    #[error("entity {0} has been removed")]
    Removed(EntityRef),

    #[error("no flush in progress")]
    NoFlushInProgress,

    #[error(transparent)]
    Loggable(#[from] LoggableError),

    #[error("log store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, HostError>;
