//! # loggable
//!
//! Audit-trail engine for object mappers.
//!
//! The host framework reports each flush through three signals. On
//! `on_flush` the engine reads the scheduled insertions, updates, and
//! deletions from a [`HostAdapter`] and stages one [`LogEntry`] per audited
//! change, versioned per object. Identifiers that only exist after the
//! physical insert are filled in on `post_persist`. On `post_flush` every
//! secondary store that received entries is flushed once.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use loggable::{AuditConfig, LoggableListener};
//!
//! let mut listener = LoggableListener::new();
//! listener.configure_type("Article", AuditConfig::versioned(["title", "body"]));
//! listener.set_identity("jules")?;
//!
//! let mut cycle = listener.on_flush(&mut host)?;
//! // host writes its objects, calling post_persist after each insert
//! let report = listener.post_flush(cycle)?;
//! assert!(report.is_complete());
//! ```
//!
//! [`LogEntry`]: loggable_entry::LogEntry

pub mod adapter;
pub mod config;
pub mod coordinator;
pub mod cycle;
pub mod error;
pub mod hook;
pub mod identity;
pub mod listener;
pub mod projector;
pub mod resolver;
pub mod synthesizer;
pub mod target;

#[cfg(test)]
mod testing;

pub use adapter::{
    AssociationKind, ClassMetadata, FieldChange, FieldValue, HostAdapter, IdGenerator,
    ObjectChangeSet, DEFAULT_LOG_ENTRY_TYPE,
};
pub use config::{AuditConfig, LoggableConfig};
pub use coordinator::PendingFlush;
pub use cycle::{CycleReport, FlushCycle, ObjectArena, TrackedIndex, Unresolved, UnresolvedEntry};
pub use error::{LoggableError, Result};
pub use hook::{NoopHook, PrePersistHook};
pub use identity::{IdentityProvider, IdentitySource};
pub use listener::LoggableListener;
pub use resolver::{PendingInsert, PendingRelation, PendingWrites};
pub use target::{StoreAccess, StoreTarget};

pub use loggable_entry::{EntryPatch, Identifier, LogAction, LogData, LogEntry};
pub use loggable_store::{LogStore, StoreError, StoreId, StoreRegistry};
