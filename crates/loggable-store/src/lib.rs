//! # loggable-store
//!
//! Stores for Loggable audit entries.
//!
//! Every backend implements [`LogStore`], a small unit of work: entries are
//! staged, corrected in place when a deferred identifier arrives, and written
//! on flush. Three backends ship with the crate:
//!
//! - [`MemoryStore`]: in-process, for hosts that keep their log table in memory
//! - [`JsonlStore`]: append-only JSON Lines with a SHA-256 hash chain
//! - [`SqliteStore`]: a `log_entries` table via rusqlite
//!
//! [`StoreRegistry`] routes a log-entry type to the store that persists it,
//! and [`LogEntryRepository`] answers history and revert queries.

pub mod error;
pub mod hasher;
pub mod jsonl;
pub mod memory;
pub mod registry;
pub mod repository;
pub mod sqlite;
pub mod store;

pub use error::StoreError;
pub use jsonl::JsonlStore;
pub use memory::MemoryStore;
pub use registry::{StoreId, StoreRegistry};
pub use repository::LogEntryRepository;
pub use sqlite::SqliteStore;
pub use store::{LogStore, PendingWork};
