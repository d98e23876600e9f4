//! # loggable-host-memory
//!
//! A small in-memory object mapper that hosts the Loggable engine.
//!
//! [`EntityManager`] keeps entities as field maps, detects changes against
//! the last flush, and implements [`loggable::HostAdapter`]. Its `flush`
//! drives the listener through a full cycle:
//!
//! 1. compute the insertions, updates, and deletions
//! 2. `on_flush`, staging log entries
//! 3. per insertion: assign the generated id, then `post_persist`
//! 4. apply deletions, snapshot, and write the primary log store
//! 5. `post_flush`, writing every staged secondary store once
//!
//! If any step fails, staged log entries are discarded in every store.

pub mod entity;
pub mod error;
pub mod manager;

pub use entity::{EntityRef, EntityState, Field};
pub use error::HostError;
pub use manager::{EntityManager, FlushPlan};
