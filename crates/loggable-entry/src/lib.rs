//! # loggable-entry
//!
//! The audit record written by the Loggable engine.
//!
//! A [`LogEntry`] captures one create, update, or remove of an audited
//! entity: who did it, which object, the per-object version, and the
//! values of the audited fields at that point.
//!
//! ## Quick Example
//!
//! ```rust
//! use loggable_entry::{Identifier, LogAction, LogData, LogEntry};
//!
//! let mut data = LogData::new();
//! data.insert("title".into(), "Title".into());
//!
//! let entry = LogEntry::new(LogAction::Create, "Article")
//!     .with_object_id(&Identifier::from(1i64))
//!     .with_data(data);
//! assert_eq!(entry.version, 1);
//! ```

pub mod entry;
pub mod identifier;
pub mod patch;

pub use entry::{LogAction, LogData, LogEntry};
pub use identifier::Identifier;
pub use patch::EntryPatch;
