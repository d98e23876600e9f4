// patch.rs — Field-level corrections to entries already accepted by a store.
//
// When an identifier only becomes known after a physical insert, the entry
// that needed it is corrected in place instead of being re-saved. The old
// value travels with the patch so stores tracking original state stay
// consistent.

use serde::{Deserialize, Serialize};

use crate::entry::LogData;

/// A single-field update to an existing LogEntry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum EntryPatch {
    /// Fill in the audited object's identifier.
    ObjectId { old: Option<String>, new: String },
    /// Replace the recorded data with a version carrying resolved relations.
    Data { old: Option<LogData>, new: LogData },
}

impl EntryPatch {
    /// Name of the patched field.
    pub fn field(&self) -> &'static str {
        match self {
            EntryPatch::ObjectId { .. } => "object_id",
            EntryPatch::Data { .. } => "data",
        }
    }
}
